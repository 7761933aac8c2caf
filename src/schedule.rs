//! 内置每日定时触发
//!
//! 服务运行期间，每天在配置的本地时间触发一次定时流水线（同样受重复触发防护约束）。

use crate::pipeline::{Pipeline, TriggerKind};
use chrono::{DateTime, Days, Local, NaiveTime, TimeZone};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 计算下一次触发时间（严格晚于 `now`）
///
/// 遇到夏令时跳过的本地时间时顺延到下一天。
pub fn next_occurrence<Tz: TimeZone>(now: &DateTime<Tz>, at: NaiveTime) -> Option<DateTime<Tz>> {
    let timezone = now.timezone();
    let today = now.date_naive();

    (0..=2u64)
        .filter_map(|offset| today.checked_add_days(Days::new(offset)))
        .filter_map(|day| timezone.from_local_datetime(&day.and_time(at)).earliest())
        .find(|candidate| candidate > now)
}

/// 距离下一次触发的等待时长
fn delay_until_next(at: NaiveTime) -> Duration {
    let now = Local::now();
    next_occurrence(&now, at)
        .and_then(|next| (next - now).to_std().ok())
        .unwrap_or(Duration::from_secs(24 * 60 * 60))
}

/// 启动每日定时任务，收到关闭信号后退出
pub fn spawn_daily(
    pipeline: Arc<Pipeline>,
    at: NaiveTime,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("每日定时任务已启动，触发时间 {}", at.format("%H:%M"));
        loop {
            let delay = delay_until_next(at);
            info!("下一次定时触发在 {} 秒后", delay.as_secs());

            tokio::select! {
                _ = tokio::time::sleep(delay) => {
                    let outcome = Arc::clone(&pipeline)
                        .trigger_detached(TriggerKind::Scheduled)
                        .await;
                    let response = outcome.response();
                    if outcome.is_duplicate() {
                        warn!("定时触发被跳过: {}", response.message);
                    } else {
                        info!("定时触发结束: {}", response.message);
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("每日定时任务停止");
                    break;
                }
            }
        }
    })
}
