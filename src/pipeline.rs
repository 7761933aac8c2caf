//! 触发流水线
//!
//! 定时触发和手动触发共用的完整流程：
//! 重复触发检查 → 批量探测 → 报告渲染 → 通知分发。

use crate::config::{Config, NotificationConfig, SinkType};
use crate::dedup::{bucket_key, DedupGuard};
use crate::error::{AccessRelayError, PipelineError};
use crate::notification::{DispatchResult, NotificationDispatcher};
use crate::probe::{BatchRunner, HttpProber, ProbeOutcome};
use crate::report::{ReportFormatter, ReportMode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, info_span, warn, Instrument, Span};
use uuid::Uuid;

/// 触发类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// 定时触发（cron 或内置每日定时）
    Scheduled,
    /// 手动触发
    Manual,
}

impl TriggerKind {
    /// 重复触发的时间窗口
    pub fn dedup_window(&self) -> Duration {
        match self {
            TriggerKind::Scheduled => Duration::from_secs(60),
            TriggerKind::Manual => Duration::from_secs(10),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Scheduled => "scheduled",
            TriggerKind::Manual => "manual",
        }
    }

    fn completed_message(&self) -> &'static str {
        match self {
            TriggerKind::Scheduled => "定时任务执行完成",
            TriggerKind::Manual => "手动触发执行完成",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 响应中回显的通知配置，地址中的查询参数会被隐去
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEcho {
    pub sink_type: SinkType,
    pub sink_url: String,
    pub enabled: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub mail_to: String,
}

impl NotificationEcho {
    pub fn from_config(config: &NotificationConfig) -> Self {
        Self {
            sink_type: config.sink_type,
            sink_url: redact_url(&config.sink_url),
            enabled: config.enabled,
            mail_to: config.mail_to.clone(),
        }
    }
}

/// 响应中回显的运行配置
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigEcho {
    pub return_type: ReportMode,
    pub notification: NotificationEcho,
}

impl ConfigEcho {
    pub fn from_config(config: &Config) -> Self {
        Self {
            return_type: config.report.mode,
            notification: NotificationEcho::from_config(&config.notification),
        }
    }
}

/// 隐去URL中的查询参数（通常携带机器人密钥）
pub fn redact_url(url: &str) -> String {
    match url.split_once('?') {
        Some((base, query)) if !query.is_empty() => format!("{}?***", base),
        _ => url.to_string(),
    }
}

/// 触发结果载荷
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<ProbeOutcome>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub send_result: Option<DispatchResult>,
    /// 只有手动触发会回传渲染后的报告
    #[serde(skip_serializing_if = "Option::is_none")]
    pub formatted_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config: Option<ConfigEcho>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            results: None,
            send_result: None,
            formatted_message: None,
            config: None,
            error: None,
        }
    }
}

/// 一次触发的结果
#[derive(Debug, Clone)]
pub enum TriggerOutcome {
    /// 流水线已执行（无论成功与否）
    Completed(TriggerResponse),
    /// 同一时间桶内已执行过，本次被拒绝
    Duplicate(TriggerResponse),
}

impl TriggerOutcome {
    pub fn is_duplicate(&self) -> bool {
        matches!(self, TriggerOutcome::Duplicate(_))
    }

    pub fn response(&self) -> &TriggerResponse {
        match self {
            TriggerOutcome::Completed(response) | TriggerOutcome::Duplicate(response) => response,
        }
    }

    pub fn into_response(self) -> TriggerResponse {
        match self {
            TriggerOutcome::Completed(response) | TriggerOutcome::Duplicate(response) => response,
        }
    }
}

/// 触发流水线
pub struct Pipeline {
    runner: BatchRunner,
    formatter: ReportFormatter,
    dispatcher: NotificationDispatcher,
    dedup: Arc<DedupGuard>,
    config: Arc<Config>,
}

impl Pipeline {
    /// 使用给定组件创建流水线
    pub fn new(
        config: Arc<Config>,
        runner: BatchRunner,
        dispatcher: NotificationDispatcher,
        dedup: Arc<DedupGuard>,
    ) -> Self {
        Self {
            runner,
            formatter: ReportFormatter::new(),
            dispatcher,
            dedup,
            config,
        }
    }

    /// 使用默认的HTTP探测器和通知分发器创建流水线
    pub fn from_config(config: Config) -> Result<Self, AccessRelayError> {
        let runner = BatchRunner::new(Arc::new(HttpProber::new()?));
        let dispatcher = NotificationDispatcher::new()?;
        Ok(Self::new(
            Arc::new(config),
            runner,
            dispatcher,
            Arc::new(DedupGuard::default()),
        ))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// 以当前时间触发
    pub async fn trigger(&self, kind: TriggerKind) -> TriggerOutcome {
        self.trigger_at(kind, Utc::now()).await
    }

    /// 以指定时间触发，时间只用于计算重复触发的时间桶
    ///
    /// 整轮执行发生在调用方的 future 内，调用方被取消时本轮也随之中断。
    pub async fn trigger_at(&self, kind: TriggerKind, now: DateTime<Utc>) -> TriggerOutcome {
        match self.acquire(kind, now) {
            Ok(span) => TriggerOutcome::Completed(self.run_cycle(kind).instrument(span).await),
            Err(duplicate) => duplicate,
        }
    }

    /// 在独立任务中以当前时间触发
    pub async fn trigger_detached(self: Arc<Self>, kind: TriggerKind) -> TriggerOutcome {
        self.trigger_detached_at(kind, Utc::now()).await
    }

    /// 在独立任务中执行一轮流水线
    ///
    /// 时间桶一旦占用，本轮就会执行到底：调用方被丢弃不会中断探测和通知。
    /// 任务异常终止（如探测器 panic）按流水线失败处理。
    pub async fn trigger_detached_at(
        self: Arc<Self>,
        kind: TriggerKind,
        now: DateTime<Utc>,
    ) -> TriggerOutcome {
        let span = match self.acquire(kind, now) {
            Ok(span) => span,
            Err(duplicate) => return duplicate,
        };

        let pipeline = Arc::clone(&self);
        let handle = tokio::spawn(
            async move { pipeline.run_cycle(kind).await }.instrument(span.clone()),
        );

        match handle.await {
            Ok(response) => TriggerOutcome::Completed(response),
            Err(e) => {
                let error = PipelineError::Aborted(e.to_string());
                TriggerOutcome::Completed(self.fail(kind, error).instrument(span).await)
            }
        }
    }

    /// 占用时间桶，成功时返回本轮的 tracing span
    fn acquire(&self, kind: TriggerKind, now: DateTime<Utc>) -> Result<Span, TriggerOutcome> {
        let window = kind.dedup_window();
        let key = bucket_key(now, window);

        if !self.dedup.try_acquire(&key, now) {
            warn!("{} 触发重复，时间桶 {} 已执行", kind, key);
            return Err(TriggerOutcome::Duplicate(TriggerResponse::failure(format!(
                "请求过于频繁，请在 {} 秒后重试",
                window.as_secs()
            ))));
        }

        let run_id = Uuid::new_v4();
        Ok(info_span!("trigger", run_id = %run_id, kind = %kind, bucket = %key))
    }

    /// 只探测并渲染报告，不发送通知
    pub async fn check(
        &self,
        mode: ReportMode,
    ) -> Result<(Vec<ProbeOutcome>, String), PipelineError> {
        let outcomes = self
            .runner
            .run_all(&self.config.targets, &self.config.timeout_config())
            .await;
        let report = self.formatter.format(&outcomes, mode)?;
        Ok((outcomes, report))
    }

    async fn run_cycle(&self, kind: TriggerKind) -> TriggerResponse {
        let mode = self.config.report.mode;
        let notification = &self.config.notification;

        if self.config.targets.is_empty() {
            return match kind {
                TriggerKind::Scheduled => {
                    let message = "⚠️ 定时任务执行：没有找到任何已配置的访问目标";
                    warn!("{}", message);
                    let send_result = self
                        .dispatcher
                        .dispatch(message, notification, mode, None)
                        .await;
                    TriggerResponse {
                        send_result: Some(send_result),
                        ..TriggerResponse::failure(message)
                    }
                }
                TriggerKind::Manual => {
                    warn!("手动触发：没有找到任何已配置的访问目标");
                    TriggerResponse::failure("没有找到任何已配置的访问目标")
                }
            };
        }

        info!("开始执行，共 {} 个目标", self.config.targets.len());
        let outcomes = self
            .runner
            .run_all(&self.config.targets, &self.config.timeout_config())
            .await;

        let formatted = match self.formatter.format(&outcomes, mode) {
            Ok(formatted) => formatted,
            Err(e) => return self.fail(kind, e).await,
        };

        let send_result = self
            .dispatcher
            .dispatch(&formatted, notification, mode, Some(&outcomes))
            .await;

        let succeeded = outcomes.iter().filter(|o| o.success).count();
        info!(
            "执行完成: 成功 {}，失败 {}，通知{}",
            succeeded,
            outcomes.len() - succeeded,
            if send_result.success { "成功" } else { "失败" }
        );

        TriggerResponse {
            success: true,
            message: kind.completed_message().to_string(),
            results: Some(outcomes),
            send_result: Some(send_result),
            formatted_message: (kind == TriggerKind::Manual).then_some(formatted),
            config: Some(ConfigEcho::from_config(&self.config)),
            error: None,
        }
    }

    /// 流水线失败：尽力发送失败通知，并返回带原因的失败载荷
    async fn fail(&self, kind: TriggerKind, error: PipelineError) -> TriggerResponse {
        let message = match kind {
            TriggerKind::Scheduled => format!("❌ 定时任务执行失败: {}", error),
            TriggerKind::Manual => "手动触发执行失败".to_string(),
        };
        warn!("{}: {}", message, error);

        let notice = format!("❌ {} 执行失败: {}", kind, error);
        let send_result = self
            .dispatcher
            .dispatch(
                &notice,
                &self.config.notification,
                self.config.report.mode,
                None,
            )
            .await;

        TriggerResponse {
            send_result: Some(send_result),
            error: Some(error.to_string()),
            ..TriggerResponse::failure(message)
        }
    }
}
