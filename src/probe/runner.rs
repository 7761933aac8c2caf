//! 批量探测模块
//!
//! 按 `concurrency_limit` 把目标切成连续的批次，批内并发探测，批间等待固定延迟。
//! 输出顺序与输入顺序一致，与完成先后无关。

use crate::config::{Target, TimeoutConfig};
use crate::probe::outcome::ProbeOutcome;
use crate::probe::prober::TargetProber;
use futures::future::join_all;
use std::sync::Arc;
use tracing::info;

/// 批量探测器
#[derive(Clone)]
pub struct BatchRunner {
    /// 单目标探测器
    prober: Arc<dyn TargetProber>,
}

impl BatchRunner {
    /// 创建新的批量探测器
    pub fn new(prober: Arc<dyn TargetProber>) -> Self {
        Self { prober }
    }

    /// 探测全部目标
    ///
    /// # 参数
    /// * `targets` - 有序的目标列表
    /// * `timeouts` - 超时与并发配置
    ///
    /// # 返回
    /// * `Vec<ProbeOutcome>` - 每个目标一个结果，顺序与输入一致
    pub async fn run_all(&self, targets: &[Target], timeouts: &TimeoutConfig) -> Vec<ProbeOutcome> {
        let limit = timeouts.concurrency_limit.max(1);
        let total_chunks = targets.len().div_ceil(limit);
        let mut outcomes = Vec::with_capacity(targets.len());

        for (index, chunk) in targets.chunks(limit).enumerate() {
            info!(
                "开始探测第 {}/{} 批，共 {} 个目标",
                index + 1,
                total_chunks,
                chunk.len()
            );

            // join_all 按输入位置返回结果
            let results = join_all(chunk.iter().map(|t| self.prober.probe(t, timeouts))).await;
            let succeeded = results.iter().filter(|o| o.success).count();
            info!(
                "第 {}/{} 批完成: 成功 {}，失败 {}",
                index + 1,
                total_chunks,
                succeeded,
                results.len() - succeeded
            );
            outcomes.extend(results);

            if index + 1 < total_chunks && timeouts.batch_delay_ms > 0 {
                tokio::time::sleep(timeouts.batch_delay()).await;
            }
        }

        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::Instant;

    /// 记录并发峰值的假探测器，目标序号越小耗时越长
    #[derive(Default)]
    struct RecordingProber {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TargetProber for RecordingProber {
        async fn probe(&self, target: &Target, _timeouts: &TimeoutConfig) -> ProbeOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            let index: u64 = target.name.trim_start_matches('t').parse().unwrap();
            tokio::time::sleep(Duration::from_millis(100 - index)).await;

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            let success = index % 3 != 0;
            if success {
                ProbeOutcome::response(target, 200, "OK".into(), true, true, 10, Duration::ZERO)
            } else {
                ProbeOutcome::error(target, "boom".into(), Duration::ZERO)
            }
        }
    }

    fn targets(n: usize) -> Vec<Target> {
        (0..n)
            .map(|i| Target::new(format!("t{}", i), format!("https://t{}.example", i)))
            .collect()
    }

    fn timeouts(limit: usize, delay_ms: u64) -> TimeoutConfig {
        TimeoutConfig {
            concurrency_limit: limit,
            batch_delay_ms: delay_ms,
            ..TimeoutConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_order_and_length_preserved() {
        let prober = Arc::new(RecordingProber::default());
        let runner = BatchRunner::new(prober.clone());
        let input = targets(12);

        let outcomes = runner.run_all(&input, &timeouts(5, 0)).await;

        assert_eq!(outcomes.len(), input.len());
        for (target, outcome) in input.iter().zip(&outcomes) {
            assert_eq!(target.name, outcome.name);
        }
        // 失败的目标同样保留
        assert!(outcomes.iter().any(|o| !o.success));
        assert_eq!(prober.calls.load(Ordering::SeqCst), 12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_bounded() {
        for limit in [1, 2, 3, 7] {
            let prober = Arc::new(RecordingProber::default());
            let runner = BatchRunner::new(prober.clone());

            runner.run_all(&targets(10), &timeouts(limit, 0)).await;

            assert!(prober.peak.load(Ordering::SeqCst) <= limit);
            assert_eq!(prober.peak.load(Ordering::SeqCst), limit.min(10));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_between_chunks_only() {
        let prober = Arc::new(RecordingProber::default());
        let runner = BatchRunner::new(prober);

        // 三个批次 => 两次批间延迟；每批最长耗时 100ms
        let started = Instant::now();
        runner.run_all(&targets(6), &timeouts(2, 1_000)).await;
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_millis(2_000));
        assert!(elapsed < Duration::from_millis(3_000));
    }

    #[tokio::test]
    async fn test_empty_targets() {
        let runner = BatchRunner::new(Arc::new(RecordingProber::default()));
        let outcomes = runner.run_all(&[], &TimeoutConfig::default()).await;
        assert!(outcomes.is_empty());
    }
}
