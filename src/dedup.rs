//! 重复触发防护
//!
//! 以粗粒度时间桶为键，防止同一时间桶内重复启动完整的探测周期。
//! 只在进程内存中生效，重启后清空；只保留最近若干个时间桶。

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

/// 默认保留的时间桶数量
pub const DEFAULT_CAPACITY: usize = 64;

/// 计算时间桶键：把时间向下取整到窗口边界
pub fn bucket_key(now: DateTime<Utc>, window: Duration) -> String {
    let window_secs = window.as_secs().max(1) as i64;
    let bucket_start = now.timestamp().div_euclid(window_secs) * window_secs;
    Utc.timestamp_opt(bucket_start, 0)
        .single()
        .unwrap_or(now)
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// 重复触发防护
#[derive(Debug)]
pub struct DedupGuard {
    /// 最近的时间桶：键和首次出现时间
    buckets: Mutex<VecDeque<(String, DateTime<Utc>)>>,
    /// 最多保留的时间桶数量
    capacity: usize,
}

impl Default for DedupGuard {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl DedupGuard {
    /// 创建新的防护器
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buckets: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<(String, DateTime<Utc>)>> {
        // 记录只增不改，中毒后的数据仍然可用
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// 该时间桶是否已经运行过
    pub fn should_skip(&self, bucket_key: &str) -> bool {
        self.lock().iter().any(|(key, _)| key == bucket_key)
    }

    /// 记录时间桶已运行，已存在时保留首次时间
    pub fn mark_run(&self, bucket_key: &str, time: DateTime<Utc>) {
        let mut buckets = self.lock();
        Self::insert(&mut buckets, self.capacity, bucket_key, time);
    }

    /// 原子地检查并记录，返回 `true` 表示本次可以运行
    pub fn try_acquire(&self, bucket_key: &str, time: DateTime<Utc>) -> bool {
        let mut buckets = self.lock();
        if buckets.iter().any(|(key, _)| key == bucket_key) {
            debug!("时间桶 {} 已运行，跳过", bucket_key);
            return false;
        }
        Self::insert(&mut buckets, self.capacity, bucket_key, time);
        true
    }

    /// 某个时间桶首次出现的时间
    pub fn first_seen(&self, bucket_key: &str) -> Option<DateTime<Utc>> {
        self.lock()
            .iter()
            .find(|(key, _)| key == bucket_key)
            .map(|(_, time)| *time)
    }

    /// 当前保留的时间桶数量
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(
        buckets: &mut VecDeque<(String, DateTime<Utc>)>,
        capacity: usize,
        bucket_key: &str,
        time: DateTime<Utc>,
    ) {
        if buckets.iter().any(|(key, _)| key == bucket_key) {
            return;
        }
        if buckets.len() >= capacity {
            buckets.pop_front();
        }
        buckets.push_back((bucket_key.to_string(), time));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_bucket_key_floors_to_window() {
        let window = Duration::from_secs(60);
        assert_eq!(bucket_key(at(120), window), bucket_key(at(179), window));
        assert_ne!(bucket_key(at(179), window), bucket_key(at(180), window));
        assert_eq!(bucket_key(at(125), window), "1970-01-01T00:02:00Z");
    }

    #[test]
    fn test_bucket_key_short_window() {
        let window = Duration::from_secs(10);
        assert_eq!(bucket_key(at(100), window), bucket_key(at(105), window));
        assert_ne!(bucket_key(at(105), window), bucket_key(at(110), window));
    }

    #[test]
    fn test_should_skip_after_mark() {
        let guard = DedupGuard::default();
        let key = bucket_key(at(1_000), Duration::from_secs(60));

        assert!(!guard.should_skip(&key));
        guard.mark_run(&key, at(1_000));
        assert!(guard.should_skip(&key));

        // 重复标记不覆盖首次时间
        guard.mark_run(&key, at(1_030));
        assert_eq!(guard.first_seen(&key), Some(at(1_000)));
        assert_eq!(guard.len(), 1);
    }

    #[test]
    fn test_try_acquire_once_per_bucket() {
        let guard = DedupGuard::default();
        let window = Duration::from_secs(60);

        assert!(guard.try_acquire(&bucket_key(at(0), window), at(0)));
        assert!(!guard.try_acquire(&bucket_key(at(5), window), at(5)));
        assert!(guard.try_acquire(&bucket_key(at(60), window), at(60)));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let guard = DedupGuard::new(2);
        guard.mark_run("a", at(0));
        guard.mark_run("b", at(1));
        guard.mark_run("c", at(2));

        assert_eq!(guard.len(), 2);
        assert!(!guard.should_skip("a"));
        assert!(guard.should_skip("b"));
        assert!(guard.should_skip("c"));
    }

    #[test]
    fn test_concurrent_acquire_single_winner() {
        let guard = Arc::new(DedupGuard::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = guard.clone();
                std::thread::spawn(move || guard.try_acquire("same-bucket", Utc::now()))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
