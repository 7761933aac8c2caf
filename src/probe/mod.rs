//! 探测模块
//!
//! 提供单目标HTTP探测、探测结果和批量并发探测功能

pub mod outcome;
pub mod prober;
pub mod runner;

// 重新导出主要类型
pub use outcome::{OutcomeSummary, ProbeOutcome, ProbeStatus};
pub use prober::{completion_policy, BodyRead, HttpProber, TargetProber};
pub use runner::BatchRunner;
