//! Access Relay - 定时访问网址并推送结果报告
//!
//! 按批并发访问一组配置好的网址，记录状态、耗时和响应体是否完整，
//! 渲染成文本或HTML报告后推送到群机器人、Webhook或邮件网关：
//! - 响应头与响应体两级超时
//! - 有界并发，批次之间固定延迟
//! - 定时/手动两种触发入口，带重复触发防护
//! - 结构化日志记录

pub mod cli;
pub mod config;
pub mod dedup;
pub mod error;
pub mod logging;
pub mod notification;
pub mod pipeline;
pub mod probe;
pub mod report;
pub mod schedule;
pub mod web;

// 重新导出主要类型
pub use config::{Config, Target, TimeoutConfig};
pub use error::AccessRelayError;
pub use pipeline::{Pipeline, TriggerKind, TriggerOutcome, TriggerResponse};
pub use probe::{ProbeOutcome, ProbeStatus};

/// 应用程序版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 应用程序名称
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");

/// 应用程序描述
pub const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
