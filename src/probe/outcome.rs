//! 探测结果数据结构
//!
//! 定义单个目标一次探测的结果和状态码表示

use crate::config::Target;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::time::Duration;

/// 探测状态：HTTP状态码，或未拿到响应时的 `"ERROR"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStatus {
    /// 收到的HTTP状态码
    Code(u16),
    /// 网络错误或响应头超时
    Error,
}

impl ProbeStatus {
    pub fn code(&self) -> Option<u16> {
        match self {
            ProbeStatus::Code(code) => Some(*code),
            ProbeStatus::Error => None,
        }
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Code(code) => write!(f, "{}", code),
            ProbeStatus::Error => write!(f, "ERROR"),
        }
    }
}

impl Serialize for ProbeStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ProbeStatus::Code(code) => serializer.serialize_u16(*code),
            ProbeStatus::Error => serializer.serialize_str("ERROR"),
        }
    }
}

/// 单个目标一次探测的结果，产生后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// 目标名称
    pub name: String,
    /// 目标URL
    pub url: String,
    /// 状态码或 "ERROR"
    pub status: ProbeStatus,
    /// 状态描述
    pub status_text: String,
    /// 总耗时（毫秒）
    pub response_time_ms: u64,
    /// 是否成功
    pub success: bool,
    /// 响应体是否读取完整
    pub is_complete: bool,
    /// 已读取的响应体字节数
    pub response_size_bytes: u64,
    /// 完成时间
    #[serde(serialize_with = "serialize_iso")]
    pub timestamp: DateTime<Utc>,
}

fn serialize_iso<S>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

impl ProbeOutcome {
    /// 创建收到响应后的探测结果
    pub fn response(
        target: &Target,
        status_code: u16,
        status_text: String,
        success: bool,
        is_complete: bool,
        response_size_bytes: u64,
        elapsed: Duration,
    ) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            status: ProbeStatus::Code(status_code),
            status_text,
            response_time_ms: elapsed.as_millis() as u64,
            success,
            is_complete,
            response_size_bytes,
            timestamp: Utc::now(),
        }
    }

    /// 创建未拿到响应的错误结果
    pub fn error(target: &Target, message: String, elapsed: Duration) -> Self {
        Self {
            name: target.name.clone(),
            url: target.url.clone(),
            status: ProbeStatus::Error,
            status_text: message,
            response_time_ms: elapsed.as_millis() as u64,
            success: false,
            is_complete: false,
            response_size_bytes: 0,
            timestamp: Utc::now(),
        }
    }

    /// 使用固定时间戳（用于可复现的报告）
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// ISO-8601 时间戳（毫秒精度）
    pub fn timestamp_iso(&self) -> String {
        self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// 转换为JSON字符串
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// 汇总统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct OutcomeSummary {
    pub total: usize,
    pub success: usize,
    pub failure: usize,
}

impl OutcomeSummary {
    pub fn from_outcomes(outcomes: &[ProbeOutcome]) -> Self {
        let total = outcomes.len();
        let success = outcomes.iter().filter(|o| o.success).count();
        Self {
            total,
            success,
            failure: total - success,
        }
    }
}
