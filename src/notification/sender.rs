//! 通知发送器模块
//!
//! 定义通知发送的trait、待发送消息和统一的发送结果

use crate::error::NotificationError;
use crate::probe::ProbeOutcome;
use crate::report::ReportMode;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// 待发送的通知消息
#[derive(Debug, Clone, Copy)]
pub struct NotificationMessage<'a> {
    /// 已渲染的报告内容
    pub content: &'a str,
    /// 报告格式
    pub mode: ReportMode,
    /// 原始探测结果（可选，供需要结构化数据的渠道使用）
    pub outcomes: Option<&'a [ProbeOutcome]>,
}

/// 统一的发送结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchResult {
    /// 是否成功
    pub success: bool,
    /// 结果描述
    pub message: String,
    /// 渠道返回的附加信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl DispatchResult {
    /// 创建成功结果
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    /// 创建失败结果
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }

    /// 附加渠道返回信息
    pub fn with_details(mut self, details: Option<Value>) -> Self {
        self.details = details;
        self
    }
}

/// 通知发送器trait
///
/// `Err` 只表示网络或解析层面的异常，由分发器统一转换成失败结果；
/// 渠道明确拒绝的情况直接返回 `success = false` 的 `DispatchResult`。
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// 渠道名称，用于日志和错误信息
    fn name(&self) -> &'static str;

    /// 发送消息
    ///
    /// # 参数
    /// * `message` - 通知消息
    ///
    /// # 返回
    /// * `Result<DispatchResult, NotificationError>` - 发送结果
    async fn send(
        &self,
        message: &NotificationMessage<'_>,
    ) -> Result<DispatchResult, NotificationError>;
}
