//! 通用 Webhook 通知发送器
//!
//! 原样 POST 报告内容，Content-Type 跟随报告格式

use crate::error::NotificationError;
use crate::notification::sender::{DispatchResult, NotificationMessage, NotificationSender};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use tracing::debug;

/// 通用 Webhook 发送器
pub struct WebhookSender {
    /// HTTP客户端
    client: Client,
    /// Webhook URL
    webhook_url: String,
}

impl WebhookSender {
    /// 创建新的 Webhook 发送器
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }
}

#[async_trait]
impl NotificationSender for WebhookSender {
    fn name(&self) -> &'static str {
        "Webhook"
    }

    async fn send(
        &self,
        message: &NotificationMessage<'_>,
    ) -> Result<DispatchResult, NotificationError> {
        debug!(
            "发送 {} 报告到 Webhook: {}",
            message.mode, self.webhook_url
        );

        let response = self
            .client
            .post(&self.webhook_url)
            .header(CONTENT_TYPE, message.mode.content_type())
            .body(message.content.to_string())
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(DispatchResult::ok("Webhook消息发送成功"))
        } else {
            Ok(DispatchResult::failed(format!(
                "Webhook发送失败: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            )))
        }
    }
}
