//! 邮件通知发送器
//!
//! 通过邮件网关的 HTTP 接口发送报告，网关返回体尽量按 JSON 解析

use crate::error::NotificationError;
use crate::notification::sender::{DispatchResult, NotificationMessage, NotificationSender};
use crate::probe::ProbeOutcome;
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// 邮件网关请求体
#[derive(Debug, Serialize)]
struct EmailPayload<'a> {
    to: &'a str,
    subject: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<&'a [ProbeOutcome]>,
}

/// 邮件通知发送器
pub struct EmailSender {
    /// HTTP客户端
    client: Client,
    /// 邮件网关 URL
    gateway_url: String,
    /// 收件人
    mail_to: String,
    /// 邮件主题
    subject: String,
}

impl EmailSender {
    /// 创建新的邮件发送器
    pub fn new(
        client: Client,
        gateway_url: impl Into<String>,
        mail_to: impl Into<String>,
        subject: impl Into<String>,
    ) -> Self {
        Self {
            client,
            gateway_url: gateway_url.into(),
            mail_to: mail_to.into(),
            subject: subject.into(),
        }
    }

    /// 解析网关返回体，非 JSON 时保留原文
    fn parse_reply(text: &str) -> Option<Value> {
        if text.trim().is_empty() {
            return None;
        }
        Some(serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string())))
    }
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn name(&self) -> &'static str {
        "邮件"
    }

    async fn send(
        &self,
        message: &NotificationMessage<'_>,
    ) -> Result<DispatchResult, NotificationError> {
        if self.gateway_url.trim().is_empty() || self.mail_to.trim().is_empty() {
            return Ok(DispatchResult::failed(
                "邮件通知配置不完整: 需要同时配置 sink_url 和 mail_to",
            ));
        }

        debug!("发送邮件到 {} (网关: {})", self.mail_to, self.gateway_url);

        let payload = EmailPayload {
            to: &self.mail_to,
            subject: &self.subject,
            content: message.content,
            results: message.outcomes,
        };

        let response = self
            .client
            .post(&self.gateway_url)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let details = response
            .text()
            .await
            .ok()
            .and_then(|text| Self::parse_reply(&text));

        if status.is_success() {
            Ok(DispatchResult::ok(format!("邮件已发送至 {}", self.mail_to)).with_details(details))
        } else {
            Ok(DispatchResult::failed(format!(
                "邮件发送失败: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown")
            ))
            .with_details(details))
        }
    }
}
