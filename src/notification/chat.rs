//! 群机器人通知发送器
//!
//! 按企业微信群机器人的消息格式发送文本消息，以返回体中的 `errcode` 判定结果

use crate::error::NotificationError;
use crate::notification::sender::{DispatchResult, NotificationMessage, NotificationSender};
use crate::pipeline::redact_url;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

/// 群机器人返回体
#[derive(Debug, Deserialize)]
struct ChatReply {
    /// 错误码，0 表示成功
    errcode: Option<i64>,
    /// 错误信息
    #[serde(default)]
    errmsg: String,
}

/// 群机器人通知发送器
pub struct ChatSender {
    /// HTTP客户端
    client: Client,
    /// 机器人 webhook URL
    webhook_url: String,
}

impl ChatSender {
    /// 创建新的群机器人发送器
    pub fn new(client: Client, webhook_url: impl Into<String>) -> Self {
        Self {
            client,
            webhook_url: webhook_url.into(),
        }
    }

    /// 构建消息体
    fn build_message_body(content: &str) -> Value {
        json!({
            "msgtype": "text",
            "text": {
                "content": content
            }
        })
    }
}

#[async_trait]
impl NotificationSender for ChatSender {
    fn name(&self) -> &'static str {
        "群机器人"
    }

    async fn send(
        &self,
        message: &NotificationMessage<'_>,
    ) -> Result<DispatchResult, NotificationError> {
        debug!("发送消息到群机器人: {}", redact_url(&self.webhook_url));

        let body = Self::build_message_body(message.content);
        let response = self.client.post(&self.webhook_url).json(&body).send().await?;
        let text = response.text().await?;

        let raw: Value = serde_json::from_str(&text)
            .map_err(|e| NotificationError::MalformedReply(e.to_string()))?;
        let reply: ChatReply = serde_json::from_value(raw.clone())
            .map_err(|e| NotificationError::MalformedReply(e.to_string()))?;

        if reply.errcode == Some(0) {
            Ok(DispatchResult::ok("群机器人消息发送成功"))
        } else {
            Ok(
                DispatchResult::failed(format!("群机器人发送失败: {}", reply.errmsg))
                    .with_details(Some(raw)),
            )
        }
    }
}
