//! 通知分发器
//!
//! 按渠道类型选择发送器，并把所有异常统一折叠为失败的 `DispatchResult`

use crate::config::{NotificationConfig, SinkType};
use crate::error::NotificationError;
use crate::notification::chat::ChatSender;
use crate::notification::email::EmailSender;
use crate::notification::sender::{DispatchResult, NotificationMessage, NotificationSender};
use crate::notification::webhook::WebhookSender;
use crate::probe::ProbeOutcome;
use crate::report::ReportMode;
use reqwest::Client;
use std::time::Duration;
use tracing::{error, info, warn};

/// 通知请求超时
const DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// 通知分发器
#[derive(Debug, Clone)]
pub struct NotificationDispatcher {
    /// 所有渠道共用的HTTP客户端
    client: Client,
}

impl NotificationDispatcher {
    /// 创建新的通知分发器
    pub fn new() -> Result<Self, NotificationError> {
        let client = Client::builder()
            .timeout(DISPATCH_TIMEOUT)
            .user_agent(format!("{}/{}", crate::APP_NAME, crate::VERSION))
            .build()?;

        Ok(Self::with_client(client))
    }

    /// 使用已有的HTTP客户端创建分发器
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// 根据配置选择发送器，未知类型已在解析时回退到群机器人
    pub fn sender_for(&self, config: &NotificationConfig) -> Box<dyn NotificationSender> {
        match config.sink_type {
            SinkType::Chat => Box::new(ChatSender::new(self.client.clone(), &config.sink_url)),
            SinkType::Webhook => {
                Box::new(WebhookSender::new(self.client.clone(), &config.sink_url))
            }
            SinkType::Email => Box::new(EmailSender::new(
                self.client.clone(),
                &config.sink_url,
                &config.mail_to,
                &config.mail_subject,
            )),
        }
    }

    /// 分发通知，从不返回错误
    ///
    /// # 参数
    /// * `message` - 已渲染的报告
    /// * `config` - 通知配置
    /// * `mode` - 报告格式
    /// * `outcomes` - 原始探测结果（可选）
    ///
    /// # 返回
    /// * `DispatchResult` - 发送结果
    pub async fn dispatch(
        &self,
        message: &str,
        config: &NotificationConfig,
        mode: ReportMode,
        outcomes: Option<&[ProbeOutcome]>,
    ) -> DispatchResult {
        if !config.enabled {
            info!("通知已禁用，跳过发送");
            return DispatchResult::ok("通知已禁用");
        }

        let sender = self.sender_for(config);
        let notification = NotificationMessage {
            content: message,
            mode,
            outcomes,
        };

        match sender.send(&notification).await {
            Ok(result) => {
                if result.success {
                    info!("{}通知发送成功: {}", sender.name(), result.message);
                } else {
                    warn!("{}通知发送失败: {}", sender.name(), result.message);
                }
                result
            }
            Err(e) => {
                error!("{}通知发送异常: {}", sender.name(), e);
                DispatchResult::failed(format!("{}发送异常: {}", sender.name(), e))
            }
        }
    }
}
