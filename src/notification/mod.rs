//! 通知模块
//!
//! 提供群机器人、通用 Webhook 和邮件网关三种通知渠道及统一分发

pub mod chat;
pub mod dispatcher;
pub mod email;
pub mod sender;
pub mod webhook;

// 重新导出主要类型
pub use chat::ChatSender;
pub use dispatcher::NotificationDispatcher;
pub use email::EmailSender;
pub use sender::{DispatchResult, NotificationMessage, NotificationSender};
pub use webhook::WebhookSender;
