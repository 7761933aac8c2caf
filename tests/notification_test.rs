//! 通知分发测试
//!
//! 使用 mockito 模拟群机器人、Webhook 和邮件网关

use access_relay::config::{NotificationConfig, SinkType, Target};
use access_relay::notification::NotificationDispatcher;
use access_relay::probe::ProbeOutcome;
use access_relay::report::ReportMode;
use mockito::Matcher;
use serde_json::json;
use std::time::Duration;

fn notification(sink_type: SinkType, url: String) -> NotificationConfig {
    NotificationConfig {
        sink_url: url,
        sink_type,
        ..NotificationConfig::default()
    }
}

fn dispatcher() -> NotificationDispatcher {
    NotificationDispatcher::new().unwrap()
}

#[tokio::test]
async fn test_chat_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/cgi-bin/webhook/send")
        .match_body(Matcher::Json(json!({
            "msgtype": "text",
            "text": { "content": "报告内容" }
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"errcode":0,"errmsg":"ok"}"#)
        .create_async()
        .await;

    let config = notification(
        SinkType::Chat,
        format!("{}/cgi-bin/webhook/send", server.url()),
    );
    let result = dispatcher()
        .dispatch("报告内容", &config, ReportMode::Text, None)
        .await;

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.message, "群机器人消息发送成功");
}

#[tokio::test]
async fn test_chat_rejected_by_errcode() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(200)
        .with_body(r#"{"errcode":93000,"errmsg":"invalid webhook url"}"#)
        .create_async()
        .await;

    let config = notification(SinkType::Chat, server.url());
    let result = dispatcher()
        .dispatch("hello", &config, ReportMode::Text, None)
        .await;

    assert!(!result.success);
    assert_eq!(result.message, "群机器人发送失败: invalid webhook url");
    assert_eq!(result.details.unwrap()["errcode"], 93000);
}

#[tokio::test]
async fn test_chat_malformed_reply_is_failure() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/")
        .with_status(502)
        .with_body("<html>bad gateway</html>")
        .create_async()
        .await;

    let config = notification(SinkType::Chat, server.url());
    let result = dispatcher()
        .dispatch("hello", &config, ReportMode::Text, None)
        .await;

    assert!(!result.success);
    assert!(result.message.starts_with("群机器人发送异常"));
}

#[tokio::test]
async fn test_webhook_content_type_follows_mode() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/hook")
        .match_header("content-type", "text/html")
        .match_body("<p>report</p>")
        .with_status(204)
        .create_async()
        .await;

    let config = notification(SinkType::Webhook, format!("{}/hook", server.url()));
    let result = dispatcher()
        .dispatch("<p>report</p>", &config, ReportMode::Html, None)
        .await;

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.message, "Webhook消息发送成功");
}

#[tokio::test]
async fn test_webhook_error_status() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("POST", "/hook")
        .with_status(503)
        .create_async()
        .await;

    let config = notification(SinkType::Webhook, format!("{}/hook", server.url()));
    let result = dispatcher()
        .dispatch("report", &config, ReportMode::Text, None)
        .await;

    assert!(!result.success);
    assert_eq!(result.message, "Webhook发送失败: 503 Service Unavailable");
}

#[tokio::test]
async fn test_webhook_unreachable_never_panics() {
    // 绑定后立即释放，得到一个没有监听者的端口
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let config = notification(SinkType::Webhook, format!("http://{}/hook", addr));
    let result = dispatcher()
        .dispatch("report", &config, ReportMode::Text, None)
        .await;

    assert!(!result.success);
    assert!(result.message.starts_with("Webhook发送异常"));
}

#[tokio::test]
async fn test_email_gateway_payload() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/mail")
        .match_body(Matcher::PartialJson(json!({
            "to": "ops@example.com",
            "subject": "定时任务执行报告",
            "content": "report"
        })))
        .with_status(200)
        .with_body(r#"{"id":"msg-1"}"#)
        .create_async()
        .await;

    let mut config = notification(SinkType::Email, format!("{}/mail", server.url()));
    config.mail_to = "ops@example.com".to_string();

    let outcomes = vec![ProbeOutcome::response(
        &Target::new("A", "https://a.example"),
        200,
        "OK".into(),
        true,
        true,
        12,
        Duration::from_millis(8),
    )];

    let result = dispatcher()
        .dispatch("report", &config, ReportMode::Text, Some(&outcomes))
        .await;

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.details.unwrap()["id"], "msg-1");
}

#[tokio::test]
async fn test_email_requires_recipient() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/mail").expect(0).create_async().await;

    let config = notification(SinkType::Email, format!("{}/mail", server.url()));
    let result = dispatcher()
        .dispatch("report", &config, ReportMode::Text, None)
        .await;

    mock.assert_async().await;
    assert!(!result.success);
    assert!(result.message.contains("mail_to"));
}

#[tokio::test]
async fn test_disabled_sends_nothing() {
    let mut server = mockito::Server::new_async().await;
    let mock = server.mock("POST", "/").expect(0).create_async().await;

    let mut config = notification(SinkType::Chat, server.url());
    config.enabled = false;

    let result = dispatcher()
        .dispatch("report", &config, ReportMode::Text, None)
        .await;

    mock.assert_async().await;
    assert!(result.success);
    assert_eq!(result.message, "通知已禁用");
}
