//! HTTP入口测试
//!
//! 通过 `tower::ServiceExt` 直接向路由发送请求，不绑定端口

use access_relay::config::{Config, SinkType, Target, TimeoutConfig};
use access_relay::dedup::DedupGuard;
use access_relay::notification::NotificationDispatcher;
use access_relay::pipeline::Pipeline;
use access_relay::probe::{BatchRunner, HttpProber, ProbeOutcome, TargetProber};
use access_relay::web::build_router;
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tower::ServiceExt;

/// 每次探测耗时 800ms 的探测器，记录完成次数
#[derive(Default)]
struct SlowProber {
    finished: AtomicUsize,
}

#[async_trait]
impl TargetProber for SlowProber {
    async fn probe(&self, target: &Target, _timeouts: &TimeoutConfig) -> ProbeOutcome {
        tokio::time::sleep(Duration::from_millis(800)).await;
        self.finished.fetch_add(1, Ordering::SeqCst);
        ProbeOutcome::response(
            target,
            200,
            "OK".into(),
            true,
            true,
            2,
            Duration::from_millis(800),
        )
    }
}

fn pipeline(targets: Vec<Target>) -> Arc<Pipeline> {
    let mut config = Config {
        targets,
        ..Config::default()
    };
    config.notification.enabled = false;
    config.notification.sink_url = "https://hooks.example/send?key=secret".to_string();

    Arc::new(Pipeline::new(
        Arc::new(config),
        BatchRunner::new(Arc::new(HttpProber::new().unwrap())),
        NotificationDispatcher::new().unwrap(),
        Arc::new(DedupGuard::default()),
    ))
}

fn request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_returns_ok() {
    let app = build_router(pipeline(Vec::new()));
    let resp = app.oneshot(request("GET", "/health")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn index_lists_endpoints_without_secrets() {
    let app = build_router(pipeline(Vec::new()));
    let resp = app.oneshot(request("GET", "/")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["name"], "access-relay");
    assert!(json["endpoints"]["/cron"].is_string());
    assert!(json["endpoints"]["/manual"].is_string());
    assert_eq!(json["config"]["returnType"], "text");

    let sink_url = json["config"]["notification"]["sinkUrl"].as_str().unwrap();
    assert!(!sink_url.contains("secret"));
}

#[tokio::test]
async fn manual_without_targets_reports_failure() {
    let app = build_router(pipeline(Vec::new()));
    let resp = app.oneshot(request("POST", "/manual")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], false);
    assert!(json.get("sendResult").is_none());
}

#[tokio::test]
async fn manual_runs_pipeline() {
    let mut server = mockito::Server::new_async().await;
    let _ok = server
        .mock("GET", "/")
        .with_status(200)
        .with_body("ok")
        .create_async()
        .await;

    let app = build_router(pipeline(vec![Target::new("Site", server.url())]));
    let resp = app.oneshot(request("GET", "/manual")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let json = body_json(resp.into_body()).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["results"][0]["name"], "Site");
    assert_eq!(json["results"][0]["status"], 200);
    assert!(json["formattedMessage"].is_string());
    assert_eq!(json["sendResult"]["message"], "通知已禁用");
}

#[tokio::test]
async fn repeated_cron_is_rejected_with_429() {
    let mut server = mockito::Server::new_async().await;
    let _ok = server
        .mock("GET", "/")
        .with_status(200)
        .create_async()
        .await;

    let app = build_router(pipeline(vec![Target::new("Site", server.url())]));

    let first = app.clone().oneshot(request("POST", "/cron")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_json = body_json(first.into_body()).await;
    assert!(first_json.get("formattedMessage").is_none());

    let second = app.oneshot(request("POST", "/cron")).await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let json = body_json(second.into_body()).await;
    assert_eq!(json["success"], false);
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let app = build_router(pipeline(Vec::new()));
    let resp = app.oneshot(request("GET", "/metrics")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn manual_cycle_survives_client_disconnect() {
    let mut sink = mockito::Server::new_async().await;
    let sink_mock = sink
        .mock("POST", "/hook")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let mut config = Config {
        targets: vec![Target::new("Slow", "https://slow.example")],
        ..Config::default()
    };
    config.notification.sink_type = SinkType::Webhook;
    config.notification.sink_url = format!("{}/hook", sink.url());

    let prober = Arc::new(SlowProber::default());
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(config),
        BatchRunner::new(prober.clone()),
        NotificationDispatcher::new().unwrap(),
        Arc::new(DedupGuard::default()),
    ));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(pipeline.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // 发出请求后在执行中途断开连接
    let mut client = TcpStream::connect(addr).await.unwrap();
    client
        .write_all(b"GET /manual HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    drop(client);

    tokio::time::sleep(Duration::from_millis(2000)).await;

    assert_eq!(prober.finished.load(Ordering::SeqCst), 1);
    sink_mock.assert_async().await;
}
