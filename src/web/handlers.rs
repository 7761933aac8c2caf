//! 路由处理函数

use super::AppState;
use crate::pipeline::{ConfigEcho, TriggerKind, TriggerOutcome};
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// 服务信息
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    endpoints: BTreeMap<&'static str, &'static str>,
    environment: &'static str,
    config: ConfigEcho,
}

/// 存活检查响应
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    uptime_seconds: i64,
}

/// 服务信息
pub async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let endpoints = BTreeMap::from([
        ("/", "服务信息"),
        ("/cron", "定时任务执行"),
        ("/manual", "手动触发执行"),
        ("/health", "存活检查"),
    ]);

    Json(ServiceInfo {
        name: crate::APP_NAME,
        version: crate::VERSION,
        description: crate::APP_DESCRIPTION,
        endpoints,
        environment: "设置 ACCESS_ 开头的环境变量来配置要访问的网址",
        config: ConfigEcho::from_config(state.pipeline.config()),
    })
}

/// 存活检查
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok",
        version: crate::VERSION,
        uptime_seconds: (Utc::now() - state.started_at).num_seconds(),
    })
}

/// 定时触发
pub async fn cron(State(state): State<AppState>) -> Response {
    info!("收到定时触发请求");
    into_http(state.pipeline.trigger_detached(TriggerKind::Scheduled).await)
}

/// 手动触发
pub async fn manual(State(state): State<AppState>) -> Response {
    info!("收到手动触发请求");
    into_http(state.pipeline.trigger_detached(TriggerKind::Manual).await)
}

/// 重复触发返回 429，其余一律 200
fn into_http(outcome: TriggerOutcome) -> Response {
    match outcome {
        TriggerOutcome::Completed(response) => (StatusCode::OK, Json(response)).into_response(),
        TriggerOutcome::Duplicate(response) => {
            (StatusCode::TOO_MANY_REQUESTS, Json(response)).into_response()
        }
    }
}
