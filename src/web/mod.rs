//! HTTP入口模块
//!
//! 只负责路由：定时触发、手动触发、服务信息和存活检查

pub mod handlers;
pub mod server;

use crate::pipeline::Pipeline;
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use server::{serve, shutdown_signal};

/// Web服务共享状态
#[derive(Clone)]
pub struct AppState {
    /// 触发流水线
    pub pipeline: Arc<Pipeline>,
    /// 启动时间
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(pipeline: Arc<Pipeline>) -> Self {
        Self {
            pipeline,
            started_at: Utc::now(),
        }
    }
}

/// 构建路由
pub fn build_router(pipeline: Arc<Pipeline>) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health))
        .route("/cron", get(handlers::cron).post(handlers::cron))
        .route("/manual", get(handlers::manual).post(handlers::manual))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(pipeline))
}
