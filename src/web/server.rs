//! HTTP服务器
//!
//! 绑定地址并运行路由，收到关闭信号后优雅退出

use crate::error::Result;
use crate::pipeline::Pipeline;
use crate::web::build_router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

/// 启动HTTP服务器，直到 `shutdown` 完成
pub async fn serve(
    pipeline: Arc<Pipeline>,
    addr: SocketAddr,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(pipeline);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP服务已启动: http://{}", listener.local_addr()?);
    info!("定时触发: http://{}/cron", addr);
    info!("手动触发: http://{}/manual", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP服务已关闭");
    Ok(())
}

/// 等待 Ctrl+C 或 SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("监听 Ctrl+C 失败: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("监听 SIGTERM 失败: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("接收到 Ctrl+C，开始优雅关闭..."),
        _ = terminate => info!("接收到 SIGTERM，开始优雅关闭..."),
    }
}
