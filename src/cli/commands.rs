//! 命令处理逻辑
//!
//! 实现各个CLI子命令

use crate::cli::args::{Args, Commands};
use crate::config::{get_default_config_path, Config, TomlConfigLoader};
use crate::error::{AccessRelayError, ConfigError, Result};
use crate::pipeline::{Pipeline, TriggerKind};
use crate::probe::OutcomeSummary;
use crate::schedule;
use crate::web;
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// 命令处理器trait
#[async_trait]
pub trait Command: Send + Sync {
    /// 执行命令
    async fn execute(&self, args: &Args) -> Result<()>;
}

/// 根据参数选择命令处理器
pub fn command_for(args: &Args) -> Box<dyn Command> {
    match &args.command {
        Commands::Serve { .. } => Box::new(ServeCommand),
        Commands::Run { .. } => Box::new(RunCommand),
        Commands::Check { .. } => Box::new(CheckCommand),
        Commands::Validate { .. } => Box::new(ValidateCommand),
    }
}

/// 加载运行配置
///
/// 未显式指定配置文件时允许文件缺失，目标可以全部来自环境变量。
pub async fn load_config(args: &Args) -> Result<Config> {
    let (path, require_file) = match &args.config {
        Some(path) => (path.clone(), true),
        None => (get_default_config_path(), false),
    };

    TomlConfigLoader::new(true)
        .load_runtime(&path, require_file)
        .await
}

/// 服务命令
pub struct ServeCommand;

#[async_trait]
impl Command for ServeCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Serve { bind, port } = &args.command else {
            return Ok(());
        };

        let mut config = load_config(args).await?;
        if let Some(bind) = bind {
            config.server.bind_address = bind.clone();
        }
        if let Some(port) = port {
            config.server.port = *port;
        }

        let addr = socket_addr(&config)?;
        let daily_at = config
            .schedule
            .daily_time()
            .map_err(ConfigError::ValidationError)?;

        info!("已加载 {} 个访问目标", config.targets.len());
        let pipeline = Arc::new(Pipeline::from_config(config)?);

        let (shutdown_tx, _) = broadcast::channel(1);
        let schedule_handle = daily_at.map(|at| {
            schedule::spawn_daily(pipeline.clone(), at, shutdown_tx.subscribe())
        });

        let signal_tx = shutdown_tx.clone();
        let result = web::serve(pipeline, addr, async move {
            web::shutdown_signal().await;
            let _ = signal_tx.send(());
        })
        .await;

        // 服务异常退出时同样停止定时任务
        let _ = shutdown_tx.send(());
        if let Some(handle) = schedule_handle {
            if let Err(e) = handle.await {
                warn!("每日定时任务异常退出: {}", e);
            }
        }

        result
    }
}

fn socket_addr(config: &Config) -> Result<SocketAddr> {
    let raw = format!("{}:{}", config.server.bind_address, config.server.port);
    raw.parse().map_err(|_| {
        ConfigError::ValidationError(format!("无效的监听地址: {}", raw)).into()
    })
}

/// 单次执行命令
pub struct RunCommand;

#[async_trait]
impl Command for RunCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Run { manual } = &args.command else {
            return Ok(());
        };

        let kind = if *manual {
            TriggerKind::Manual
        } else {
            TriggerKind::Scheduled
        };

        let pipeline = Arc::new(Pipeline::from_config(load_config(args).await?)?);
        let response = pipeline.trigger_detached(kind).await.into_response();
        println!("{}", serde_json::to_string_pretty(&response)?);

        if response.success {
            Ok(())
        } else {
            Err(AccessRelayError::Other(anyhow::anyhow!(
                "执行失败: {}",
                response.message
            )))
        }
    }
}

/// 检查命令：只探测和渲染，不发送通知
pub struct CheckCommand;

#[async_trait]
impl Command for CheckCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Check { format } = &args.command else {
            return Ok(());
        };

        let config = load_config(args).await?;
        let mode = format.map(Into::into).unwrap_or(config.report.mode);
        let pipeline = Pipeline::from_config(config)?;

        let (outcomes, report) = pipeline.check(mode).await?;
        println!("{}", report);

        let summary = OutcomeSummary::from_outcomes(&outcomes);
        info!(
            "检查完成: 总计 {}，成功 {}，失败 {}",
            summary.total, summary.success, summary.failure
        );
        Ok(())
    }
}

/// 验证配置命令
pub struct ValidateCommand;

#[async_trait]
impl Command for ValidateCommand {
    async fn execute(&self, args: &Args) -> Result<()> {
        let Commands::Validate { verbose } = &args.command else {
            return Ok(());
        };

        let config = load_config(args).await?;
        let timeouts = config.timeout_config();

        println!("✅ 配置验证通过");
        println!("访问目标: {} 个", config.targets.len());
        println!(
            "超时: 响应头 {}ms，响应体 {}ms；并发 {}，批次间隔 {}ms",
            timeouts.request_timeout_ms,
            timeouts.response_timeout_ms,
            timeouts.concurrency_limit,
            timeouts.batch_delay_ms
        );
        println!(
            "通知: {}（{}）",
            config.notification.sink_type.as_str(),
            if config.notification.enabled {
                "启用"
            } else {
                "禁用"
            }
        );
        println!("报告格式: {}", config.report.mode);
        if let Some(daily_at) = &config.schedule.daily_at {
            println!("每日定时: {}", daily_at);
        }

        if *verbose {
            for (index, target) in config.targets.iter().enumerate() {
                println!("  {}. {} -> {}", index + 1, target.name, target.url);
            }
        }

        if config.targets.is_empty() {
            warn!("没有配置任何访问目标");
        }
        Ok(())
    }
}
