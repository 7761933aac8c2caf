//! 命令行参数定义
//!
//! 使用clap定义应用程序的命令行接口

use crate::report::ReportMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Access Relay - 定时访问网址并推送结果报告
#[derive(Parser, Debug, Clone)]
#[command(
    name = "access-relay",
    version = crate::VERSION,
    about = crate::APP_DESCRIPTION,
    long_about = None
)]
pub struct Args {
    /// 配置文件路径
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径",
        env = "RELAY_CONFIG"
    )]
    pub config: Option<PathBuf>,

    /// 日志级别
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        help = "日志级别",
        env = "RELAY_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// 以JSON格式输出日志
    #[arg(long, help = "以JSON格式输出日志")]
    pub json_logs: bool,

    /// 子命令
    #[command(subcommand)]
    pub command: Commands,
}

/// 日志级别枚举
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Error => log::LevelFilter::Error,
        }
    }
}

/// 报告格式参数
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum ReportFormat {
    /// 纯文本
    Text,
    /// HTML
    Html,
}

impl From<ReportFormat> for ReportMode {
    fn from(format: ReportFormat) -> Self {
        match format {
            ReportFormat::Text => ReportMode::Text,
            ReportFormat::Html => ReportMode::Html,
        }
    }
}

/// 子命令定义
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// 启动HTTP服务和内置每日定时
    Serve {
        /// 绑定地址（覆盖配置文件）
        #[arg(short, long, value_name = "ADDR", help = "绑定地址")]
        bind: Option<String>,

        /// 监听端口（覆盖配置文件）
        #[arg(short, long, value_name = "PORT", help = "监听端口")]
        port: Option<u16>,
    },

    /// 执行一次完整的探测、报告和通知流程
    Run {
        /// 按手动触发执行（响应中附带渲染后的报告）
        #[arg(short, long, help = "按手动触发执行")]
        manual: bool,
    },

    /// 探测全部目标并打印报告，不发送通知
    Check {
        /// 报告格式，默认使用配置中的格式
        #[arg(short, long, value_enum, help = "报告格式")]
        format: Option<ReportFormat>,
    },

    /// 验证配置
    Validate {
        /// 是否列出全部目标
        #[arg(short, long, help = "列出全部目标")]
        verbose: bool,
    },
}
