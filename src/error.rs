//! 错误处理模块
//!
//! 定义应用程序的统一错误类型

use thiserror::Error;

/// Access Relay 应用程序的主要错误类型
#[derive(Error, Debug)]
pub enum AccessRelayError {
    /// 配置相关错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 探测相关错误
    #[error("探测错误: {0}")]
    Probe(#[from] ProbeError),

    /// 通知相关错误
    #[error("通知错误: {0}")]
    Notification(#[from] NotificationError),

    /// 流水线错误
    #[error("流水线错误: {0}")]
    Pipeline(#[from] PipelineError),

    /// IO错误
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON序列化/反序列化错误
    #[error("JSON错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 其他错误
    #[error("其他错误: {0}")]
    Other(#[from] anyhow::Error),
}

/// 配置错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 配置文件解析错误
    #[error("配置文件解析失败: {0}")]
    ParseError(String),

    /// 配置验证错误
    #[error("配置验证失败: {0}")]
    ValidationError(String),

    /// 配置文件不存在
    #[error("配置文件不存在: {path}")]
    FileNotFound { path: String },

    /// 环境变量替换错误
    #[error("环境变量替换失败: {var}")]
    EnvVarError { var: String },
}

/// 单个目标的探测错误
///
/// 只在探测器内部出现，最终都会折叠进 `ProbeOutcome`。
#[derive(Error, Debug)]
pub enum ProbeError {
    /// HTTP请求错误
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// 响应头超时
    #[error("Request timeout after {0}ms")]
    HeaderTimeout(u64),

    /// 响应体读取超时
    #[error("Response timeout after {0}ms")]
    BodyTimeout(u64),
}

/// 通知错误类型
///
/// 只在发送器内部出现，分发器会把它转换成失败的 `DispatchResult`。
#[derive(Error, Debug)]
pub enum NotificationError {
    /// 网络层发送失败
    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    /// 响应解析失败
    #[error("响应解析失败: {0}")]
    MalformedReply(String),
}

/// 流水线顶层错误
#[derive(Error, Debug)]
pub enum PipelineError {
    /// 报告渲染失败
    #[error("报告渲染失败: {0}")]
    Render(String),

    /// 执行任务异常终止
    #[error("执行任务异常终止: {0}")]
    Aborted(String),
}

/// 结果类型别名
pub type Result<T> = std::result::Result<T, AccessRelayError>;
