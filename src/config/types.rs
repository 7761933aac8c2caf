//! 配置数据结构定义
//!
//! 定义应用程序的配置结构体、环境变量覆盖和验证逻辑

use crate::report::ReportMode;
use chrono::NaiveTime;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;
use tracing::warn;

/// 目标环境变量前缀
pub const ACCESS_PREFIX: &str = "ACCESS_";

/// 默认的企业微信机器人 Webhook URL
pub const DEFAULT_SINK_URL: &str = "https://qyapi.weixin.qq.com/cgi-bin/webhook/send";

/// 主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// 访问目标列表（顺序即报告顺序）
    #[serde(default)]
    pub targets: Vec<Target>,
    /// 探测参数（原始值，使用前需归一化）
    #[serde(default)]
    pub probe: ProbeSettings,
    /// 通知配置
    #[serde(default)]
    pub notification: NotificationConfig,
    /// 报告配置
    #[serde(default)]
    pub report: ReportSettings,
    /// HTTP服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 内置定时配置
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// 访问目标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// 目标名称（唯一标识）
    pub name: String,
    /// 目标URL（不做校验，原样透传）
    pub url: String,
}

impl Target {
    /// 创建新的访问目标
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// 探测参数的原始值
///
/// 数值字段允许缺失或非法，由 [`TimeoutConfig::from_settings`] 回退到默认值。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeSettings {
    /// 响应头超时（毫秒）
    #[serde(default, deserialize_with = "lenient_number")]
    pub request_timeout_ms: Option<i64>,
    /// 响应体超时（毫秒，从探测开始计时）
    #[serde(default, deserialize_with = "lenient_number")]
    pub response_timeout_ms: Option<i64>,
    /// 每批并发数
    #[serde(default, deserialize_with = "lenient_number")]
    pub concurrency_limit: Option<i64>,
    /// 批次间延迟（毫秒）
    #[serde(default, deserialize_with = "lenient_number")]
    pub batch_delay_ms: Option<i64>,
}

/// 宽松数值：接受整数、浮点数和数字字符串，其余一律视为缺失
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientNumber {
    Int(i64),
    Float(f64),
    Text(String),
    Other(serde::de::IgnoredAny),
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<LenientNumber>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        LenientNumber::Int(i) => Some(i),
        LenientNumber::Float(f) if f.is_finite() => Some(f as i64),
        LenientNumber::Text(s) => s.trim().parse().ok(),
        _ => None,
    }))
}

/// 归一化后的超时与并发配置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeoutConfig {
    /// 响应头超时（毫秒）
    pub request_timeout_ms: u64,
    /// 响应体超时（毫秒，从探测开始计时）
    pub response_timeout_ms: u64,
    /// 每批并发数，始终 >= 1
    pub concurrency_limit: usize,
    /// 批次间延迟（毫秒）
    pub batch_delay_ms: u64,
}

impl TimeoutConfig {
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;
    pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 60_000;
    pub const DEFAULT_CONCURRENCY_LIMIT: usize = 5;
    pub const DEFAULT_BATCH_DELAY_MS: u64 = 1_000;

    /// 从原始配置归一化
    pub fn from_settings(settings: &ProbeSettings) -> Self {
        let positive = |v: Option<i64>, default: u64| match v {
            Some(v) if v > 0 => v as u64,
            _ => default,
        };

        Self {
            request_timeout_ms: positive(
                settings.request_timeout_ms,
                Self::DEFAULT_REQUEST_TIMEOUT_MS,
            ),
            response_timeout_ms: positive(
                settings.response_timeout_ms,
                Self::DEFAULT_RESPONSE_TIMEOUT_MS,
            ),
            concurrency_limit: positive(
                settings.concurrency_limit,
                Self::DEFAULT_CONCURRENCY_LIMIT as u64,
            ) as usize,
            batch_delay_ms: match settings.batch_delay_ms {
                Some(v) if v >= 0 => v as u64,
                _ => Self::DEFAULT_BATCH_DELAY_MS,
            },
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }

    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self::from_settings(&ProbeSettings::default())
    }
}

/// 通知渠道类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum SinkType {
    /// 群机器人（企业微信格式）
    #[default]
    Chat,
    /// 通用 Webhook
    Webhook,
    /// 经由 Webhook 的邮件网关
    Email,
}

impl From<String> for SinkType {
    fn from(value: String) -> Self {
        SinkType::parse(&value)
    }
}

impl SinkType {
    /// 解析渠道类型，未知值回退到群机器人
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "webhook" => SinkType::Webhook,
            "email" => SinkType::Email,
            _ => SinkType::Chat,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SinkType::Chat => "chat",
            SinkType::Webhook => "webhook",
            SinkType::Email => "email",
        }
    }
}

/// 通知配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// 通知地址
    #[serde(default = "default_sink_url")]
    pub sink_url: String,
    /// 通知渠道类型
    #[serde(default)]
    pub sink_type: SinkType,
    /// 是否启用
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// 邮件收件人
    #[serde(default)]
    pub mail_to: String,
    /// 邮件主题
    #[serde(default = "default_mail_subject")]
    pub mail_subject: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            sink_url: default_sink_url(),
            sink_type: SinkType::default(),
            enabled: default_enabled(),
            mail_to: String::new(),
            mail_subject: default_mail_subject(),
        }
    }
}

/// 报告配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// 报告格式
    #[serde(default)]
    pub mode: ReportMode,
}

/// HTTP服务配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 绑定地址
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

/// 内置定时配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// 每日触发时间（本地时间，HH:MM）
    pub daily_at: Option<String>,
}

impl ScheduleConfig {
    /// 解析每日触发时间
    pub fn daily_time(&self) -> Result<Option<NaiveTime>, String> {
        match self.daily_at.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => NaiveTime::parse_from_str(raw, "%H:%M")
                .map(Some)
                .map_err(|_| format!("无效的每日触发时间: {}，格式应为 HH:MM", raw)),
        }
    }
}

// 默认值函数
fn default_sink_url() -> String {
    DEFAULT_SINK_URL.to_string()
}
fn default_enabled() -> bool {
    true
}
fn default_mail_subject() -> String {
    "定时任务执行报告".to_string()
}
fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8787
}

impl Config {
    /// 归一化后的超时配置
    pub fn timeout_config(&self) -> TimeoutConfig {
        TimeoutConfig::from_settings(&self.probe)
    }

    /// 叠加环境变量
    ///
    /// `ACCESS_` 开头且值非空的变量按名称升序追加为目标；同名目标以环境变量为准。
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let vars: BTreeMap<String, String> = vars.into_iter().collect();

        for (key, value) in &vars {
            if !key.starts_with(ACCESS_PREFIX) || value.trim().is_empty() {
                continue;
            }
            match self.targets.iter_mut().find(|t| &t.name == key) {
                Some(existing) => existing.url = value.clone(),
                None => self.targets.push(Target::new(key.clone(), value.clone())),
            }
        }

        let number = |key: &str| -> Option<i64> {
            let raw = vars.get(key)?;
            match raw.trim().parse::<i64>() {
                Ok(v) => Some(v),
                Err(_) => {
                    warn!("环境变量 {} 的值 {:?} 不是有效数字，使用默认值", key, raw);
                    None
                }
            }
        };

        if let Some(v) = number("REQUEST_TIMEOUT") {
            self.probe.request_timeout_ms = Some(v);
        }
        if let Some(v) = number("RESPONSE_TIMEOUT") {
            self.probe.response_timeout_ms = Some(v);
        }
        if let Some(v) = number("CONCURRENCY_LIMIT") {
            self.probe.concurrency_limit = Some(v);
        }
        if let Some(v) = number("BATCH_DELAY") {
            self.probe.batch_delay_ms = Some(v);
        }

        if let Some(url) = vars.get("WEBHOOK_URL").filter(|v| !v.is_empty()) {
            self.notification.sink_url = url.clone();
        }
        if let Some(kind) = vars.get("NOTIFICATION_TYPE") {
            self.notification.sink_type = SinkType::parse(kind);
        }
        if let Some(enabled) = vars.get("NOTIFICATION_ENABLED") {
            self.notification.enabled = enabled != "false";
        }
        if let Some(to) = vars.get("MAIL_TO") {
            self.notification.mail_to = to.clone();
        }
        if let Some(subject) = vars.get("MAIL_SUBJECT").filter(|v| !v.is_empty()) {
            self.notification.mail_subject = subject.clone();
        }
        if let Some(mode) = vars.get("RETURN_TYPE") {
            self.report.mode = ReportMode::parse(mode);
        }
    }
}

/// 配置验证函数
///
/// URL 不做校验，由探测结果体现其可达性。
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut seen = HashSet::new();
    for target in &config.targets {
        if target.name.trim().is_empty() {
            return Err("目标名称不能为空".to_string());
        }
        if !seen.insert(target.name.as_str()) {
            return Err(format!("目标名称重复: {}", target.name));
        }
    }

    if config.server.port == 0 {
        return Err("HTTP服务端口不能为0".to_string());
    }

    if config.server.bind_address.trim().is_empty() {
        return Err("HTTP服务绑定地址不能为空".to_string());
    }

    config.schedule.daily_time()?;

    Ok(())
}
