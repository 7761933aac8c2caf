//! HTTP目标探测器实现
//!
//! 对单个目标发起一次GET请求，分别限制响应头等待时间和响应体读取时间，
//! 并根据状态码与响应体完整性判定结果。任何失败都折叠进 `ProbeOutcome`。

use crate::config::{Target, TimeoutConfig};
use crate::error::ProbeError;
use crate::probe::outcome::ProbeOutcome;
use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response};
use std::error::Error as StdError;
use tokio::time::{timeout, timeout_at, Instant};
use tracing::debug;

/// 固定的浏览器 User-Agent
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// 探测器trait，定义探测接口
#[async_trait]
pub trait TargetProber: Send + Sync {
    /// 探测单个目标，从不返回错误
    ///
    /// # 参数
    /// * `target` - 访问目标
    /// * `timeouts` - 超时配置
    ///
    /// # 返回
    /// * `ProbeOutcome` - 探测结果
    async fn probe(&self, target: &Target, timeouts: &TimeoutConfig) -> ProbeOutcome;
}

/// 响应体读取情况
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRead {
    /// 已读取的字节数
    pub bytes: u64,
    /// 中断原因，`None` 表示读取完整
    pub interruption: Option<String>,
}

impl BodyRead {
    pub fn complete(bytes: u64) -> Self {
        Self {
            bytes,
            interruption: None,
        }
    }

    pub fn interrupted(bytes: u64, reason: impl Into<String>) -> Self {
        Self {
            bytes,
            interruption: Some(reason.into()),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }
}

/// 完成判定策略
///
/// 返回 `(success, status_text)`：
/// - 206 读取完整视为成功，读取中断视为失败；
/// - 其余状态码不在 2xx/3xx 范围内一律失败；
/// - 2xx/3xx 仅在响应体读取完整时成功。
pub fn completion_policy(status_code: u16, reason: &str, body: &BodyRead) -> (bool, String) {
    if status_code == 206 {
        return if body.is_complete() {
            (true, "Partial Content (fully loaded)".to_string())
        } else {
            (false, "Partial Content (incomplete)".to_string())
        };
    }

    if !(200..400).contains(&status_code) {
        return (false, reason.to_string());
    }

    match &body.interruption {
        None => (true, reason.to_string()),
        Some(cause) => (false, format!("{} (incomplete: {})", reason, cause)),
    }
}

/// 固定的浏览器请求头，禁止缓存
pub fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("zh-CN,zh;q=0.9,en;q=0.8"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers
}

/// HTTP探测器实现
#[derive(Debug, Clone)]
pub struct HttpProber {
    /// HTTP客户端
    client: Client,
}

impl HttpProber {
    /// 创建新的HTTP探测器
    ///
    /// 超时由探测过程自行控制，客户端本身不设置总超时。
    pub fn new() -> Result<Self, ProbeError> {
        let client = Client::builder()
            .default_headers(browser_headers())
            .build()?;

        Ok(Self { client })
    }

    /// 流式读取响应体，直到读完或到达截止时间
    async fn read_body(mut response: Response, deadline: Instant, limit_ms: u64) -> BodyRead {
        let mut bytes = 0u64;
        loop {
            match timeout_at(deadline, response.chunk()).await {
                Ok(Ok(Some(chunk))) => bytes += chunk.len() as u64,
                Ok(Ok(None)) => return BodyRead::complete(bytes),
                Ok(Err(e)) => return BodyRead::interrupted(bytes, describe_request_error(&e)),
                Err(_) => {
                    return BodyRead::interrupted(
                        bytes,
                        ProbeError::BodyTimeout(limit_ms).to_string(),
                    )
                }
            }
        }
    }
}

#[async_trait]
impl TargetProber for HttpProber {
    async fn probe(&self, target: &Target, timeouts: &TimeoutConfig) -> ProbeOutcome {
        let started = Instant::now();
        let deadline = started + timeouts.response_timeout();
        debug!("开始探测: {} ({})", target.name, target.url);

        let response = match timeout(
            timeouts.request_timeout(),
            self.client.get(&target.url).send(),
        )
        .await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                let message = describe_request_error(&e);
                debug!("探测失败: {} - {}", target.name, message);
                return ProbeOutcome::error(target, message, started.elapsed());
            }
            Err(_) => {
                let message = ProbeError::HeaderTimeout(timeouts.request_timeout_ms).to_string();
                debug!("探测超时: {} - {}", target.name, message);
                return ProbeOutcome::error(target, message, started.elapsed());
            }
        };

        let status = response.status();
        let body = Self::read_body(response, deadline, timeouts.response_timeout_ms).await;
        let (success, status_text) = completion_policy(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            &body,
        );

        debug!(
            "探测完成: {} - {} {} ({} 字节, 完整: {})",
            target.name,
            status.as_u16(),
            status_text,
            body.bytes,
            body.is_complete()
        );

        ProbeOutcome::response(
            target,
            status.as_u16(),
            status_text,
            success,
            body.is_complete(),
            body.bytes,
            started.elapsed(),
        )
    }
}

/// 格式化请求错误信息：错误类别加底层原因
fn describe_request_error(error: &reqwest::Error) -> String {
    let kind = if error.is_timeout() {
        "Request timeout"
    } else if error.is_connect() {
        "Connection failed"
    } else if error.is_builder() {
        "Invalid request"
    } else if error.is_body() || error.is_decode() {
        "Response body error"
    } else {
        "Request failed"
    };

    let mut cause = error.to_string();
    let mut source = error.source();
    while let Some(inner) = source {
        cause = inner.to_string();
        source = inner.source();
    }

    format!("{}: {}", kind, cause)
}
