//! 报告模块
//!
//! 把探测结果渲染为文本或HTML报告

pub mod formatter;

use serde::{Deserialize, Serialize};

pub use formatter::ReportFormatter;

/// 报告格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum ReportMode {
    /// 纯文本
    #[default]
    Text,
    /// 自包含的HTML文档
    Html,
}

impl From<String> for ReportMode {
    fn from(value: String) -> Self {
        ReportMode::parse(&value)
    }
}

impl ReportMode {
    /// 解析报告格式，未知值回退到文本
    pub fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("html") {
            ReportMode::Html
        } else {
            ReportMode::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportMode::Text => "text",
            ReportMode::Html => "html",
        }
    }

    /// 对应的 Content-Type
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportMode::Text => "text/plain",
            ReportMode::Html => "text/html",
        }
    }
}

impl std::fmt::Display for ReportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
