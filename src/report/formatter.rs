//! 报告渲染器
//!
//! 文本报告直接拼接，HTML报告使用 askama 模板（自动转义）。
//! 给定相同的结果和固定的生成时间，输出逐字节一致。

use crate::error::PipelineError;
use crate::probe::{OutcomeSummary, ProbeOutcome};
use crate::report::ReportMode;
use askama::Template;
use chrono::{DateTime, Local, SecondsFormat, Utc};

/// 报告标题
pub const REPORT_TITLE: &str = "定时任务执行报告";

/// 没有任何目标时的提示
pub const EMPTY_MESSAGE: &str = "⚠️ 没有找到任何已配置的访问目标";

/// HTML报告模板
#[derive(Template)]
#[template(path = "report.html")]
struct HtmlReport<'a> {
    title: &'a str,
    generated_local: String,
    generated_iso: String,
    summary: OutcomeSummary,
    cards: Vec<ReportCard<'a>>,
}

/// HTML报告中的单个结果卡片
struct ReportCard<'a> {
    index: usize,
    success: bool,
    name: &'a str,
    url: &'a str,
    status: String,
    status_text: &'a str,
    response_time_ms: u64,
    complete: bool,
    size_bytes: u64,
    timestamp: String,
}

/// 报告渲染器
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportFormatter;

impl ReportFormatter {
    pub fn new() -> Self {
        Self
    }

    /// 以当前时间渲染报告
    pub fn format(
        &self,
        outcomes: &[ProbeOutcome],
        mode: ReportMode,
    ) -> Result<String, PipelineError> {
        self.format_at(outcomes, mode, Utc::now())
    }

    /// 以指定的生成时间渲染报告
    ///
    /// # 参数
    /// * `outcomes` - 探测结果，按输入顺序渲染
    /// * `mode` - 报告格式
    /// * `generated_at` - 报告头部和尾部使用的生成时间
    pub fn format_at(
        &self,
        outcomes: &[ProbeOutcome],
        mode: ReportMode,
        generated_at: DateTime<Utc>,
    ) -> Result<String, PipelineError> {
        if outcomes.is_empty() {
            return Ok(Self::empty_message(mode));
        }

        match mode {
            ReportMode::Text => Ok(Self::render_text(outcomes, generated_at)),
            ReportMode::Html => Self::render_html(outcomes, generated_at),
        }
    }

    /// 没有目标时的固定提示
    pub fn empty_message(mode: ReportMode) -> String {
        match mode {
            ReportMode::Text => EMPTY_MESSAGE.to_string(),
            ReportMode::Html => format!("<p>{}</p>", EMPTY_MESSAGE),
        }
    }

    fn local_time(generated_at: DateTime<Utc>) -> String {
        generated_at
            .with_timezone(&Local)
            .format("%Y/%m/%d %H:%M:%S")
            .to_string()
    }

    fn render_text(outcomes: &[ProbeOutcome], generated_at: DateTime<Utc>) -> String {
        let summary = OutcomeSummary::from_outcomes(outcomes);

        let mut text = format!(
            "🌅 {} ({})\n\n",
            REPORT_TITLE,
            Self::local_time(generated_at)
        );
        text.push_str(&format!(
            "📊 执行统计：总计 {} 个，成功 {} 个，失败 {} 个\n\n",
            summary.total, summary.success, summary.failure
        ));

        for (index, outcome) in outcomes.iter().enumerate() {
            let icon = if outcome.success { "✅" } else { "❌" };
            text.push_str(&format!("{}. {} {}\n", index + 1, icon, outcome.name));
            text.push_str(&format!("   URL: {}\n", outcome.url));
            text.push_str(&format!(
                "   状态: {} {}\n",
                outcome.status, outcome.status_text
            ));
            text.push_str(&format!("   响应时间: {}ms\n", outcome.response_time_ms));
            text.push_str(&format!(
                "   完整性: {}\n",
                if outcome.is_complete { "完整" } else { "未完成" }
            ));
            if outcome.response_size_bytes > 0 {
                text.push_str(&format!("   响应大小: {} 字节\n", outcome.response_size_bytes));
            }
            text.push_str(&format!("   时间: {}\n\n", outcome.timestamp_iso()));
        }

        text.push_str(&format!(
            "生成时间: {}",
            generated_at.to_rfc3339_opts(SecondsFormat::Millis, true)
        ));
        text
    }

    fn render_html(
        outcomes: &[ProbeOutcome],
        generated_at: DateTime<Utc>,
    ) -> Result<String, PipelineError> {
        let cards = outcomes
            .iter()
            .enumerate()
            .map(|(index, outcome)| ReportCard {
                index: index + 1,
                success: outcome.success,
                name: &outcome.name,
                url: &outcome.url,
                status: outcome.status.to_string(),
                status_text: &outcome.status_text,
                response_time_ms: outcome.response_time_ms,
                complete: outcome.is_complete,
                size_bytes: outcome.response_size_bytes,
                timestamp: outcome.timestamp_iso(),
            })
            .collect();

        let report = HtmlReport {
            title: REPORT_TITLE,
            generated_local: Self::local_time(generated_at),
            generated_iso: generated_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            summary: OutcomeSummary::from_outcomes(outcomes),
            cards,
        };

        report
            .render()
            .map_err(|e| PipelineError::Render(e.to_string()))
    }
}
