//! # JSON Reporting Module / JSON 报告模块
//!
//! Dumps every suite report as machine-readable JSON.
//!
//! 将每个套件报告导出为机器可读的 JSON。

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use serde::Serialize;
use std::fs;
use std::path::Path;

use crate::core::models::SuiteReport;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_at: DateTime<Local>,
    failed: bool,
    suites: &'a [SuiteReport],
}

/// Serializes the reports into a pretty-printed JSON document.
/// 将报告序列化为格式化的 JSON 文档。
pub fn render_json_report(reports: &[SuiteReport]) -> Result<String> {
    let report = JsonReport {
        generated_at: Local::now(),
        failed: reports.iter().any(SuiteReport::is_failure),
        suites: reports,
    };
    serde_json::to_string_pretty(&report).context("Failed to serialize JSON report")
}

pub fn write_json_report(reports: &[SuiteReport], output_path: &Path) -> Result<()> {
    let content = render_json_report(reports)?;
    fs::write(output_path, content)
        .with_context(|| format!("Failed to write JSON report: {}", output_path.display()))
}
