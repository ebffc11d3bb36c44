//! # HTML Reporting Module / HTML 报告模块
//!
//! Renders a self-contained HTML report of every suite run with `maud`.
//!
//! 使用 `maud` 渲染每次套件运行的独立 HTML 报告。

use anyhow::{Context, Result};
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::fs;
use std::path::Path;

use crate::core::models::{SuiteOutcome, SuiteReport};
use crate::infra::t;

/// Embedded CSS styles for HTML reports / HTML 报告的嵌入式 CSS 样式
const HTML_STYLE: &str = include_str!("assets/report.css");

/// Writes the HTML report for `reports` to `output_path`.
///
/// 将 `reports` 的 HTML 报告写入 `output_path`。
pub fn generate_html_report(reports: &[SuiteReport], output_path: &Path, locale: &str) -> Result<()> {
    let markup = render_report(reports, locale);
    fs::write(output_path, markup.into_string())
        .with_context(|| format!("Failed to write HTML report: {}", output_path.display()))
}

/// Renders the report markup.
pub fn render_report(reports: &[SuiteReport], locale: &str) -> Markup {
    let total_tests: usize = reports.iter().filter_map(SuiteReport::results).map(|r| r.len()).sum();
    let passed_tests: usize = reports
        .iter()
        .filter_map(SuiteReport::results)
        .map(|r| r.passed().count())
        .sum();
    let lost_devices = reports
        .iter()
        .filter_map(SuiteReport::results)
        .filter(|r| r.is_device_loss())
        .count();

    html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                title { (t!("html_report.title", locale = locale)) }
                style { (PreEscaped(HTML_STYLE)) }
            }
            body {
                h1 { (t!("html_report.main_header", locale = locale)) }
                div.summary-container {
                    div.summary-item {
                        span.count { (reports.len()) }
                        span.label { (t!("html_report.summary.suites", locale = locale)) }
                    }
                    div.summary-item {
                        span.count { (total_tests) }
                        span.label { (t!("html_report.summary.tests", locale = locale)) }
                    }
                    div.summary-item {
                        span.count.passed-text { (passed_tests) }
                        span.label { (t!("html_report.summary.passed", locale = locale)) }
                    }
                    div.summary-item {
                        span.count.failed-text { (total_tests - passed_tests) }
                        span.label { (t!("html_report.summary.failed", locale = locale)) }
                    }
                    div.summary-item {
                        span.count.lost-text { (lost_devices) }
                        span.label { (t!("html_report.summary.device_lost", locale = locale)) }
                    }
                }
                @for report in reports {
                    (render_suite(report, locale))
                }
            }
        }
    }
}

fn render_suite(report: &SuiteReport, locale: &str) -> Markup {
    html! {
        h2 {
            (report.suite) " @ " (report.device)
            " (" (format!("{:.2}s", report.duration.as_secs_f64())) ")"
        }
        @match &report.outcome {
            SuiteOutcome::Aborted { error } => {
                div.notice {
                    strong { (t!("html_report.aborted", locale = locale)) }
                    pre { (error) }
                }
            }
            SuiteOutcome::Skipped => {
                div.notice { (t!("html_report.skipped", locale = locale)) }
            }
            SuiteOutcome::Completed { results } => {
                @if let Some(device) = &results.device_exception {
                    div.notice { (t!("html_report.device_lost", locale = locale, device = device)) }
                }
                table {
                    thead {
                        tr {
                            th { (t!("html_report.table.name", locale = locale)) }
                            th { (t!("html_report.table.status", locale = locale)) }
                        }
                    }
                    tbody {
                        @for record in &results.records {
                            tr {
                                td {
                                    (record.name)
                                    @if let Some(detail) = &record.detail {
                                        details {
                                            summary { (t!("html_report.toggle_output", locale = locale)) }
                                            pre { (detail) }
                                        }
                                    }
                                }
                                td {
                                    div class=(format!("status-cell {}", record.status.css_class())) {
                                        (record.status.label(locale))
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
