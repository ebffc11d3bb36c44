//! # Console Reporting Module / 控制台报告模块
//!
//! Colorful, localized summaries of suite runs printed to the console.
//!
//! 打印到控制台的彩色、本地化的套件运行摘要。

use colored::*;

use crate::core::models::{SuiteOutcome, SuiteReport, TestStatus};
use crate::infra::t;

/// Prints one line per suite with its verdict and test counts.
///
/// 为每个套件打印一行，包含其结论和测试计数。
///
/// # Output Format / 输出格式
/// ```text
/// --- Suite Summary ---
///   - Passed       | base_unittests           | emulator-5554    |  212/212   |    41.20s
///   - Failed       | net_unittests            | 0123456789ABCDEF |  198/201   |    93.07s
///   - Device Lost  | unit_tests               | emulator-5556    |    0/3     |     2.10s
///   - Aborted      | content_unittests        | emulator-5554    |    N/A     |     0.40s
/// ```
pub fn print_summary(reports: &[SuiteReport], locale: &str) {
    println!("\n{}", t!("summary.banner", locale = locale).bold());

    for report in reports {
        let (verdict, counts) = match &report.outcome {
            SuiteOutcome::Completed { results } => {
                let passed = results.passed().count();
                let counts = format!("{passed}/{}", results.len());
                let verdict = if results.is_device_loss() {
                    t!("summary.device_lost", locale = locale).yellow()
                } else if results.has_failures() {
                    t!("summary.failed", locale = locale).red()
                } else {
                    t!("summary.passed", locale = locale).green()
                };
                (verdict, counts)
            }
            SuiteOutcome::Aborted { .. } => {
                (t!("summary.aborted", locale = locale).red(), "N/A".to_string())
            }
            SuiteOutcome::Skipped => {
                (t!("summary.skipped", locale = locale).dimmed(), "N/A".to_string())
            }
        };

        println!(
            "  - {:<12} | {:<28} | {:<16} | {:>9} | {:>9.2}s",
            verdict,
            report.suite,
            report.device,
            counts,
            report.duration.as_secs_f64()
        );
    }

    let failing = reports.iter().filter(|r| r.is_failure()).count();
    if failing == 0 {
        println!("\n{}", t!("summary.all_passed", locale = locale).green().bold());
    } else {
        println!(
            "\n{}",
            t!("summary.some_failed", locale = locale, count = failing).red().bold()
        );
    }
}

/// Prints every failing test with its captured log, plus the error of each
/// aborted suite.
///
/// 打印每个失败的测试及其捕获的日志，以及每个中止套件的错误。
pub fn print_failure_details(reports: &[SuiteReport], locale: &str) {
    let failing: Vec<&SuiteReport> = reports.iter().filter(|r| r.is_failure()).collect();
    if failing.is_empty() {
        return;
    }

    println!("\n{}", t!("failures.banner", locale = locale).red().bold());
    println!("{}", "-".repeat(80));

    for report in failing {
        println!(
            "{} '{}' ({})",
            t!("failures.suite_header", locale = locale).red(),
            report.suite.cyan(),
            report.device
        );
        match &report.outcome {
            SuiteOutcome::Aborted { error } => {
                println!("\n{}\n", error);
            }
            SuiteOutcome::Completed { results } => {
                if let Some(device) = &results.device_exception {
                    println!(
                        "{}",
                        t!("failures.device_lost", locale = locale, device = device).yellow()
                    );
                }
                for record in results.failed() {
                    let status = record.status.label(locale);
                    let status = match record.status {
                        TestStatus::Timeout => status.yellow(),
                        _ => status.red(),
                    };
                    println!("  [{}] {}", status, record.name);
                    if let Some(detail) = &record.detail {
                        println!("\n--- {} ---\n", t!("failures.test_log", locale = locale).yellow());
                        println!("{}", detail);
                    }
                }
            }
            SuiteOutcome::Skipped => {}
        }
        println!("{}", "-".repeat(80));
    }
}
