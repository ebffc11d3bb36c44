//! # gtest Output Parser / gtest 输出解析器
//!
//! Turns the console output of a gtest binary into per-test records.
//!
//! 将 gtest 二进制文件的控制台输出转换为每个测试的记录。

use crate::core::models::{TestResultRecord, TestStatus};

const RUN_MARKER: &str = "[ RUN      ]";
const OK_MARKER: &str = "[       OK ]";
const FAILED_MARKER: &str = "[  FAILED  ]";

/// Extracts the test name following a marker, dropping the optional
/// ` (12 ms)` timing suffix and the `, where GetParam() = ...` description
/// of parameterized tests.
fn test_name_after<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    let idx = line.find(marker)?;
    let rest = line[idx + marker.len()..].trim();
    let end = [" (", ", where "]
        .iter()
        .filter_map(|suffix| rest.find(suffix))
        .min()
        .unwrap_or(rest.len());
    let name = &rest[..end];
    (!name.is_empty()).then_some(name)
}

/// Parses gtest console output.
///
/// `timed_out` tells whether the output was cut because the binary went
/// silent; a test still open at the end is then reported as `Timeout`
/// instead of `Crashed`.
///
/// 解析 gtest 控制台输出。
///
/// `timed_out` 表示输出是否因二进制文件沉默而被截断；此时结尾仍处于打开状态的测试
/// 会被报告为 `Timeout` 而非 `Crashed`。
pub fn parse_gtest_output<S: AsRef<str>>(lines: &[S], timed_out: bool) -> Vec<TestResultRecord> {
    let mut records = Vec::new();
    let mut current: Option<(String, Vec<String>)> = None;

    for line in lines {
        let line = line.as_ref().trim_end_matches('\r');

        if let Some(name) = test_name_after(line, RUN_MARKER) {
            if let Some((open, log)) = current.take() {
                records.push(close(open, TestStatus::Crashed, log));
            }
            current = Some((name.to_string(), Vec::new()));
            continue;
        }

        let Some((open, log)) = current.as_mut() else {
            // Summary section or preamble.
            continue;
        };

        if test_name_after(line, OK_MARKER) == Some(open.as_str()) {
            let (open, _) = current.take().unwrap_or_default();
            records.push(TestResultRecord::passed(open));
        } else if test_name_after(line, FAILED_MARKER) == Some(open.as_str()) {
            let (open, log) = current.take().unwrap_or_default();
            records.push(close(open, TestStatus::Failed, log));
        } else {
            log.push(line.to_string());
        }
    }

    if let Some((open, log)) = current {
        let status = if timed_out {
            TestStatus::Timeout
        } else {
            TestStatus::Crashed
        };
        records.push(close(open, status, log));
    }
    records
}

fn close(name: String, status: TestStatus, log: Vec<String>) -> TestResultRecord {
    let detail = log.join("\n");
    TestResultRecord {
        name,
        status,
        detail: (!detail.trim().is_empty()).then_some(detail),
    }
}
