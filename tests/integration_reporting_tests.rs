//! # Reporting Integration Tests / 报告集成测试
//!
//! Renders HTML and JSON reports for a mix of completed, lost, aborted and
//! skipped suites.
//!
//! 为已完成、设备丢失、已中止和已跳过的套件组合渲染 HTML 和 JSON 报告。

use device_test_runner::core::models::{
    SuiteOutcome, SuiteReport, TestResultRecord, TestResultSet, TestStatus,
};
use device_test_runner::reporting::html::render_report;
use device_test_runner::reporting::json::render_json_report;
use device_test_runner::reporting::{generate_html_report, write_json_report};
use std::fs;
use std::time::Duration;
use tempfile::tempdir;

fn sample_reports() -> Vec<SuiteReport> {
    vec![
        SuiteReport {
            suite: "base_unittests".to_string(),
            device: "emulator-5554".to_string(),
            duration: Duration::from_secs(12),
            outcome: SuiteOutcome::Completed {
                results: TestResultSet::new(vec![
                    TestResultRecord::passed("FileUtilTest.Copy"),
                    TestResultRecord::failed("FileUtilTest.Move", "file_util_unittest.cc:88: <Failure>"),
                    TestResultRecord {
                        name: "FileUtilTest.Hang".to_string(),
                        status: TestStatus::Timeout,
                        detail: None,
                    },
                ]),
            },
        },
        SuiteReport {
            suite: "net_unittests".to_string(),
            device: "emulator-5556".to_string(),
            duration: Duration::from_secs(3),
            outcome: SuiteOutcome::Completed {
                results: TestResultSet::from_device_loss(["*"], "emulator-5556"),
            },
        },
        SuiteReport {
            suite: "ui_unittests".to_string(),
            device: "emulator-5554".to_string(),
            duration: Duration::ZERO,
            outcome: SuiteOutcome::Aborted {
                error: "Failed to install ui_unittests.apk".to_string(),
            },
        },
        SuiteReport {
            suite: "unit_tests".to_string(),
            device: "emulator-5554".to_string(),
            duration: Duration::ZERO,
            outcome: SuiteOutcome::Skipped,
        },
    ]
}

#[cfg(test)]
mod html_tests {
    use super::*;

    #[test]
    fn test_html_report_lists_every_suite() {
        let html = render_report(&sample_reports(), "en").into_string();

        assert!(html.starts_with("<!DOCTYPE html>"));
        for suite in ["base_unittests", "net_unittests", "ui_unittests", "unit_tests"] {
            assert!(html.contains(suite), "{suite} missing from report");
        }
        assert!(html.contains("FileUtilTest.Move"));
        assert!(html.contains("status-Timeout"));
        assert!(html.contains("Failed to install ui_unittests.apk"));
        assert!(html.contains("emulator-5556"));
    }

    #[test]
    fn test_html_report_escapes_test_output() {
        let html = render_report(&sample_reports(), "en").into_string();
        assert!(html.contains("&lt;Failure&gt;"));
        assert!(!html.contains("<Failure>"));
    }

    #[test]
    fn test_html_report_is_localized() {
        let english = render_report(&sample_reports(), "en").into_string();
        let chinese = render_report(&sample_reports(), "zh-CN").into_string();

        assert!(english.contains("Passed"));
        assert!(chinese.contains("通过"));
        assert_ne!(english, chinese);
    }

    #[test]
    fn test_html_report_is_written() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.html");
        generate_html_report(&sample_reports(), &path, "en").unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("base_unittests"));
    }
}

#[cfg(test)]
mod json_tests {
    use super::*;

    #[test]
    fn test_json_report_structure() {
        let json: serde_json::Value =
            serde_json::from_str(&render_json_report(&sample_reports()).unwrap()).unwrap();

        assert_eq!(json["failed"], true);
        assert!(json["generated_at"].is_string());
        let suites = json["suites"].as_array().unwrap();
        assert_eq!(suites.len(), 4);

        assert_eq!(suites[0]["outcome"]["kind"], "completed");
        assert_eq!(suites[0]["outcome"]["results"]["records"][1]["status"], "Failed");
        assert_eq!(suites[1]["outcome"]["results"]["device_exception"], "emulator-5556");
        assert_eq!(suites[2]["outcome"]["kind"], "aborted");
        assert_eq!(suites[3]["outcome"]["kind"], "skipped");
    }

    #[test]
    fn test_json_report_for_passing_run() {
        let reports = vec![SuiteReport {
            suite: "base_unittests".to_string(),
            device: "emulator-5554".to_string(),
            duration: Duration::from_secs(1),
            outcome: SuiteOutcome::Completed {
                results: TestResultSet::new(vec![TestResultRecord::passed("A.B")]),
            },
        }];
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.json");
        write_json_report(&reports, &path).unwrap();

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["failed"], false);
    }
}
