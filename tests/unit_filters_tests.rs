//! # Filters Module Unit Tests / Filters 模块单元测试
//!
//! Unit tests for disabled-test files and gtest filter composition.
//!
//! 禁用测试文件和 gtest 过滤器组合的单元测试。

use device_test_runner::core::filters::{
    build_gtest_filter, disabled_tests_for, emulator_filter_file_name, filter_file_name,
    read_expectations, selected_test_names,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[cfg(test)]
mod expectation_file_tests {
    use super::*;

    #[test]
    fn test_file_names() {
        let dir = Path::new("build/android/gtest_filter");
        assert_eq!(
            filter_file_name(dir, "base_unittests"),
            dir.join("base_unittests_disabled")
        );
        assert_eq!(
            emulator_filter_file_name(dir, "base_unittests"),
            dir.join("base_unittests_emulator_additional_disabled")
        );
    }

    #[test]
    fn test_comments_and_blank_lines_are_skipped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("base_unittests_disabled");
        fs::write(
            &path,
            "# List of suppressions\n\nFileUtilTest.Slow\n  StackTrace.*  # crbug.com/123\n#Disabled.Test\n",
        )
        .unwrap();

        assert_eq!(
            read_expectations(&path).unwrap(),
            vec!["FileUtilTest.Slow", "StackTrace.*"]
        );
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        assert!(read_expectations(&dir.path().join("nope_disabled")).unwrap().is_empty());
    }

    #[test]
    fn test_emulator_list_only_applies_to_emulators() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("net_unittests_disabled"), "A.B\nShared.Test\n").unwrap();
        fs::write(
            dir.path().join("net_unittests_emulator_additional_disabled"),
            "C.D\nShared.Test\n",
        )
        .unwrap();

        assert_eq!(
            disabled_tests_for(dir.path(), "net_unittests", "0123456789ABCDEF").unwrap(),
            vec!["A.B", "Shared.Test"]
        );
        // Duplicates across the two files are kept.
        assert_eq!(
            disabled_tests_for(dir.path(), "net_unittests", "emulator-5554").unwrap(),
            vec!["A.B", "Shared.Test", "C.D", "Shared.Test"]
        );
    }

    #[test]
    fn test_emulator_list_without_base_list() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("ui_unittests_emulator_additional_disabled"),
            "Gpu.*\n",
        )
        .unwrap();

        assert!(disabled_tests_for(dir.path(), "ui_unittests", "device-1").unwrap().is_empty());
        assert_eq!(
            disabled_tests_for(dir.path(), "ui_unittests", "emulator-5556").unwrap(),
            vec!["Gpu.*"]
        );
    }
}

#[cfg(test)]
mod gtest_filter_tests {
    use super::*;

    fn disabled(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_empty_selection_without_exclusions() {
        assert_eq!(build_gtest_filter("", &[]), "*");
        assert_eq!(build_gtest_filter("A.*", &[]), "A.*");
    }

    #[test]
    fn test_exclusions_start_negative_part() {
        assert_eq!(build_gtest_filter("", &disabled(&["A.B", "C.D"])), "*-A.B:C.D");
        assert_eq!(
            build_gtest_filter("Net.*:Url.*", &disabled(&["Net.Slow"])),
            "Net.*:Url.*-Net.Slow"
        );
    }

    #[test]
    fn test_exclusions_extend_existing_negative_part() {
        assert_eq!(
            build_gtest_filter("A.*-A.Flaky", &disabled(&["A.Slow"])),
            "A.*-A.Flaky:A.Slow"
        );
    }

    #[test]
    fn test_selected_names() {
        assert_eq!(selected_test_names(""), vec!["*"]);
        assert_eq!(selected_test_names("A.B"), vec!["A.B"]);
        assert_eq!(selected_test_names("A.B:C.D"), vec!["A.B", "C.D"]);
        assert_eq!(selected_test_names("A.B::"), vec!["A.B"]);
    }
}
