//! # Suite Requirements Unit Tests / 套件需求单元测试
//!
//! Unit tests for the static suite table: data files, paks and the mock
//! test server flag.
//!
//! 静态套件表的单元测试：数据文件、pak 和模拟测试服务器标志。

use device_test_runner::core::suites::{
    WEBKIT_TEST_DATA_DEVICE_PATH, data_files_for_suite, known_suites, requirements_for,
    requires_mock_test_server, webkit_test_data_source,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[cfg(test)]
mod data_file_tests {
    use super::*;

    #[test]
    fn test_shared_unit_test_data() {
        let root = Path::new("/src");
        let base = data_files_for_suite("base_unittests", root);
        assert_eq!(base.len(), 40);
        assert_eq!(base[0], "base/data/file_util_unittest");
        assert!(base.contains(&"net/data/ssl/certificates/".to_string()));
        assert_eq!(base, data_files_for_suite("sql_unittests", root));
    }

    #[test]
    fn test_net_unittests_data() {
        let net = data_files_for_suite("net_unittests", Path::new("/src"));
        assert_eq!(net.len(), 9);
        assert!(net.contains(&"net/data/proxy_resolver_v8_unittest".to_string()));
        assert!(net.contains(&"chrome/test/data/animate1.gif".to_string()));
    }

    #[test]
    fn test_other_suites() {
        let root = Path::new("/src");
        assert_eq!(data_files_for_suite("media_unittests", root), vec!["media/test/data"]);
        assert_eq!(data_files_for_suite("ui_tests", root).len(), 5);
        assert_eq!(data_files_for_suite("content_unittests", root).len(), 4);
        assert!(data_files_for_suite("ui_unittests", root).is_empty());
        assert!(data_files_for_suite("gfx_unittests", root).is_empty());
    }

    #[test]
    fn test_unit_tests_expand_dictionary_glob() {
        let root = tempdir().unwrap();
        let dictionaries = root.path().join("third_party/hunspell_dictionaries");
        fs::create_dir_all(&dictionaries).unwrap();
        fs::write(dictionaries.join("fr-FR-3-0.bdic"), b"").unwrap();
        fs::write(dictionaries.join("en-US-3-0.bdic"), b"").unwrap();
        fs::write(dictionaries.join("README"), b"").unwrap();

        let files = data_files_for_suite("unit_tests", root.path());
        assert_eq!(files.len(), 43);
        assert_eq!(files[40], "chrome/test/data/simple_open_search.xml");
        assert_eq!(
            &files[41..],
            &[
                "third_party/hunspell_dictionaries/en-US-3-0.bdic".to_string(),
                "third_party/hunspell_dictionaries/fr-FR-3-0.bdic".to_string(),
            ]
        );
    }

    #[test]
    fn test_unit_tests_without_dictionaries() {
        let root = tempdir().unwrap();
        assert_eq!(data_files_for_suite("unit_tests", root.path()).len(), 41);
    }
}

#[cfg(test)]
mod requirement_tests {
    use super::*;

    #[test]
    fn test_mock_test_server_suites() {
        assert!(requires_mock_test_server("net_unittests"));
        assert!(requires_mock_test_server("unit_tests"));
        assert!(requires_mock_test_server("content_unittests"));
        assert!(!requires_mock_test_server("base_unittests"));
        assert!(!requires_mock_test_server("unknown_suite"));
    }

    #[test]
    fn test_pak_files() {
        let unit_tests = requirements_for("unit_tests");
        assert_eq!(unit_tests.pak_files.len(), 4);
        assert!(unit_tests.pak_files.contains(&("locales/en-US.pak", "en-US.pak")));
        assert_eq!(unit_tests.pak_dirs, &[("test_data", "test_data")]);

        let content = requirements_for("content_unittests");
        assert_eq!(content.pak_files, &[("content_resources.pak", "content_resources.pak")]);

        assert!(requirements_for("base_unittests").pak_files.is_empty());
    }

    #[test]
    fn test_known_suites_are_sorted() {
        let suites = known_suites();
        assert!(suites.contains(&"net_unittests"));
        assert!(suites.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_webkit_data_location() {
        let root = Path::new("/src");
        assert_eq!(
            webkit_test_data_source(root, false),
            root.join("third_party/WebKit/Source/WebKit/chromium/tests/data")
        );
        assert_eq!(
            webkit_test_data_source(root, true),
            root.join("../../../Source/WebKit/chromium/tests/data")
        );
        assert!(WEBKIT_TEST_DATA_DEVICE_PATH.starts_with("third_party/WebKit"));
    }
}
