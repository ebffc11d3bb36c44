//! # Suite Requirements Module / 套件需求模块
//!
//! A single static table describing what each known suite needs on the device:
//! data files to stage, resource paks, and whether the mock network test server
//! must be running. All suite-name policy lives here.
//!
//! 一张静态表，描述每个已知套件在设备上需要的内容：要暂存的数据文件、资源 pak，
//! 以及是否必须运行模拟网络测试服务器。所有按套件名的策略都集中在这里。

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// A resource pak: path relative to the suite's output directory, and the
/// destination file name under the device `paks/` directory.
///
/// 资源 pak：相对于套件输出目录的路径，以及设备 `paks/` 目录下的目标文件名。
pub type PakFile = (&'static str, &'static str);

/// Static requirements for one suite.
/// 单个套件的静态需求。
#[derive(Debug, Clone, Copy, Default)]
pub struct SuiteRequirements {
    /// Data files and directories, relative to the source root.
    /// 数据文件和目录，相对于源码根目录。
    pub data_files: &'static [&'static str],
    /// Suite-specific entries appended after `data_files`.
    pub extra_data_files: &'static [&'static str],
    /// Glob patterns, relative to the source root, expanded at lookup time.
    /// 相对于源码根目录的 glob 模式，在查找时展开。
    pub data_globs: &'static [&'static str],
    pub pak_files: &'static [PakFile],
    /// Extra directories pushed next to the paks (local, device-relative).
    pub pak_dirs: &'static [PakFile],
    pub requires_mock_test_server: bool,
}

/// Suite whose WebKit test data lives at a checkout-dependent location.
pub const WEBKIT_UNIT_TESTS: &str = "webkit_unit_tests";

const SHARED_UNIT_TEST_DATA: &[&str] = &[
    "base/data/file_util_unittest",
    "base/data/json/bom_feff.json",
    "base/prefs/test/data/pref_service",
    "chrome/test/data/download-test1.lib",
    "chrome/test/data/extensions/bad_magic.crx",
    "chrome/test/data/extensions/good.crx",
    "chrome/test/data/extensions/icon1.png",
    "chrome/test/data/extensions/icon2.png",
    "chrome/test/data/extensions/icon3.png",
    "chrome/test/data/extensions/allow_silent_upgrade/",
    "chrome/test/data/extensions/app/",
    "chrome/test/data/extensions/bad/",
    "chrome/test/data/extensions/effective_host_permissions/",
    "chrome/test/data/extensions/empty_manifest/",
    "chrome/test/data/extensions/good/Extensions/",
    "chrome/test/data/extensions/manifest_tests/",
    "chrome/test/data/extensions/page_action/",
    "chrome/test/data/extensions/permissions/",
    "chrome/test/data/extensions/script_and_capture/",
    "chrome/test/data/extensions/unpacker/",
    "chrome/test/data/bookmarks/",
    "chrome/test/data/components/",
    "chrome/test/data/extensions/json_schema_test.js",
    "chrome/test/data/History/",
    "chrome/test/data/json_schema_validator/",
    "chrome/test/data/pref_service/",
    "chrome/test/data/serializer_nested_test.js",
    "chrome/test/data/serializer_test.js",
    "chrome/test/data/serializer_test_nowhitespace.js",
    "chrome/test/data/top_sites/",
    "chrome/test/data/web_app_info/",
    "chrome/test/data/web_database",
    "chrome/test/data/webui/",
    "chrome/test/data/zip",
    "chrome/third_party/mock4js/",
    "content/browser/gpu/software_rendering_list.json",
    "net/data/cache_tests/insert_load1",
    "net/data/cache_tests/dirty_entry5",
    "net/data/ssl/certificates/",
    "ui/base/test/data/data_pack_unittest",
];

static SUITE_REQUIREMENTS: Lazy<HashMap<&'static str, SuiteRequirements>> = Lazy::new(|| {
    let mut table = HashMap::new();
    table.insert(
        "base_unittests",
        SuiteRequirements {
            data_files: SHARED_UNIT_TEST_DATA,
            ..Default::default()
        },
    );
    table.insert(
        "sql_unittests",
        SuiteRequirements {
            data_files: SHARED_UNIT_TEST_DATA,
            ..Default::default()
        },
    );
    table.insert(
        "unit_tests",
        SuiteRequirements {
            data_files: SHARED_UNIT_TEST_DATA,
            extra_data_files: &["chrome/test/data/simple_open_search.xml"],
            // Spell check dictionaries used by the unit tests.
            data_globs: &["third_party/hunspell_dictionaries/*.bdic"],
            pak_files: &[
                ("chrome.pak", "chrome.pak"),
                ("locales/en-US.pak", "en-US.pak"),
                ("resources.pak", "resources.pak"),
                ("chrome_100_percent.pak", "chrome_100_percent.pak"),
            ],
            pak_dirs: &[("test_data", "test_data")],
            requires_mock_test_server: true,
        },
    );
    table.insert(
        "ui_unittests",
        SuiteRequirements {
            pak_files: &[
                ("chrome.pak", "chrome.pak"),
                ("locales/en-US.pak", "en-US.pak"),
            ],
            ..Default::default()
        },
    );
    table.insert(
        "media_unittests",
        SuiteRequirements {
            data_files: &["media/test/data"],
            ..Default::default()
        },
    );
    table.insert(
        "net_unittests",
        SuiteRequirements {
            data_files: &[
                "chrome/test/data/animate1.gif",
                "chrome/test/data/simple.html",
                "net/data/cache_tests",
                "net/data/filter_unittests",
                "net/data/ftp",
                "net/data/proxy_resolver_v8_unittest",
                "net/data/ssl/certificates",
                "net/data/url_request_unittest/",
                "net/data/proxy_script_fetcher_unittest",
            ],
            requires_mock_test_server: true,
            ..Default::default()
        },
    );
    table.insert(
        "ui_tests",
        SuiteRequirements {
            data_files: &[
                "chrome/test/data/dromaeo",
                "chrome/test/data/json2.js",
                "chrome/test/data/sunspider",
                "chrome/test/data/v8_benchmark",
                "chrome/test/perf/v8_benchmark_uitest.js",
            ],
            ..Default::default()
        },
    );
    table.insert(
        "content_unittests",
        SuiteRequirements {
            data_files: &[
                "content/test/data/gpu/webgl_conformance_test_expectations.txt",
                "net/data/ssl/certificates/",
                "webkit/data/dom_storage/webcore_test_database.localstorage",
                "third_party/hyphen/hyph_en_US.dic",
            ],
            pak_files: &[("content_resources.pak", "content_resources.pak")],
            requires_mock_test_server: true,
            ..Default::default()
        },
    );
    table
});

/// Looks up the requirements of a suite. Unlisted suites need nothing.
/// 查找套件的需求。未列出的套件没有任何需求。
pub fn requirements_for(suite: &str) -> SuiteRequirements {
    SUITE_REQUIREMENTS.get(suite).copied().unwrap_or_default()
}

/// Returns the data files and directories a suite needs on the device,
/// relative to the source root. Glob entries are expanded against
/// `source_root` and returned sorted after the fixed entries.
///
/// 返回套件在设备上需要的数据文件和目录（相对于源码根目录）。
/// Glob 条目相对于 `source_root` 展开，并在固定条目之后按排序返回。
pub fn data_files_for_suite(suite: &str, source_root: &Path) -> Vec<String> {
    let requirements = requirements_for(suite);
    let mut files: Vec<String> = requirements
        .data_files
        .iter()
        .chain(requirements.extra_data_files)
        .map(|f| f.to_string())
        .collect();

    for pattern in requirements.data_globs {
        let full_pattern = source_root.join(pattern);
        let Some(full_pattern) = full_pattern.to_str() else {
            continue;
        };
        let mut matched: Vec<String> = match glob::glob(full_pattern) {
            Ok(paths) => paths
                .filter_map(Result::ok)
                .filter_map(|path| {
                    path.strip_prefix(source_root)
                        .ok()
                        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
                })
                .collect(),
            Err(e) => {
                tracing::warn!(pattern = %full_pattern, error = %e, "invalid data glob");
                Vec::new()
            }
        };
        matched.sort();
        files.extend(matched);
    }
    files
}

/// Names of every suite with an entry in the table, sorted.
/// 表中所有有条目的套件名称，已排序。
pub fn known_suites() -> Vec<&'static str> {
    let mut names: Vec<&'static str> = SUITE_REQUIREMENTS.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Whether the suite needs the mock network test server.
pub fn requires_mock_test_server(suite: &str) -> bool {
    requirements_for(suite).requires_mock_test_server
}

/// Local directory holding the WebKit unit test data. Inside a WebKit
/// checkout the Chromium tree sits three levels below the WebKit root.
///
/// 存放 WebKit 单元测试数据的本地目录。在 WebKit 检出中，Chromium 树位于 WebKit 根目录下三层。
pub fn webkit_test_data_source(source_root: &Path, in_webkit_checkout: bool) -> PathBuf {
    let webkit_src = if in_webkit_checkout {
        source_root.join("..").join("..").join("..")
    } else {
        source_root.join("third_party").join("WebKit")
    };
    webkit_src.join("Source/WebKit/chromium/tests/data")
}

/// Device path, relative to external storage, for the WebKit unit test data.
pub const WEBKIT_TEST_DATA_DEVICE_PATH: &str =
    "third_party/WebKit/Source/WebKit/chromium/tests/data";
