//! # Test Filter Module / 测试过滤模块
//!
//! Reads the per-suite disabled-test files and composes gtest filter
//! expressions from a positive selection and a list of exclusions.
//!
//! 读取每个套件的禁用测试文件，并根据正向选择和排除列表组合 gtest 过滤表达式。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::device::is_emulator;

/// Path of the base disabled-test file for a suite.
/// 套件基础禁用测试文件的路径。
pub fn filter_file_name(filter_dir: &Path, suite: &str) -> PathBuf {
    filter_dir.join(format!("{suite}_disabled"))
}

/// Path of the additional disabled-test file applied on emulators.
/// 在模拟器上应用的附加禁用测试文件的路径。
pub fn emulator_filter_file_name(filter_dir: &Path, suite: &str) -> PathBuf {
    filter_dir.join(format!("{suite}_emulator_additional_disabled"))
}

/// Reads the test-name patterns listed in a filter file.
///
/// One pattern per line; blank lines and `#` comments are skipped, as is
/// anything after a `#` on a pattern line. A missing file yields an empty list.
///
/// 读取过滤文件中列出的测试名称模式。
///
/// 每行一个模式；跳过空行和 `#` 注释，模式行中 `#` 之后的内容也会被忽略。
/// 文件不存在时返回空列表。
pub fn read_expectations(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read filter file: {}", path.display()))?;
    Ok(content
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

/// The disabled-test patterns for `suite` on `device`: the base file, then
/// the emulator-only file when `device` is an emulator. Lists are
/// concatenated as read; duplicates are kept.
///
/// `suite` 在 `device` 上的禁用测试模式：先是基础文件，若 `device` 为模拟器再加上仅限模拟器的文件。
/// 列表按读取顺序拼接，保留重复项。
pub fn disabled_tests_for(filter_dir: &Path, suite: &str, device: &str) -> Result<Vec<String>> {
    let mut disabled = read_expectations(&filter_file_name(filter_dir, suite))?;
    if is_emulator(device) {
        disabled.extend(read_expectations(&emulator_filter_file_name(filter_dir, suite))?);
    }
    Ok(disabled)
}

/// Composes the `--gtest_filter` value from the requested selection and the
/// disabled tests.
///
/// An empty selection means `*`. If the selection already carries a negative
/// part (`A.*-A.Slow`), the disabled tests are appended to it.
///
/// 根据请求的选择和禁用测试组合 `--gtest_filter` 的值。
///
/// 空选择表示 `*`。如果选择已包含负向部分（`A.*-A.Slow`），禁用测试会追加到其后。
pub fn build_gtest_filter(selection: &str, disabled: &[String]) -> String {
    let selection = if selection.is_empty() { "*" } else { selection };
    if disabled.is_empty() {
        return selection.to_string();
    }
    let exclusions = disabled.join(":");
    if selection.contains('-') {
        format!("{selection}:{exclusions}")
    } else {
        format!("{selection}-{exclusions}")
    }
}

/// The test names a filter expression selects explicitly, split on `:`.
/// An empty expression selects everything and is reported as `*`.
///
/// 过滤表达式明确选择的测试名称（按 `:` 拆分）。空表达式选择全部，报告为 `*`。
pub fn selected_test_names(selection: &str) -> Vec<String> {
    let names: Vec<String> = selection
        .split(':')
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        vec!["*".to_string()]
    } else {
        names
    }
}
