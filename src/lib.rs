//! # Device Test Runner Library / 设备测试运行器库
//!
//! Pushes gtest suites (native executables or APKs) and their data onto
//! Android devices, runs them, and collects per-test results.
//!
//! 将 gtest 套件（原生可执行文件或 APK）及其数据推送到 Android 设备，运行它们并收集每个测试的结果。
//!
//! ## Modules / 模块
//!
//! - `core` - The test lifecycle controller, data models and suite policy
//! - `infra` - adb-backed device control, process plumbing and i18n
//! - `reporting` - Console, HTML and JSON reports
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 测试生命周期控制器、数据模型和套件策略
//! - `infra` - 基于 adb 的设备控制、进程管道和国际化
//! - `reporting` - 控制台、HTML 和 JSON 报告
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::controller;
pub use core::models;

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");

/// Picks the UI language from the system locale.
///
/// It attempts to match the full locale (e.g., "zh-CN"), then just the
/// language code (e.g., "en"), and finally falls back to "en".
///
/// 根据系统区域设置选择界面语言。
pub fn detect_locale() -> String {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    if available_locales.contains(&locale.as_str()) {
        return locale;
    }
    locale
        .split('-')
        .next()
        .filter(|lang_code| available_locales.contains(lang_code))
        .unwrap_or("en")
        .to_string()
}

/// Initializes the application's i18n based on the system locale.
/// 根据系统区域设置初始化应用程序的国际化。
pub fn init() {
    rust_i18n::set_locale(&detect_locale());
}
