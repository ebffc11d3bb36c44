//! # Configuration Module / 配置模块
//!
//! The TOML run configuration: where the source tree lives, which suites to
//! run, and how each lifecycle controller should behave.
//!
//! TOML 运行配置：源码树位置、要运行的套件，以及每个生命周期控制器的行为方式。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::tools::Tool;

/// Package whose on-device state is reset before each suite.
pub const DEFAULT_APP_PACKAGE: &str = "com.google.android.apps.chrome";

/// A single suite entry in the configuration.
/// 配置中的单个套件条目。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SuiteConfig {
    /// Path to the gtest executable or APK. Relative paths are resolved
    /// against `source_root`.
    /// gtest 可执行文件或 APK 的路径。相对路径相对于 `source_root` 解析。
    pub path: String,
    /// gtest filter expression; empty runs every test.
    /// gtest 过滤表达式；为空则运行所有测试。
    #[serde(default)]
    pub gtest_filter: String,
    /// Extra arguments passed to the test binary.
    #[serde(default)]
    pub test_arguments: String,
    /// Overrides the global per-test timeout for this suite.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Settings for the host-side mock network test server.
/// 主机端模拟网络测试服务器的设置。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TestServerConfig {
    /// Host command starting the server. `{port}` is replaced by `port`.
    /// 启动服务器的主机命令。`{port}` 会被替换为 `port`。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default = "default_test_server_port")]
    pub port: u16,
}

impl Default for TestServerConfig {
    fn default() -> Self {
        Self {
            command: None,
            port: default_test_server_port(),
        }
    }
}

/// The whole run configuration, loaded from a TOML file.
/// 从 TOML 文件加载的完整运行配置。
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RunnerConfig {
    /// The language for the runner's output messages (e.g., "en", "zh-CN").
    /// 运行器输出消息的语言（例如 "en", "zh-CN"）。
    #[serde(default = "default_language")]
    pub language: String,
    /// Root of the source checkout; data files are relative to it.
    /// 源码检出的根目录；数据文件相对于它。
    #[serde(default = "default_source_root")]
    pub source_root: String,
    /// Build configuration name, e.g. `Debug` or `Release`.
    #[serde(default = "default_build_type")]
    pub build_type: String,
    /// Directory holding `<suite>_disabled` filter files.
    #[serde(default = "default_filter_dir")]
    pub filter_dir: String,
    /// Per-test timeout in seconds.
    /// 单个测试的超时时间（秒）。
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub cleanup_test_files: bool,
    #[serde(default)]
    pub tool: Tool,
    /// Record device logs and archive crash dumps for each suite.
    /// 为每个套件记录设备日志并归档崩溃转储。
    #[serde(default)]
    pub dump_debug_info: bool,
    /// Skip staging auxiliary data files for speed.
    /// 为提高速度跳过辅助数据文件的暂存。
    #[serde(default)]
    pub fast_and_loose: bool,
    /// The suite is run from inside a WebKit checkout.
    #[serde(default)]
    pub in_webkit_checkout: bool,
    #[serde(default = "default_app_package")]
    pub app_package: String,
    /// Toolchain `strip` used before pushing executables. Unset pushes the
    /// binary as built.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strip_tool: Option<String>,
    #[serde(default = "default_debug_output_dir")]
    pub debug_output_dir: String,
    #[serde(default)]
    pub test_server: TestServerConfig,
    #[serde(default)]
    pub suites: Vec<SuiteConfig>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            source_root: default_source_root(),
            build_type: default_build_type(),
            filter_dir: default_filter_dir(),
            timeout_secs: default_timeout_secs(),
            cleanup_test_files: false,
            tool: Tool::None,
            dump_debug_info: false,
            fast_and_loose: false,
            in_webkit_checkout: false,
            app_package: default_app_package(),
            strip_tool: None,
            debug_output_dir: default_debug_output_dir(),
            test_server: TestServerConfig::default(),
            suites: Vec::new(),
        }
    }
}

impl RunnerConfig {
    pub fn source_root(&self) -> Result<PathBuf> {
        expand_path(&self.source_root)
    }

    /// The filter directory; relative paths are resolved against the source root.
    pub fn filter_dir(&self) -> Result<PathBuf> {
        self.resolve(&self.filter_dir)
    }

    pub fn debug_output_dir(&self) -> Result<PathBuf> {
        expand_path(&self.debug_output_dir)
    }

    pub fn strip_tool(&self) -> Result<Option<PathBuf>> {
        self.strip_tool.as_deref().map(expand_path).transpose()
    }

    /// Resolves a suite path against the source root.
    /// 相对于源码根目录解析套件路径。
    pub fn suite_path(&self, suite: &SuiteConfig) -> Result<PathBuf> {
        self.resolve(&suite.path)
    }

    pub fn timeout_for(&self, suite: &SuiteConfig) -> Duration {
        Duration::from_secs(suite.timeout_secs.unwrap_or(self.timeout_secs))
    }

    fn resolve(&self, raw: &str) -> Result<PathBuf> {
        let path = expand_path(raw)?;
        if path.is_absolute() {
            Ok(path)
        } else {
            Ok(self.source_root()?.join(path))
        }
    }

    fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be greater than zero");
        }
        if let Some(suite) = self.suites.iter().find(|s| s.path.trim().is_empty()) {
            bail!("Suite entry has an empty path: {suite:?}");
        }
        if let Some(suite) = self.suites.iter().find(|s| s.timeout_secs == Some(0)) {
            bail!("Suite '{}' has a zero timeout", suite.path);
        }
        Ok(())
    }
}

/// Expands `~` and environment variables in a configured path.
/// 展开配置路径中的 `~` 和环境变量。
pub fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw).with_context(|| format!("Failed to expand path: {raw}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Loads and validates a configuration file.
/// 加载并验证配置文件。
pub fn load_config(path: &Path) -> Result<RunnerConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let config: RunnerConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    config.validate()?;
    Ok(config)
}

fn default_language() -> String {
    "en".to_string()
}

fn default_source_root() -> String {
    ".".to_string()
}

fn default_build_type() -> String {
    "Debug".to_string()
}

fn default_filter_dir() -> String {
    "build/android/gtest_filter".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_app_package() -> String {
    DEFAULT_APP_PACKAGE.to_string()
}

fn default_debug_output_dir() -> String {
    "out/debug_info_dumps".to_string()
}

fn default_test_server_port() -> u16 {
    8001
}
