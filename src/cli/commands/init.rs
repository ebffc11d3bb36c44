//! # Init Command Module / 初始化命令模块
//!
//! Implements `init`: writes a starter `DeviceTests.toml`, either from a
//! commented template or through an interactive `dialoguer` wizard.
//!
//! 实现 `init`：通过带注释的模板或交互式 `dialoguer` 向导写入初始 `DeviceTests.toml`。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, Input, MultiSelect, Select, theme::ColorfulTheme};
use std::fs;
use std::path::Path;

use crate::core::config::{RunnerConfig, SuiteConfig};
use crate::core::suites;
use crate::core::tools::Tool;
use crate::infra::fs::ensure_parent_dir;
use crate::infra::t;

const DEFAULT_CONFIG: &str = r#"# Device Test Runner Configuration / 设备测试运行器配置

# Language for messages / 消息语言
language = "en"

# Root of the source checkout; data files are relative to it.
# 源码检出的根目录；数据文件相对于它。
source_root = "."
build_type = "Debug"

# Directory holding <suite>_disabled filter files / 存放 <suite>_disabled 过滤文件的目录
filter_dir = "build/android/gtest_filter"

# Per-test timeout in seconds / 单个测试的超时时间（秒）
timeout_secs = 60

# Remove pushed files after each suite / 每个套件结束后删除推送的文件
cleanup_test_files = false

# none | asan | memcheck | tsan
tool = "none"

# Record logcat and archive tombstones / 记录 logcat 并归档 tombstone
dump_debug_info = false

[test_server]
# Host command starting the mock server; {port} is substituted.
# 启动模拟服务器的主机命令；{port} 会被替换。
# command = "python net/tools/testserver/testserver.py --port={port}"
port = 8001

[[suites]]
path = "out/Debug/base_unittests"

[[suites]]
path = "out/Debug/net_unittests"
# gtest_filter = "URLRequestTest.*"
# test_arguments = "--v=1"
# timeout_secs = 120
"#;

/// Executes the init command.
///
/// With `non_interactive` the commented template is written; otherwise a
/// wizard asks for the main settings. An existing file is only replaced
/// with `force` or after confirmation.
///
/// 执行初始化命令。
/// 使用 `non_interactive` 时写入带注释的模板；否则由向导询问主要设置。
/// 现有文件只有在指定 `force` 或确认后才会被替换。
pub fn execute(output: &Path, language: &str, non_interactive: bool, force: bool) -> Result<()> {
    let theme = ColorfulTheme::default();

    if output.exists() && !force {
        if non_interactive {
            println!(
                "{}",
                t!("init.file_exists", locale = language, path = output.display()).red()
            );
            println!("{}", t!("init.use_force", locale = language).yellow());
            return Ok(());
        }
        let overwrite = Confirm::with_theme(&theme)
            .with_prompt(t!("init.overwrite_prompt", locale = language, path = output.display()).to_string())
            .default(false)
            .interact()
            .context(t!("init.confirmation_failed", locale = language).to_string())?;
        if !overwrite {
            println!("{}", t!("init.aborted", locale = language).yellow());
            return Ok(());
        }
    }

    let content = if non_interactive {
        DEFAULT_CONFIG.replace("language = \"en\"", &format!("language = \"{language}\""))
    } else {
        run_wizard(&theme, language)?
    };

    ensure_parent_dir(output)?;
    fs::write(output, content)
        .with_context(|| t!("init.write_failed", locale = language, path = output.display()).to_string())?;

    println!(
        "\n{} {}",
        "✔".green(),
        t!("init.success", locale = language, path = output.display()).bold()
    );
    println!("{}", t!("init.next_steps", locale = language));
    Ok(())
}

/// Asks for the main settings and renders them as TOML.
/// 询问主要设置并将其渲染为 TOML。
fn run_wizard(theme: &ColorfulTheme, language: &str) -> Result<String> {
    println!("\n{}", t!("init.wizard_welcome", locale = language).bold().cyan());
    println!("{}\n", t!("init.wizard_description", locale = language));

    let defaults = RunnerConfig::default();
    let source_root: String = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_source_root", locale = language).to_string())
        .default(defaults.source_root.clone())
        .interact_text()?;
    let build_type: String = Input::with_theme(theme)
        .with_prompt(t!("init.prompt_build_type", locale = language).to_string())
        .default(defaults.build_type.clone())
        .interact_text()?;

    let tools = [Tool::None, Tool::AddressSanitizer, Tool::Memcheck, Tool::ThreadSanitizer];
    let tool_names: Vec<String> = tools.iter().map(Tool::to_string).collect();
    let tool_index = Select::with_theme(theme)
        .with_prompt(t!("init.prompt_tool", locale = language).to_string())
        .items(&tool_names)
        .default(0)
        .interact()?;

    let known = suites::known_suites();
    let selected = MultiSelect::with_theme(theme)
        .with_prompt(t!("init.prompt_suites", locale = language).to_string())
        .items(&known)
        .interact()?;

    let dump_debug_info = Confirm::with_theme(theme)
        .with_prompt(t!("init.prompt_debug_info", locale = language).to_string())
        .default(false)
        .interact()?;

    let config = RunnerConfig {
        language: language.to_string(),
        source_root,
        tool: tools[tool_index],
        dump_debug_info,
        suites: selected
            .into_iter()
            .map(|i| SuiteConfig {
                path: format!("out/{build_type}/{}", known[i]),
                gtest_filter: String::new(),
                test_arguments: String::new(),
                timeout_secs: None,
            })
            .collect(),
        build_type,
        ..defaults
    };

    toml::to_string_pretty(&config).context(t!("init.serialize_failed", locale = language).to_string())
}
