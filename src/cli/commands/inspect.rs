//! # Inspect Command Module / 检查命令模块
//!
//! Implements `inspect`: shows what a run would stage and filter for each
//! configured suite without touching a device.
//!
//! 实现 `inspect`：在不接触设备的情况下，显示每个已配置套件在运行时将暂存和过滤的内容。

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;

use crate::core::config;
use crate::core::filters;
use crate::core::planner;
use crate::core::suites;
use crate::infra::t;

/// Placeholder device used when no serial is given: never an emulator.
const NO_DEVICE: &str = "-";

/// Executes the inspect command.
/// 执行检查命令。
pub fn execute(config_path: &Path, selected: &[String], device: Option<&str>, language: Option<&str>) -> Result<()> {
    let runner_config = config::load_config(config_path)
        .with_context(|| t!("run.config_load_failed", path = config_path.display()).to_string())?;
    let locale = language.unwrap_or(&runner_config.language).to_string();
    rust_i18n::set_locale(&locale);

    let device = device.unwrap_or(NO_DEVICE);
    let source_root = runner_config.source_root()?;
    let filter_dir = runner_config.filter_dir()?;
    let plan = planner::plan_execution(&runner_config, selected, &[device.to_string()], None, None)?;

    for planned in plan.assignments.iter().flat_map(|a| &a.suites) {
        let name = planned.name();
        let requirements = suites::requirements_for(&name);
        let data_files = suites::data_files_for_suite(&name, &source_root);
        let disabled = filters::disabled_tests_for(&filter_dir, &name, device)?;
        let gtest_filter = filters::build_gtest_filter(&planned.config.gtest_filter, &disabled);

        println!("\n{}", name.bold().cyan());
        println!(
            "  {:<22} {} ({:?})",
            t!("inspect.artifact", locale = &locale),
            planned.artifact.path().display(),
            planned.artifact.kind()
        );
        println!(
            "  {:<22} {}",
            t!("inspect.test_server", locale = &locale),
            if requirements.requires_mock_test_server {
                t!("inspect.yes", locale = &locale).yellow()
            } else {
                t!("inspect.no", locale = &locale).dimmed()
            }
        );
        println!(
            "  {:<22} {}",
            t!("inspect.paks", locale = &locale),
            requirements.pak_files.len() + requirements.pak_dirs.len()
        );
        println!(
            "  {:<22} {}",
            t!("inspect.data_files", locale = &locale),
            data_files.len()
        );
        for data in &data_files {
            println!("    - {data}");
        }
        println!(
            "  {:<22} {}",
            t!("inspect.disabled_tests", locale = &locale),
            disabled.len()
        );
        println!(
            "  {:<22} {}",
            t!("inspect.gtest_filter", locale = &locale),
            gtest_filter
        );
    }
    Ok(())
}
