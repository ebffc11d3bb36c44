//! # Command-Line Interface / 命令行接口
//!
//! Builds the localized `clap` command tree and dispatches to the
//! subcommands in [`commands`].
//!
//! 构建本地化的 `clap` 命令树，并分派到 [`commands`] 中的子命令。

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf};

use crate::infra::t;

pub mod commands;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "DeviceTests.toml";

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    args.iter()
        .position(|arg| arg == "--lang")
        .and_then(|pos| args.get(pos + 1))
        .cloned()
}

fn config_arg(locale: &str) -> Arg {
    Arg::new("config")
        .short('c')
        .long("config")
        .help(t!("cli.arg_config", locale = locale).to_string())
        .value_name("CONFIG")
        .default_value(DEFAULT_CONFIG_FILE)
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn suite_arg(locale: &str) -> Arg {
    Arg::new("suite")
        .short('s')
        .long("suite")
        .help(t!("cli.arg_suite", locale = locale).to_string())
        .value_name("SUITE")
        .action(ArgAction::Append)
}

pub fn build_cli(locale: &str) -> Command {
    Command::new("device-test-runner")
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about", locale = locale).to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.arg_lang", locale = locale).to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.cmd_run_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(suite_arg(locale))
                .arg(
                    Arg::new("device")
                        .short('d')
                        .long("device")
                        .help(t!("cli.arg_device", locale = locale).to_string())
                        .value_name("SERIAL")
                        .action(ArgAction::Append),
                )
                .arg(
                    Arg::new("gtest-filter")
                        .short('f')
                        .long("gtest-filter")
                        .help(t!("cli.arg_gtest_filter", locale = locale).to_string())
                        .value_name("FILTER")
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("adb")
                        .long("adb")
                        .help(t!("cli.arg_adb", locale = locale).to_string())
                        .value_name("ADB")
                        .default_value("adb")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("total-runners")
                        .long("total-runners")
                        .help(t!("cli.arg_total_runners", locale = locale).to_string())
                        .value_name("TOTAL_RUNNERS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("runner-index"),
                )
                .arg(
                    Arg::new("runner-index")
                        .long("runner-index")
                        .help(t!("cli.arg_runner_index", locale = locale).to_string())
                        .value_name("RUNNER_INDEX")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set)
                        .requires("total-runners"),
                )
                .arg(
                    Arg::new("html")
                        .long("html")
                        .help(t!("cli.arg_html", locale = locale).to_string())
                        .value_name("HTML")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .help(t!("cli.arg_json", locale = locale).to_string())
                        .value_name("JSON")
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about(t!("cli.cmd_inspect_about", locale = locale).to_string())
                .arg(config_arg(locale))
                .arg(suite_arg(locale))
                .arg(
                    Arg::new("device")
                        .short('d')
                        .long("device")
                        .help(t!("cli.arg_inspect_device", locale = locale).to_string())
                        .value_name("SERIAL")
                        .action(ArgAction::Set),
                ),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.cmd_init_about", locale = locale).to_string())
                .arg(
                    Arg::new("output")
                        .short('o')
                        .long("output")
                        .help(t!("cli.arg_init_output", locale = locale).to_string())
                        .value_name("OUTPUT")
                        .default_value(DEFAULT_CONFIG_FILE)
                        .value_parser(clap::value_parser!(PathBuf))
                        .action(ArgAction::Set),
                )
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("cli.arg_force", locale = locale).to_string())
                        .action(ArgAction::SetTrue),
                ),
        )
}

fn strings(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|values| values.cloned().collect())
        .unwrap_or_default()
}

fn path_or_default(matches: &ArgMatches, id: &str, default: &str) -> PathBuf {
    matches
        .get_one::<PathBuf>(id)
        .cloned()
        .unwrap_or_else(|| PathBuf::from(default))
}

/// Parses the process arguments and runs the selected subcommand.
/// 解析进程参数并运行所选子命令。
pub async fn run() -> Result<()> {
    // Pre-parse language and initialize i18n first.
    let explicit_language = pre_parse_language();
    let language = explicit_language.clone().unwrap_or_else(crate::detect_locale);
    rust_i18n::set_locale(&language);

    let matches = build_cli(&language).get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let args = commands::run::RunArgs {
                config: path_or_default(run_matches, "config", DEFAULT_CONFIG_FILE),
                suites: strings(run_matches, "suite"),
                devices: strings(run_matches, "device"),
                gtest_filter: run_matches.get_one::<String>("gtest-filter").cloned(),
                adb: path_or_default(run_matches, "adb", "adb"),
                total_runners: run_matches.get_one::<usize>("total-runners").copied(),
                runner_index: run_matches.get_one::<usize>("runner-index").copied(),
                html: run_matches.get_one::<PathBuf>("html").cloned(),
                json: run_matches.get_one::<PathBuf>("json").cloned(),
                language: explicit_language,
            };
            commands::run::execute(args).await
        }
        Some(("inspect", inspect_matches)) => commands::inspect::execute(
            &path_or_default(inspect_matches, "config", DEFAULT_CONFIG_FILE),
            &strings(inspect_matches, "suite"),
            inspect_matches.get_one::<String>("device").map(String::as_str),
            explicit_language.as_deref(),
        ),
        Some(("init", init_matches)) => {
            let non_interactive = init_matches.get_flag("non-interactive");
            if explicit_language.is_none() {
                println!(
                    "🌐 {}",
                    t!("init.system_language_detected", locale = &language, lang = &language)
                );
            }
            commands::init::execute(
                &path_or_default(init_matches, "output", DEFAULT_CONFIG_FILE),
                &language,
                non_interactive,
                init_matches.get_flag("force"),
            )
        }
        // `subcommand_required` makes clap print help before we get here.
        _ => Ok(()),
    }
}
