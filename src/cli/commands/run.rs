//! # Run Command Module / 运行命令模块
//!
//! Implements `run`: plans the configured suites across the selected
//! devices, drives one lifecycle controller per suite, and reports.
//!
//! 实现 `run`：在所选设备间规划已配置的套件，为每个套件驱动一个生命周期控制器，并生成报告。

use anyhow::{Context, Result, bail};
use colored::*;
use futures::{StreamExt, stream};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::signal;
use tokio_util::sync::CancellationToken;

use crate::core::config::{self, RunnerConfig};
use crate::core::controller::{Collaborators, ControllerOptions, TestLifecycleController};
use crate::core::device::{DeviceRegistry, TestServerLauncher};
use crate::core::models::{SuiteOutcome, SuiteReport};
use crate::core::planner::{self, DeviceAssignment, PlannedSuite};
use crate::infra::adb::{AdbDevice, AdbRegistry};
use crate::infra::fs::ensure_parent_dir;
use crate::infra::t;
use crate::infra::test_server::SpawnedTestServer;
use crate::reporting::{generate_html_report, print_failure_details, print_summary, write_json_report};

/// Arguments of the `run` subcommand.
#[derive(Debug, Clone)]
pub struct RunArgs {
    pub config: PathBuf,
    pub suites: Vec<String>,
    pub devices: Vec<String>,
    /// Overrides every suite's configured filter.
    pub gtest_filter: Option<String>,
    pub adb: PathBuf,
    pub total_runners: Option<usize>,
    pub runner_index: Option<usize>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    /// `--lang` as given on the command line; falls back to the config.
    pub language: Option<String>,
}

/// Executes the run command.
/// 执行运行命令。
pub async fn execute(args: RunArgs) -> Result<()> {
    let mut runner_config = config::load_config(&args.config)
        .with_context(|| t!("run.config_load_failed", path = args.config.display()).to_string())?;
    let locale = args.language.clone().unwrap_or_else(|| runner_config.language.clone());
    rust_i18n::set_locale(&locale);

    println!(
        "{}",
        t!("run.loading_config", locale = &locale, path = args.config.display())
    );

    if let Some(filter) = &args.gtest_filter {
        for suite in &mut runner_config.suites {
            suite.gtest_filter = filter.clone();
        }
    }

    let registry = Arc::new(AdbRegistry::with_adb(&args.adb));
    let devices = if args.devices.is_empty() {
        registry
            .attached_devices()
            .await
            .context(t!("run.device_list_failed", locale = &locale).to_string())?
    } else {
        args.devices.clone()
    };
    if devices.is_empty() {
        bail!(t!("run.no_devices", locale = &locale).to_string());
    }
    println!(
        "{}",
        t!("run.devices_selected", locale = &locale, devices = devices.join(", ")).cyan()
    );

    let plan = planner::plan_execution(
        &runner_config,
        &args.suites,
        &devices,
        args.total_runners,
        args.runner_index,
    )?;

    if let (Some(total), Some(index)) = (args.total_runners, args.runner_index) {
        println!(
            "{}",
            t!(
                "run.split_runner",
                locale = &locale,
                index = index + 1,
                total = total,
                count = plan.suite_count()
            )
            .bold()
        );
    } else {
        println!(
            "{}",
            t!("run.single_runner", locale = &locale, count = plan.suite_count()).bold()
        );
    }
    if plan.suite_count() == 0 {
        println!("{}", t!("run.no_suites", locale = &locale).green());
        return Ok(());
    }

    let stop_token = setup_signal_handler(&locale);
    let shared = Shared {
        config: Arc::new(runner_config.clone()),
        registry,
        test_server: Arc::new(SpawnedTestServer::new(&runner_config.test_server)),
        adb: args.adb.clone(),
        stop_token,
    };

    let device_count = plan.assignments.len();
    let reports: Vec<SuiteReport> = stream::iter(plan.assignments.into_iter().map(|assignment| {
        let shared = shared.clone();
        let device = assignment.device.clone();
        async move {
            match tokio::spawn(run_device(assignment, shared)).await {
                Ok(reports) => reports,
                Err(e) => vec![SuiteReport {
                    suite: "*".to_string(),
                    device,
                    duration: Duration::ZERO,
                    outcome: SuiteOutcome::Aborted {
                        error: format!("Critical error during device run: {e}"),
                    },
                }],
            }
        }
    }))
    .buffer_unordered(device_count)
    .collect::<Vec<Vec<SuiteReport>>>()
    .await
    .into_iter()
    .flatten()
    .collect();

    print_summary(&reports, &locale);

    if let Some(report_path) = &args.html {
        println!(
            "\n{}",
            t!("run.generating_html", locale = &locale, path = report_path.display())
        );
        let written = ensure_parent_dir(report_path)
            .and_then(|_| generate_html_report(&reports, report_path, &locale));
        if let Err(e) = written {
            eprintln!("{} {e:#}", t!("run.html_failed", locale = &locale).red());
        }
    }
    if let Some(report_path) = &args.json {
        let written =
            ensure_parent_dir(report_path).and_then(|_| write_json_report(&reports, report_path));
        if let Err(e) = written {
            eprintln!("{} {e:#}", t!("run.json_failed", locale = &locale).red());
        }
    }

    if reports.iter().any(SuiteReport::is_failure) {
        print_failure_details(&reports, &locale);
        bail!(t!("run.tests_failed", locale = &locale).to_string());
    }
    Ok(())
}

/// State shared by every device task of a run.
#[derive(Clone)]
struct Shared {
    config: Arc<RunnerConfig>,
    registry: Arc<AdbRegistry>,
    test_server: Arc<SpawnedTestServer>,
    adb: PathBuf,
    stop_token: CancellationToken,
}

/// Works through one device's suites in order. Once a stop is requested the
/// remaining suites are reported as skipped.
///
/// 依次处理一个设备的套件。一旦请求停止，剩余套件将被报告为已跳过。
async fn run_device(assignment: DeviceAssignment, shared: Shared) -> Vec<SuiteReport> {
    let mut reports = Vec::with_capacity(assignment.suites.len());
    for suite in assignment.suites {
        let name = suite.name();
        if shared.stop_token.is_cancelled() {
            reports.push(SuiteReport {
                suite: name,
                device: assignment.device.clone(),
                duration: Duration::ZERO,
                outcome: SuiteOutcome::Skipped,
            });
            continue;
        }

        // A fresh handle per suite: its pushed-file list covers this suite only.
        let collaborators = Collaborators {
            device: Arc::new(AdbDevice::with_adb(&assignment.device, &shared.adb)),
            registry: shared.registry.clone() as Arc<dyn DeviceRegistry>,
            test_server: shared.test_server.clone() as Arc<dyn TestServerLauncher>,
        };
        let started = Instant::now();
        let outcome = match run_suite(&assignment.device, suite, &shared.config, collaborators).await {
            Ok(results) => SuiteOutcome::Completed { results },
            Err(e) => {
                tracing::error!(suite = %name, device = %assignment.device, error = %format!("{e:#}"), "suite aborted");
                SuiteOutcome::Aborted {
                    error: format!("{e:#}"),
                }
            }
        };
        reports.push(SuiteReport {
            suite: name,
            device: assignment.device.clone(),
            duration: started.elapsed(),
            outcome,
        });
    }
    reports
}

async fn run_suite(
    device: &str,
    suite: PlannedSuite,
    config: &RunnerConfig,
    collaborators: Collaborators,
) -> Result<crate::core::models::TestResultSet> {
    let options = ControllerOptions::from_config(config, &suite.config)?;
    let mut controller = TestLifecycleController::new(device, suite.artifact, options, collaborators)?;
    controller.execute().await
}

/// Sets up a signal handler for graceful shutdown.
fn setup_signal_handler(locale: &str) -> CancellationToken {
    let token = CancellationToken::new();
    let token_clone = token.clone();
    let locale = locale.to_string();

    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                println!("\n{}", t!("run.shutdown_signal", locale = &locale).yellow());
                token_clone.cancel();
            }
            Err(e) => tracing::warn!(error = %e, "failed to listen for Ctrl-C"),
        }
    });

    token
}
