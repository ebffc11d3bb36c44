//! # Test Lifecycle Controller / 测试生命周期控制器
//!
//! Owns one device and one test artifact for a single suite run and drives it
//! through `SetUp → RunTests → TearDown`. Whatever SetUp acquires, TearDown
//! releases, even when SetUp stopped half-way or RunTests was never called.
//!
//! 在单次套件运行中拥有一个设备和一个测试产物，并驱动其完成
//! `SetUp → RunTests → TearDown`。无论 SetUp 获取了什么，TearDown 都会释放，
//! 即使 SetUp 中途停止或从未调用 RunTests。
//!
//! ## Lifecycle / 生命周期
//!
//! ```text
//! Constructed ──set_up──▶ Ready ──run_tests──▶ Ran
//!      │                    │                   │
//!      └──── (failed) ──▶ SetUpFailed           │
//!                           │                   │
//!                           └──── tear_down ◀───┘ ──▶ TornDown
//! ```

use anyhow::{Context, Result, bail};
use colored::*;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::{RunnerConfig, SuiteConfig, DEFAULT_APP_PACKAGE};
use crate::core::debug_info::DebugCapture;
use crate::core::device::{DeviceControl, DeviceError, DeviceRegistry, TestServerLauncher, is_emulator};
use crate::core::filters::{self, build_gtest_filter, selected_test_names};
use crate::core::models::{ArtifactKind, ArtifactReference, TestResultSet};
use crate::core::package::{PackageOptions, TestPackage};
use crate::core::suites;
use crate::core::tools::Tool;
use crate::infra::t;

/// How long to wait for external storage before pushing data files.
const SD_CARD_READY_TIMEOUT: Duration = Duration::from_secs(20);

/// Construction inputs of a controller besides the device and artifact.
/// 除设备和产物之外的控制器构造输入。
#[derive(Debug, Clone)]
pub struct ControllerOptions {
    /// gtest filter expression; empty runs every test.
    pub gtest_filter: String,
    /// Extra arguments passed to the test binary.
    pub test_arguments: String,
    /// Per-test timeout. Must be positive.
    /// 单个测试的超时时间，必须为正。
    pub timeout: Duration,
    /// Remove every pushed file on teardown.
    pub cleanup_test_files: bool,
    pub tool: Tool,
    /// Record the device log and archive crash dumps.
    pub dump_debug_info: bool,
    /// Skip auxiliary data staging.
    /// 跳过辅助数据暂存。
    pub fast_and_loose: bool,
    pub build_type: String,
    pub in_webkit_checkout: bool,
    pub source_root: PathBuf,
    pub filter_dir: PathBuf,
    /// Application whose state is cleared before the run.
    pub app_package: String,
    pub strip_tool: Option<PathBuf>,
    pub debug_output_dir: PathBuf,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            gtest_filter: String::new(),
            test_arguments: String::new(),
            timeout: Duration::from_secs(60),
            cleanup_test_files: false,
            tool: Tool::None,
            dump_debug_info: false,
            fast_and_loose: false,
            build_type: "Debug".to_string(),
            in_webkit_checkout: false,
            source_root: PathBuf::from("."),
            filter_dir: PathBuf::from("build/android/gtest_filter"),
            app_package: DEFAULT_APP_PACKAGE.to_string(),
            strip_tool: None,
            debug_output_dir: PathBuf::from("out/debug_info_dumps"),
        }
    }
}

impl ControllerOptions {
    /// Builds the options for one configured suite.
    /// 为一个已配置的套件构建选项。
    pub fn from_config(config: &RunnerConfig, suite: &SuiteConfig) -> Result<Self> {
        Ok(Self {
            gtest_filter: suite.gtest_filter.clone(),
            test_arguments: suite.test_arguments.clone(),
            timeout: config.timeout_for(suite),
            cleanup_test_files: config.cleanup_test_files,
            tool: config.tool,
            dump_debug_info: config.dump_debug_info,
            fast_and_loose: config.fast_and_loose,
            build_type: config.build_type.clone(),
            in_webkit_checkout: config.in_webkit_checkout,
            source_root: config.source_root()?,
            filter_dir: config.filter_dir()?,
            app_package: config.app_package.clone(),
            strip_tool: config.strip_tool()?,
            debug_output_dir: config.debug_output_dir()?,
        })
    }
}

/// The external capabilities a controller drives.
/// 控制器驱动的外部能力。
#[derive(Clone)]
pub struct Collaborators {
    pub device: Arc<dyn DeviceControl>,
    pub registry: Arc<dyn DeviceRegistry>,
    pub test_server: Arc<dyn TestServerLauncher>,
}

/// Where a controller is in its lifecycle.
/// 控制器在其生命周期中的位置。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Constructed,
    /// SetUp returned an error; only TearDown is allowed.
    SetUpFailed,
    Ready,
    /// RunTests has been called. Running again requires a new controller.
    /// 已调用 RunTests。再次运行需要新的控制器。
    Ran,
    TornDown,
}

/// Transient state of one run, created by SetUp, consulted by RunTests and
/// consumed by TearDown. The flags record which SetUp steps were reached;
/// TearDown only undoes those.
///
/// 一次运行的临时状态，由 SetUp 创建、RunTests 查阅并由 TearDown 消耗。
/// 标志记录到达了哪些 SetUp 步骤；TearDown 只撤销这些步骤。
#[derive(Debug, Default)]
pub struct RunContext {
    pub device: String,
    /// Resolved by SetUp; RunTests builds the gtest filter from it.
    pub disabled_tests: Vec<String>,
    pub debug_capture: Option<DebugCapture>,
    /// Staging began, so some files may be on the device.
    pub files_pushed: bool,
    /// Launch was attempted; set before launching so a half-started server is shut down.
    pub test_server_started: bool,
    pub tool_environment_set_up: bool,
    /// The crash-file snapshot was taken and the log recorder started.
    /// 已获取崩溃文件快照并启动日志记录。
    pub log_recording_started: bool,
}

/// Drives one suite on one device.
/// 在一个设备上驱动一个套件。
pub struct TestLifecycleController {
    device_id: String,
    options: ControllerOptions,
    package: TestPackage,
    device: Arc<dyn DeviceControl>,
    registry: Arc<dyn DeviceRegistry>,
    test_server: Arc<dyn TestServerLauncher>,
    context: Option<RunContext>,
    state: LifecycleState,
}

impl TestLifecycleController {
    /// Creates a controller and fixes its execution strategy from the
    /// artifact kind. Device reachability is checked by SetUp, not here.
    ///
    /// 创建控制器，并根据产物类型确定其执行策略。设备可达性由 SetUp 检查，而非此处。
    pub fn new(
        device_id: impl Into<String>,
        artifact: ArtifactReference,
        options: ControllerOptions,
        collaborators: Collaborators,
    ) -> Result<Self> {
        let device_id = device_id.into();
        if device_id.trim().is_empty() {
            bail!("Device id must not be empty");
        }
        if options.timeout.is_zero() {
            bail!("Per-test timeout must be positive");
        }
        if collaborators.device.serial() != device_id {
            bail!(
                "Device handle is bound to '{}' but the controller was asked to drive '{}'",
                collaborators.device.serial(),
                device_id
            );
        }

        let symbols_dir = (artifact.kind() == ArtifactKind::NativeExecutable).then(|| {
            options
                .source_root
                .join("out")
                .join(&options.build_type)
                .join("lib.target")
        });
        let package = TestPackage::new(
            artifact,
            PackageOptions {
                timeout: options.timeout,
                cleanup_test_files: options.cleanup_test_files,
                tool: options.tool,
                symbols_dir,
                strip_tool: options.strip_tool.clone(),
            },
        );
        tracing::info!(suite = package.suite_basename(), device = %device_id, "controller created");

        Ok(Self {
            device_id,
            options,
            package,
            device: collaborators.device,
            registry: collaborators.registry,
            test_server: collaborators.test_server,
            context: None,
            state: LifecycleState::Constructed,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn package(&self) -> &TestPackage {
        &self.package
    }

    pub fn suite_basename(&self) -> &str {
        self.package.suite_basename()
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn context(&self) -> Option<&RunContext> {
        self.context.as_ref()
    }

    pub fn is_running_on_emulator(&self) -> bool {
        is_emulator(&self.device_id)
    }

    pub fn requires_mock_test_server(&self) -> bool {
        suites::requires_mock_test_server(self.suite_basename())
    }

    /// Data files and directories the suite needs, relative to the source root.
    /// 套件所需的数据文件和目录，相对于源码根目录。
    pub fn get_data_files_for_test_suite(&self) -> Vec<String> {
        suites::data_files_for_suite(self.suite_basename(), &self.options.source_root)
    }

    /// The disabled-test patterns for this suite: the base filter file, plus
    /// the emulator-only file when running on an emulator.
    ///
    /// 此套件的禁用测试模式：基础过滤文件，在模拟器上运行时再加上仅限模拟器的文件。
    pub fn get_disabled_tests(&self) -> Result<Vec<String>> {
        filters::disabled_tests_for(&self.options.filter_dir, self.suite_basename(), &self.device_id)
    }

    /// Prepares the device. Must be called once, before [`Self::run_tests`].
    /// On failure the controller must still be torn down.
    ///
    /// 准备设备。必须在 [`Self::run_tests`] 之前调用一次。失败时仍必须执行 TearDown。
    pub async fn set_up(&mut self) -> Result<()> {
        if self.state != LifecycleState::Constructed {
            bail!("SetUp called in state {:?}", self.state);
        }
        self.state = LifecycleState::SetUpFailed;

        let mut context = RunContext {
            device: self.device_id.clone(),
            debug_capture: self
                .options
                .dump_debug_info
                .then(|| DebugCapture::new(&self.options.debug_output_dir, self.suite_basename())),
            ..Default::default()
        };
        let result = self.set_up_steps(&mut context).await;
        self.context = Some(context);
        result?;

        self.state = LifecycleState::Ready;
        Ok(())
    }

    async fn set_up_steps(&self, context: &mut RunContext) -> Result<()> {
        let device = self.device.as_ref();
        println!(
            "{}",
            t!("setup.starting", name = self.suite_basename(), device = &self.device_id).blue()
        );

        context.disabled_tests = self.get_disabled_tests()?;

        device
            .clear_application_state(&self.options.app_package)
            .await
            .with_context(|| format!("Failed to clear state of {}", self.options.app_package))?;

        if let Some(capture) = context.debug_capture.as_mut() {
            capture.start_recording_log(device, true).await?;
            context.log_recording_started = true;
        }

        self.strip_and_copy_files(context).await?;
        self.launch_helper_tools_for_test_suite(context).await?;

        context.tool_environment_set_up = true;
        self.options
            .tool
            .setup_environment(device, &self.options.app_package)
            .await?;
        Ok(())
    }

    /// Pushes the artifact, its paks, the tool payload and the suite's data files.
    /// 推送产物、其 pak、工具载荷和套件的数据文件。
    async fn strip_and_copy_files(&self, context: &mut RunContext) -> Result<()> {
        let device = self.device.as_ref();
        context.files_pushed = true;

        self.package.strip_and_push(device).await?;
        self.package.push_data_and_pak_files(device).await?;
        self.options
            .tool
            .copy_files(device, &self.options.source_root)
            .await?;

        let test_data = self.get_data_files_for_test_suite();
        if !test_data.is_empty() && !self.options.fast_and_loose {
            device
                .wait_for_sd_card_ready(SD_CARD_READY_TIMEOUT)
                .await
                .context("External storage did not become ready")?;
            let external_storage = device
                .external_storage()
                .await
                .context("Failed to query external storage")?;
            println!(
                "{}",
                t!("setup.pushing_data", count = test_data.len(), device = &self.device_id).cyan()
            );
            for data in &test_data {
                let remote = format!("{external_storage}/{}", data.trim_end_matches('/'));
                device
                    .push_if_needed(&self.options.source_root.join(data), &remote)
                    .await
                    .with_context(|| format!("Failed to push test data {data}"))?;
            }
        }

        if self.suite_basename() == suites::WEBKIT_UNIT_TESTS {
            self.push_webkit_unit_tests_data().await?;
        }
        Ok(())
    }

    async fn push_webkit_unit_tests_data(&self) -> Result<()> {
        let device = self.device.as_ref();
        let source = suites::webkit_test_data_source(
            &self.options.source_root,
            self.options.in_webkit_checkout,
        );
        let external_storage = device
            .external_storage()
            .await
            .context("Failed to query external storage")?;
        device
            .push_if_needed(
                &source,
                &format!("{external_storage}/{}", suites::WEBKIT_TEST_DATA_DEVICE_PATH),
            )
            .await
            .with_context(|| format!("Failed to push WebKit test data from {}", source.display()))?;
        Ok(())
    }

    async fn launch_helper_tools_for_test_suite(&self, context: &mut RunContext) -> Result<()> {
        if !self.requires_mock_test_server() {
            return Ok(());
        }
        println!(
            "{}",
            t!("setup.launching_test_server", name = self.suite_basename()).cyan()
        );
        context.test_server_started = true;
        self.test_server
            .launch(self.device.as_ref())
            .await
            .context("Failed to launch the mock test server")
    }

    /// Runs the suite once and returns its results.
    ///
    /// A device that stops responding and is no longer attached produces a
    /// result set with one failure per requested test, marked as device-loss.
    /// A device that stops responding but is still attached is a fatal error,
    /// returned unchanged.
    ///
    /// 运行套件一次并返回其结果。
    ///
    /// 停止响应且不再连接的设备会产生一个结果集，每个请求的测试对应一个失败，并标记为设备丢失。
    /// 停止响应但仍连接的设备是致命错误，原样返回。
    pub async fn run_tests(&mut self) -> Result<TestResultSet> {
        match self.state {
            LifecycleState::Ready => {}
            LifecycleState::Ran => bail!("RunTests already called; set up a new controller to run again"),
            other => bail!("RunTests called in state {other:?}"),
        }
        self.state = LifecycleState::Ran;

        let disabled = self
            .context
            .as_ref()
            .map(|c| c.disabled_tests.as_slice())
            .unwrap_or_default();
        let gtest_filter = build_gtest_filter(&self.options.gtest_filter, disabled);

        let device = self.device.as_ref();
        let attempt = async {
            self.package
                .create_test_runner_script(device, &gtest_filter, &self.options.test_arguments)
                .await?;
            self.package.run_tests_and_list_results(device).await
        }
        .await;

        let error = match attempt {
            Ok(results) => return Ok(results),
            Err(error) => error,
        };
        let unresponsive = error
            .downcast_ref::<DeviceError>()
            .is_some_and(DeviceError::is_unresponsive);
        if !unresponsive || self.registry.is_attached(&self.device_id).await {
            return Err(error);
        }

        tracing::warn!(device = %self.device_id, error = %error, "device lost during test run");
        println!(
            "{}",
            t!("run.device_lost", device = &self.device_id, name = self.suite_basename()).yellow()
        );
        Ok(TestResultSet::from_device_loss(
            selected_test_names(&self.options.gtest_filter),
            &self.device_id,
        ))
    }

    /// Releases everything SetUp acquired. Each step is independent and
    /// best-effort; failures are logged and never stop later steps. Calling
    /// this more than once is a no-op.
    ///
    /// 释放 SetUp 获取的所有资源。每个步骤相互独立且尽力而为；失败会被记录，
    /// 且不会阻止后续步骤。多次调用是无操作的。
    pub async fn tear_down(&mut self) {
        if self.state == LifecycleState::TornDown {
            return;
        }
        let device = self.device.as_ref();
        let mut context = self.context.take();
        let reached = |step: fn(&RunContext) -> bool| context.as_ref().is_some_and(step);

        if reached(|c| c.tool_environment_set_up) {
            if let Err(e) = self
                .options
                .tool
                .cleanup_environment(device, &self.options.app_package)
                .await
            {
                tracing::warn!(error = %format!("{e:#}"), "tool environment cleanup failed");
            }
        }

        if self.package.cleanup_test_files() && reached(|c| c.files_pushed) {
            if let Err(e) = device.remove_pushed_files().await {
                tracing::warn!(error = %e, "failed to remove pushed files");
            }
        }

        // Without the snapshot every existing tombstone would look new.
        let capture = context
            .as_mut()
            .filter(|c| c.log_recording_started)
            .and_then(|c| c.debug_capture.as_mut());
        if let Some(capture) = capture {
            if let Err(e) = capture.stop_recording_log(device).await {
                tracing::warn!(error = %format!("{e:#}"), "failed to stop log recording");
            }
            match capture.archive_new_crash_files(device).await {
                Ok(archived) if !archived.is_empty() => println!(
                    "{}",
                    t!("teardown.archived_crashes", count = archived.len(), path = capture.dump_dir().display())
                        .yellow()
                ),
                Ok(_) => {}
                Err(e) => tracing::warn!(error = %format!("{e:#}"), "failed to archive crash files"),
            }
        }

        if context.as_ref().is_some_and(|c| c.test_server_started) {
            if let Err(e) = self.test_server.shut_down(device).await {
                tracing::warn!(error = %format!("{e:#}"), "failed to shut down the mock test server");
            }
        }

        self.state = LifecycleState::TornDown;
    }

    /// Convenience wrapper running the whole lifecycle; TearDown always runs.
    /// 运行整个生命周期的便捷包装；TearDown 总会执行。
    pub async fn execute(&mut self) -> Result<TestResultSet> {
        let outcome = match self.set_up().await {
            Ok(()) => self.run_tests().await,
            Err(e) => Err(e),
        };
        self.tear_down().await;
        outcome
    }
}
