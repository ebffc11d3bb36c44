//! # Test Package Module / 测试包模块
//!
//! The two ways a gtest suite can be deployed and driven on a device: as a
//! native executable launched from a shell script, or as an APK whose
//! activity writes the gtest output into a FIFO. The variant is chosen once,
//! from the artifact kind, and stays fixed.
//!
//! gtest 套件在设备上部署和驱动的两种方式：作为从 shell 脚本启动的原生可执行文件，
//! 或作为其 activity 将 gtest 输出写入 FIFO 的 APK。变体根据产物类型一次性选定，之后保持不变。

use anyhow::{Context, Result, bail};
use colored::*;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::device::DeviceControl;
use crate::core::gtest::parse_gtest_output;
use crate::core::models::{ArtifactKind, ArtifactReference, TestResultSet};
use crate::core::suites;
use crate::core::tools::Tool;
use crate::infra::{command, fs, t};

/// Device directory for executables and their runner script.
pub const DEVICE_TMP_DIR: &str = "/data/local/tmp";
pub const TEST_RUNNER_SCRIPT: &str = "/data/local/tmp/chrome_test_runner.sh";
pub const APK_COMMAND_LINE_FILE: &str = "/data/local/tmp/chrome-native-tests-command-line";
pub const APK_PACKAGE: &str = "org.chromium.native_test";
pub const APK_ACTIVITY: &str = "org.chromium.native_test.ChromeNativeTestActivity";
pub const APK_FIFO: &str = "/data/data/org.chromium.native_test/files/test.fifo";

/// Settings shared by both package variants.
/// 两种包变体共享的设置。
#[derive(Debug, Clone)]
pub struct PackageOptions {
    /// Per-test timeout, before the tool's scale factor.
    pub timeout: Duration,
    pub cleanup_test_files: bool,
    pub tool: Tool,
    /// Host directory receiving an unstripped copy of the executable.
    /// 接收可执行文件未剥离副本的主机目录。
    pub symbols_dir: Option<PathBuf>,
    pub strip_tool: Option<PathBuf>,
}

/// A deployable gtest suite.
/// 可部署的 gtest 套件。
#[derive(Debug, Clone)]
pub enum TestPackage {
    Executable(PackageCommon),
    Apk(PackageCommon),
}

/// State common to both variants.
#[derive(Debug, Clone)]
pub struct PackageCommon {
    artifact: ArtifactReference,
    basename: String,
    options: PackageOptions,
}

impl TestPackage {
    /// Selects the variant from the artifact kind.
    /// 根据产物类型选择变体。
    pub fn new(artifact: ArtifactReference, options: PackageOptions) -> Self {
        let basename = artifact.suite_basename();
        let kind = artifact.kind();
        let common = PackageCommon {
            artifact,
            basename,
            options,
        };
        match kind {
            ArtifactKind::NativeExecutable => TestPackage::Executable(common),
            ArtifactKind::PackagedApp => TestPackage::Apk(common),
        }
    }

    fn common(&self) -> &PackageCommon {
        match self {
            TestPackage::Executable(common) | TestPackage::Apk(common) => common,
        }
    }

    pub fn kind(&self) -> ArtifactKind {
        match self {
            TestPackage::Executable(_) => ArtifactKind::NativeExecutable,
            TestPackage::Apk(_) => ArtifactKind::PackagedApp,
        }
    }

    pub fn suite_basename(&self) -> &str {
        &self.common().basename
    }

    pub fn cleanup_test_files(&self) -> bool {
        self.common().options.cleanup_test_files
    }

    /// The timeout applied to each silent period of the test output.
    /// 应用于测试输出每段静默期的超时。
    pub fn line_timeout(&self) -> Duration {
        let options = &self.common().options;
        options.timeout * options.tool.timeout_scale()
    }

    /// Device path of the executable for the native variant.
    pub fn device_executable_path(&self) -> String {
        format!("{DEVICE_TMP_DIR}/{}", self.suite_basename())
    }

    /// Strips (when a strip tool is configured) and pushes the executable,
    /// or installs the APK.
    ///
    /// 剥离（配置了 strip 工具时）并推送可执行文件，或安装 APK。
    pub async fn strip_and_push(&self, device: &dyn DeviceControl) -> Result<()> {
        let common = self.common();
        let artifact = common.artifact.path();
        match self {
            TestPackage::Executable(_) => {
                if let Some(symbols_dir) = &common.options.symbols_dir {
                    keep_symbols_copy(artifact, symbols_dir, &common.basename);
                }

                let staging = tempfile::tempdir().context("Failed to create staging directory")?;
                let to_push = match &common.options.strip_tool {
                    Some(strip_tool) => {
                        let stripped = staging.path().join(&common.basename);
                        strip_executable(strip_tool, artifact, &stripped).await?;
                        stripped
                    }
                    None => artifact.to_path_buf(),
                };
                device
                    .push_if_needed(&to_push, &self.device_executable_path())
                    .await
                    .with_context(|| format!("Failed to push {}", artifact.display()))?;
            }
            TestPackage::Apk(_) => {
                device
                    .install_package(artifact)
                    .await
                    .with_context(|| format!("Failed to install {}", artifact.display()))?;
            }
        }
        Ok(())
    }

    /// Pushes the resource paks the suite needs.
    /// 推送套件所需的资源 pak。
    pub async fn push_data_and_pak_files(&self, device: &dyn DeviceControl) -> Result<()> {
        let requirements = suites::requirements_for(self.suite_basename());
        if requirements.pak_files.is_empty() && requirements.pak_dirs.is_empty() {
            return Ok(());
        }
        let suite_dir = self.common().artifact.suite_dirname();
        let device_root = match self {
            TestPackage::Executable(_) => device
                .external_storage()
                .await
                .context("Failed to query external storage")?,
            TestPackage::Apk(_) => DEVICE_TMP_DIR.to_string(),
        };

        for (local, remote) in requirements.pak_files {
            device
                .push_if_needed(&suite_dir.join(local), &format!("{device_root}/paks/{remote}"))
                .await
                .with_context(|| format!("Failed to push pak file {local}"))?;
        }
        for (local, remote) in requirements.pak_dirs {
            device
                .push_if_needed(&suite_dir.join(local), &format!("{device_root}/{remote}"))
                .await
                .with_context(|| format!("Failed to push {local}"))?;
        }
        Ok(())
    }

    /// Renders the on-device invocation for a gtest filter and extra
    /// arguments: a shell script for executables, a command-line file for
    /// APKs.
    ///
    /// 为 gtest 过滤器和额外参数渲染设备端调用：可执行文件为 shell 脚本，APK 为命令行文件。
    pub fn render_invocation(&self, gtest_filter: &str, test_arguments: &str) -> Result<String> {
        let mut args = vec![format!("--gtest_filter={gtest_filter}")];
        if !test_arguments.trim().is_empty() {
            let extra = shlex::split(test_arguments)
                .ok_or_else(|| anyhow::anyhow!("Failed to parse test arguments: {test_arguments}"))?;
            args.extend(extra);
        }
        let args = quote_all(&args)?;

        match self {
            TestPackage::Executable(common) => {
                let wrapper = common
                    .options
                    .tool
                    .wrapper()
                    .map(|w| format!("{w} "))
                    .unwrap_or_default();
                Ok(format!(
                    "#!/system/bin/sh\ncd {DEVICE_TMP_DIR}\n{wrapper}{} {args}\n",
                    self.device_executable_path()
                ))
            }
            TestPackage::Apk(common) => Ok(format!("{} {args}\n", common.basename)),
        }
    }

    /// Writes the invocation locally and pushes it to the device.
    /// Device errors are returned unchanged so callers can inspect them.
    ///
    /// 在本地写入调用内容并推送到设备。设备错误原样返回，以便调用方检查。
    pub async fn create_test_runner_script(
        &self,
        device: &dyn DeviceControl,
        gtest_filter: &str,
        test_arguments: &str,
    ) -> Result<()> {
        let content = self.render_invocation(gtest_filter, test_arguments)?;
        let mut local = tempfile::NamedTempFile::new().context("Failed to create runner script")?;
        local
            .write_all(content.as_bytes())
            .context("Failed to write runner script")?;
        local.flush()?;

        let remote = match self {
            TestPackage::Executable(_) => TEST_RUNNER_SCRIPT,
            TestPackage::Apk(_) => APK_COMMAND_LINE_FILE,
        };
        device.push(local.path(), remote).await?;
        Ok(())
    }

    /// Runs the suite and parses its output into per-test records.
    /// Device errors are returned unchanged.
    ///
    /// 运行套件并将其输出解析为每个测试的记录。设备错误原样返回。
    pub async fn run_tests_and_list_results(&self, device: &dyn DeviceControl) -> Result<TestResultSet> {
        println!(
            "{}",
            t!("run.running_suite", name = self.suite_basename(), device = device.serial()).blue()
        );
        let line_timeout = self.line_timeout();
        let output = match self {
            TestPackage::Executable(_) => {
                device
                    .stream_shell_command(&format!("sh {TEST_RUNNER_SCRIPT}"), line_timeout)
                    .await?
            }
            TestPackage::Apk(_) => {
                device.run_shell_command(&format!("rm -f {APK_FIFO}")).await?;
                device
                    .run_shell_command(&format!(
                        "am start -W -S -a android.intent.action.MAIN -n {APK_PACKAGE}/{APK_ACTIVITY}"
                    ))
                    .await?;
                wait_for_fifo(device).await?;
                device
                    .stream_shell_command(&format!("cat {APK_FIFO}"), line_timeout)
                    .await?
            }
        };

        if output.timed_out {
            println!(
                "{}",
                t!("run.suite_timed_out", name = self.suite_basename(), timeout = line_timeout.as_secs())
                    .red()
            );
        }
        Ok(TestResultSet::new(parse_gtest_output(
            &output.lines,
            output.timed_out,
        )))
    }
}

/// Polls for the APK's output FIFO with a growing back-off. A FIFO that never
/// shows up means the device stopped doing work for us.
async fn wait_for_fifo(device: &dyn DeviceControl) -> Result<()> {
    for attempt in 0..10u64 {
        let probe = device
            .run_shell_command(&format!("[ -p {APK_FIFO} ] && echo present"))
            .await?;
        if probe.contains("present") {
            return Ok(());
        }
        tokio::time::sleep(Duration::from_secs(attempt)).await;
    }
    Err(crate::core::device::DeviceError::Unresponsive {
        device: device.serial().to_string(),
        detail: format!("Unable to find fifo on device {APK_FIFO}"),
    }
    .into())
}

fn quote_all(args: &[String]) -> Result<String> {
    let quoted: Vec<String> = args
        .iter()
        .map(|arg| {
            shlex::try_quote(arg)
                .map(|q| q.into_owned())
                .map_err(|e| anyhow::anyhow!("Cannot quote argument {arg:?}: {e}"))
        })
        .collect::<Result<_>>()?;
    Ok(quoted.join(" "))
}

/// Copies the unstripped executable next to the other build symbols so crash
/// stacks can be symbolized later. Failure only costs symbolization.
fn keep_symbols_copy(artifact: &Path, symbols_dir: &Path, basename: &str) {
    if let Err(e) = fs::copy_file_into(artifact, symbols_dir, basename) {
        tracing::warn!(
            artifact = %artifact.display(),
            error = %format!("{e:#}"),
            "failed to keep an unstripped copy for symbolization"
        );
    }
}

async fn strip_executable(strip_tool: &Path, input: &Path, output: &Path) -> Result<()> {
    let mut cmd = tokio::process::Command::new(strip_tool);
    cmd.arg("--strip-unneeded")
        .arg(input)
        .arg("-o")
        .arg(output)
        .kill_on_drop(true);

    let (status, captured) = command::spawn_and_capture(cmd).await;
    let status = status.with_context(|| format!("Failed to run {}", strip_tool.display()))?;
    if !status.success() {
        bail!(
            "Stripping {} failed with {status}:\n{}",
            input.display(),
            captured.trim()
        );
    }
    Ok(())
}
