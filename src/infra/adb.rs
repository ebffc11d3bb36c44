//! # ADB Device Module / ADB 设备模块
//!
//! [`DeviceControl`] and [`DeviceRegistry`] backed by the `adb` program.
//!
//! 由 `adb` 程序支持的 [`DeviceControl`] 和 [`DeviceRegistry`]。

use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tokio::process::{Child, Command};

use crate::core::device::{DeviceControl, DeviceError, DeviceRegistry, ShellOutput};
use crate::infra::command;

/// Default ceiling on a single non-streaming adb call.
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(120);

const DEFAULT_EXTERNAL_STORAGE: &str = "/sdcard";

/// A device reached through `adb -s <serial>`.
/// 通过 `adb -s <serial>` 访问的设备。
pub struct AdbDevice {
    serial: String,
    adb: PathBuf,
    command_timeout: Duration,
    pushed_files: Mutex<Vec<String>>,
    log_recorder: tokio::sync::Mutex<Option<Child>>,
}

impl AdbDevice {
    pub fn new(serial: impl Into<String>) -> Self {
        Self::with_adb(serial, "adb")
    }

    /// Uses a specific `adb` binary.
    pub fn with_adb(serial: impl Into<String>, adb: impl Into<PathBuf>) -> Self {
        Self {
            serial: serial.into(),
            adb: adb.into(),
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
            pushed_files: Mutex::new(Vec::new()),
            log_recorder: tokio::sync::Mutex::new(None),
        }
    }

    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    fn base_command(&self) -> Command {
        let mut cmd = Command::new(&self.adb);
        cmd.arg("-s").arg(&self.serial).kill_on_drop(true);
        cmd
    }

    /// Runs `adb -s <serial> <args>` to completion and reports whether it
    /// exited successfully. A call that outlives the command timeout, or
    /// output saying the device is gone, means the device stopped answering.
    ///
    /// 运行 `adb -s <serial> <args>` 直至完成，并报告其是否成功退出。
    /// 超出命令超时的调用或表明设备已消失的输出，意味着设备停止响应。
    async fn run<I, S>(&self, args: I) -> Result<(bool, String), DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut cmd = self.base_command();
        cmd.args(args);
        let description = format!("{:?}", cmd.as_std());
        tracing::debug!(command = %description, "adb");

        let (status, output) = tokio::time::timeout(self.command_timeout, command::spawn_and_capture(cmd))
            .await
            .map_err(|_| DeviceError::Unresponsive {
                device: self.serial.clone(),
                detail: format!("no answer within {}s to {description}", self.command_timeout.as_secs()),
            })?;
        let status = status?;
        if mentions_lost_device(&output) {
            return Err(classify_failure(&self.serial, &description, &output));
        }
        if !status.success() {
            tracing::debug!(command = %description, %status, "adb exited unsuccessfully");
        }
        Ok((status.success(), output))
    }

    /// Like [`Self::run`], but an unsuccessful exit is an error.
    async fn adb<I, S>(&self, args: I) -> Result<String, DeviceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let args: Vec<S> = args.into_iter().collect();
        let description = args
            .iter()
            .map(|a| a.as_ref().to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ");
        match self.run(args).await? {
            (true, output) => Ok(output),
            (false, output) => Err(classify_failure(&self.serial, &format!("adb {description}"), &output)),
        }
    }

    /// Runs a device shell command. The device shell's exit code is not
    /// reliable across releases, so only the output is returned.
    ///
    /// 运行设备 shell 命令。设备 shell 的退出码在各版本间不可靠，因此只返回输出。
    async fn shell(&self, command: &str) -> Result<String, DeviceError> {
        let (_, output) = self.run(["shell", command]).await?;
        Ok(output)
    }

    fn remember_pushed(&self, remote: &str) {
        let mut pushed = self.pushed_files.lock().unwrap_or_else(|e| e.into_inner());
        if !pushed.iter().any(|p| p == remote) {
            pushed.push(remote.to_string());
        }
    }

    async fn remote_size(&self, remote: &str) -> Option<u64> {
        let output = self
            .shell(&format!("stat -c %s {}", quote(remote)))
            .await
            .ok()?;
        output.trim().parse().ok()
    }
}

#[async_trait]
impl DeviceControl for AdbDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    async fn clear_application_state(&self, package: &str) -> Result<(), DeviceError> {
        self.shell(&format!("pm clear {}", quote(package))).await?;
        Ok(())
    }

    async fn push_if_needed(&self, local: &Path, remote: &str) -> Result<(), DeviceError> {
        let metadata = std::fs::metadata(local)?;
        if metadata.is_file() && self.remote_size(remote).await == Some(metadata.len()) {
            tracing::debug!(remote, "already on device, skipping push");
            self.remember_pushed(remote);
            return Ok(());
        }
        self.push(local, remote).await
    }

    async fn push(&self, local: &Path, remote: &str) -> Result<(), DeviceError> {
        if let Some(parent) = Path::new(remote).parent().and_then(Path::to_str) {
            if !parent.is_empty() {
                self.shell(&format!("mkdir -p {}", quote(parent))).await?;
            }
        }
        self.adb([OsStr::new("push"), local.as_os_str(), OsStr::new(remote)])
            .await?;
        self.remember_pushed(remote);
        Ok(())
    }

    async fn remove_pushed_files(&self) -> Result<(), DeviceError> {
        let pushed = std::mem::take(&mut *self.pushed_files.lock().unwrap_or_else(|e| e.into_inner()));
        let mut first_error = None;
        for remote in pushed.iter().rev() {
            if let Err(e) = self.shell(&format!("rm -rf {}", quote(remote))).await {
                tracing::warn!(remote = %remote, error = %e, "failed to remove pushed file");
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    async fn external_storage(&self) -> Result<String, DeviceError> {
        let output = self.shell("echo $EXTERNAL_STORAGE").await?;
        let path = output.trim();
        Ok(if path.is_empty() {
            DEFAULT_EXTERNAL_STORAGE.to_string()
        } else {
            path.to_string()
        })
    }

    async fn wait_for_sd_card_ready(&self, timeout: Duration) -> Result<(), DeviceError> {
        let external_storage = self.external_storage().await?;
        let deadline = Instant::now() + timeout;
        loop {
            let probe = self
                .shell(&format!("test -d {} && echo ready", quote(&external_storage)))
                .await?;
            if probe.contains("ready") {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(DeviceError::CommandFailed {
                    command: "wait for external storage".to_string(),
                    detail: format!("{external_storage} not ready after {}s", timeout.as_secs()),
                });
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }

    async fn install_package(&self, apk: &Path) -> Result<(), DeviceError> {
        let output = self.adb([OsStr::new("install"), OsStr::new("-r"), apk.as_os_str()]).await?;
        if output.contains("Success") {
            Ok(())
        } else {
            Err(DeviceError::CommandFailed {
                command: format!("install {}", apk.display()),
                detail: output.trim().to_string(),
            })
        }
    }

    async fn run_shell_command(&self, command: &str) -> Result<String, DeviceError> {
        self.shell(command).await
    }

    async fn stream_shell_command(
        &self,
        command: &str,
        line_timeout: Duration,
    ) -> Result<ShellOutput, DeviceError> {
        let mut cmd = self.base_command();
        cmd.arg("shell").arg(command);
        let streamed = command::stream_lines(cmd, line_timeout).await?;

        let failed = streamed.status.is_some_and(|s| !s.success());
        if failed && streamed.lines.iter().any(|l| mentions_lost_device(l)) {
            return Err(DeviceError::Unresponsive {
                device: self.serial.clone(),
                detail: streamed.lines.join("\n"),
            });
        }
        Ok(ShellOutput {
            lines: streamed.lines,
            timed_out: streamed.timed_out,
        })
    }

    async fn start_log_recording(&self, destination: &Path, clear: bool) -> Result<(), DeviceError> {
        self.stop_log_recording().await?;
        if clear {
            self.adb(["logcat", "-c"]).await?;
        }
        let file = std::fs::File::create(destination)?;
        let mut cmd = self.base_command();
        cmd.args(["logcat", "-v", "threadtime"])
            .stdout(Stdio::from(file))
            .stderr(Stdio::null());
        let child = cmd.spawn()?;
        *self.log_recorder.lock().await = Some(child);
        Ok(())
    }

    async fn stop_log_recording(&self) -> Result<(), DeviceError> {
        let Some(mut child) = self.log_recorder.lock().await.take() else {
            return Ok(());
        };
        child.start_kill()?;
        child.wait().await?;
        Ok(())
    }

    async fn pull(&self, remote: &str, local: &Path) -> Result<(), DeviceError> {
        self.adb([OsStr::new("pull"), OsStr::new(remote), local.as_os_str()]).await?;
        Ok(())
    }

    async fn reverse_port(&self, port: u16) -> Result<(), DeviceError> {
        let spec = format!("tcp:{port}");
        self.adb(["reverse", spec.as_str(), spec.as_str()]).await?;
        Ok(())
    }

    async fn remove_reverse_port(&self, port: u16) -> Result<(), DeviceError> {
        let spec = format!("tcp:{port}");
        self.adb(["reverse", "--remove", spec.as_str()]).await?;
        Ok(())
    }
}

/// The host's device list, read from `adb devices`.
/// 从 `adb devices` 读取的主机设备列表。
pub struct AdbRegistry {
    adb: PathBuf,
}

impl AdbRegistry {
    pub fn new() -> Self {
        Self::with_adb("adb")
    }

    pub fn with_adb(adb: impl Into<PathBuf>) -> Self {
        Self { adb: adb.into() }
    }
}

impl Default for AdbRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRegistry for AdbRegistry {
    async fn attached_devices(&self) -> Result<Vec<String>, DeviceError> {
        let mut cmd = Command::new(&self.adb);
        cmd.arg("devices").kill_on_drop(true);
        let (status, output) = command::spawn_and_capture(cmd).await;
        if !status?.success() {
            return Err(DeviceError::CommandFailed {
                command: "adb devices".to_string(),
                detail: output.trim().to_string(),
            });
        }
        Ok(parse_device_list(&output))
    }
}

/// Parses `adb devices` output into the serials in the `device` state.
/// Offline and unauthorized devices are not usable and are left out.
///
/// 将 `adb devices` 输出解析为处于 `device` 状态的序列号。离线和未授权的设备不可用，会被排除。
pub fn parse_device_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.starts_with("List of devices") && !line.starts_with('*'))
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some(serial), Some("device")) => Some(serial.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Turns a failed adb call into a [`DeviceError`]. Output saying the device
/// vanished or went offline makes it [`DeviceError::Unresponsive`].
///
/// 将失败的 adb 调用转换为 [`DeviceError`]。表明设备消失或离线的输出会使其成为 [`DeviceError::Unresponsive`]。
pub fn classify_failure(serial: &str, command: &str, output: &str) -> DeviceError {
    if mentions_lost_device(output) {
        DeviceError::Unresponsive {
            device: serial.to_string(),
            detail: output.trim().to_string(),
        }
    } else {
        DeviceError::CommandFailed {
            command: command.to_string(),
            detail: output.trim().to_string(),
        }
    }
}

fn mentions_lost_device(output: &str) -> bool {
    let lower = output.to_ascii_lowercase();
    (lower.contains("error: device") && (lower.contains("not found") || lower.contains("offline")))
        || lower.contains("no devices/emulators found")
}

fn quote(arg: &str) -> String {
    shlex::try_quote(arg)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| arg.to_string())
}
