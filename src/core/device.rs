//! # Device Capabilities Module / 设备能力模块
//!
//! The seams between the lifecycle controller and the outside world. The
//! controller only ever talks to a device, the host's device list and the
//! mock test server through these traits, so every branch of the lifecycle
//! can be exercised without real hardware.
//!
//! 生命周期控制器与外部世界之间的接缝。控制器只通过这些 trait 与设备、
//! 主机设备列表和模拟测试服务器交互，因此无需真实硬件即可覆盖生命周期的每个分支。

use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

/// Errors raised by device operations.
/// 设备操作引发的错误。
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    /// The device stopped answering. Whether it is still attached decides
    /// between a fatal run failure and a device-loss result.
    ///
    /// 设备停止响应。设备是否仍然连接决定了是致命的运行失败还是设备丢失结果。
    #[error("device {device} is unresponsive: {detail}")]
    Unresponsive { device: String, detail: String },

    /// A device command ran but reported failure.
    /// 设备命令已运行但报告失败。
    #[error("device command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    /// Local I/O failed while preparing or collecting device files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DeviceError {
    pub fn is_unresponsive(&self) -> bool {
        matches!(self, DeviceError::Unresponsive { .. })
    }
}

/// Output of a streamed shell command.
/// 流式 shell 命令的输出。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellOutput {
    /// Every line received before the command exited or went silent.
    pub lines: Vec<String>,
    /// `true` when the stream was cut because no line arrived within the
    /// per-line timeout.
    /// 当在每行超时时间内没有收到任何行而截断流时为 `true`。
    pub timed_out: bool,
}

/// Control over a single attached device.
/// 对单个已连接设备的控制。
#[async_trait]
pub trait DeviceControl: Send + Sync {
    /// The serial this handle is bound to.
    fn serial(&self) -> &str;

    /// Clears the on-device data of an application package.
    async fn clear_application_state(&self, package: &str) -> Result<(), DeviceError>;

    /// Pushes a local file or directory to `remote` unless an identical copy
    /// is already there. Every pushed path is remembered for
    /// [`DeviceControl::remove_pushed_files`].
    ///
    /// 将本地文件或目录推送到 `remote`，除非那里已有相同副本。
    /// 每个推送的路径都会被记录下来，供 [`DeviceControl::remove_pushed_files`] 使用。
    async fn push_if_needed(&self, local: &Path, remote: &str) -> Result<(), DeviceError>;

    /// Pushes unconditionally, overwriting whatever is at `remote`. The path
    /// is remembered like [`DeviceControl::push_if_needed`] does.
    async fn push(&self, local: &Path, remote: &str) -> Result<(), DeviceError>;

    /// Removes everything previously pushed through this handle.
    async fn remove_pushed_files(&self) -> Result<(), DeviceError>;

    /// The external storage mount point, e.g. `/sdcard`.
    async fn external_storage(&self) -> Result<String, DeviceError>;

    /// Waits until external storage is mounted and writable.
    async fn wait_for_sd_card_ready(&self, timeout: Duration) -> Result<(), DeviceError>;

    /// Installs (or reinstalls) an APK.
    async fn install_package(&self, apk: &Path) -> Result<(), DeviceError>;

    /// Runs a shell command to completion and returns its output.
    async fn run_shell_command(&self, command: &str) -> Result<String, DeviceError>;

    /// Runs a shell command, collecting its output line by line. The command
    /// is cut off when no line arrives within `line_timeout`.
    ///
    /// 运行 shell 命令并逐行收集其输出。若在 `line_timeout` 内没有收到任何行，则中断该命令。
    async fn stream_shell_command(
        &self,
        command: &str,
        line_timeout: Duration,
    ) -> Result<ShellOutput, DeviceError>;

    /// Starts recording the device log into `destination`.
    async fn start_log_recording(&self, destination: &Path, clear: bool)
    -> Result<(), DeviceError>;

    /// Stops a recording started by [`DeviceControl::start_log_recording`].
    /// Stopping when nothing is recording is not an error.
    async fn stop_log_recording(&self) -> Result<(), DeviceError>;

    /// Copies a device file to the host.
    async fn pull(&self, remote: &str, local: &Path) -> Result<(), DeviceError>;

    /// Makes a host TCP port reachable from the device.
    async fn reverse_port(&self, port: u16) -> Result<(), DeviceError>;

    /// Undoes [`DeviceControl::reverse_port`].
    async fn remove_reverse_port(&self, port: u16) -> Result<(), DeviceError>;
}

/// The host's view of which devices are attached.
/// 主机对已连接设备的视图。
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    async fn attached_devices(&self) -> Result<Vec<String>, DeviceError>;

    /// Whether `serial` currently shows up as attached. A registry that
    /// cannot be queried reports the device as detached.
    ///
    /// `serial` 当前是否显示为已连接。无法查询的注册表会将设备报告为未连接。
    async fn is_attached(&self, serial: &str) -> bool {
        match self.attached_devices().await {
            Ok(devices) => devices.iter().any(|d| d == serial),
            Err(e) => {
                tracing::warn!(error = %e, "failed to list attached devices");
                false
            }
        }
    }
}

/// Launches the host-side mock network test server some suites depend on.
/// 启动某些套件所依赖的主机端模拟网络测试服务器。
#[async_trait]
pub trait TestServerLauncher: Send + Sync {
    async fn launch(&self, device: &dyn DeviceControl) -> anyhow::Result<()>;

    /// Stops the server. Calling this when nothing was launched is a no-op.
    async fn shut_down(&self, device: &dyn DeviceControl) -> anyhow::Result<()>;
}

/// Whether a serial names an emulator-class device.
/// 序列号是否指向模拟器类设备。
pub fn is_emulator(serial: &str) -> bool {
    serial.starts_with("emulator")
}
