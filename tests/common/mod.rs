// Shared test helpers for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use device_test_runner::core::controller::{Collaborators, ControllerOptions, TestLifecycleController};
use device_test_runner::core::device::{
    DeviceControl, DeviceError, DeviceRegistry, ShellOutput, TestServerLauncher,
};
use device_test_runner::core::models::ArtifactReference;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::{TempDir, tempdir};

pub const EXTERNAL_STORAGE: &str = "/sdcard";

/// A scripted device that records every call made through it.
#[derive(Default)]
pub struct MockDevice {
    pub serial: String,
    /// Output of the streamed test run.
    pub run_output: Vec<String>,
    pub run_timed_out: bool,
    /// The streamed test run fails with `DeviceError::Unresponsive`.
    pub unresponsive_during_run: bool,
    /// Pushing the runner script fails with `DeviceError::CommandFailed`.
    pub fail_script_push: bool,
    pub fail_push_if_needed: bool,
    pub fail_clear_state: bool,
    pub fail_remove_pushed_files: bool,
    pub fail_stop_log: bool,
    pub calls: Mutex<Vec<String>>,
    /// Contents of every file pushed with `push`, keyed by remote path.
    pub pushed_contents: Mutex<HashMap<String, String>>,
    /// Files reported by `ls /data/tombstones`.
    pub tombstones: Mutex<Vec<String>>,
}

impl MockDevice {
    pub fn new(serial: &str) -> Self {
        Self {
            serial: serial.to_string(),
            ..Default::default()
        }
    }

    pub fn with_output(mut self, lines: &[&str]) -> Self {
        self.run_output = lines.iter().map(|l| l.to_string()).collect();
        self
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with(prefix))
            .collect()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn pushed(&self, remote: &str) -> Option<String> {
        self.pushed_contents.lock().unwrap().get(remote).cloned()
    }

    fn unresponsive(&self, detail: &str) -> DeviceError {
        DeviceError::Unresponsive {
            device: self.serial.clone(),
            detail: detail.to_string(),
        }
    }

    fn failed(command: &str) -> DeviceError {
        DeviceError::CommandFailed {
            command: command.to_string(),
            detail: "scripted failure".to_string(),
        }
    }
}

#[async_trait]
impl DeviceControl for MockDevice {
    fn serial(&self) -> &str {
        &self.serial
    }

    async fn clear_application_state(&self, package: &str) -> Result<(), DeviceError> {
        self.record(format!("clear:{package}"));
        if self.fail_clear_state {
            return Err(Self::failed("pm clear"));
        }
        Ok(())
    }

    async fn push_if_needed(&self, _local: &Path, remote: &str) -> Result<(), DeviceError> {
        self.record(format!("push_if_needed:{remote}"));
        if self.fail_push_if_needed {
            return Err(Self::failed("push"));
        }
        Ok(())
    }

    async fn push(&self, local: &Path, remote: &str) -> Result<(), DeviceError> {
        self.record(format!("push:{remote}"));
        if self.fail_script_push {
            return Err(Self::failed("push"));
        }
        let content = fs::read_to_string(local).unwrap_or_default();
        self.pushed_contents
            .lock()
            .unwrap()
            .insert(remote.to_string(), content);
        Ok(())
    }

    async fn remove_pushed_files(&self) -> Result<(), DeviceError> {
        self.record("remove_pushed_files");
        if self.fail_remove_pushed_files {
            return Err(Self::failed("rm"));
        }
        Ok(())
    }

    async fn external_storage(&self) -> Result<String, DeviceError> {
        Ok(EXTERNAL_STORAGE.to_string())
    }

    async fn wait_for_sd_card_ready(&self, _timeout: Duration) -> Result<(), DeviceError> {
        self.record("wait_for_sd_card_ready");
        Ok(())
    }

    async fn install_package(&self, apk: &Path) -> Result<(), DeviceError> {
        self.record(format!("install:{}", apk.display()));
        Ok(())
    }

    async fn run_shell_command(&self, command: &str) -> Result<String, DeviceError> {
        self.record(format!("shell:{command}"));
        if command.starts_with("ls /data/tombstones") {
            return Ok(self.tombstones.lock().unwrap().join("\n"));
        }
        if command.starts_with("[ -p ") {
            return Ok("present\n".to_string());
        }
        Ok(String::new())
    }

    async fn stream_shell_command(
        &self,
        command: &str,
        _line_timeout: Duration,
    ) -> Result<ShellOutput, DeviceError> {
        self.record(format!("stream:{command}"));
        if self.unresponsive_during_run {
            return Err(self.unresponsive("stopped answering"));
        }
        Ok(ShellOutput {
            lines: self.run_output.clone(),
            timed_out: self.run_timed_out,
        })
    }

    async fn start_log_recording(&self, _destination: &Path, clear: bool) -> Result<(), DeviceError> {
        self.record(format!("start_log:{clear}"));
        Ok(())
    }

    async fn stop_log_recording(&self) -> Result<(), DeviceError> {
        self.record("stop_log");
        if self.fail_stop_log {
            return Err(Self::failed("logcat"));
        }
        Ok(())
    }

    async fn pull(&self, remote: &str, _local: &Path) -> Result<(), DeviceError> {
        self.record(format!("pull:{remote}"));
        Ok(())
    }

    async fn reverse_port(&self, port: u16) -> Result<(), DeviceError> {
        self.record(format!("reverse:{port}"));
        Ok(())
    }

    async fn remove_reverse_port(&self, port: u16) -> Result<(), DeviceError> {
        self.record(format!("remove_reverse:{port}"));
        Ok(())
    }
}

/// A registry reporting a fixed set of attached devices.
#[derive(Default)]
pub struct MockRegistry {
    pub attached: Vec<String>,
    pub queries: AtomicUsize,
}

impl MockRegistry {
    pub fn with_attached(serials: &[&str]) -> Self {
        Self {
            attached: serials.iter().map(|s| s.to_string()).collect(),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceRegistry for MockRegistry {
    async fn attached_devices(&self) -> Result<Vec<String>, DeviceError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.attached.clone())
    }
}

/// A test server launcher that only records what it was asked to do.
#[derive(Default)]
pub struct MockLauncher {
    pub fail_launch: bool,
    pub launched: Mutex<Vec<String>>,
    pub shut_down: Mutex<Vec<String>>,
}

impl MockLauncher {
    pub fn launches(&self) -> usize {
        self.launched.lock().unwrap().len()
    }

    pub fn shutdowns(&self) -> usize {
        self.shut_down.lock().unwrap().len()
    }
}

#[async_trait]
impl TestServerLauncher for MockLauncher {
    async fn launch(&self, device: &dyn DeviceControl) -> anyhow::Result<()> {
        self.launched.lock().unwrap().push(device.serial().to_string());
        if self.fail_launch {
            anyhow::bail!("test server refused to start");
        }
        Ok(())
    }

    async fn shut_down(&self, device: &dyn DeviceControl) -> anyhow::Result<()> {
        self.shut_down.lock().unwrap().push(device.serial().to_string());
        Ok(())
    }
}

/// A source tree with a filter directory and an output directory.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempdir().expect("Failed to create temporary directory");
        fs::create_dir_all(dir.path().join("filters")).expect("Failed to create filter directory");
        fs::create_dir_all(dir.path().join("out/Debug")).expect("Failed to create out directory");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn filter_dir(&self) -> PathBuf {
        self.root().join("filters")
    }

    pub fn write_filter(&self, file_name: &str, content: &str) {
        fs::write(self.filter_dir().join(file_name), content).expect("Failed to write filter file");
    }

    /// Creates an artifact file under `out/Debug`.
    pub fn artifact(&self, file_name: &str) -> ArtifactReference {
        let path = self.root().join("out/Debug").join(file_name);
        fs::write(&path, b"\x7fELF").expect("Failed to write artifact");
        ArtifactReference::from_path(path)
    }

    pub fn options(&self) -> ControllerOptions {
        ControllerOptions {
            source_root: self.root().to_path_buf(),
            filter_dir: self.filter_dir(),
            debug_output_dir: self.root().join("debug"),
            ..Default::default()
        }
    }
}

pub struct Harness {
    pub device: Arc<MockDevice>,
    pub registry: Arc<MockRegistry>,
    pub launcher: Arc<MockLauncher>,
}

impl Harness {
    pub fn new(device: MockDevice, registry: MockRegistry, launcher: MockLauncher) -> Self {
        Self {
            device: Arc::new(device),
            registry: Arc::new(registry),
            launcher: Arc::new(launcher),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            device: self.device.clone(),
            registry: self.registry.clone(),
            test_server: self.launcher.clone(),
        }
    }

    pub fn controller(
        &self,
        artifact: ArtifactReference,
        options: ControllerOptions,
    ) -> TestLifecycleController {
        TestLifecycleController::new(self.device.serial.clone(), artifact, options, self.collaborators())
            .expect("Failed to construct controller")
    }
}

/// Writes a configuration file into `dir` and returns its path.
pub fn write_config(dir: &Path, content: &str) -> PathBuf {
    let path = dir.join("DeviceTests.toml");
    fs::write(&path, content).expect("Failed to write config");
    path
}
