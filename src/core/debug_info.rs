//! # Diagnostic Capture Module / 诊断捕获模块
//!
//! Records the device log while a suite runs and archives crash dumps
//! (tombstones) produced during the run.
//!
//! 在套件运行期间记录设备日志，并归档运行期间产生的崩溃转储（tombstone）。

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::device::DeviceControl;
use crate::infra::fs;

const TOMBSTONE_DIR: &str = "/data/tombstones";

/// Diagnostic capture for one suite run.
/// 一次套件运行的诊断捕获。
#[derive(Debug)]
pub struct DebugCapture {
    dump_dir: PathBuf,
    known_crash_files: HashSet<String>,
    recording: bool,
}

impl DebugCapture {
    /// Creates a capture writing under `<output_dir>/<suite>/<timestamp>`.
    /// 创建一个写入 `<output_dir>/<suite>/<timestamp>` 的捕获。
    pub fn new(output_dir: &Path, suite: &str) -> Self {
        let timestamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        Self {
            dump_dir: output_dir.join(suite).join(timestamp),
            known_crash_files: HashSet::new(),
            recording: false,
        }
    }

    pub fn dump_dir(&self) -> &Path {
        &self.dump_dir
    }

    pub fn log_path(&self) -> PathBuf {
        self.dump_dir.join("logcat.txt")
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Snapshots the existing crash files, then starts recording the device log.
    /// 快照现有的崩溃文件，然后开始记录设备日志。
    pub async fn start_recording_log(&mut self, device: &dyn DeviceControl, clear: bool) -> Result<()> {
        fs::ensure_dir(&self.dump_dir)?;
        self.known_crash_files = list_crash_files(device).await?.into_iter().collect();
        device
            .start_log_recording(&self.log_path(), clear)
            .await
            .context("Failed to start device log recording")?;
        self.recording = true;
        Ok(())
    }

    /// Stops the log recording. Safe to call when nothing is recording.
    pub async fn stop_recording_log(&mut self, device: &dyn DeviceControl) -> Result<()> {
        self.recording = false;
        device
            .stop_log_recording()
            .await
            .context("Failed to stop device log recording")
    }

    /// Pulls every crash file that appeared since recording started.
    /// Returns the local paths of the archived files.
    ///
    /// 拉取自开始记录以来出现的每个崩溃文件，返回已归档文件的本地路径。
    pub async fn archive_new_crash_files(&self, device: &dyn DeviceControl) -> Result<Vec<PathBuf>> {
        let new_files: Vec<String> = list_crash_files(device)
            .await?
            .into_iter()
            .filter(|f| !self.known_crash_files.contains(f))
            .collect();
        if new_files.is_empty() {
            return Ok(Vec::new());
        }

        let crash_dir = self.dump_dir.join("crashes");
        fs::ensure_dir(&crash_dir)?;

        let mut archived = Vec::with_capacity(new_files.len());
        for file in new_files {
            let local = crash_dir.join(&file);
            device
                .pull(&format!("{TOMBSTONE_DIR}/{file}"), &local)
                .await
                .with_context(|| format!("Failed to pull crash file {file}"))?;
            archived.push(local);
        }
        Ok(archived)
    }
}

async fn list_crash_files(device: &dyn DeviceControl) -> Result<Vec<String>> {
    // `ls` on a missing directory prints an error line rather than failing
    // on older shells, so only keep plain file names.
    let output = device
        .run_shell_command(&format!("ls {TOMBSTONE_DIR}"))
        .await
        .context("Failed to list crash files")?;
    Ok(output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.contains(' ') && !line.contains(':'))
        .map(str::to_string)
        .collect())
}
