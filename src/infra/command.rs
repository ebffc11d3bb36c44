//! # Command Execution Module / 命令执行模块
//!
//! Child process plumbing for adb and host tools: run-to-completion capture,
//! and line streaming with a silence timeout.
//!
//! adb 和主机工具的子进程管道：运行至完成的捕获，以及带静默超时的逐行流式读取。

use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::LinesStream;

use crate::infra::t;

/// Spawns a command, captures its stdout and stderr.
/// The output streams are read concurrently and combined into a single string.
///
/// # Returns
/// A tuple containing:
/// - The `ExitStatus` of the process wrapped in an `io::Result`.
/// - The combined stdout and stderr as a `String`.
///
/// 派生一个命令，捕获其 stdout 和 stderr。
/// 输出流被并发读取并合并到一个字符串中。
pub async fn spawn_and_capture(mut cmd: Command) -> (std::io::Result<ExitStatus>, String) {
    let mut child = match cmd.stdout(Stdio::piped()).stderr(Stdio::piped()).spawn() {
        Ok(child) => child,
        Err(e) => return (Err(e), String::new()),
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return (
            Err(std::io::Error::other(t!("command.capture_failed").to_string())),
            String::new(),
        );
    };

    // 使用 Arc<Mutex<String>> 来允许多个任务（stdout 和 stderr）并发写入。
    let output = Arc::new(tokio::sync::Mutex::new(String::new()));

    let stdout_output = Arc::clone(&output);
    let stdout_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stdout_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let stderr_output = Arc::clone(&output);
    let stderr_handle = tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let mut output = stderr_output.lock().await;
            output.push_str(&line);
            output.push('\n');
        }
    });

    let status = child.wait().await;

    // 等待读取任务完成，以确保所有输出都被捕获。
    if let Err(e) = stdout_handle.await {
        tracing::warn!(error = %e, "failed to join stdout task");
    }
    if let Err(e) = stderr_handle.await {
        tracing::warn!(error = %e, "failed to join stderr task");
    }

    let captured = output.lock().await.clone();
    (status, captured)
}

/// Lines read from a streamed command.
/// 从流式命令读取的行。
#[derive(Debug, Default)]
pub struct StreamedOutput {
    pub lines: Vec<String>,
    /// The command went silent for longer than the line timeout and was killed.
    /// 命令静默超过行超时时间并被终止。
    pub timed_out: bool,
    /// Exit status; `None` when the command was killed.
    pub status: Option<ExitStatus>,
}

/// Spawns a command and collects stdout and stderr line by line. If no line
/// arrives within `line_timeout`, the child is killed and the output so far
/// is returned with `timed_out` set.
///
/// 派生命令并逐行收集 stdout 和 stderr。如果在 `line_timeout` 内没有收到任何行，
/// 则终止子进程，并返回目前为止的输出，同时设置 `timed_out`。
pub async fn stream_lines(mut cmd: Command, line_timeout: Duration) -> std::io::Result<StreamedOutput> {
    let mut child = cmd
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()?;

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        return Err(std::io::Error::other(t!("command.capture_failed").to_string()));
    };
    let mut merged = LinesStream::new(BufReader::new(stdout).lines())
        .merge(LinesStream::new(BufReader::new(stderr).lines()));

    let mut output = StreamedOutput::default();
    loop {
        match tokio::time::timeout(line_timeout, merged.next()).await {
            Ok(Some(Ok(line))) => output.lines.push(line),
            Ok(Some(Err(e))) => {
                tracing::warn!(error = %e, "failed to read command output");
                break;
            }
            Ok(None) => break,
            Err(_) => {
                output.timed_out = true;
                if let Err(e) = child.start_kill() {
                    tracing::warn!(error = %e, "failed to kill silent command");
                }
                return Ok(output);
            }
        }
    }

    output.status = Some(child.wait().await?);
    Ok(output)
}
