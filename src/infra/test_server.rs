//! # Test Server Module / 测试服务器模块
//!
//! Starts the host-side mock network test server and makes its port
//! reachable from the device.
//!
//! 启动主机端模拟网络测试服务器，并使设备可以访问其端口。

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::collections::HashSet;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;

use crate::core::config::TestServerConfig;
use crate::core::device::{DeviceControl, TestServerLauncher};

const STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Spawns the configured server command. Without a command, the server is
/// assumed to be managed elsewhere and only the port is forwarded.
///
/// One server is shared by every device of a run: it starts with the first
/// launch and stops when the last device using it shuts down.
///
/// 派生已配置的服务器命令。如果没有命令，则假定服务器由别处管理，只转发端口。
/// 一次运行的所有设备共享一个服务器：它随第一次启动而启动，在最后一个使用它的设备关闭时停止。
pub struct SpawnedTestServer {
    command: Option<String>,
    port: u16,
    state: Mutex<ServerState>,
}

#[derive(Default)]
struct ServerState {
    child: Option<Child>,
    devices: HashSet<String>,
}

impl SpawnedTestServer {
    pub fn new(config: &TestServerConfig) -> Self {
        Self {
            command: config.command.clone(),
            port: config.port,
            state: Mutex::new(ServerState::default()),
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The server command line with `{port}` substituted.
    pub fn command_line(&self) -> Option<Vec<String>> {
        let command = self.command.as_ref()?;
        shlex::split(&command.replace("{port}", &self.port.to_string()))
    }

    async fn spawn_server(&self) -> Result<Option<Child>> {
        let Some(raw) = &self.command else {
            tracing::info!(port = self.port, "no test server command configured, forwarding port only");
            return Ok(None);
        };
        let argv = self
            .command_line()
            .filter(|argv| !argv.is_empty())
            .with_context(|| format!("Invalid test server command: {raw}"))?;

        let mut cmd = Command::new(&argv[0]);
        cmd.args(&argv[1..])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        let child = cmd
            .spawn()
            .with_context(|| format!("Failed to spawn test server: {raw}"))?;

        wait_for_port(self.port).await?;
        Ok(Some(child))
    }
}

#[async_trait]
impl TestServerLauncher for SpawnedTestServer {
    async fn launch(&self, device: &dyn DeviceControl) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.devices.is_empty() && state.child.is_none() {
            state.child = self.spawn_server().await?;
        }
        device
            .reverse_port(self.port)
            .await
            .with_context(|| format!("Failed to forward port {} to {}", self.port, device.serial()))?;
        state.devices.insert(device.serial().to_string());
        Ok(())
    }

    async fn shut_down(&self, device: &dyn DeviceControl) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.devices.remove(device.serial()) {
            if let Err(e) = device.remove_reverse_port(self.port).await {
                tracing::warn!(port = self.port, error = %e, "failed to remove port forwarding");
            }
        }
        if !state.devices.is_empty() {
            return Ok(());
        }
        if let Some(mut child) = state.child.take() {
            child.start_kill().context("Failed to stop the test server")?;
            child.wait().await.context("Failed to reap the test server")?;
        }
        Ok(())
    }
}

async fn wait_for_port(port: u16) -> Result<()> {
    let deadline = tokio::time::Instant::now() + STARTUP_TIMEOUT;
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if tokio::time::Instant::now() >= deadline {
            bail!(
                "Test server did not start listening on port {port} within {}s",
                STARTUP_TIMEOUT.as_secs()
            );
        }
        tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
    }
}
