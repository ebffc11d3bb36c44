//! # Instrumentation Tools Module / 插桩工具模块
//!
//! Memory and thread checkers that wrap the test binary on the device. Each
//! tool contributes a command wrapper, a timeout multiplier, a payload to copy
//! onto the device, and environment setup/cleanup hooks.
//!
//! 在设备上包装测试二进制文件的内存和线程检查器。每个工具提供命令包装器、
//! 超时倍数、复制到设备的载荷以及环境设置/清理钩子。

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::core::device::DeviceControl;

const TOOLS_DEVICE_DIR: &str = "/data/local/tmp";

/// The instrumentation tool wrapped around the test binary.
/// 包装在测试二进制文件外的插桩工具。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    #[default]
    None,
    #[serde(rename = "asan")]
    AddressSanitizer,
    Memcheck,
    #[serde(rename = "tsan")]
    ThreadSanitizer,
}

impl FromStr for Tool {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "" | "none" => Ok(Tool::None),
            "asan" => Ok(Tool::AddressSanitizer),
            "memcheck" => Ok(Tool::Memcheck),
            "tsan" => Ok(Tool::ThreadSanitizer),
            other => bail!("Unknown tool '{other}'. Expected one of: none, asan, memcheck, tsan"),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tool::None => "none",
            Tool::AddressSanitizer => "asan",
            Tool::Memcheck => "memcheck",
            Tool::ThreadSanitizer => "tsan",
        };
        f.write_str(name)
    }
}

impl Tool {
    /// Command prefix placed before the test binary, if any.
    /// 放在测试二进制文件之前的命令前缀（如有）。
    pub fn wrapper(&self) -> Option<String> {
        match self {
            Tool::None => None,
            Tool::AddressSanitizer => Some(format!("{TOOLS_DEVICE_DIR}/asanwrapper")),
            Tool::Memcheck => Some(format!(
                "{TOOLS_DEVICE_DIR}/valgrind/bin/valgrind --tool=memcheck --error-exitcode=1 --trace-children=yes"
            )),
            Tool::ThreadSanitizer => Some(format!(
                "{TOOLS_DEVICE_DIR}/valgrind/bin/valgrind --tool=tsan --error-exitcode=1 --trace-children=yes"
            )),
        }
    }

    /// Factor applied to the per-test timeout while the tool is active.
    /// 工具启用时应用于单测超时的倍数。
    pub fn timeout_scale(&self) -> u32 {
        match self {
            Tool::None => 1,
            Tool::AddressSanitizer => 2,
            Tool::Memcheck => 20,
            Tool::ThreadSanitizer => 30,
        }
    }

    /// Pushes the tool's payload from the source tree onto the device.
    /// 将工具的载荷从源码树推送到设备。
    pub async fn copy_files(&self, device: &dyn DeviceControl, source_root: &Path) -> Result<()> {
        match self {
            Tool::None => Ok(()),
            Tool::AddressSanitizer => {
                let asan_dir = source_root.join("third_party/asan/lib");
                device
                    .push_if_needed(
                        &asan_dir.join("asanwrapper"),
                        &format!("{TOOLS_DEVICE_DIR}/asanwrapper"),
                    )
                    .await
                    .context("Failed to push the asan wrapper")?;
                device
                    .push_if_needed(
                        &asan_dir.join("libclang_rt.asan-arm-android.so"),
                        &format!("{TOOLS_DEVICE_DIR}/libclang_rt.asan-arm-android.so"),
                    )
                    .await
                    .context("Failed to push the asan runtime")?;
                Ok(())
            }
            Tool::Memcheck | Tool::ThreadSanitizer => {
                device
                    .push_if_needed(
                        &source_root.join("third_party/valgrind/android"),
                        &format!("{TOOLS_DEVICE_DIR}/valgrind"),
                    )
                    .await
                    .context("Failed to push valgrind")?;
                Ok(())
            }
        }
    }

    /// Wraps `package` so that processes it spawns run under the tool.
    /// 包装 `package`，使其派生的进程在工具下运行。
    pub async fn setup_environment(&self, device: &dyn DeviceControl, package: &str) -> Result<()> {
        let Some(wrapper) = self.wrapper() else {
            return Ok(());
        };
        device
            .run_shell_command(&format!("setprop {} {}", wrap_property(package), quote(&wrapper)))
            .await
            .with_context(|| format!("Failed to set up the {self} environment"))?;
        Ok(())
    }

    /// Reverses [`Tool::setup_environment`].
    pub async fn cleanup_environment(&self, device: &dyn DeviceControl, package: &str) -> Result<()> {
        if *self == Tool::None {
            return Ok(());
        }
        device
            .run_shell_command(&format!("setprop {} \"\"", wrap_property(package)))
            .await
            .with_context(|| format!("Failed to clean up the {self} environment"))?;
        Ok(())
    }
}

/// System property names are capped at 31 characters.
fn wrap_property(package: &str) -> String {
    let mut property = format!("wrap.{package}");
    property.truncate(31);
    property
}

fn quote(value: &str) -> String {
    shlex::try_quote(value)
        .map(|q| q.into_owned())
        .unwrap_or_else(|_| value.to_string())
}
