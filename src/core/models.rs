//! # Data Models Module / 数据模型模块
//!
//! This module defines the core data structures used throughout the device test runner.
//! It includes the artifact reference that identifies what to run, and the per-test
//! and per-run result models collected from the device.
//!
//! 此模块定义了整个设备测试运行器中使用的核心数据结构。
//! 它包括标识运行对象的产物引用，以及从设备收集的单个测试和整次运行的结果模型。

use crate::infra::t;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Distinguishes the two deployable forms a test suite can take.
/// 区分测试套件可以采用的两种部署形式。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum ArtifactKind {
    /// A native gtest executable pushed to the device and run from a shell.
    /// 推送到设备并从 shell 运行的原生 gtest 可执行文件。
    NativeExecutable,
    /// An APK wrapping the gtest suite, driven through an activity.
    /// 包装 gtest 套件的 APK，通过 activity 驱动。
    PackagedApp,
}

/// Identifies the artifact under test: a local path plus its kind.
/// Immutable once constructed.
///
/// 标识被测产物：本地路径及其类型。
/// 构造后不可变。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactReference {
    path: PathBuf,
    kind: ArtifactKind,
}

impl ArtifactReference {
    /// Creates a reference with an explicit kind.
    pub fn new(path: impl Into<PathBuf>, kind: ArtifactKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Derives the kind from the file extension: `.apk` is a packaged app,
    /// anything else a native executable.
    ///
    /// 根据文件扩展名推断类型：`.apk` 为打包应用，其他均为原生可执行文件。
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let kind = match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("apk") => ArtifactKind::PackagedApp,
            _ => ArtifactKind::NativeExecutable,
        };
        Self { path, kind }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// The suite base name, i.e. the file stem (`base_unittests` for both
    /// `out/Debug/base_unittests` and `out/Debug/base_unittests.apk`).
    ///
    /// 套件基本名称，即文件主干名。
    pub fn suite_basename(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// The directory holding the artifact; pak files are looked up next to it.
    pub fn suite_dirname(&self) -> PathBuf {
        self.path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default()
    }
}

/// Outcome of a single gtest case.
/// 单个 gtest 用例的结果。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum TestStatus {
    /// The test reported `[       OK ]`.
    Passed,
    /// The test reported `[  FAILED  ]`.
    Failed,
    /// The test started but the binary died before it finished.
    /// 测试已开始，但二进制文件在其完成前终止。
    Crashed,
    /// The test produced no output within the per-test timeout.
    /// 测试在单测超时时间内没有产生任何输出。
    Timeout,
}

impl TestStatus {
    /// Gets the localized status label for display.
    /// 获取用于显示的本地化状态标签。
    pub fn label(&self, locale: &str) -> String {
        match self {
            TestStatus::Passed => t!("report.status_passed", locale = locale).to_string(),
            TestStatus::Failed => t!("report.status_failed", locale = locale).to_string(),
            TestStatus::Crashed => t!("report.status_crashed", locale = locale).to_string(),
            TestStatus::Timeout => t!("report.status_timeout", locale = locale).to_string(),
        }
    }

    /// Gets the CSS class used by the HTML report.
    pub fn css_class(&self) -> &'static str {
        match self {
            TestStatus::Passed => "status-Passed",
            TestStatus::Failed => "status-Failed",
            TestStatus::Crashed => "status-Crashed",
            TestStatus::Timeout => "status-Timeout",
        }
    }
}

/// One outcome per test case.
/// 每个测试用例的一个结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultRecord {
    /// Full gtest name, e.g. `FileUtilTest.CopyFile`.
    /// 完整的 gtest 名称。
    pub name: String,
    pub status: TestStatus,
    /// The log lines captured while the test ran, when it did not pass.
    /// 测试未通过时，运行期间捕获的日志行。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl TestResultRecord {
    pub fn passed(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: TestStatus::Passed,
            detail: None,
        }
    }

    pub fn failed(name: impl Into<String>, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        Self {
            name: name.into(),
            status: TestStatus::Failed,
            detail: (!detail.is_empty()).then_some(detail),
        }
    }

    pub fn is_passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

/// The ordered results of one run of one suite on one device.
///
/// When `device_exception` is set the run was aborted because the device
/// disappeared, and every record is a synthesized failure. Callers use it to
/// tell "tests failed" apart from "device lost".
///
/// 一个设备上一个套件一次运行的有序结果。
///
/// 当设置了 `device_exception` 时，表示运行因设备消失而中止，所有记录均为合成的失败。
/// 调用方据此区分"测试失败"与"设备丢失"。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResultSet {
    pub records: Vec<TestResultRecord>,
    /// The serial of the device that was lost during the run, if any.
    /// 运行期间丢失的设备序列号（如有）。
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_exception: Option<String>,
}

impl TestResultSet {
    pub fn new(records: Vec<TestResultRecord>) -> Self {
        Self {
            records,
            device_exception: None,
        }
    }

    /// Builds the synthetic result set reported when a device is lost:
    /// one failure per requested test name, tagged with the device serial.
    ///
    /// 构建设备丢失时报告的合成结果集：每个请求的测试名称对应一个失败，并标记设备序列号。
    pub fn from_device_loss<I, S>(names: I, device: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            records: names
                .into_iter()
                .map(|name| TestResultRecord::failed(name, String::new()))
                .collect(),
            device_exception: Some(device.to_string()),
        }
    }

    pub fn is_device_loss(&self) -> bool {
        self.device_exception.is_some()
    }

    pub fn passed(&self) -> impl Iterator<Item = &TestResultRecord> {
        self.records.iter().filter(|r| r.is_passed())
    }

    /// Every record that did not pass (failed, crashed or timed out).
    /// 所有未通过的记录（失败、崩溃或超时）。
    pub fn failed(&self) -> impl Iterator<Item = &TestResultRecord> {
        self.records.iter().filter(|r| !r.is_passed())
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some() || self.is_device_loss()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl fmt::Display for TestResultSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed",
            self.passed().count(),
            self.failed().count()
        )?;
        if let Some(device) = &self.device_exception {
            write!(f, " (device {device} lost)")?;
        }
        Ok(())
    }
}

/// The outcome of one suite as seen by the `run` command: either a result
/// set, or the error that aborted setup or execution.
///
/// `run` 命令所见的一个套件的结果：结果集，或中止设置/执行的错误。
#[derive(Debug, Clone, Serialize)]
pub struct SuiteReport {
    pub suite: String,
    pub device: String,
    #[serde(with = "duration_secs")]
    pub duration: std::time::Duration,
    pub outcome: SuiteOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SuiteOutcome {
    Completed { results: TestResultSet },
    Aborted { error: String },
    Skipped,
}

impl SuiteReport {
    /// Whether this suite should make the overall run fail.
    /// 此套件是否应导致整体运行失败。
    pub fn is_failure(&self) -> bool {
        match &self.outcome {
            SuiteOutcome::Completed { results } => results.has_failures(),
            SuiteOutcome::Aborted { .. } => true,
            SuiteOutcome::Skipped => false,
        }
    }

    pub fn results(&self) -> Option<&TestResultSet> {
        match &self.outcome {
            SuiteOutcome::Completed { results } => Some(results),
            _ => None,
        }
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
