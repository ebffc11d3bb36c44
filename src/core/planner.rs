//! # Suite Execution Planner Module / 套件执行计划模块
//!
//! Picks the configured suites to run, splits them across CI runners, and
//! then hands each device its share.
//!
//! 选择要运行的已配置套件，将其在 CI 运行器之间拆分，然后为每个设备分配其份额。

use anyhow::{Result, bail};

use crate::core::config::{RunnerConfig, SuiteConfig};
use crate::core::models::ArtifactReference;

/// A configured suite resolved to its artifact.
/// 解析到其产物的已配置套件。
#[derive(Debug, Clone)]
pub struct PlannedSuite {
    pub config: SuiteConfig,
    pub artifact: ArtifactReference,
}

impl PlannedSuite {
    pub fn name(&self) -> String {
        self.artifact.suite_basename()
    }
}

/// The suites one device works through, in order.
/// 一个设备依次处理的套件。
#[derive(Debug, Clone)]
pub struct DeviceAssignment {
    pub device: String,
    pub suites: Vec<PlannedSuite>,
}

/// Represents a complete execution plan for a run.
/// 表示一次运行的完整执行计划。
#[derive(Debug)]
pub struct ExecutionPlan {
    pub assignments: Vec<DeviceAssignment>,
    /// Configured suites left out by the name selection.
    /// 因名称选择而被排除的已配置套件数量。
    pub unselected_count: usize,
    /// Whether the suites are distributed across multiple runners (CI environment).
    /// 套件是否分布在多个运行器上（CI 环境）。
    pub is_distributed: bool,
}

impl ExecutionPlan {
    pub fn suite_count(&self) -> usize {
        self.assignments.iter().map(|a| a.suites.len()).sum()
    }
}

/// Creates an execution plan.
///
/// `selected` restricts the run to suites with those base names; an empty
/// selection keeps every configured suite. Suites are ordered by name, taken
/// round-robin for this CI shard, then dealt round-robin across `devices`.
/// Repeated device serials are collapsed so no device gets two assignments.
///
/// 创建执行计划。
///
/// `selected` 将运行限制为具有这些基本名称的套件；空选择保留所有已配置的套件。
/// 套件按名称排序，为此 CI 分片轮询选取，然后轮询分配给 `devices`。
pub fn plan_execution(
    config: &RunnerConfig,
    selected: &[String],
    devices: &[String],
    total_runners: Option<usize>,
    runner_index: Option<usize>,
) -> Result<ExecutionPlan> {
    if devices.is_empty() {
        bail!("No devices to run on");
    }

    let mut suites = config
        .suites
        .iter()
        .map(|suite| {
            Ok(PlannedSuite {
                config: suite.clone(),
                artifact: ArtifactReference::from_path(config.suite_path(suite)?),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    for name in selected {
        if !suites.iter().any(|s| &s.name() == name) {
            bail!("Suite '{name}' is not in the configuration");
        }
    }
    let total = suites.len();
    if !selected.is_empty() {
        suites.retain(|s| selected.contains(&s.name()));
    }
    let unselected_count = total - suites.len();

    // Sort suites by name for deterministic sharding
    suites.sort_by_key(PlannedSuite::name);

    let (suites, is_distributed) = match (total_runners, runner_index) {
        (Some(total), Some(index)) => {
            if total == 0 || index >= total {
                bail!("Runner index must be less than total runners.");
            }
            let shard = suites
                .into_iter()
                .enumerate()
                .filter(|(i, _)| i % total == index)
                .map(|(_, suite)| suite)
                .collect();
            (shard, true)
        }
        (None, None) => (suites, false),
        _ => bail!("Both --total-runners and --runner-index must be provided."),
    };

    // One controller per device at a time: a serial listed twice still gets
    // a single assignment.
    let mut assignments: Vec<DeviceAssignment> = Vec::with_capacity(devices.len());
    for device in devices {
        if assignments.iter().any(|a| &a.device == device) {
            tracing::warn!(device = %device, "device listed more than once; using it once");
            continue;
        }
        assignments.push(DeviceAssignment {
            device: device.clone(),
            suites: Vec::new(),
        });
    }
    let device_count = assignments.len();
    for (i, suite) in suites.into_iter().enumerate() {
        assignments[i % device_count].suites.push(suite);
    }

    Ok(ExecutionPlan {
        assignments,
        unselected_count,
        is_distributed,
    })
}
