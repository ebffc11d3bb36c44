//! # Core Module / 核心模块
//!
//! The test lifecycle controller and everything it needs that does not touch
//! a process or a socket: data models, the suite table, filters, output
//! parsing, configuration and planning.
//!
//! 测试生命周期控制器及其所需的、不涉及进程或套接字的一切：
//! 数据模型、套件表、过滤器、输出解析、配置和计划。

pub mod config;
pub mod controller;
pub mod debug_info;
pub mod device;
pub mod filters;
pub mod gtest;
pub mod models;
pub mod package;
pub mod planner;
pub mod suites;
pub mod tools;

// Re-exports
pub use controller::{Collaborators, ControllerOptions, LifecycleState, TestLifecycleController};
pub use device::{DeviceControl, DeviceError, DeviceRegistry, TestServerLauncher};
pub use models::{TestResultRecord, TestResultSet, TestStatus};
