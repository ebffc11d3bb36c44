//! # Infrastructure Module / 基础设施模块
//!
//! Everything that touches a process, a socket or the host file system:
//! adb-backed device control, child process plumbing, the mock test server
//! launcher, and i18n support.
//!
//! 所有涉及进程、套接字或主机文件系统的部分：基于 adb 的设备控制、子进程管道、
//! 模拟测试服务器启动器以及国际化支持。

pub mod adb;
pub mod command;
pub mod fs;
pub mod test_server;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
