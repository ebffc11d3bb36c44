//! # Subcommands / 子命令
//!
//! One module per CLI subcommand.
//!
//! 每个 CLI 子命令一个模块。

pub mod init;
pub mod inspect;
pub mod run;
