//! # File System Operations Module / 文件系统操作模块
//!
//! Small host-side helpers: creating output directories and keeping copies of
//! build outputs.
//!
//! 主机端小工具：创建输出目录以及保留构建输出的副本。

use anyhow::{Context, Result};
use fs_extra::file::{CopyOptions, copy};
use std::fs;
use std::path::{Path, PathBuf};

/// Creates `path` and its parents if missing.
/// 如果不存在，则创建 `path` 及其父目录。
pub fn ensure_dir(path: &Path) -> Result<()> {
    fs::create_dir_all(path).with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Copies `file` into `dir` under `name`, overwriting an older copy.
///
/// # Returns
/// The path of the copy.
///
/// 将 `file` 以 `name` 复制到 `dir` 中，覆盖旧副本。
pub fn copy_file_into(file: &Path, dir: &Path, name: &str) -> Result<PathBuf> {
    ensure_dir(dir)?;
    let destination = dir.join(name);
    let options = CopyOptions::new().overwrite(true);
    copy(file, &destination, &options).with_context(|| {
        format!("Failed to copy {} to {}", file.display(), destination.display())
    })?;
    Ok(destination)
}

/// Makes sure the parent directory of an output file exists.
pub fn ensure_parent_dir(file: &Path) -> Result<()> {
    match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => ensure_dir(parent),
        _ => Ok(()),
    }
}

