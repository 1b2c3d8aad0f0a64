//! 原子文件写入
//!
//! 先写入同目录下的临时文件并 fsync，再通过 rename 替换目标文件。
//! 中途崩溃只会留下临时文件，目标文件要么是旧内容，要么是新内容。

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{AppError, AppResult};

/// 原子写入文件
pub fn write_file_atomic(path: &Path, content: &[u8]) -> AppResult<()> {
    let display = path.display().to_string();
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    std::fs::create_dir_all(parent).map_err(|e| AppError::persistence(&display, e))?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| AppError::persistence(&display, e))?;
    temp_file
        .write_all(content)
        .map_err(|e| AppError::persistence(&display, e))?;
    temp_file
        .as_file()
        .sync_all()
        .map_err(|e| AppError::persistence(&display, e))?;

    temp_file
        .persist(path)
        .map_err(|e| AppError::persistence(&display, e.error))?;

    Ok(())
}
