//! 文件操作
//!
//! 原地改写使用"写临时文件 + 原子重命名"：临时文件创建在目标文件所在目录，
//! 写入并落盘后通过 `rename` 覆盖目标。任一步骤失败时临时文件被删除，目标文件保持原样。
//! 文件时间戳使用 `filetime` 库设置。

use chrono::NaiveDateTime;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{AppError, Result};

/// 检查源文件存在且可写
pub fn ensure_writable(path: &Path) -> Result<()> {
    let metadata = fs::metadata(path).map_err(|e| AppError::file_access(path, e.to_string()))?;

    if !metadata.is_file() {
        return Err(AppError::file_access(path, "不是普通文件"));
    }

    if metadata.permissions().readonly() {
        return Err(AppError::file_access(path, "文件只读"));
    }

    // 只读目录中无法创建临时文件，提前打开一次确认写权限
    fs::OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| AppError::file_access(path, format!("无写入权限: {}", e)))?;

    Ok(())
}

/// 将 `bytes` 原子地写入 `destination`
///
/// 目标已存在时覆盖，并沿用原文件的权限位。
pub fn atomic_write_replace(destination: &Path, bytes: &[u8]) -> Result<()> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| AppError::rewrite_failure(destination, format!("创建临时文件失败: {}", e)))?;
    tracing::trace!("临时文件: {:?}", temp.path());

    temp.write_all(bytes)
        .and_then(|_| temp.as_file().sync_all())
        .map_err(|e| AppError::rewrite_failure(destination, format!("写入临时文件失败: {}", e)))?;

    if let Ok(existing) = fs::metadata(destination) {
        fs::set_permissions(temp.path(), existing.permissions()).map_err(|e| {
            AppError::rewrite_failure(destination, format!("复制文件权限失败: {}", e))
        })?;
    }

    // persist 失败时 NamedTempFile 随错误一起被丢弃，临时文件自动删除
    temp.persist(destination)
        .map_err(|e| AppError::rewrite_failure(destination, format!("替换原文件失败: {}", e.error)))?;

    tracing::debug!("已原子替换: {}", destination.display());
    Ok(())
}

/// 设置文件的访问时间和修改时间
///
/// EXIF 时间没有时区，按本地时间解释。
pub fn set_file_timestamps(path: &Path, datetime: &NaiveDateTime) -> Result<()> {
    tracing::debug!(
        "设置文件时间戳: {:?} -> {}",
        path,
        datetime.format("%Y-%m-%d %H:%M:%S")
    );

    if !path.exists() {
        return Err(AppError::file_access(path, "文件不存在"));
    }

    let filetime = datetime_to_filetime(datetime)
        .ok_or_else(|| AppError::file_access(path, "本地时间不存在或有歧义"))?;

    filetime::set_file_times(path, filetime, filetime)
        .map_err(|e| AppError::file_access(path, e.to_string()))?;

    Ok(())
}

/// 将本地 NaiveDateTime 转换为 filetime::FileTime
fn datetime_to_filetime(datetime: &NaiveDateTime) -> Option<filetime::FileTime> {
    use chrono::{Local, TimeZone};

    let local = Local.from_local_datetime(datetime).earliest()?;
    Some(filetime::FileTime::from_unix_time(
        local.timestamp(),
        local.timestamp_subsec_nanos(),
    ))
}

/// 创建目录（如果不存在）
///
/// # 参数
/// - `path`: 目录路径
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path).map_err(|e| AppError::file_access(path, e.to_string()))?;
        tracing::debug!("创建目录: {}", path.display());
    } else if !path.is_dir() {
        return Err(AppError::file_access(path, "路径已存在且不是目录"));
    }
    Ok(())
}
