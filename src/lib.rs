// 公共类型和错误定义
mod error;

// 模块导出
pub mod cli;
pub mod config;
pub mod exif;
pub mod fileops;
pub mod session;
pub mod shifter;
pub mod validator;

// 重新导出常用类型
pub use error::{AppError, Result};

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// 单张照片的处理状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoStatus {
    /// 没有可用的拍摄时间
    Unknown,
    /// 已计算新时间，等待写入
    Pending,
    /// 已写入新时间
    Updated,
    /// 处理失败
    Error(String),
}

impl PhotoStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PhotoStatus::Updated | PhotoStatus::Error(_))
    }
}

/// 批次中的一张照片
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoRecord {
    pub source_path: PathBuf,
    pub original_timestamp: Option<NaiveDateTime>,
    pub computed_timestamp: Option<NaiveDateTime>,
    pub status: PhotoStatus,
}

impl PhotoRecord {
    /// 根据提取到的拍摄时间创建记录
    pub fn new(source_path: impl Into<PathBuf>, original_timestamp: Option<NaiveDateTime>) -> Self {
        Self {
            source_path: source_path.into(),
            original_timestamp,
            computed_timestamp: None,
            status: PhotoStatus::Unknown,
        }
    }

    /// 文件名（用于表格和错误汇总）
    pub fn file_name(&self) -> String {
        file_name_of(&self.source_path)
    }
}

/// 取路径中的文件名部分，取不到时退回完整路径
pub fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 批量写入统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct BatchResult {
    pub success_count: usize,
    pub error_count: usize,
    /// (文件名, 错误信息)
    pub per_file_errors: Vec<(String, String)>,
}

impl BatchResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_failure(&mut self, file_name: &str, message: &str) {
        self.error_count += 1;
        self.per_file_errors
            .push((file_name.to_string(), message.to_string()));
    }

    pub fn total(&self) -> usize {
        self.success_count + self.error_count
    }

    pub fn success_rate(&self) -> f64 {
        if self.total() == 0 {
            return 0.0;
        }
        (self.success_count as f64 / self.total() as f64) * 100.0
    }
}

/// 日期处理辅助函数
pub mod date_utils {
    use super::*;
    use chrono::{Local, TimeDelta};

    /// EXIF 标准日期时间格式
    pub const EXIF_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

    /// 表格展示使用的格式
    pub const DISPLAY_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// 解析日期时间字符串
    ///
    /// 依次尝试 EXIF 格式 `YYYY:MM:DD HH:MM:SS` 和 `YYYY-MM-DD HH:MM:SS`，
    /// 忽略末尾的 NUL 和空白。
    pub fn parse_datetime(input: &str) -> Result<NaiveDateTime> {
        let trimmed = input.trim_end_matches('\0').trim();
        NaiveDateTime::parse_from_str(trimmed, EXIF_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(trimmed, DISPLAY_FORMAT))
            .map_err(|e| AppError::InvalidDate {
                input: input.to_string(),
                details: e.to_string(),
            })
    }

    /// 格式化为 EXIF 写入格式（无亚秒、无时区）
    pub fn format_exif(datetime: &NaiveDateTime) -> String {
        datetime.format(EXIF_FORMAT).to_string()
    }

    /// 格式化为展示格式，缺失时显示 Unknown
    pub fn format_display(datetime: Option<&NaiveDateTime>) -> String {
        match datetime {
            Some(dt) => dt.format(DISPLAY_FORMAT).to_string(),
            None => "Unknown".to_string(),
        }
    }

    /// 当前本地时间
    pub fn now() -> NaiveDateTime {
        Local::now().naive_local()
    }

    /// 将时间差格式化为 "+7d 00:00:00" 形式
    pub fn format_delta(delta: &TimeDelta) -> String {
        let sign = if *delta < TimeDelta::zero() { '-' } else { '+' };
        let total = delta.num_seconds().unsigned_abs();
        let days = total / 86_400;
        let rest = total % 86_400;
        format!(
            "{}{}d {:02}:{:02}:{:02}",
            sign,
            days,
            rest / 3600,
            (rest % 3600) / 60,
            rest % 60
        )
    }
}
