//! 应用程序错误类型定义
//!
//! 使用 `thiserror` 为应用程序定义结构化的错误类型。
//! 单个文件的错误在批处理边界被捕获并记录，不会中断整个批次。

use std::path::PathBuf;
use thiserror::Error;

/// 应用程序 Result 类型
pub type Result<T = (), E = AppError> = std::result::Result<T, E>;

/// 应用程序错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 配置文件加载错误
    #[error("配置文件错误: {path}: {details}")]
    ConfigError {
        path: PathBuf,
        details: String,
    },

    /// TOML 解析错误
    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    /// 日期解析错误
    #[error("无效的日期格式 '{input}': {details}")]
    InvalidDate {
        input: String,
        details: String,
    },

    /// 文件没有可解析的拍摄时间
    #[error("无法读取拍摄时间: {path}")]
    UnreadableMetadata {
        path: PathBuf,
    },

    /// 源文件缺失、不可读写，或目标目录创建失败
    #[error("文件访问错误: {path} - {details}")]
    FileAccess {
        path: PathBuf,
        details: String,
    },

    /// EXIF 改写失败或原子替换失败，原文件保持不变
    #[error("EXIF 改写失败: {path} - {details}")]
    RewriteFailure {
        path: PathBuf,
        details: String,
    },

    /// IO 错误
    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    /// 参数错误
    #[error("参数错误: {0}")]
    ArgumentError(String),
}

impl AppError {
    /// 创建配置文件错误
    pub fn config_error(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::ConfigError {
            path: path.into(),
            details: details.into(),
        }
    }

    /// 创建文件访问错误
    pub fn file_access(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::FileAccess {
            path: path.into(),
            details: details.into(),
        }
    }

    /// 创建 EXIF 改写错误
    pub fn rewrite_failure(path: impl Into<PathBuf>, details: impl Into<String>) -> Self {
        Self::RewriteFailure {
            path: path.into(),
            details: details.into(),
        }
    }

    pub fn unreadable_metadata(path: impl Into<PathBuf>) -> Self {
        Self::UnreadableMetadata { path: path.into() }
    }

    /// 创建参数错误
    pub fn argument_error(msg: impl Into<String>) -> Self {
        Self::ArgumentError(msg.into())
    }

    /// 面向用户的简短说明（不含路径，路径由汇总表单独展示）
    pub fn short_message(&self) -> String {
        match self {
            Self::UnreadableMetadata { .. } => "没有可用的原始拍摄时间".to_string(),
            Self::FileAccess { details, .. } | Self::RewriteFailure { details, .. } => {
                details.clone()
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AppError::config_error("exifshift.toml", "missing field");
        assert!(err.to_string().contains("exifshift.toml"));
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn test_file_access_error() {
        let err = AppError::file_access("/photos/a.jpg", "只读文件");
        assert!(matches!(err, AppError::FileAccess { .. }));
        assert!(err.to_string().contains("a.jpg"));
    }

    #[test]
    fn test_short_message_omits_path() {
        let err = AppError::rewrite_failure("/photos/a.jpg", "EXIF 段损坏");
        assert_eq!(err.short_message(), "EXIF 段损坏");

        let err = AppError::unreadable_metadata("/photos/b.jpg");
        assert_eq!(err.short_message(), "没有可用的原始拍摄时间");
    }
}
