//! 命令行参数定义
//!
//! 使用 `clap` 库定义和解析命令行参数。

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::DEFAULT_CONFIG_FILE;
use crate::error::{AppError, Result};
use crate::validator::ImageValidator;

/// JPEG 拍摄时间批量平移工具
#[derive(Parser, Debug)]
#[command(
    name = "exifshift",
    version = "0.1.0",
    about = "批量平移 JPEG 照片的 EXIF 拍摄时间",
    long_about = "读取一批 JPEG 照片的 EXIF 拍摄时间，按统一的时间差（自动：当前时间减去最新拍摄时间；\
                  手动：N 天）平移，并原地改写或复制到目标文件夹。"
)]
pub struct Cli {
    /// 配置文件路径 (默认: exifshift.toml，不存在时使用默认配置)
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// 日志级别 (trace, debug, info, warn, error) (默认: info)
    #[arg(short = 'l', long, global = true, default_value = "info")]
    pub log_level: String,

    /// 子命令
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// 实际使用的配置文件路径，以及是否由用户显式指定
    pub fn config_path(&self) -> (PathBuf, bool) {
        match &self.config {
            Some(path) => (path.clone(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        }
    }
}

/// inspect 与 apply 共用的参数
#[derive(Args, Debug, Clone)]
pub struct ShiftArgs {
    /// JPEG 文件或包含 JPEG 的目录
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// 手动指定平移天数；不指定时自动计算（当前时间减去最新拍摄时间）
    ///
    /// 负数或无效输入按 0 天处理
    #[arg(short = 'd', long, allow_hyphen_values = true)]
    pub days: Option<String>,

    /// 原地修改原文件（apply 时生效）
    #[arg(long, default_value_t = false, conflicts_with = "dest")]
    pub in_place: bool,

    /// 复制到指定文件夹，文件名不变（apply 时生效）
    #[arg(long)]
    pub dest: Option<PathBuf>,

    /// 写入后把文件修改时间设为新的拍摄时间
    #[arg(long, default_value_t = false)]
    pub sync_file_time: bool,
}

impl ShiftArgs {
    /// 展开参数中的目录，过滤出 JPEG 文件
    ///
    /// 目录只展开第一层并按文件名排序；不存在或扩展名不是 JPEG 的路径记录警告后跳过。
    /// 文件内容是否可读由后续的 EXIF 读取和写入阶段判断，损坏的文件保留在批次中。
    pub fn resolve_paths(&self) -> Result<Vec<PathBuf>> {
        let mut resolved = Vec::new();

        for path in &self.paths {
            if path.is_dir() {
                let mut entries = read_dir_sorted(path)?;
                entries.retain(|p| p.is_file() && ImageValidator::has_jpeg_extension(p));
                tracing::debug!("目录 {} 中找到 {} 个 JPEG 文件", path.display(), entries.len());
                resolved.extend(entries);
                continue;
            }

            if !path.is_file() {
                tracing::warn!("跳过 {}: 文件不存在", path.display());
            } else if !ImageValidator::has_jpeg_extension(path) {
                tracing::warn!("跳过 {}: 不是 JPEG 文件", path.display());
            } else {
                resolved.push(path.clone());
            }
        }

        // 同一个文件在批次中只处理一次
        let mut seen = std::collections::HashSet::new();
        resolved.retain(|p| seen.insert(p.clone()));

        if resolved.is_empty() {
            return Err(AppError::argument_error("没有找到可处理的 JPEG 文件"));
        }
        Ok(resolved)
    }
}

fn read_dir_sorted(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::file_access(dir, e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect::<Vec<_>>();
    entries.sort();
    Ok(entries)
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Command {
    /// 读取拍摄时间并预览平移结果，不修改任何文件
    Inspect {
        #[command(flatten)]
        args: ShiftArgs,
    },

    /// 平移拍摄时间并写入
    Apply {
        #[command(flatten)]
        args: ShiftArgs,

        /// 把失败的文件名和原因写入指定文件
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// 配置文件验证
    Config {
        /// 验证配置文件是否正确
        #[arg(long, default_value_t = false)]
        validate: bool,
    },
}
