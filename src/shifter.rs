//! 批量平移拍摄时间
//!
//! 对整个批次计算一个统一的时间差（自动：当前时间减去最新拍摄时间；手动：N 天），
//! 再把它加到每张照片的拍摄时间上，最后原地改写或写入目标文件夹。
//!
//! `compute_delta` 和 `preview` 是纯函数，不做任何文件 I/O；只有 `apply` 会读写文件。

use chrono::{NaiveDateTime, TimeDelta};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};
use crate::exif::CaptureTimeRewriter;
use crate::fileops;
use crate::{BatchResult, PhotoRecord, PhotoStatus};

/// 时间差计算策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeOffsetPolicy {
    /// 当前时间减去批次中最新的拍摄时间
    #[default]
    Automatic,
    /// 固定天数
    Manual { days: u32 },
}

impl TimeOffsetPolicy {
    /// 解析用户输入的天数
    ///
    /// 负数或无法解析的输入按 0 天处理。
    pub fn manual_from_input(input: &str) -> Self {
        let trimmed = input.trim();
        let days = match trimmed.parse::<i64>() {
            Ok(n) if n < 0 => {
                tracing::warn!("天数不能为负数: {}，按 0 处理", n);
                0
            }
            Ok(n) => u32::try_from(n).unwrap_or_else(|_| {
                tracing::warn!("天数过大: {}，按 0 处理", n);
                0
            }),
            Err(_) => {
                tracing::warn!("无效的天数: '{}'，按 0 处理", trimmed);
                0
            }
        };
        Self::Manual { days }
    }
}

/// 写入方式
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteMode {
    /// 通过临时文件原子替换原文件
    InPlace,
    /// 写入目标文件夹，文件名不变
    CopyToFolder(PathBuf),
}

/// 计算整个批次的时间差
pub fn compute_delta(records: &[PhotoRecord], policy: TimeOffsetPolicy, now: NaiveDateTime) -> TimeDelta {
    match policy {
        TimeOffsetPolicy::Automatic => match most_recent(records) {
            Some(latest) => {
                let delta = now - latest;
                if delta < TimeDelta::zero() {
                    tracing::warn!(
                        "最新拍摄时间 {} 晚于当前时间 {}，时间差为负",
                        latest,
                        now
                    );
                }
                delta
            }
            None => TimeDelta::zero(),
        },
        TimeOffsetPolicy::Manual { days } => TimeDelta::seconds(i64::from(days) * 86_400),
    }
}

/// 批次中最新的拍摄时间
pub fn most_recent(records: &[PhotoRecord]) -> Option<NaiveDateTime> {
    records.iter().filter_map(|r| r.original_timestamp).max()
}

/// 计算每张照片的新时间
///
/// 所有照片使用同一个时间差；没有原始时间的记录保持 Unknown。
pub fn preview(records: &[PhotoRecord], delta: TimeDelta) -> Vec<PhotoRecord> {
    records
        .iter()
        .map(|record| {
            let mut updated = record.clone();
            match record.original_timestamp {
                Some(original) => match original.checked_add_signed(delta) {
                    Some(computed) => {
                        updated.computed_timestamp = Some(computed);
                        updated.status = PhotoStatus::Pending;
                    }
                    None => {
                        updated.computed_timestamp = None;
                        updated.status = PhotoStatus::Error("日期超出范围".to_string());
                    }
                },
                None => {
                    updated.computed_timestamp = None;
                    updated.status = PhotoStatus::Unknown;
                }
            }
            updated
        })
        .collect()
}

/// 批量写入器
pub struct BatchDateShifter<R> {
    rewriter: R,
    sync_file_time: bool,
}

impl<R: CaptureTimeRewriter> BatchDateShifter<R> {
    pub fn new(rewriter: R) -> Self {
        Self {
            rewriter,
            sync_file_time: false,
        }
    }

    /// 写入成功后同时把文件修改时间设为新的拍摄时间
    pub fn with_sync_file_time(mut self, sync: bool) -> Self {
        self.sync_file_time = sync;
        self
    }

    pub fn rewriter(&self) -> &R {
        &self.rewriter
    }

    /// 按写入方式处理整个批次
    ///
    /// 单个文件失败只影响该文件的状态和计数。只有目标文件夹创建失败时才提前返回错误，
    /// 此时尚未处理任何文件。
    pub fn apply(&self, records: &mut [PhotoRecord], mode: &WriteMode) -> Result<BatchResult> {
        if let WriteMode::CopyToFolder(dest) = mode {
            fileops::ensure_dir_exists(dest)?;
        }

        tracing::info!("开始写入 {} 个文件", records.len());
        let mut result = BatchResult::new();

        for record in records.iter_mut() {
            let file_name = record.file_name();

            // 预览阶段已失败（如日期溢出）的记录不再写入，沿用原有错误信息
            if let PhotoStatus::Error(message) = &record.status {
                tracing::warn!("跳过: {}: {}", file_name, message);
                result.record_failure(&file_name, message);
                continue;
            }

            let outcome = match mode {
                WriteMode::InPlace => self.apply_in_place(record),
                WriteMode::CopyToFolder(dest) => self.apply_copy(record, dest),
            };

            match outcome {
                Ok(()) => {
                    result.record_success();
                }
                Err(e) => {
                    tracing::error!("处理失败: {}: {}", file_name, e);
                    let message = e.short_message();
                    result.record_failure(&file_name, &message);
                    record.status = PhotoStatus::Error(message);
                }
            }
        }

        tracing::info!(
            "写入完成: 成功 {}，失败 {}",
            result.success_count,
            result.error_count
        );
        Ok(result)
    }

    fn apply_in_place(&self, record: &mut PhotoRecord) -> Result<()> {
        let path = record.source_path.clone();
        let computed = match record.computed_timestamp {
            Some(ts) => ts,
            None => return Err(AppError::unreadable_metadata(&path)),
        };

        fileops::ensure_writable(&path)?;
        let bytes = read_source(&path)?;
        let rewritten = self.rewrite(&path, &bytes, &computed)?;
        fileops::atomic_write_replace(&path, &rewritten)?;
        self.sync_time(&path, &computed);

        tracing::info!("已更新: {:?} -> {}", path, computed);
        record.status = PhotoStatus::Updated;
        Ok(())
    }

    fn apply_copy(&self, record: &mut PhotoRecord, dest: &Path) -> Result<()> {
        let path = record.source_path.clone();
        let file_name = path
            .file_name()
            .ok_or_else(|| AppError::file_access(&path, "无法确定文件名"))?;
        let target = dest.join(file_name);

        match record.computed_timestamp {
            Some(computed) => {
                let bytes = read_source(&path)?;
                let rewritten = self.rewrite(&path, &bytes, &computed)?;
                fileops::atomic_write_replace(&target, &rewritten)?;
                self.sync_time(&target, &computed);

                tracing::info!("已写入: {:?} -> {}", target, computed);
                record.status = PhotoStatus::Updated;
            }
            None => {
                // 没有可用的拍摄时间，原样写出；目标可能就是源文件本身
                let bytes = read_source(&path)?;
                fileops::atomic_write_replace(&target, &bytes)?;
                tracing::info!("原样复制: {:?}", target);
            }
        }
        Ok(())
    }

    fn rewrite(&self, path: &Path, bytes: &[u8], computed: &NaiveDateTime) -> Result<Vec<u8>> {
        self.rewriter
            .rewrite(bytes, computed)
            .map_err(|e| AppError::rewrite_failure(path, e.to_string()))
    }

    fn sync_time(&self, path: &Path, computed: &NaiveDateTime) {
        if !self.sync_file_time {
            return;
        }
        if let Err(e) = fileops::set_file_timestamps(path, computed) {
            tracing::warn!("更新文件时间戳失败: {:?}: {}", path, e);
        }
    }
}

fn read_source(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| AppError::file_access(path, e.to_string()))
}
