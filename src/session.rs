//! 会话状态
//!
//! 保存当前选中的照片、生效的时间差策略和选择时刻的当前时间。
//! 只有 `select` 会读取文件；切换策略时复用已提取的拍摄时间重新计算预览。

use chrono::{NaiveDateTime, TimeDelta};
use std::path::PathBuf;

use crate::error::Result;
use crate::exif::{CaptureTimeRewriter, TimestampExtractor};
use crate::shifter::{self, BatchDateShifter, TimeOffsetPolicy, WriteMode};
use crate::{BatchResult, PhotoRecord};

/// 一次批处理会话
pub struct Session<E> {
    extractor: E,
    records: Vec<PhotoRecord>,
    policy: TimeOffsetPolicy,
    now: Option<NaiveDateTime>,
    delta: TimeDelta,
}

impl<E: TimestampExtractor> Session<E> {
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            records: Vec::new(),
            policy: TimeOffsetPolicy::default(),
            now: None,
            delta: TimeDelta::zero(),
        }
    }

    /// 选择一批新文件，替换之前的所有记录
    ///
    /// 每个文件只读取一次拍摄时间；`now` 作为自动策略的参考时间保存下来。
    pub fn select(&mut self, paths: &[PathBuf], now: NaiveDateTime) {
        tracing::info!("读取 {} 个文件的拍摄时间", paths.len());

        self.records = paths
            .iter()
            .map(|path| {
                let taken = self.extractor.extract(path);
                if taken.is_none() {
                    tracing::warn!("无法读取拍摄时间: {}", path.display());
                }
                PhotoRecord::new(path.clone(), taken)
            })
            .collect();
        self.now = Some(now);
        self.recompute();
    }

    /// 切换策略并重新计算预览，不读取文件
    pub fn set_policy(&mut self, policy: TimeOffsetPolicy) {
        if self.policy != policy {
            tracing::debug!("切换策略: {:?} -> {:?}", self.policy, policy);
        }
        self.policy = policy;
        self.recompute();
    }

    fn recompute(&mut self) {
        let now = self.now.unwrap_or_else(crate::date_utils::now);
        self.delta = shifter::compute_delta(&self.records, self.policy, now);
        self.records = shifter::preview(&self.records, self.delta);
        tracing::debug!("时间差: {}", crate::date_utils::format_delta(&self.delta));
    }

    /// 写入当前批次
    pub fn apply<R: CaptureTimeRewriter>(
        &mut self,
        shifter: &BatchDateShifter<R>,
        mode: &WriteMode,
    ) -> Result<BatchResult> {
        shifter.apply(&mut self.records, mode)
    }

    pub fn records(&self) -> &[PhotoRecord] {
        &self.records
    }

    pub fn policy(&self) -> TimeOffsetPolicy {
        self.policy
    }

    pub fn delta(&self) -> TimeDelta {
        self.delta
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    /// 批次中最新的拍摄时间
    pub fn most_recent(&self) -> Option<NaiveDateTime> {
        shifter::most_recent(&self.records)
    }

    /// 距最新拍摄时间的整天数（向零截断）
    pub fn days_since_most_recent(&self) -> Option<i64> {
        let now = self.now?;
        self.most_recent().map(|latest| (now - latest).num_days())
    }
}
