//! # Progress Events
//!
//! レコードが終端状態に到達するたびに通知される進捗イベント

use crate::domain::entities::outcome::Resolution;

/// 進捗イベント
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    /// この実行で終端状態に到達したレコード数
    pub processed_count: usize,
    /// この実行の送信対象レコード数
    pub total_count: usize,
    pub line_number: usize,
    pub identifier: String,
    pub resolution: Resolution,
}

/// 進捗の通知先
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, event: &ProgressEvent);
}

/// 何もしない通知先
pub struct NoopProgress;

impl ProgressObserver for NoopProgress {
    fn on_progress(&self, _event: &ProgressEvent) {}
}
