//! # Report Repository Trait
//!
//! 実行結果レポートの出力を抽象化

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::import_session::ImportStats;
use crate::domain::entities::operation_record::{OperationRecord, OperationStatus};

/// 実行結果レポート
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: String,
    pub input: String,
    pub dry_run: bool,
    pub generated_at: DateTime<Utc>,
    /// この実行分の統計
    pub stats: ImportStats,
    /// 中断理由（正常終了時は `None`）
    pub aborted: Option<String>,
    pub operations: Vec<OperationRecord>,
}

impl ImportReport {
    /// 指定ステータスのレコード数を数える
    pub fn count(&self, status: OperationStatus) -> usize {
        self.operations
            .iter()
            .filter(|op| op.status == status)
            .count()
    }
}

/// レポートリポジトリ
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// レポートを書き出す
    ///
    /// # Errors
    ///
    /// 書き込みに失敗した場合にエラーを返す
    async fn write(&self, path: &str, report: &ImportReport) -> Result<()>;
}
