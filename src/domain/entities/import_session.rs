//! # ImportSession Entity
//!
//! 実行をまたいで永続化されるインポート状態

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::outcome::Resolution;

/// インポート統計
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    /// サービスに送信して終端状態に到達した数
    pub submitted: u64,
    /// 重複としてスキップした数（ファイル内・前回実行分・サービス側既存）
    pub skipped_duplicate: u64,
    /// 無効な入力としてスキップした数
    pub skipped_invalid: u64,
    /// 失敗数
    pub failed: u64,
    /// 成功数
    pub succeeded: u64,
}

impl ImportStats {
    /// 終端状態を集計に加える
    pub fn record(&mut self, resolution: &Resolution) {
        self.submitted += 1;
        match resolution {
            Resolution::Succeeded => self.succeeded += 1,
            Resolution::AlreadyPresent => self.skipped_duplicate += 1,
            Resolution::Rejected(_) | Resolution::RetriesExhausted(_) => self.failed += 1,
        }
    }
}

/// インポートセッション
///
/// 1つのアカウント（identity）ごとの処理済み識別子と統計。
/// `processed` は増えるだけで、明示的なリセット以外では減らない
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportSession {
    /// セッションのキー（アカウント識別名）
    pub identity: String,
    /// 終端状態に到達した正規化済み識別子
    pub processed: HashSet<String>,
    /// 累積統計
    pub stats: ImportStats,
    pub created_at: DateTime<Utc>,
    pub last_updated_at: DateTime<Utc>,
    /// 最後にこのセッションを更新した実行のID
    pub last_run_id: Option<String>,
}

impl ImportSession {
    /// 空のセッションを作成
    pub fn new(identity: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            identity: identity.into(),
            processed: HashSet::new(),
            stats: ImportStats::default(),
            created_at: now,
            last_updated_at: now,
            last_run_id: None,
        }
    }

    /// 識別子が処理済みかどうか
    pub fn is_processed(&self, identifier: &str) -> bool {
        self.processed.contains(identifier)
    }

    /// 終端状態を記録する
    pub fn record_outcome(&mut self, identifier: &str, resolution: &Resolution) {
        self.processed.insert(identifier.to_string());
        self.stats.record(resolution);
        self.touch();
    }

    /// 送信前にスキップしたレコードを記録する
    pub fn record_skips(&mut self, invalid: u64, duplicate: u64) {
        self.stats.skipped_invalid += invalid;
        self.stats.skipped_duplicate += duplicate;
        self.touch();
    }

    /// 実行IDを設定
    pub fn begin_run(&mut self, run_id: impl Into<String>) {
        self.last_run_id = Some(run_id.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.last_updated_at = Utc::now();
    }
}
