//! # Outcome Value Objects
//!
//! 連絡先サービスへの送信結果と、レコードの最終的な解決状態

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 1回の送信試行の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 追加成功
    Succeeded,
    /// 既に連絡先に存在する（スキップ扱い）
    AlreadyExists,
    /// サービス側で恒久的に拒否された
    InvalidRemote(String),
    /// サーバー指定の待機時間（flood-wait）
    Throttled(Duration),
    /// ネットワーク / 5xx 系の一時的なエラー
    TransientError(String),
    /// 認証が無効。実行全体を中断する
    FatalAuthError(String),
}

/// 認証済みアカウントの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityKind {
    User,
    Bot,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::User => write!(f, "user"),
            IdentityKind::Bot => write!(f, "bot"),
        }
    }
}

/// レコードの終端状態
///
/// この状態に到達したレコードは `processed` に記録され、自動では再送されない
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Succeeded,
    AlreadyPresent,
    Rejected(String),
    RetriesExhausted(String),
}

impl Resolution {
    /// 失敗として集計するかどうか
    pub fn is_failure(&self) -> bool {
        matches!(self, Resolution::Rejected(_) | Resolution::RetriesExhausted(_))
    }

    /// レポート用のステータス名
    pub fn status(&self) -> &'static str {
        match self {
            Resolution::Succeeded => "succeeded",
            Resolution::AlreadyPresent => "already_present",
            Resolution::Rejected(_) => "rejected",
            Resolution::RetriesExhausted(_) => "failed",
        }
    }

    /// 失敗理由
    pub fn reason(&self) -> Option<&str> {
        match self {
            Resolution::Rejected(reason) | Resolution::RetriesExhausted(reason) => Some(reason),
            _ => None,
        }
    }
}
