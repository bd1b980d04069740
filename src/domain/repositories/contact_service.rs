//! # Contact Service Client Trait
//!
//! 外部の連絡先ディレクトリサービスを抽象化

use anyhow::Result;
use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::domain::entities::outcome::{IdentityKind, Outcome};

/// 連絡先サービスクライアント
///
/// 送信結果はエラーではなく `Outcome` として返す。
/// `Result` のエラーは事前確認（認証・アカウント種別）の通信失敗のみ
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ContactServiceClient: Send + Sync {
    /// 正規化済み識別子を連絡先として追加する
    async fn submit(&self, identifier: &str) -> Outcome;

    /// セッションが認証済みかどうか
    async fn is_authenticated(&self) -> Result<bool>;

    /// 認証済みアカウントの種別
    async fn identity_kind(&self) -> Result<IdentityKind>;
}
