//! # Session Repository Trait
//!
//! インポートセッションの永続化を抽象化

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::entities::import_session::ImportSession;

/// セッションリポジトリ
///
/// アカウント（identity）ごとのインポート状態の読み込みと保存を担当する。
/// 保存は原子的（部分書き込みで既存の状態を壊さない）でなければならない
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// セッションを読み込む
    ///
    /// # Arguments
    ///
    /// * `path` - 状態ファイルのパス
    /// * `identity` - セッションのキー
    ///
    /// # Returns
    ///
    /// 保存済みのセッション。存在しない場合は空のセッション
    ///
    /// # Errors
    ///
    /// ファイルの読み込みまたはパースに失敗した場合にエラーを返す
    async fn load(&self, path: &str, identity: &str) -> Result<ImportSession>;

    /// セッションを保存する
    ///
    /// 同じファイル内の他のidentityのセッションは変更しない
    ///
    /// # Errors
    ///
    /// ファイルの書き込みに失敗した場合にエラーを返す
    async fn save(&self, path: &str, session: &ImportSession) -> Result<()>;

    /// セッションを削除する（明示的なリセット）
    ///
    /// # Returns
    ///
    /// セッションが存在した場合に `true`
    async fn reset(&self, path: &str, identity: &str) -> Result<bool>;
}
