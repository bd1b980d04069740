//! JSON Session Repository Implementation
//!
//! SessionRepositoryのJSON実装（インポートセッションをJSONファイルで永続化）
//!
//! 1つのファイルに複数のidentityのセッションを保持する。書き込みは
//! `<path>.tmp` に書いてから `rename` で置き換える

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::entities::import_session::{ImportSession, ImportStats};
use crate::domain::repositories::session_repository::SessionRepository;

/// JSONファイルベースのセッションリポジトリ
pub struct JsonSessionRepository;

/// 状態ファイル全体（JSON永続化用の内部表現）
#[derive(Debug, Default, Deserialize, Serialize)]
struct SessionFileJson {
    #[serde(default)]
    sessions: BTreeMap<String, SessionJson>,
}

/// 1つのセッション
#[derive(Debug, Deserialize, Serialize)]
struct SessionJson {
    #[serde(default)]
    processed: Vec<String>,
    #[serde(default)]
    stats: ImportStats,
    created_at: DateTime<Utc>,
    last_updated_at: DateTime<Utc>,
    #[serde(default)]
    last_run_id: Option<String>,
}

impl JsonSessionRepository {
    /// 新しいリポジトリを作成
    pub fn new() -> Self {
        Self
    }

    fn expand(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).as_ref())
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// ファイルから状態を読み込む（同期処理）
    fn read_file(path: &Path) -> Result<SessionFileJson> {
        if !path.exists() {
            return Ok(SessionFileJson::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;

        if content.trim().is_empty() {
            return Ok(SessionFileJson::default());
        }

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))
    }

    /// ファイルに状態を書き込む（同期処理）
    fn write_file(path: &Path, file: &SessionFileJson) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create state directory")?;
            }
        }

        let json = serde_json::to_string_pretty(file).context("Failed to serialize session")?;
        let temp = Self::temp_path(path);

        fs::write(&temp, json)
            .with_context(|| format!("Failed to write session file: {}", temp.display()))?;
        fs::rename(&temp, path)
            .with_context(|| format!("Failed to replace session file: {}", path.display()))?;

        Ok(())
    }

    fn load_sync(path: &str, identity: &str) -> Result<ImportSession> {
        let path = Self::expand(path);
        let mut file = Self::read_file(&path)?;

        match file.sessions.remove(identity) {
            Some(json) => {
                let session = Self::to_domain_session(identity, json);
                info!(
                    "Loaded session '{}': {} numbers previously processed",
                    identity,
                    session.processed.len()
                );
                Ok(session)
            }
            None => {
                info!("No existing session '{}', starting new session", identity);
                Ok(ImportSession::new(identity))
            }
        }
    }

    fn save_sync(path: &str, session: &ImportSession) -> Result<()> {
        let path = Self::expand(path);
        let mut file = Self::read_file(&path)?;

        file.sessions
            .insert(session.identity.clone(), Self::from_domain_session(session));
        Self::write_file(&path, &file)?;

        debug!(
            "Saved session '{}': {} numbers processed",
            session.identity,
            session.processed.len()
        );
        Ok(())
    }

    fn reset_sync(path: &str, identity: &str) -> Result<bool> {
        let path = Self::expand(path);
        let mut file = Self::read_file(&path)?;

        if file.sessions.remove(identity).is_none() {
            return Ok(false);
        }
        Self::write_file(&path, &file)?;
        info!("Reset session '{}'", identity);
        Ok(true)
    }

    /// JSON形式からDomain形式に変換
    fn to_domain_session(identity: &str, json: SessionJson) -> ImportSession {
        ImportSession {
            identity: identity.to_string(),
            processed: json.processed.into_iter().collect::<HashSet<_>>(),
            stats: json.stats,
            created_at: json.created_at,
            last_updated_at: json.last_updated_at,
            last_run_id: json.last_run_id,
        }
    }

    /// Domain形式からJSON形式に変換
    ///
    /// 差分が読みやすいように `processed` はソートして書く
    fn from_domain_session(session: &ImportSession) -> SessionJson {
        let mut processed: Vec<String> = session.processed.iter().cloned().collect();
        processed.sort();
        SessionJson {
            processed,
            stats: session.stats,
            created_at: session.created_at,
            last_updated_at: session.last_updated_at,
            last_run_id: session.last_run_id.clone(),
        }
    }
}

#[async_trait]
impl SessionRepository for JsonSessionRepository {
    async fn load(&self, path: &str, identity: &str) -> Result<ImportSession> {
        let path = path.to_string();
        let identity = identity.to_string();
        tokio::task::spawn_blocking(move || Self::load_sync(&path, &identity))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }

    async fn save(&self, path: &str, session: &ImportSession) -> Result<()> {
        let path = path.to_string();
        let session = session.clone();
        tokio::task::spawn_blocking(move || Self::save_sync(&path, &session))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }

    async fn reset(&self, path: &str, identity: &str) -> Result<bool> {
        let path = path.to_string();
        let identity = identity.to_string();
        tokio::task::spawn_blocking(move || Self::reset_sync(&path, &identity))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

impl Default for JsonSessionRepository {
    fn default() -> Self {
        Self::new()
    }
}
