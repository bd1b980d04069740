//! HTTP Contact Service Client
//!
//! ContactServiceClientのHTTP実装（reqwest）
//!
//! ステータスコードを `Outcome` に分類する。通信自体の失敗も一時的なエラーとして
//! `Outcome` で返し、リトライの判断はリトライポリシーに任せる

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::debug;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::entities::outcome::{IdentityKind, Outcome};
use crate::domain::repositories::contact_service::ContactServiceClient;

/// 429 に `Retry-After` がない場合の待機時間
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(1);

/// `Retry-After` の上限（既定）
pub const DEFAULT_MAX_RETRY_AFTER: Duration = Duration::from_secs(3600);

const MAX_REASON_LEN: usize = 200;

/// 連絡先追加リクエスト
#[derive(Debug, Serialize)]
struct AddContactRequest {
    phone: String,
    first_name: String,
}

/// `GET /me` のレスポンス
#[derive(Debug, Deserialize)]
struct MeResponse {
    #[serde(default)]
    bot: bool,
}

/// HTTP連絡先サービスクライアント
#[derive(Clone)]
pub struct HttpContactServiceClient {
    client: Client,
    base_url: String,
    name_prefix: String,
    max_retry_after: Duration,
}

impl HttpContactServiceClient {
    /// 新しいクライアントを作成
    ///
    /// # Arguments
    ///
    /// * `base_url` - サービスのベースURL
    /// * `token` - Bearerトークン
    /// * `name_prefix` - 作成する連絡先の名前の接頭辞
    /// * `timeout` - リクエストのタイムアウト
    pub fn new(base_url: &str, token: &str, name_prefix: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("API token contains invalid header characters")?;
        headers.insert(AUTHORIZATION, value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            name_prefix: name_prefix.to_string(),
            max_retry_after: DEFAULT_MAX_RETRY_AFTER,
        })
    }

    /// サーバー指定の待機時間の上限を設定
    pub fn with_max_retry_after(mut self, max_retry_after: Duration) -> Self {
        self.max_retry_after = max_retry_after;
        self
    }

    /// 連絡先の表示名（接頭辞 + 下4桁）
    pub fn contact_name(prefix: &str, identifier: &str) -> String {
        let start = identifier.len().saturating_sub(4);
        format!("{} {}", prefix, &identifier[start..])
    }

    async fn me(&self) -> Result<Option<MeResponse>> {
        let url = format!("{}/me", self.base_url);
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send identity request")?;

        let status = res.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }
        if !status.is_success() {
            let txt = res.text().await.unwrap_or_default();
            anyhow::bail!("Identity check failed: {} - {}", status, txt);
        }

        let me: MeResponse = res.json().await.context("Parsing identity response json")?;
        Ok(Some(me))
    }
}

/// ステータスコードを送信結果に分類する
///
/// # Arguments
///
/// * `status` - HTTPステータス
/// * `retry_after` - `Retry-After` ヘッダー（秒数またはHTTP日付）
/// * `body` - レスポンス本文
/// * `max_retry_after` - 待機時間の上限
pub fn classify_status(
    status: StatusCode,
    retry_after: Option<&str>,
    body: &str,
    max_retry_after: Duration,
) -> Outcome {
    match status.as_u16() {
        200 | 201 => Outcome::Succeeded,
        409 => Outcome::AlreadyExists,
        400 | 404 | 422 => Outcome::InvalidRemote(reason(status, body)),
        429 => Outcome::Throttled(
            retry_after
                .and_then(|value| parse_retry_after(value, Utc::now()))
                .unwrap_or(DEFAULT_RETRY_AFTER)
                .min(max_retry_after),
        ),
        401 | 403 => Outcome::FatalAuthError(reason(status, body)),
        408 => Outcome::TransientError(reason(status, body)),
        code if (500..600).contains(&code) => Outcome::TransientError(reason(status, body)),
        _ if status.is_success() => Outcome::Succeeded,
        _ => Outcome::InvalidRemote(reason(status, body)),
    }
}

/// `Retry-After` を待機時間に変換する（delay-seconds または HTTP-date）
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    match DateTime::parse_from_rfc2822(value) {
        Ok(at) => Some(
            at.with_timezone(&Utc)
                .signed_duration_since(now)
                .to_std()
                .unwrap_or(Duration::ZERO),
        ),
        Err(e) => {
            debug!("Ignoring unparseable Retry-After '{}': {}", value, e);
            None
        }
    }
}

fn reason(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return status.to_string();
    }
    let truncated: String = body.chars().take(MAX_REASON_LEN).collect();
    format!("{} - {}", status, truncated)
}

#[async_trait]
impl ContactServiceClient for HttpContactServiceClient {
    async fn submit(&self, identifier: &str) -> Outcome {
        let url = format!("{}/contacts", self.base_url);
        let request = AddContactRequest {
            phone: format!("+{}", identifier),
            first_name: Self::contact_name(&self.name_prefix, identifier),
        };

        let res = match self.client.post(&url).json(&request).send().await {
            Ok(res) => res,
            Err(e) => {
                debug!("Request for {} failed: {}", identifier, e);
                return Outcome::TransientError(e.to_string());
            }
        };

        let status = res.status();
        let retry_after = res
            .headers()
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = res.text().await.unwrap_or_default();

        classify_status(status, retry_after.as_deref(), &body, self.max_retry_after)
    }

    async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.me().await?.is_some())
    }

    async fn identity_kind(&self) -> Result<IdentityKind> {
        match self.me().await? {
            Some(me) if me.bot => Ok(IdentityKind::Bot),
            Some(_) => Ok(IdentityKind::User),
            None => anyhow::bail!("Identity check failed: not authenticated"),
        }
    }
}
