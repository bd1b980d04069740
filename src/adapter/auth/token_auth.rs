//! Token Authentication
//!
//! 連絡先サービスのAPIトークン読み込み

use anyhow::{Context, Result};
use std::fs;
use std::time::Duration;

use crate::adapter::config::ServiceConfig;
use crate::adapter::contact_service::HttpContactServiceClient;

/// トークンを渡す環境変数
pub const TOKEN_ENV_VAR: &str = "CONTACT_IMPORTER_TOKEN";

/// Expands tilde in path and returns the full path
pub fn expand_token_path(token_path: &str) -> String {
    shellexpand::tilde(token_path).to_string()
}

/// Reads the API token from a file, trimming surrounding whitespace
pub fn read_token_file(token_path: &str) -> Result<String> {
    let expanded_path = expand_token_path(token_path);
    let token = fs::read_to_string(&expanded_path)
        .with_context(|| format!("Failed to read API token file: {}", expanded_path))?;

    let token = token.trim().to_string();
    if token.is_empty() {
        anyhow::bail!("API token file is empty: {}", expanded_path);
    }
    Ok(token)
}

/// Loads the API token from the environment, falling back to the token file
pub fn load_api_token(token_path: &str) -> Result<String> {
    match std::env::var(TOKEN_ENV_VAR) {
        Ok(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        _ => read_token_file(token_path),
    }
}

/// Creates a contact service client with bearer token authentication
pub fn create_contact_client(
    service: &ServiceConfig,
    name_prefix: &str,
) -> Result<HttpContactServiceClient> {
    let token = load_api_token(&service.token_path)?;

    HttpContactServiceClient::new(
        &service.base_url,
        &token,
        name_prefix,
        Duration::from_secs(service.timeout_secs),
    )
    .map(|client| client.with_max_retry_after(Duration::from_secs(service.max_retry_after_secs)))
    .context("Failed to create contact service client")
}
