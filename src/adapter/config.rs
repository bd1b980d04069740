//! Configuration
//!
//! JSON設定ファイルの読み込み。全セクションに `#[serde(default)]` を付けているので
//! 一部のキーだけを書いた設定ファイルも読める

use anyhow::{Context, Result};
use log::info;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::adapter::contact_service::http_client::DEFAULT_MAX_RETRY_AFTER;
use crate::application::dto::import_config::{
    ImportConfig, DEFAULT_BATCH_SIZE, DEFAULT_CONCURRENCY,
};
use crate::application::services::rate_limiter::{
    RateLimitSettings, DEFAULT_MAX_REQUESTS, DEFAULT_WINDOW_SECS,
};
use crate::domain::entities::country::CountryCode;
use crate::domain::services::retry_policy::{
    RetrySettings, DEFAULT_INITIAL_RETRY_DELAY_MS, DEFAULT_MAX_RETRY_DELAY_MS,
    DEFAULT_MAX_TRANSIENT_RETRIES, DEFAULT_THROTTLE_JITTER_MS,
};

pub const DEFAULT_CONFIG_PATH: &str = "./.contact-importer/config.json";
pub const DEFAULT_STATE_PATH: &str = "./.contact-importer/state.json";
pub const DEFAULT_SESSION_NAME: &str = "contact_importer";
pub const DEFAULT_NAME_PREFIX: &str = "Contact";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Session key inside the state file
    pub session_name: String,
    pub state_path: String,
    /// ISO code applied to numbers without a calling code
    pub default_country: Option<String>,
    pub batch_size: usize,
    pub concurrency: usize,
    /// First name given to created contacts, followed by the last four digits
    pub name_prefix: String,
    /// Upper bound on the whole run, in seconds
    pub max_run_secs: Option<u64>,
    pub rate_limit: RateLimitConfig,
    pub retry: RetryConfig,
    pub service: ServiceConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_transient_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub throttle_jitter_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub token_path: String,
    pub timeout_secs: u64,
    /// `Retry-After` をこの秒数で打ち切る
    pub max_retry_after_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session_name: DEFAULT_SESSION_NAME.to_string(),
            state_path: DEFAULT_STATE_PATH.to_string(),
            default_country: None,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            max_run_secs: None,
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_MAX_REQUESTS,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_transient_retries: DEFAULT_MAX_TRANSIENT_RETRIES,
            initial_delay_ms: DEFAULT_INITIAL_RETRY_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_RETRY_DELAY_MS,
            throttle_jitter_ms: DEFAULT_THROTTLE_JITTER_MS,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/api".to_string(),
            token_path: "~/.contact-importer/token".to_string(),
            timeout_secs: 30,
            max_retry_after_secs: DEFAULT_MAX_RETRY_AFTER.as_secs(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path))?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            Self::load(path)
        } else {
            info!("No config file at {}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Parse `default_country` into a known calling code
    pub fn country(&self) -> Result<Option<CountryCode>> {
        self.default_country
            .as_deref()
            .map(|iso| iso.parse::<CountryCode>())
            .transpose()
            .context("Invalid default_country in config")
    }

    pub fn rate_limit_settings(&self) -> RateLimitSettings {
        RateLimitSettings {
            max_requests: self.rate_limit.max_requests,
            window: Duration::from_secs(self.rate_limit.window_secs),
        }
    }

    pub fn retry_settings(&self) -> RetrySettings {
        RetrySettings {
            max_transient_retries: self.retry.max_transient_retries,
            initial_delay_ms: self.retry.initial_delay_ms,
            max_delay_ms: self.retry.max_delay_ms,
            throttle_jitter_ms: self.retry.throttle_jitter_ms,
        }
    }

    /// Build the application-level settings for one run
    pub fn to_import_config(&self) -> Result<ImportConfig> {
        Ok(ImportConfig::new(&self.session_name, &self.state_path)
            .with_country(self.country()?)
            .with_batch_size(self.batch_size)
            .with_concurrency(self.concurrency)
            .with_rate_limit(self.rate_limit_settings())
            .with_retry(self.retry_settings())
            .with_max_run_duration(self.max_run_secs.map(Duration::from_secs)))
    }
}
