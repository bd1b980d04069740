//! # Import Configuration DTO
//!
//! インポート設定のData Transfer Object

use std::time::Duration;

use crate::application::services::rate_limiter::RateLimitSettings;
use crate::domain::entities::country::CountryCode;
use crate::domain::services::retry_policy::RetrySettings;

pub const DEFAULT_BATCH_SIZE: usize = 50;
pub const DEFAULT_CONCURRENCY: usize = 1;

/// インポート設定
///
/// 設定ファイルとCLI引数から組み立てられ、ユースケースに明示的に渡される
#[derive(Debug, Clone)]
pub struct ImportConfig {
    /// セッションのキー（アカウント識別名）
    pub identity: String,
    /// 状態ファイルのパス
    pub state_path: String,
    /// 国番号のない番号に適用する国
    pub assumed_country: Option<CountryCode>,
    /// 1バッチの最大レコード数
    pub batch_size: usize,
    /// 同時に処理するレコード数
    pub concurrency: usize,
    /// レート制限
    pub rate_limit: RateLimitSettings,
    /// リトライ設定
    pub retry: RetrySettings,
    /// 実行全体の上限時間
    pub max_run_duration: Option<Duration>,
}

impl ImportConfig {
    /// デフォルト値で設定を作成します。
    ///
    /// # 例
    ///
    /// ```
    /// use contact_importer::application::dto::import_config::ImportConfig;
    ///
    /// let config = ImportConfig::new("my-account", "./state.json")
    ///     .with_batch_size(20)
    ///     .with_concurrency(0);
    ///
    /// assert_eq!(config.batch_size, 20);
    /// assert_eq!(config.concurrency, 1); // 0は1に切り上げ
    /// assert!(config.assumed_country.is_none());
    /// ```
    pub fn new(identity: impl Into<String>, state_path: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            state_path: state_path.into(),
            assumed_country: None,
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            rate_limit: RateLimitSettings::default(),
            retry: RetrySettings::default(),
            max_run_duration: None,
        }
    }

    pub fn with_country(mut self, country: Option<CountryCode>) -> Self {
        self.assumed_country = country;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitSettings) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_retry(mut self, retry: RetrySettings) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_run_duration(mut self, duration: Option<Duration>) -> Self {
        self.max_run_duration = duration;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_config_defaults() {
        let config = ImportConfig::new("acct", "/tmp/state.json");

        assert_eq!(config.identity, "acct");
        assert_eq!(config.state_path, "/tmp/state.json");
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.rate_limit, RateLimitSettings::default());
        assert_eq!(config.retry, RetrySettings::default());
        assert!(config.max_run_duration.is_none());
    }

    #[test]
    fn test_import_config_builders() {
        let ke: CountryCode = "KE".parse().unwrap();
        let config = ImportConfig::new("acct", "state.json")
            .with_country(Some(ke.clone()))
            .with_batch_size(10)
            .with_concurrency(4)
            .with_max_run_duration(Some(Duration::from_secs(600)));

        assert_eq!(config.assumed_country, Some(ke));
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.max_run_duration, Some(Duration::from_secs(600)));
    }
}
