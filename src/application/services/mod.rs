//! # Application Services
//!
//! ユースケースが共有する実行時のサービス

pub mod rate_limiter;
