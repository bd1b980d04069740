//! Contact Service Adapters
//!
//! 連絡先サービスとの通信

pub mod http_client;

pub use http_client::HttpContactServiceClient;
