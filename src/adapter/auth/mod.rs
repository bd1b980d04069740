//! Authentication Module
//!
//! 連絡先サービスの認証関連の機能

pub mod token_auth;

pub use token_auth::create_contact_client;
