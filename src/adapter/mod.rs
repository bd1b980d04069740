//! Adapter Layer
//!
//! 外部システム（連絡先サービス, ファイルシステム）との統合

pub mod auth;
pub mod config;
pub mod contact_service;
pub mod export;
pub mod repositories;
