//! # Data Transfer Objects
//!
//! - **ImportConfig**: インポート設定
//! - **ProgressEvent**: 進捗イベントと通知先

pub mod import_config;
pub mod progress;
