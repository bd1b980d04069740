//! # Domain Services
//!
//! エンティティに属さないビジネスルール
//!
//! - **PhoneNormalizer**: 電話番号の正規化と検証
//! - **Deduplicator**: ファイル内・実行間の重複排除
//! - **RetryPolicy**: 送信結果の分類とバックオフ

pub mod deduplication;
pub mod phone_normalizer;
pub mod retry_policy;
