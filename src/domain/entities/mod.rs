//! # Domain Entities
//!
//! ビジネスエンティティとバリューオブジェクトを定義するモジュール
//!
//! ## エンティティ
//!
//! - **PhoneRecord**: 入力1行分の電話番号
//! - **ImportSession**: 永続化されるインポート状態
//! - **ContactBatch**: 送信バッチのバリューオブジェクト
//! - **Outcome / Resolution**: 送信結果と終端状態
//! - **OperationRecord**: レポート用のレコード単位の結果
//! - **CountryCode**: 国コードと国番号

pub mod contact_batch;
pub mod country;
pub mod import_session;
pub mod operation_record;
pub mod outcome;
pub mod phone_record;
