//! # Use Cases
//!
//! アプリケーションのビジネスフロー（ユースケース）
//!
//! ## ユースケース
//!
//! - **PrepareImportUseCase**: 入力の読み込み、正規化、重複排除
//! - **RunImportUseCase**: バッチ単位の送信とセッションの永続化

pub mod prepare_import;
pub mod run_import;
