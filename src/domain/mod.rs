//! # Domain Layer
//!
//! このモジュールはビジネスの核心的なルールとエンティティを定義します。
//!
//! ## 特徴
//!
//! - フレームワークに依存しない
//! - ファイル形式や連絡先サービスのAPIについて何も知らない
//! - 純粋なビジネスロジック
//!
//! ## 構成要素
//!
//! - **entities**: ビジネスエンティティ（PhoneRecord, ImportSessionなど）
//! - **repositories**: Repository trait（インターフェース定義のみ）
//! - **services**: Domain Service（正規化、重複排除、リトライ判定）
//! - **errors**: 実行を中断する致命的エラー

pub mod entities;
pub mod errors;
pub mod repositories;
pub mod services;
