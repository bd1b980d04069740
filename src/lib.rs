//! # Contact Importer
//!
//! 電話番号リストを連絡先サービスに一括登録するツール
//!
//! 入力を正規化・重複排除し、レート制限とリトライポリシーに従って送信する。
//! 処理済みの番号はセッションファイルに保存され、中断しても再実行で続きから再開できる。
//!
//! このプロジェクトはクリーンアーキテクチャを採用しており、以下の4層で構成されています：
//!
//! - **Domain層**: ビジネスの核心的なルールとエンティティ（正規化、重複排除、リトライ判定）
//! - **Application層**: アプリケーション固有のビジネスフロー（ユースケース、レートリミッター）
//! - **Adapter層**: 外部システムとの統合（連絡先サービス, ファイルシステム等）
//! - **Driver層**: CLI、依存性注入

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
// カバレッジ計測時に外部サービス依存コードを除外するために使用
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

// Domain層（純粋なビジネスロジック）
pub mod domain;

// Application層（ユースケース）
pub mod application;

// Adapter層（Infrastructure）
pub mod adapter;

// Driver層（Presentation）
pub mod driver;
