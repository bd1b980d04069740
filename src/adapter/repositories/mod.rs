//! Repository Implementations
//!
//! Domain層のRepositoryトレイトの実装

pub mod json_report_repository;
pub mod json_session_repository;
pub mod text_input_repository;
