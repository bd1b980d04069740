//! # Input Repository Trait
//!
//! 電話番号の入力ファイルの読み込みを抽象化

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// 入力ファイルの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    /// 行番号（1始まり）
    pub line_number: usize,
    pub text: String,
}

impl InputLine {
    pub fn new(line_number: usize, text: impl Into<String>) -> Self {
        Self {
            line_number,
            text: text.into(),
        }
    }
}

/// 入力リポジトリ
#[async_trait]
pub trait InputRepository: Send + Sync {
    /// 入力ファイルを読み込む
    ///
    /// 空行とコメント行（`#`, `//`）は含まない
    ///
    /// # Errors
    ///
    /// ファイルが存在しない、またはUTF-8として読めない場合にエラーを返す
    async fn read_lines(&self, path: &Path) -> Result<Vec<InputLine>>;
}
