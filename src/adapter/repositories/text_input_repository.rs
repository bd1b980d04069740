//! Text Input Repository Implementation
//!
//! InputRepositoryのファイルシステム実装（1行1件のテキストファイル）

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::repositories::input_repository::{InputLine, InputRepository};

/// テキストファイルベースの入力リポジトリ
pub struct TextInputRepository;

impl TextInputRepository {
    /// 新しいリポジトリを作成
    pub fn new() -> Self {
        Self
    }

    /// 空行とコメント行（`#`, `//`）かどうか
    fn is_ignored(line: &str) -> bool {
        let trimmed = line.trim();
        trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with("//")
    }

    /// 入力ファイルを行に分割する（内部実装）
    ///
    /// 行番号はファイル上の位置（1始まり）で、無視した行も数える
    fn read_lines_internal(path: &Path) -> Result<Vec<InputLine>> {
        let expanded = shellexpand::tilde(&path.to_string_lossy()).to_string();
        let path = PathBuf::from(expanded);

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?;

        let content = content.strip_prefix('\u{feff}').unwrap_or(&content);

        let lines: Vec<InputLine> = content
            .lines()
            .enumerate()
            .filter(|(_, line)| !Self::is_ignored(line))
            .map(|(index, line)| InputLine::new(index + 1, line))
            .collect();

        info!("Read {} candidate lines from {}", lines.len(), path.display());

        Ok(lines)
    }
}

#[async_trait]
impl InputRepository for TextInputRepository {
    async fn read_lines(&self, path: &Path) -> Result<Vec<InputLine>> {
        let path = path.to_path_buf();
        tokio::task::spawn_blocking(move || Self::read_lines_internal(&path))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

impl Default for TextInputRepository {
    fn default() -> Self {
        Self::new()
    }
}
