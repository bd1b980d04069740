//! # PhoneRecord Entity
//!
//! 入力ファイル1行分の電話番号レコード

use serde::Serialize;

/// 電話番号レコード
///
/// 生成後は不変。無効な行も `valid == false` のレコードとして表現する
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhoneRecord {
    raw: String,
    line_number: usize,
    normalized: String,
    valid: bool,
    reason: Option<String>,
}

impl PhoneRecord {
    /// 有効なレコードを作成
    ///
    /// # Arguments
    ///
    /// * `raw` - 元の入力テキスト
    /// * `line_number` - 入力ファイル上の行番号（1始まり）
    /// * `normalized` - 正規化済みの識別子（数字のみ、国番号付き）
    pub fn valid(raw: impl Into<String>, line_number: usize, normalized: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            line_number,
            normalized: normalized.into(),
            valid: true,
            reason: None,
        }
    }

    /// 無効なレコードを作成
    pub fn invalid(raw: impl Into<String>, line_number: usize, reason: impl Into<String>) -> Self {
        Self {
            raw: raw.into(),
            line_number,
            normalized: String::new(),
            valid: false,
            reason: Some(reason.into()),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// 正規化済み識別子（無効な場合は空文字列）
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// 無効な理由
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// E.164 表示形式（`+` 付き）
    pub fn display_number(&self) -> String {
        format!("+{}", self.normalized)
    }

    /// 末尾の数字（連絡先名の生成に使用）
    pub fn last_digits(&self, count: usize) -> &str {
        let start = self.normalized.len().saturating_sub(count);
        &self.normalized[start..]
    }
}
