//! # Phone Normalizer Service
//!
//! 生の入力テキストを正規化済みの電話番号識別子に変換する
//!
//! 正規化済み識別子は国番号付きの数字列（`+` なし、例: `254712345678`）。
//! 無効な入力はエラーではなく `valid == false` のレコードになる

use phonenumber::{Mode, ParseError, PhoneNumber};
use std::collections::BTreeMap;

use crate::domain::entities::country::{calling_code_of, CountryCode};
use crate::domain::entities::phone_record::PhoneRecord;

const SEPARATORS: &[char] = &['-', '.', '(', ')'];
const INTERNATIONAL_PREFIX: &str = "00";
const TRUNK_PREFIX: char = '0';
const MIN_TOTAL_DIGITS: usize = 8;
const MAX_TOTAL_DIGITS: usize = 15;

pub const REASON_EMPTY: &str = "empty";
pub const REASON_UNRECOGNIZED: &str = "unrecognized format";
pub const REASON_TOO_SHORT: &str = "too short";
pub const REASON_TOO_LONG: &str = "too long";
pub const REASON_MISSING_COUNTRY: &str = "missing country code";
pub const REASON_UNKNOWN_CALLING_CODE: &str = "unknown calling code";
pub const REASON_INVALID_NUMBER: &str = "invalid number";

/// 電話番号正規化サービス
///
/// 番号の妥当性は libphonenumber のメタデータで判定する。
/// 国が指定されている場合は国内番号としての解釈を優先し、
/// それが無効な場合に限り `+` なしの国際番号として解釈する
pub struct PhoneNormalizer;

impl PhoneNormalizer {
    /// 1件の入力を正規化する（行番号なし）
    pub fn normalize(raw: &str, assumed_country: Option<&CountryCode>) -> PhoneRecord {
        Self::normalize_line(0, raw, assumed_country)
    }

    /// 入力ファイルの1行を正規化する
    ///
    /// # Arguments
    ///
    /// * `line_number` - 行番号（1始まり）
    /// * `raw` - 元のテキスト
    /// * `assumed_country` - 国番号のない番号に適用する国
    pub fn normalize_line(
        line_number: usize,
        raw: &str,
        assumed_country: Option<&CountryCode>,
    ) -> PhoneRecord {
        let raw_trimmed = raw.trim();
        match Self::canonicalize(raw_trimmed, assumed_country) {
            Ok(identifier) => PhoneRecord::valid(raw_trimmed, line_number, identifier),
            Err(reason) => PhoneRecord::invalid(raw_trimmed, line_number, reason),
        }
    }

    fn canonicalize(raw: &str, assumed: Option<&CountryCode>) -> Result<String, &'static str> {
        let compact: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && !SEPARATORS.contains(c))
            .collect();

        if compact.is_empty() {
            return Err(REASON_EMPTY);
        }

        let (international, digits) = if let Some(rest) = compact.strip_prefix('+') {
            (true, rest)
        } else if let Some(rest) = compact.strip_prefix(INTERNATIONAL_PREFIX) {
            (true, rest)
        } else {
            (false, compact.as_str())
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(REASON_UNRECOGNIZED);
        }

        if international {
            return Self::from_international(digits);
        }

        let national = match assumed {
            Some(country) => match Self::from_national(country, digits) {
                Ok(identifier) => return Ok(identifier),
                Err(reason) => Some(reason),
            },
            None => None,
        };

        if !digits.starts_with(TRUNK_PREFIX) {
            if let Ok(identifier) = Self::from_international(digits) {
                return Ok(identifier);
            }
        }

        Err(national.unwrap_or_else(|| Self::unqualified_reason(digits)))
    }

    /// `+` / `00` 付きの番号
    fn from_international(digits: &str) -> Result<String, &'static str> {
        if digits.starts_with(TRUNK_PREFIX) {
            return Err(REASON_UNRECOGNIZED);
        }
        if digits.len() > MAX_TOTAL_DIGITS {
            return Err(REASON_TOO_LONG);
        }
        let parsed = phonenumber::parse(None, format!("+{}", digits));
        Self::validated(parsed, digits)
    }

    /// 指定国の国内番号として解釈する（トランクプレフィックス `0` を含む）
    fn from_national(country: &CountryCode, digits: &str) -> Result<String, &'static str> {
        if digits.len() > MAX_TOTAL_DIGITS {
            return Err(REASON_TOO_LONG);
        }
        let parsed = phonenumber::parse(Some(country.region()), digits);
        Self::validated(parsed, digits)
    }

    fn validated(
        parsed: Result<PhoneNumber, ParseError>,
        digits: &str,
    ) -> Result<String, &'static str> {
        let number = parsed.map_err(Self::parse_error_reason)?;
        if !phonenumber::is_valid(&number) {
            return Err(Self::invalid_reason(digits));
        }
        let e164 = number.format().mode(Mode::E164).to_string();
        Ok(e164.trim_start_matches('+').to_string())
    }

    fn parse_error_reason(error: ParseError) -> &'static str {
        match error {
            ParseError::InvalidCountryCode => REASON_UNKNOWN_CALLING_CODE,
            ParseError::TooShortNsn | ParseError::TooShortAfterIdd => REASON_TOO_SHORT,
            ParseError::TooLong => REASON_TOO_LONG,
            _ => REASON_UNRECOGNIZED,
        }
    }

    fn invalid_reason(digits: &str) -> &'static str {
        if digits.len() < MIN_TOTAL_DIGITS {
            REASON_TOO_SHORT
        } else {
            REASON_INVALID_NUMBER
        }
    }

    fn unqualified_reason(digits: &str) -> &'static str {
        if digits.len() < MIN_TOTAL_DIGITS {
            REASON_TOO_SHORT
        } else if digits.len() > MAX_TOTAL_DIGITS {
            REASON_TOO_LONG
        } else {
            REASON_MISSING_COUNTRY
        }
    }
}

/// パース統計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseStats {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    /// 国番号ごとの有効レコード数
    pub calling_codes: BTreeMap<String, usize>,
}

impl ParseStats {
    /// レコード列から統計を作成
    pub fn from_records(records: &[PhoneRecord]) -> Self {
        let mut stats = ParseStats {
            total: records.len(),
            ..Default::default()
        };
        for record in records {
            if record.is_valid() {
                stats.valid += 1;
                if let Some(calling) = calling_code_of(record.normalized()) {
                    *stats
                        .calling_codes
                        .entry(format!("+{}", calling))
                        .or_insert(0) += 1;
                }
            } else {
                stats.invalid += 1;
            }
        }
        stats
    }

    /// 有効率（%）
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64 * 100.0
        }
    }
}
