//! # Country Value Objects
//!
//! 国コード（ISO 3166-1 alpha-2）と国際電話の国番号
//!
//! 国と国番号の対応は libphonenumber のメタデータ（`phonenumber` クレート）を使う

use phonenumber::country;
use phonenumber::metadata::DATABASE;
use std::fmt;
use std::str::FromStr;

/// ISO 3166-1 alpha-2 の国コード
///
/// 電話番号メタデータに存在する地域のみ受け付ける
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CountryCode {
    iso: String,
    id: country::Id,
    calling: u16,
}

impl CountryCode {
    /// ISOコード（大文字）
    pub fn iso(&self) -> &str {
        &self.iso
    }

    /// 国番号（例: 254）
    pub fn calling_code(&self) -> u16 {
        self.calling
    }

    /// 番号解析で使う地域ID
    pub fn region(&self) -> country::Id {
        self.id
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (+{})", self.iso, self.calling)
    }
}

/// 未知の国コード
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown country code: {0}")]
pub struct UnknownCountry(pub String);

impl FromStr for CountryCode {
    type Err = UnknownCountry;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let iso = s.trim().to_ascii_uppercase();
        let id = iso
            .parse::<country::Id>()
            .map_err(|_| UnknownCountry(s.to_string()))?;
        let calling = DATABASE
            .by_id(iso.as_str())
            .map(|metadata| metadata.country_code())
            .ok_or_else(|| UnknownCountry(s.to_string()))?;

        Ok(CountryCode { iso, id, calling })
    }
}

/// 正規化済み識別子（`+` なしの数字列）から国番号を取り出す
pub fn calling_code_of(identifier: &str) -> Option<u16> {
    phonenumber::parse(None, format!("+{}", identifier))
        .ok()
        .map(|number| number.code().value())
}
