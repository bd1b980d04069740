//! # OperationRecord Entity
//!
//! レコード単位の処理結果（レポート出力用）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::Resolution;
use super::phone_record::PhoneRecord;

/// 処理結果のステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Succeeded,
    AlreadyPresent,
    Rejected,
    Failed,
    Invalid,
    Duplicate,
    PreviouslyProcessed,
    /// ドライランで送信対象になったレコード
    Planned,
}

/// 1レコード分の処理結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationRecord {
    pub line_number: usize,
    pub raw: String,
    pub normalized: Option<String>,
    pub status: OperationStatus,
    pub reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl OperationRecord {
    /// ステータスを指定して作成
    pub fn new(record: &PhoneRecord, status: OperationStatus, reason: Option<String>) -> Self {
        let normalized = if record.is_valid() {
            Some(record.normalized().to_string())
        } else {
            None
        };
        Self {
            line_number: record.line_number(),
            raw: record.raw().to_string(),
            normalized,
            status,
            reason,
            timestamp: Utc::now(),
        }
    }

    /// 終端状態から作成
    pub fn resolved(record: &PhoneRecord, resolution: &Resolution) -> Self {
        let status = match resolution {
            Resolution::Succeeded => OperationStatus::Succeeded,
            Resolution::AlreadyPresent => OperationStatus::AlreadyPresent,
            Resolution::Rejected(_) => OperationStatus::Rejected,
            Resolution::RetriesExhausted(_) => OperationStatus::Failed,
        };
        Self::new(record, status, resolution.reason().map(str::to_string))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_record_has_no_normalized() {
        let record = PhoneRecord::invalid("abc", 4, "unrecognized format");
        let op = OperationRecord::new(
            &record,
            OperationStatus::Invalid,
            record.reason().map(str::to_string),
        );

        assert_eq!(op.line_number, 4);
        assert!(op.normalized.is_none());
        assert_eq!(op.reason.as_deref(), Some("unrecognized format"));
    }

    #[test]
    fn test_resolved_maps_status() {
        let record = PhoneRecord::valid("+254712345678", 1, "254712345678");

        let op = OperationRecord::resolved(
            &record,
            &Resolution::RetriesExhausted("transient retries exhausted".into()),
        );

        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.normalized.as_deref(), Some("254712345678"));
        assert_eq!(op.reason.as_deref(), Some("transient retries exhausted"));
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&OperationStatus::PreviouslyProcessed).unwrap();
        assert_eq!(json, "\"previously_processed\"");
    }
}
