//! # Deduplication Service
//!
//! 重複排除サービス

use std::collections::HashSet;

use crate::domain::entities::phone_record::PhoneRecord;

/// 重複判定の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupVerdict {
    /// 送信対象
    Eligible,
    /// 無効なレコード
    Invalid,
    /// 同じファイル内で既に出現した
    DuplicateInFile,
    /// 以前の実行で処理済み
    AlreadyProcessed,
}

/// 重複排除サービス
///
/// 1ファイルの読み込み中に出現した識別子を保持する。
/// ファイル順で最初に出現したレコードだけが送信対象になる
pub struct Deduplicator<'a> {
    seen: HashSet<String>,
    processed: &'a HashSet<String>,
}

impl<'a> Deduplicator<'a> {
    /// 新しい重複排除器を作成
    ///
    /// # Arguments
    ///
    /// * `processed` - 以前の実行で処理済みの識別子
    pub fn new(processed: &'a HashSet<String>) -> Self {
        Self {
            seen: HashSet::new(),
            processed,
        }
    }

    /// レコードを判定する
    pub fn classify(&mut self, record: &PhoneRecord) -> DedupVerdict {
        if !record.is_valid() {
            return DedupVerdict::Invalid;
        }
        let identifier = record.normalized();
        if self.processed.contains(identifier) {
            return DedupVerdict::AlreadyProcessed;
        }
        if !self.seen.insert(identifier.to_string()) {
            return DedupVerdict::DuplicateInFile;
        }
        DedupVerdict::Eligible
    }

    /// レコードを送信すべきかどうか
    pub fn should_process(&mut self, record: &PhoneRecord) -> bool {
        self.classify(record) == DedupVerdict::Eligible
    }

    /// このファイルで出現した有効な識別子の数
    pub fn seen_count(&self) -> usize {
        self.seen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(line: usize, id: &str) -> PhoneRecord {
        PhoneRecord::valid(format!("+{}", id), line, id)
    }

    #[test]
    fn test_same_number_three_times_yields_one_eligible() {
        let processed = HashSet::new();
        let mut dedup = Deduplicator::new(&processed);
        let records = vec![
            record(1, "254712345678"),
            record(2, "254712345678"),
            record(3, "254712345678"),
        ];

        let eligible: Vec<&PhoneRecord> = records
            .iter()
            .filter(|r| dedup.should_process(r))
            .collect();

        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].line_number(), 1);
    }

    #[test]
    fn test_previously_processed_is_skipped() {
        let processed = HashSet::from(["254700000001".to_string()]);
        let mut dedup = Deduplicator::new(&processed);

        assert_eq!(
            dedup.classify(&record(1, "254700000001")),
            DedupVerdict::AlreadyProcessed
        );
        assert_eq!(
            dedup.classify(&record(2, "254700000002")),
            DedupVerdict::Eligible
        );
    }

    #[test]
    fn test_invalid_record_never_eligible() {
        let processed = HashSet::new();
        let mut dedup = Deduplicator::new(&processed);
        let invalid = PhoneRecord::invalid("abc", 1, "unrecognized format");

        assert_eq!(dedup.classify(&invalid), DedupVerdict::Invalid);
        assert_eq!(dedup.seen_count(), 0);
    }

    #[test]
    fn test_duplicate_in_file_verdict() {
        let processed = HashSet::new();
        let mut dedup = Deduplicator::new(&processed);

        assert_eq!(dedup.classify(&record(1, "254712345678")), DedupVerdict::Eligible);
        assert_eq!(
            dedup.classify(&record(4, "254712345678")),
            DedupVerdict::DuplicateInFile
        );
        assert_eq!(dedup.seen_count(), 1);
    }
}
