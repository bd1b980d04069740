//! # Prepare Import Use Case
//!
//! 入力ファイルの読み込み、正規化、重複排除ユースケース
//!
//! ドライランではこのユースケースだけを実行する（連絡先サービスとリミッターは使わない）

use anyhow::Result;
use log::info;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use crate::application::dto::import_config::ImportConfig;
use crate::domain::entities::contact_batch::ContactBatch;
use crate::domain::entities::country::CountryCode;
use crate::domain::entities::operation_record::{OperationRecord, OperationStatus};
use crate::domain::entities::phone_record::PhoneRecord;
use crate::domain::errors::{error_chain_to_string, ImportError};
use crate::domain::repositories::input_repository::{InputLine, InputRepository};
use crate::domain::services::deduplication::{DedupVerdict, Deduplicator};
use crate::domain::services::phone_normalizer::{ParseStats, PhoneNormalizer};

/// インポート計画
///
/// 全レコードと、そのうち送信対象になるレコード
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    /// 入力の全レコード（ファイル順）
    pub records: Vec<PhoneRecord>,
    /// 送信対象（有効・ファイル内で初出・未処理）
    pub eligible: Vec<PhoneRecord>,
    /// 送信前にスキップしたレコード
    pub skipped: Vec<OperationRecord>,
    pub invalid_count: usize,
    pub duplicate_in_file: usize,
    pub previously_processed: usize,
    pub parse_stats: ParseStats,
}

impl ImportPlan {
    /// 入力行から計画を作成
    ///
    /// # Arguments
    ///
    /// * `lines` - 入力行
    /// * `assumed_country` - 国番号のない番号に適用する国
    /// * `processed` - 以前の実行で処理済みの識別子
    pub fn build(
        lines: &[InputLine],
        assumed_country: Option<&CountryCode>,
        processed: &HashSet<String>,
    ) -> Self {
        let records: Vec<PhoneRecord> = lines
            .iter()
            .map(|line| PhoneNormalizer::normalize_line(line.line_number, &line.text, assumed_country))
            .collect();

        let mut dedup = Deduplicator::new(processed);
        let mut plan = ImportPlan {
            parse_stats: ParseStats::from_records(&records),
            ..Default::default()
        };

        for record in &records {
            match dedup.classify(record) {
                DedupVerdict::Eligible => plan.eligible.push(record.clone()),
                DedupVerdict::Invalid => {
                    plan.invalid_count += 1;
                    plan.skipped.push(OperationRecord::new(
                        record,
                        OperationStatus::Invalid,
                        record.reason().map(str::to_string),
                    ));
                }
                DedupVerdict::DuplicateInFile => {
                    plan.duplicate_in_file += 1;
                    plan.skipped
                        .push(OperationRecord::new(record, OperationStatus::Duplicate, None));
                }
                DedupVerdict::AlreadyProcessed => {
                    plan.previously_processed += 1;
                    plan.skipped.push(OperationRecord::new(
                        record,
                        OperationStatus::PreviouslyProcessed,
                        None,
                    ));
                }
            }
        }

        plan.records = records;
        plan
    }

    /// 送信対象をバッチに分割する（遅延）
    pub fn batches(&self, batch_size: usize) -> impl Iterator<Item = ContactBatch> + '_ {
        ContactBatch::chunked(&self.eligible, batch_size)
    }

    /// バッチ数
    pub fn batch_count(&self, batch_size: usize) -> usize {
        ContactBatch::count_for(self.eligible.len(), batch_size)
    }

    /// 重複としてスキップした数（ファイル内 + 処理済み）
    pub fn skipped_duplicates(&self) -> usize {
        self.duplicate_in_file + self.previously_processed
    }

    /// ドライラン用の計画レコード（送信対象 + スキップ）
    pub fn planned_operations(&self) -> Vec<OperationRecord> {
        let mut operations: Vec<OperationRecord> = self
            .eligible
            .iter()
            .map(|record| OperationRecord::new(record, OperationStatus::Planned, None))
            .chain(self.skipped.iter().cloned())
            .collect();
        operations.sort_by_key(|op| op.line_number);
        operations
    }
}

/// インポート準備ユースケース
pub struct PrepareImportUseCase<I: InputRepository> {
    input_repository: Arc<I>,
}

impl<I: InputRepository> PrepareImportUseCase<I> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `input_repository` - 入力リポジトリ
    pub fn new(input_repository: Arc<I>) -> Self {
        Self { input_repository }
    }

    /// 入力ファイルを読み込んで計画を作成
    ///
    /// # Arguments
    ///
    /// * `input_path` - 入力ファイルのパス
    /// * `config` - インポート設定
    /// * `processed` - 以前の実行で処理済みの識別子
    ///
    /// # Errors
    ///
    /// 入力ファイルを読めない場合に `ImportError::Input` を返す
    pub async fn execute(
        &self,
        input_path: &Path,
        config: &ImportConfig,
        processed: &HashSet<String>,
    ) -> Result<ImportPlan> {
        let lines = self
            .input_repository
            .read_lines(input_path)
            .await
            .map_err(|e| ImportError::Input(error_chain_to_string(&e)))?;

        let plan = ImportPlan::build(&lines, config.assumed_country.as_ref(), processed);

        info!(
            "Prepared import from {}: {} lines, {} eligible, {} invalid, {} duplicates, {} previously processed",
            input_path.display(),
            plan.records.len(),
            plan.eligible.len(),
            plan.invalid_count,
            plan.duplicate_in_file,
            plan.previously_processed
        );

        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct MockInputRepository {
        lines: Vec<InputLine>,
    }

    impl MockInputRepository {
        fn from_texts(texts: &[&str]) -> Self {
            Self {
                lines: texts
                    .iter()
                    .enumerate()
                    .map(|(i, text)| InputLine::new(i + 1, *text))
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl InputRepository for MockInputRepository {
        async fn read_lines(&self, _path: &Path) -> Result<Vec<InputLine>> {
            Ok(self.lines.clone())
        }
    }

    struct FailingInputRepository;

    #[async_trait]
    impl InputRepository for FailingInputRepository {
        async fn read_lines(&self, path: &Path) -> Result<Vec<InputLine>> {
            anyhow::bail!("File not found: {}", path.display())
        }
    }

    fn kenya_config() -> ImportConfig {
        ImportConfig::new("acct", "state.json").with_country(Some("KE".parse().unwrap()))
    }

    #[tokio::test]
    async fn test_prepare_end_to_end_example() {
        let repo = Arc::new(MockInputRepository::from_texts(&[
            "+254712345678",
            "0712345678",
            "not-a-number",
        ]));
        let use_case = PrepareImportUseCase::new(repo);

        let plan = use_case
            .execute(Path::new("numbers.txt"), &kenya_config(), &HashSet::new())
            .await
            .unwrap();

        assert_eq!(plan.records.len(), 3);
        assert_eq!(plan.records[0].normalized(), plan.records[1].normalized());
        assert_eq!(plan.invalid_count, 1);
        assert!(!plan.records[2].is_valid());
        assert_eq!(plan.records[2].line_number(), 3);
        assert_eq!(plan.eligible.len(), 1);
        assert_eq!(plan.eligible[0].line_number(), 1);
        assert_eq!(plan.duplicate_in_file, 1);
    }

    #[tokio::test]
    async fn test_prepare_skips_previously_processed() {
        let repo = Arc::new(MockInputRepository::from_texts(&[
            "+254700000001",
            "+254700000002",
        ]));
        let use_case = PrepareImportUseCase::new(repo);
        let processed = HashSet::from(["254700000001".to_string()]);

        let plan = use_case
            .execute(Path::new("numbers.txt"), &kenya_config(), &processed)
            .await
            .unwrap();

        assert_eq!(plan.eligible.len(), 1);
        assert_eq!(plan.eligible[0].normalized(), "254700000002");
        assert_eq!(plan.previously_processed, 1);
        assert_eq!(plan.skipped_duplicates(), 1);
        assert_eq!(plan.skipped[0].status, OperationStatus::PreviouslyProcessed);
    }

    #[tokio::test]
    async fn test_prepare_input_error_is_typed() {
        let use_case = PrepareImportUseCase::new(Arc::new(FailingInputRepository));

        let err = use_case
            .execute(Path::new("missing.txt"), &kenya_config(), &HashSet::new())
            .await
            .unwrap_err();

        let import_err = err.downcast_ref::<ImportError>().unwrap();
        assert!(matches!(import_err, ImportError::Input(msg) if msg.contains("missing.txt")));
    }

    #[test]
    fn test_plan_batches() {
        let lines: Vec<InputLine> = (0..5)
            .map(|i| InputLine::new(i + 1, format!("+25471234567{}", i)))
            .collect();

        let plan = ImportPlan::build(&lines, None, &HashSet::new());

        assert_eq!(plan.eligible.len(), 5);
        assert_eq!(plan.batch_count(2), 3);
        let sizes: Vec<usize> = plan.batches(2).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
    }

    #[test]
    fn test_planned_operations_sorted_by_line() {
        let lines = vec![
            InputLine::new(1, "garbage"),
            InputLine::new(2, "+254712345678"),
            InputLine::new(3, "+254 712 345 678"),
        ];

        let plan = ImportPlan::build(&lines, None, &HashSet::new());
        let ops = plan.planned_operations();

        let statuses: Vec<OperationStatus> = ops.iter().map(|op| op.status).collect();
        assert_eq!(
            statuses,
            vec![
                OperationStatus::Invalid,
                OperationStatus::Planned,
                OperationStatus::Duplicate
            ]
        );
    }
}
