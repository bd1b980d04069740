//! # Run Import Use Case
//!
//! バッチスケジューラ
//!
//! 送信対象をバッチに分割し、各レコードをレートリミッターとリトライポリシーに
//! 従って連絡先サービスへ送信する。結果はこのループ（単一の書き込み元）で
//! セッションに反映し、バッチごとに永続化する

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::sleep;
use uuid::Uuid;

use crate::application::dto::import_config::ImportConfig;
use crate::application::dto::progress::{NoopProgress, ProgressEvent, ProgressObserver};
use crate::application::services::rate_limiter::RateLimiter;
use crate::application::use_cases::prepare_import::ImportPlan;
use crate::domain::entities::contact_batch::ContactBatch;
use crate::domain::entities::import_session::{ImportSession, ImportStats};
use crate::domain::entities::operation_record::OperationRecord;
use crate::domain::entities::outcome::{IdentityKind, Resolution};
use crate::domain::entities::phone_record::PhoneRecord;
use crate::domain::errors::{error_chain_to_string, ImportError};
use crate::domain::repositories::contact_service::ContactServiceClient;
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::services::retry_policy::{AttemptTracker, RetryDecision, RetryPolicy};

/// 実行結果のサマリー
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    /// この実行分の統計
    pub stats: ImportStats,
    /// 送信対象レコード数
    pub total_eligible: usize,
    /// 終端状態に到達したレコード数
    pub processed_count: usize,
    pub batches_completed: usize,
    pub batches_total: usize,
    /// 全レコードの処理結果（スキップ分を含む）
    pub operations: Vec<OperationRecord>,
    /// 実行を中断した致命的エラー
    pub aborted: Option<ImportError>,
}

impl RunSummary {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }
}

/// 1レコードの送信結果
#[derive(Debug)]
enum AttemptResult {
    /// 終端状態に到達した
    Resolved(Resolution),
    /// 実行全体を止めるエラー
    Stopped(ImportError),
    /// 中断シグナルで待機を打ち切った（未処理のまま）
    Cancelled,
}

/// 実行中の集計
struct RunProgress {
    stats: ImportStats,
    operations: Vec<OperationRecord>,
    processed_count: usize,
    total: usize,
    dirty: bool,
}

/// インポート実行ユースケース
pub struct RunImportUseCase<S: SessionRepository> {
    client: Arc<dyn ContactServiceClient>,
    session_repository: Arc<S>,
    limiter: Arc<RateLimiter>,
    policy: Arc<RetryPolicy>,
    progress: Arc<dyn ProgressObserver>,
}

impl<S: SessionRepository> RunImportUseCase<S> {
    /// 新しいユースケースを作成
    ///
    /// # Arguments
    ///
    /// * `client` - 連絡先サービスクライアント
    /// * `session_repository` - セッションリポジトリ
    /// * `limiter` - 全ワーカーで共有するレートリミッター
    /// * `policy` - リトライポリシー
    pub fn new(
        client: Arc<dyn ContactServiceClient>,
        session_repository: Arc<S>,
        limiter: Arc<RateLimiter>,
        policy: Arc<RetryPolicy>,
    ) -> Self {
        Self {
            client,
            session_repository,
            limiter,
            policy,
            progress: Arc::new(NoopProgress),
        }
    }

    /// 進捗の通知先を設定
    pub fn with_progress(mut self, progress: Arc<dyn ProgressObserver>) -> Self {
        self.progress = progress;
        self
    }

    /// インポートを実行
    ///
    /// # Arguments
    ///
    /// * `plan` - 準備済みのインポート計画
    /// * `session` - 読み込み済みのセッション（結果が反映される）
    /// * `config` - インポート設定
    /// * `shutdown` - 中断シグナル（`true` で中断）
    ///
    /// # Returns
    ///
    /// 実行結果のサマリー。実行中の致命的エラーは `RunSummary::aborted` に入る
    ///
    /// # Errors
    ///
    /// 事前確認（認証・アカウント種別）に失敗した場合。この場合は何も送信しない
    pub async fn execute(
        &self,
        plan: &ImportPlan,
        session: &mut ImportSession,
        config: &ImportConfig,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, ImportError> {
        self.verify_identity().await?;

        let run_id = Uuid::new_v4().to_string();
        session.begin_run(&run_id);
        info!("Starting import run {} for '{}'", run_id, session.identity);

        let mut progress = RunProgress {
            stats: ImportStats {
                skipped_invalid: plan.invalid_count as u64,
                skipped_duplicate: plan.skipped_duplicates() as u64,
                ..Default::default()
            },
            operations: plan.skipped.clone(),
            processed_count: 0,
            total: plan.eligible.len(),
            dirty: true,
        };
        session.record_skips(
            progress.stats.skipped_invalid,
            progress.stats.skipped_duplicate,
        );

        let batches_total = plan.batch_count(config.batch_size);
        let mut batches_completed = 0;
        let mut aborted = None;

        for (index, batch) in plan.batches(config.batch_size).enumerate() {
            if *shutdown.borrow() {
                aborted = Some(ImportError::Interrupted);
                break;
            }

            info!(
                "Processing batch {}/{} ({} records)",
                index + 1,
                batches_total,
                batch.len()
            );
            let stop = self
                .process_batch(batch, session, &mut progress, config.concurrency, &shutdown)
                .await;

            if let Err(err) = self.persist(config, session, &mut progress).await {
                aborted = Some(err);
                break;
            }

            if let Some(err) = stop {
                aborted = Some(err);
                break;
            }
            batches_completed += 1;
        }

        if progress.dirty {
            if let Err(err) = self.persist(config, session, &mut progress).await {
                if let Some(previous) = aborted.replace(err) {
                    error!("Run was already stopping: {}", previous);
                }
            }
        }

        match &aborted {
            Some(err) => warn!("Import run {} stopped: {}", run_id, err),
            None => info!(
                "Import run {} finished: {} submitted, {} succeeded, {} failed",
                run_id, progress.stats.submitted, progress.stats.succeeded, progress.stats.failed
            ),
        }

        progress.operations.sort_by_key(|op| op.line_number);

        Ok(RunSummary {
            run_id,
            stats: progress.stats,
            total_eligible: progress.total,
            processed_count: progress.processed_count,
            batches_completed,
            batches_total,
            operations: progress.operations,
            aborted,
        })
    }

    /// 認証状態とアカウント種別を確認
    async fn verify_identity(&self) -> Result<(), ImportError> {
        match self.client.is_authenticated().await {
            Ok(true) => {}
            Ok(false) => return Err(ImportError::NotAuthenticated),
            Err(e) => return Err(ImportError::FatalAuth(error_chain_to_string(&e))),
        }

        match self.client.identity_kind().await {
            Ok(IdentityKind::User) => Ok(()),
            Ok(kind) => Err(ImportError::WrongIdentity(kind)),
            Err(e) => Err(ImportError::FatalAuth(error_chain_to_string(&e))),
        }
    }

    /// 1バッチを処理
    ///
    /// 同時実行数を `concurrency` に制限してワーカーを起動し、終わったものから結果を反映する
    ///
    /// # Returns
    ///
    /// 実行を止めるエラーが発生した場合はそのエラー
    async fn process_batch(
        &self,
        batch: ContactBatch,
        session: &mut ImportSession,
        progress: &mut RunProgress,
        concurrency: usize,
        shutdown: &watch::Receiver<bool>,
    ) -> Option<ImportError> {
        let mut queue = batch.into_records().into_iter();
        let mut in_flight = JoinSet::new();
        let mut stop: Option<ImportError> = None;

        loop {
            if stop.is_none() && *shutdown.borrow() {
                stop = Some(ImportError::Interrupted);
            }
            while stop.is_none() && in_flight.len() < concurrency.max(1) {
                let Some(record) = queue.next() else { break };
                in_flight.spawn(attempt_record(
                    self.client.clone(),
                    self.limiter.clone(),
                    self.policy.clone(),
                    record,
                    shutdown.clone(),
                ));
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            match joined {
                Ok((record, AttemptResult::Resolved(resolution))) => {
                    self.commit(session, progress, &record, resolution);
                }
                Ok((record, AttemptResult::Stopped(err))) => {
                    debug!("Line {} stopped the run: {}", record.line_number(), err);
                    if stop.is_none() {
                        stop = Some(err);
                        in_flight.abort_all();
                    }
                }
                Ok((_, AttemptResult::Cancelled)) => {
                    stop.get_or_insert(ImportError::Interrupted);
                }
                Err(join_err) if join_err.is_cancelled() => {}
                Err(join_err) => {
                    error!("Submission task failed: {}", join_err);
                    if stop.is_none() {
                        stop = Some(ImportError::Worker(join_err.to_string()));
                        in_flight.abort_all();
                    }
                }
            }
        }

        stop
    }

    /// 終端状態をセッションと集計に反映
    fn commit(
        &self,
        session: &mut ImportSession,
        progress: &mut RunProgress,
        record: &PhoneRecord,
        resolution: Resolution,
    ) {
        match &resolution {
            Resolution::Succeeded => debug!("Added {}", record.display_number()),
            Resolution::AlreadyPresent => {
                debug!("{} already present", record.display_number())
            }
            Resolution::Rejected(reason) | Resolution::RetriesExhausted(reason) => warn!(
                "Line {} ({}) failed: {}",
                record.line_number(),
                record.display_number(),
                reason
            ),
        }

        session.record_outcome(record.normalized(), &resolution);
        progress.stats.record(&resolution);
        progress
            .operations
            .push(OperationRecord::resolved(record, &resolution));
        progress.processed_count += 1;
        progress.dirty = true;

        self.progress.on_progress(&ProgressEvent {
            processed_count: progress.processed_count,
            total_count: progress.total,
            line_number: record.line_number(),
            identifier: record.normalized().to_string(),
            resolution,
        });
    }

    async fn persist(
        &self,
        config: &ImportConfig,
        session: &ImportSession,
        progress: &mut RunProgress,
    ) -> Result<(), ImportError> {
        self.session_repository
            .save(&config.state_path, session)
            .await
            .map_err(|e| ImportError::Persistence(error_chain_to_string(&e)))?;
        progress.dirty = false;
        debug!(
            "Persisted session '{}' ({} processed)",
            session.identity,
            session.processed.len()
        );
        Ok(())
    }
}

/// 中断シグナルを待つ
///
/// 送信側が破棄された場合は中断されないものとして待ち続ける
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        let requested = *shutdown.borrow_and_update();
        if requested {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// 1レコードを終端状態まで送信する
async fn attempt_record(
    client: Arc<dyn ContactServiceClient>,
    limiter: Arc<RateLimiter>,
    policy: Arc<RetryPolicy>,
    record: PhoneRecord,
    mut shutdown: watch::Receiver<bool>,
) -> (PhoneRecord, AttemptResult) {
    let mut tracker = AttemptTracker::default();

    loop {
        tokio::select! {
            biased;
            _ = wait_for_shutdown(&mut shutdown) => return (record, AttemptResult::Cancelled),
            acquired = limiter.acquire() => {
                if let Err(err) = acquired {
                    return (record, AttemptResult::Stopped(err));
                }
            }
        }

        let outcome = client.submit(record.normalized()).await;

        match policy.decide(&outcome, &mut tracker) {
            RetryDecision::Done(resolution) => return (record, AttemptResult::Resolved(resolution)),
            RetryDecision::Abort(reason) => {
                return (record, AttemptResult::Stopped(ImportError::FatalAuth(reason)))
            }
            RetryDecision::Wait {
                delay,
                throttled: true,
            } => {
                warn!(
                    "Contact service requested a {}ms wait (line {})",
                    delay.as_millis(),
                    record.line_number()
                );
                limiter.cool_down(delay).await;
            }
            RetryDecision::Wait {
                delay,
                throttled: false,
            } => {
                debug!(
                    "Transient error on line {}, retry {} in {}ms",
                    record.line_number(),
                    tracker.transient_retries,
                    delay.as_millis()
                );
                tokio::select! {
                    biased;
                    _ = wait_for_shutdown(&mut shutdown) => return (record, AttemptResult::Cancelled),
                    _ = sleep(delay) => {}
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use anyhow::Result;
    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::application::services::rate_limiter::RateLimitSettings;
    use crate::domain::entities::outcome::Outcome;
    use crate::domain::repositories::contact_service::MockContactServiceClient;
    use crate::domain::repositories::input_repository::InputLine;
    use crate::domain::services::retry_policy::RetrySettings;

    struct MemorySessionRepository {
        saved: Mutex<Vec<ImportSession>>,
        fail: bool,
    }

    impl MemorySessionRepository {
        fn new() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                saved: Mutex::new(Vec::new()),
                fail: true,
            }
        }

        fn save_count(&self) -> usize {
            self.saved.lock().unwrap().len()
        }

        fn last_saved(&self) -> Option<ImportSession> {
            self.saved.lock().unwrap().last().cloned()
        }
    }

    #[async_trait]
    impl SessionRepository for MemorySessionRepository {
        async fn load(&self, _path: &str, identity: &str) -> Result<ImportSession> {
            Ok(self
                .last_saved()
                .unwrap_or_else(|| ImportSession::new(identity)))
        }

        async fn save(&self, _path: &str, session: &ImportSession) -> Result<()> {
            if self.fail {
                anyhow::bail!("disk full");
            }
            self.saved.lock().unwrap().push(session.clone());
            Ok(())
        }

        async fn reset(&self, _path: &str, _identity: &str) -> Result<bool> {
            Ok(self.saved.lock().unwrap().drain(..).count() > 0)
        }
    }

    fn user_client() -> MockContactServiceClient {
        let mut client = MockContactServiceClient::new();
        client.expect_is_authenticated().returning(|| Ok(true));
        client
            .expect_identity_kind()
            .returning(|| Ok(IdentityKind::User));
        client
    }

    fn plan_for(count: usize) -> ImportPlan {
        let lines: Vec<InputLine> = (1..=count)
            .map(|i| InputLine::new(i, format!("+2547000000{:02}", i)))
            .collect();
        ImportPlan::build(&lines, None, &HashSet::new())
    }

    fn fast_retry() -> RetrySettings {
        RetrySettings {
            max_transient_retries: 3,
            initial_delay_ms: 100,
            max_delay_ms: 1000,
            throttle_jitter_ms: 0,
        }
    }

    fn use_case(
        client: MockContactServiceClient,
        repo: Arc<MemorySessionRepository>,
        limiter: RateLimiter,
    ) -> RunImportUseCase<MemorySessionRepository> {
        RunImportUseCase::new(
            Arc::new(client),
            repo,
            Arc::new(limiter),
            Arc::new(RetryPolicy::new(fast_retry())),
        )
    }

    fn generous_limiter() -> RateLimiter {
        RateLimiter::new(RateLimitSettings {
            max_requests: 1000,
            window: Duration::from_secs(1),
        })
    }

    fn config() -> ImportConfig {
        ImportConfig::new("acct", "state.json").with_batch_size(2)
    }

    fn no_shutdown() -> watch::Receiver<bool> {
        watch::channel(false).1
    }

    #[tokio::test]
    async fn test_all_records_succeed() {
        let mut client = user_client();
        client
            .expect_submit()
            .times(5)
            .returning(|_| Outcome::Succeeded);
        let repo = Arc::new(MemorySessionRepository::new());
        let use_case = use_case(client, repo.clone(), generous_limiter());
        let plan = plan_for(5);
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan, &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.stats.submitted, 5);
        assert_eq!(summary.stats.succeeded, 5);
        assert_eq!(summary.batches_total, 3);
        assert_eq!(summary.batches_completed, 3);
        assert_eq!(summary.processed_count, 5);
        assert_eq!(session.processed.len(), 5);
        assert_eq!(repo.save_count(), 3);
        assert_eq!(repo.last_saved().unwrap().processed.len(), 5);
    }

    #[tokio::test]
    async fn test_already_exists_counts_as_duplicate() {
        let mut client = user_client();
        client.expect_submit().returning(|id| {
            if id == "254700000001" {
                Outcome::AlreadyExists
            } else {
                Outcome::InvalidRemote("privacy restricted".to_string())
            }
        });
        let repo = Arc::new(MemorySessionRepository::new());
        let use_case = use_case(client, repo, generous_limiter());
        let plan = plan_for(2);
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan, &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.stats.skipped_duplicate, 1);
        assert_eq!(summary.stats.failed, 1);
        assert_eq!(summary.stats.succeeded, 0);
        assert!(session.is_processed("254700000001"));
        assert!(session.is_processed("254700000002"));
        assert_eq!(summary.operations[1].reason.as_deref(), Some("privacy restricted"));
    }

    #[tokio::test]
    async fn test_not_authenticated_submits_nothing() {
        let mut client = MockContactServiceClient::new();
        client.expect_is_authenticated().returning(|| Ok(false));
        client.expect_submit().never();
        let repo = Arc::new(MemorySessionRepository::new());
        let use_case = use_case(client, repo.clone(), generous_limiter());
        let mut session = ImportSession::new("acct");

        let result = use_case
            .execute(&plan_for(3), &mut session, &config(), no_shutdown())
            .await;

        assert_eq!(result.unwrap_err(), ImportError::NotAuthenticated);
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn test_bot_identity_is_refused() {
        let mut client = MockContactServiceClient::new();
        client.expect_is_authenticated().returning(|| Ok(true));
        client
            .expect_identity_kind()
            .returning(|| Ok(IdentityKind::Bot));
        client.expect_submit().never();
        let use_case = use_case(
            client,
            Arc::new(MemorySessionRepository::new()),
            generous_limiter(),
        );
        let mut session = ImportSession::new("acct");

        let result = use_case
            .execute(&plan_for(1), &mut session, &config(), no_shutdown())
            .await;

        assert_eq!(
            result.unwrap_err(),
            ImportError::WrongIdentity(IdentityKind::Bot)
        );
    }

    #[tokio::test]
    async fn test_fatal_auth_stops_and_persists() {
        let mut client = user_client();
        client.expect_submit().times(2).returning(|id| {
            if id == "254700000002" {
                Outcome::FatalAuthError("AUTH_KEY_UNREGISTERED".to_string())
            } else {
                Outcome::Succeeded
            }
        });
        let repo = Arc::new(MemorySessionRepository::new());
        let use_case = use_case(client, repo.clone(), generous_limiter());
        let mut session = ImportSession::new("acct");
        let config = ImportConfig::new("acct", "state.json").with_batch_size(10);

        let summary = use_case
            .execute(&plan_for(3), &mut session, &config, no_shutdown())
            .await
            .unwrap();

        assert!(matches!(summary.aborted, Some(ImportError::FatalAuth(_))));
        assert_eq!(summary.batches_completed, 0);
        let saved = repo.last_saved().unwrap();
        assert!(saved.is_processed("254700000001"));
        assert!(!saved.is_processed("254700000002"));
        assert!(!saved.is_processed("254700000003"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_retries_exhausted() {
        let mut client = user_client();
        client
            .expect_submit()
            .times(4)
            .returning(|_| Outcome::TransientError("503".to_string()));
        let use_case = use_case(
            client,
            Arc::new(MemorySessionRepository::new()),
            generous_limiter(),
        );
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan_for(1), &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert!(summary.is_complete());
        assert_eq!(summary.stats.failed, 1);
        assert!(session.is_processed("254700000001"));
        let reason = summary.operations[0].reason.clone().unwrap();
        assert!(reason.contains("after 4 attempts"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttled_wait_is_honored() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut client = user_client();
        client.expect_submit().returning(move |_| {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Outcome::Throttled(Duration::from_secs(3))
            } else {
                Outcome::Succeeded
            }
        });
        let use_case = use_case(
            client,
            Arc::new(MemorySessionRepository::new()),
            generous_limiter(),
        );
        let mut session = ImportSession::new("acct");
        let start = Instant::now();

        let summary = use_case
            .execute(&plan_for(1), &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.stats.succeeded, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(Instant::now().duration_since(start) >= Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_shutdown_before_first_batch() {
        let mut client = user_client();
        client.expect_submit().never();
        let repo = Arc::new(MemorySessionRepository::new());
        let use_case = use_case(client, repo.clone(), generous_limiter());
        let mut session = ImportSession::new("acct");
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let summary = use_case
            .execute(&plan_for(3), &mut session, &config(), rx)
            .await
            .unwrap();

        assert_eq!(summary.aborted, Some(ImportError::Interrupted));
        assert_eq!(summary.processed_count, 0);
        assert_eq!(repo.save_count(), 1);
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts() {
        let mut client = user_client();
        client.expect_submit().returning(|_| Outcome::Succeeded);
        let use_case = use_case(
            client,
            Arc::new(MemorySessionRepository::failing()),
            generous_limiter(),
        );
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan_for(4), &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        match summary.aborted {
            Some(ImportError::Persistence(msg)) => assert!(msg.contains("disk full")),
            other => panic!("unexpected abort: {:?}", other),
        }
        assert_eq!(summary.batches_completed, 0);
    }

    #[tokio::test]
    async fn test_concurrent_workers_process_every_record() {
        let mut client = user_client();
        client
            .expect_submit()
            .times(7)
            .returning(|_| Outcome::Succeeded);
        let use_case = use_case(
            client,
            Arc::new(MemorySessionRepository::new()),
            generous_limiter(),
        );
        let mut session = ImportSession::new("acct");
        let config = ImportConfig::new("acct", "state.json")
            .with_batch_size(3)
            .with_concurrency(4);

        let summary = use_case
            .execute(&plan_for(7), &mut session, &config, no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.processed_count, 7);
        assert_eq!(session.processed.len(), 7);
        let lines: Vec<usize> = summary.operations.iter().map(|op| op.line_number).collect();
        assert_eq!(lines, (1..=7).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_deadline_stops_run() {
        let mut client = user_client();
        client
            .expect_submit()
            .times(1)
            .returning(|_| Outcome::Succeeded);
        let limiter = RateLimiter::new(RateLimitSettings {
            max_requests: 1,
            window: Duration::from_secs(10),
        })
        .with_deadline(Instant::now() + Duration::from_secs(1));
        let use_case = use_case(client, Arc::new(MemorySessionRepository::new()), limiter);
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan_for(2), &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.aborted, Some(ImportError::RateLimitTimeout));
        assert_eq!(summary.processed_count, 1);
        assert!(session.is_processed("254700000001"));
    }

    /// 2件目の送信でパニックするクライアント
    struct PanickingClient {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ContactServiceClient for PanickingClient {
        async fn submit(&self, identifier: &str) -> Outcome {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 1 {
                panic!("malformed response for {}", identifier);
            }
            Outcome::Succeeded
        }

        async fn is_authenticated(&self) -> Result<bool> {
            Ok(true)
        }

        async fn identity_kind(&self) -> Result<IdentityKind> {
            Ok(IdentityKind::User)
        }
    }

    #[tokio::test]
    async fn test_panicking_worker_stops_run() {
        let repo = Arc::new(MemorySessionRepository::new());
        let use_case = RunImportUseCase::new(
            Arc::new(PanickingClient {
                calls: AtomicUsize::new(0),
            }),
            repo.clone(),
            Arc::new(generous_limiter()),
            Arc::new(RetryPolicy::new(fast_retry())),
        );
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan_for(3), &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert!(!summary.is_complete());
        assert!(matches!(summary.aborted, Some(ImportError::Worker(_))));
        assert_eq!(summary.processed_count, 1);
        assert!(session.is_processed("254700000001"));
        assert!(!session.is_processed("254700000002"));
        assert!(!session.is_processed("254700000003"));
        assert_eq!(summary.batches_completed, 0);
        let saved = repo.last_saved().unwrap();
        assert!(!saved.is_processed("254700000002"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unbounded_throttle_hits_deadline() {
        let mut client = user_client();
        client
            .expect_submit()
            .times(1)
            .returning(|_| Outcome::Throttled(Duration::MAX));
        let limiter = generous_limiter().with_deadline(Instant::now() + Duration::from_secs(60));
        let use_case = use_case(client, Arc::new(MemorySessionRepository::new()), limiter);
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan_for(1), &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert!(!summary.is_complete());
        assert_eq!(summary.aborted, Some(ImportError::RateLimitTimeout));
        assert_eq!(summary.processed_count, 0);
        assert!(!session.is_processed("254700000001"));
    }

    #[tokio::test]
    async fn test_skips_are_recorded_in_stats() {
        let mut client = user_client();
        client.expect_submit().returning(|_| Outcome::Succeeded);
        let use_case = use_case(
            client,
            Arc::new(MemorySessionRepository::new()),
            generous_limiter(),
        );
        let lines = vec![
            InputLine::new(1, "+254700000001"),
            InputLine::new(2, "+254 700 000 001"),
            InputLine::new(3, "hello"),
        ];
        let plan = ImportPlan::build(&lines, None, &HashSet::new());
        let mut session = ImportSession::new("acct");

        let summary = use_case
            .execute(&plan, &mut session, &config(), no_shutdown())
            .await
            .unwrap();

        assert_eq!(summary.stats.submitted, 1);
        assert_eq!(summary.stats.skipped_duplicate, 1);
        assert_eq!(summary.stats.skipped_invalid, 1);
        assert_eq!(summary.operations.len(), 3);
        assert_eq!(session.stats, summary.stats);
    }
}
