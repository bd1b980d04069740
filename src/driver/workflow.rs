//! Workflow Orchestration
//!
//! ワークフローのオーケストレーション

use anyhow::Result;
use chrono::Utc;
use log::{info, warn};
use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::Instant;

use crate::adapter::auth::create_contact_client;
use crate::adapter::config::Config;
use crate::adapter::export::vcf_exporter;
use crate::adapter::repositories::json_report_repository::JsonReportRepository;
use crate::adapter::repositories::json_session_repository::JsonSessionRepository;
use crate::adapter::repositories::text_input_repository::TextInputRepository;
use crate::application::dto::import_config::ImportConfig;
use crate::application::dto::progress::{ProgressEvent, ProgressObserver};
use crate::application::services::rate_limiter::RateLimiter;
use crate::application::use_cases::prepare_import::{ImportPlan, PrepareImportUseCase};
use crate::application::use_cases::run_import::{RunImportUseCase, RunSummary};
use crate::domain::entities::country::CountryCode;
use crate::domain::entities::import_session::ImportStats;
use crate::domain::entities::outcome::Resolution;
use crate::domain::entities::phone_record::PhoneRecord;
use crate::domain::errors::{error_chain_to_string, ImportError};
use crate::domain::repositories::contact_service::ContactServiceClient;
use crate::domain::repositories::report_repository::{ImportReport, ReportRepository};
use crate::domain::repositories::session_repository::SessionRepository;
use crate::domain::services::retry_policy::RetryPolicy;

use super::cli::Args;

/// 進捗をコンソールに出力する
pub struct ConsoleProgress;

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, event: &ProgressEvent) {
        let marker = match &event.resolution {
            Resolution::Succeeded => "✓",
            Resolution::AlreadyPresent => "⚠",
            Resolution::Rejected(_) | Resolution::RetriesExhausted(_) => "✗",
        };
        match event.resolution.reason() {
            Some(reason) => println!(
                "  [{}/{}] {} +{} ({})",
                event.processed_count, event.total_count, marker, event.identifier, reason
            ),
            None => println!(
                "  [{}/{}] {} +{} {}",
                event.processed_count,
                event.total_count,
                marker,
                event.identifier,
                event.resolution.status()
            ),
        }
    }
}

/// Apply CLI overrides on top of the config file
pub fn resolve_import_config(config: &Config, args: &Args) -> Result<ImportConfig, ImportError> {
    let mut import_config = config
        .to_import_config()
        .map_err(|e| ImportError::Config(error_chain_to_string(&e)))?;

    if let Some(country) = &args.country {
        let country = country
            .parse::<CountryCode>()
            .map_err(|e| ImportError::Config(e.to_string()))?;
        import_config = import_config.with_country(Some(country));
    }
    if let Some(state) = &args.state {
        import_config.state_path = state.clone();
    }
    if let Some(batch_size) = args.batch_size {
        import_config = import_config.with_batch_size(batch_size);
    }
    if let Some(concurrency) = args.concurrency {
        import_config = import_config.with_concurrency(concurrency);
    }

    Ok(import_config)
}

/// Valid numbers with in-file repeats removed, in file order
fn unique_valid_records(plan: &ImportPlan) -> Vec<PhoneRecord> {
    let mut seen = HashSet::new();
    plan.records
        .iter()
        .filter(|record| record.is_valid() && seen.insert(record.normalized().to_string()))
        .cloned()
        .collect()
}

/// Contact Import Workflow
pub struct ContactImportWorkflow {
    config: Config,
    prepare_use_case: PrepareImportUseCase<TextInputRepository>,
    session_repository: Arc<JsonSessionRepository>,
    report_repository: Arc<JsonReportRepository>,
    client: Option<Arc<dyn ContactServiceClient>>,
}

impl ContactImportWorkflow {
    /// Create a new workflow instance with dependency injection
    pub fn new(config: Config) -> Self {
        Self {
            config,
            prepare_use_case: PrepareImportUseCase::new(Arc::new(TextInputRepository::new())),
            session_repository: Arc::new(JsonSessionRepository::new()),
            report_repository: Arc::new(JsonReportRepository::new()),
            client: None,
        }
    }

    /// Use the given client instead of building the HTTP client from config
    pub fn with_client(mut self, client: Arc<dyn ContactServiceClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Execute the import, stopping cleanly on Ctrl-C
    pub async fn execute(&self, args: Args) -> Result<ImportReport> {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let listener = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                println!("\n⚠ Interrupt received, finishing in-flight requests...");
                let _ = shutdown_tx.send(true);
            }
        });

        let result = self.execute_with_shutdown(args, shutdown_rx).await;
        listener.abort();
        result
    }

    /// Execute the import with an external shutdown signal
    pub async fn execute_with_shutdown(
        &self,
        args: Args,
        shutdown: watch::Receiver<bool>,
    ) -> Result<ImportReport> {
        info!("Starting contact import...");
        info!("Dry run: {}", args.dry_run);

        let import_config = resolve_import_config(&self.config, &args)?;

        println!("✓ Using configuration:");
        println!("  Session: {}", import_config.identity);
        println!("  State: {}", import_config.state_path);
        match &import_config.assumed_country {
            Some(country) => println!("  Default country: {}", country),
            None => println!("  Default country: (none, numbers must be international)"),
        }
        println!(
            "  Batch size: {} | Concurrency: {} | Rate: {} per {}s",
            import_config.batch_size,
            import_config.concurrency,
            import_config.rate_limit.max_requests,
            import_config.rate_limit.window.as_secs()
        );

        if args.reset_session {
            if args.dry_run {
                println!("⚠ --reset-session ignored in dry-run mode");
            } else {
                let removed = self
                    .session_repository
                    .reset(&import_config.state_path, &import_config.identity)
                    .await
                    .map_err(|e| ImportError::Persistence(error_chain_to_string(&e)))?;
                if removed {
                    println!("✓ Reset session '{}'", import_config.identity);
                }
            }
        }

        let mut session = self
            .session_repository
            .load(&import_config.state_path, &import_config.identity)
            .await
            .map_err(|e| ImportError::Persistence(error_chain_to_string(&e)))?;
        println!(
            "✓ Loaded session '{}': {} numbers previously processed",
            session.identity,
            session.processed.len()
        );

        let plan = self
            .prepare_use_case
            .execute(&args.input, &import_config, &session.processed)
            .await?;
        self.print_plan(&args.input, &plan);

        if let Some(vcf_path) = &args.export_vcf {
            let records = unique_valid_records(&plan);
            let count = vcf_exporter::export(&records, vcf_path, &self.config.name_prefix)
                .map_err(|e| ImportError::Output(error_chain_to_string(&e)))?;
            println!("✓ Exported {} contacts to {}", count, vcf_path);
        }

        if args.dry_run {
            return self.finish_dry_run(&args, &import_config, &plan).await;
        }

        if plan.eligible.is_empty() {
            println!("No new numbers to import.");
        }

        let client = match &self.client {
            Some(client) => client.clone(),
            None => {
                let client = create_contact_client(&self.config.service, &self.config.name_prefix)
                    .map_err(|e| ImportError::FatalAuth(error_chain_to_string(&e)))?;
                println!("✓ Created contact service client ({})", self.config.service.base_url);
                Arc::new(client) as Arc<dyn ContactServiceClient>
            }
        };

        let mut limiter = RateLimiter::new(import_config.rate_limit);
        if let Some(max_run) = import_config.max_run_duration {
            limiter = limiter.with_deadline(Instant::now() + max_run);
        }

        let run_use_case = RunImportUseCase::new(
            client,
            self.session_repository.clone(),
            Arc::new(limiter),
            Arc::new(RetryPolicy::new(import_config.retry)),
        )
        .with_progress(Arc::new(ConsoleProgress));

        let summary = run_use_case
            .execute(&plan, &mut session, &import_config, shutdown)
            .await?;

        self.print_summary(&summary, &session.stats);

        let report = ImportReport {
            run_id: summary.run_id.clone(),
            input: args.input.display().to_string(),
            dry_run: false,
            generated_at: Utc::now(),
            stats: summary.stats,
            aborted: summary.aborted.as_ref().map(|err| err.to_string()),
            operations: summary.operations.clone(),
        };
        let report_result = self.write_report(&args, &report).await;

        if let Some(err) = summary.aborted {
            println!("✗ Import stopped: {}", err);
            if err.is_resumable() {
                println!("  Progress is saved. Re-run the same command to resume.");
            } else {
                println!("  Session state may be behind the last completed batch.");
            }
            if let Err(report_err) = report_result {
                warn!("{}", report_err);
            }
            return Err(err.into());
        }
        report_result?;

        println!("✓ Import complete!");
        Ok(report)
    }

    fn print_plan(&self, input: &Path, plan: &ImportPlan) {
        let stats = &plan.parse_stats;
        println!(
            "✓ Parsed {} lines from {}: {} valid, {} invalid ({:.1}% valid)",
            stats.total,
            input.display(),
            stats.valid,
            stats.invalid,
            stats.success_rate()
        );
        for (code, count) in &stats.calling_codes {
            println!("  {}: {}", code, count);
        }
        for skipped in plan
            .skipped
            .iter()
            .filter(|op| op.reason.is_some())
            .take(10)
        {
            println!(
                "  ⚠ line {}: {:?} ({})",
                skipped.line_number,
                skipped.raw,
                skipped.reason.as_deref().unwrap_or_default()
            );
        }
        println!(
            "✓ {} to submit, {} duplicates in file, {} previously processed",
            plan.eligible.len(),
            plan.duplicate_in_file,
            plan.previously_processed
        );
    }

    async fn finish_dry_run(
        &self,
        args: &Args,
        import_config: &ImportConfig,
        plan: &ImportPlan,
    ) -> Result<ImportReport> {
        println!("✓ Dry-run mode (not contacting the service)");
        println!(
            "  Would submit {} numbers in {} batches:",
            plan.eligible.len(),
            plan.batch_count(import_config.batch_size)
        );
        for (index, batch) in plan.batches(import_config.batch_size).enumerate() {
            let records = batch.records();
            if let (Some(first), Some(last)) = (records.first(), records.last()) {
                println!(
                    "    - Batch {}: {} numbers ({} .. {})",
                    index + 1,
                    records.len(),
                    first.display_number(),
                    last.display_number()
                );
            }
        }

        let report = ImportReport {
            run_id: uuid::Uuid::new_v4().to_string(),
            input: args.input.display().to_string(),
            dry_run: true,
            generated_at: Utc::now(),
            stats: ImportStats {
                skipped_invalid: plan.invalid_count as u64,
                skipped_duplicate: plan.skipped_duplicates() as u64,
                ..Default::default()
            },
            aborted: None,
            operations: plan.planned_operations(),
        };
        self.write_report(args, &report).await?;

        Ok(report)
    }

    fn print_summary(&self, summary: &RunSummary, total: &ImportStats) {
        println!(
            "✓ Processed {}/{} numbers in {}/{} batches",
            summary.processed_count,
            summary.total_eligible,
            summary.batches_completed,
            summary.batches_total
        );
        println!("  Succeeded: {}", summary.stats.succeeded);
        println!("  Already present / duplicate: {}", summary.stats.skipped_duplicate);
        println!("  Invalid: {}", summary.stats.skipped_invalid);
        println!("  Failed: {}", summary.stats.failed);
        println!(
            "  Session totals: {} submitted, {} succeeded, {} failed",
            total.submitted, total.succeeded, total.failed
        );
    }

    async fn write_report(&self, args: &Args, report: &ImportReport) -> Result<(), ImportError> {
        if let Some(path) = &args.report {
            self.report_repository
                .write(path, report)
                .await
                .map_err(|e| ImportError::Output(error_chain_to_string(&e)))?;
            println!("✓ Wrote report to {}", path);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    use crate::domain::repositories::input_repository::InputLine;

    #[test]
    fn test_resolve_import_config_overrides() {
        let config = Config {
            default_country: Some("US".to_string()),
            ..Default::default()
        };
        let args = Args::parse_from([
            "contact-importer",
            "numbers.txt",
            "--country",
            "ke",
            "--state",
            "/tmp/s.json",
            "--batch-size",
            "5",
            "--concurrency",
            "0",
        ]);

        let import_config = resolve_import_config(&config, &args).unwrap();

        assert_eq!(import_config.assumed_country.unwrap().iso(), "KE");
        assert_eq!(import_config.state_path, "/tmp/s.json");
        assert_eq!(import_config.batch_size, 5);
        assert_eq!(import_config.concurrency, 1);
    }

    #[test]
    fn test_resolve_import_config_keeps_config_values() {
        let config = Config {
            max_run_secs: Some(60),
            batch_size: 7,
            ..Default::default()
        };
        let args = Args::parse_from(["contact-importer", "numbers.txt"]);

        let import_config = resolve_import_config(&config, &args).unwrap();

        assert_eq!(import_config.batch_size, 7);
        assert_eq!(import_config.max_run_duration, Some(Duration::from_secs(60)));
        assert!(import_config.assumed_country.is_none());
    }

    #[test]
    fn test_resolve_import_config_unknown_country() {
        let args = Args::parse_from(["contact-importer", "numbers.txt", "--country", "XX"]);

        let err = resolve_import_config(&Config::default(), &args).unwrap_err();

        assert!(matches!(err, ImportError::Config(_)));
    }

    #[test]
    fn test_unique_valid_records() {
        let lines = vec![
            InputLine::new(1, "+254712345678"),
            InputLine::new(2, "nope"),
            InputLine::new(3, "+254 712 345 678"),
            InputLine::new(4, "+14155550123"),
        ];
        let plan = ImportPlan::build(&lines, None, &HashSet::new());

        let records = unique_valid_records(&plan);

        let lines: Vec<usize> = records.iter().map(|r| r.line_number()).collect();
        assert_eq!(lines, vec![1, 4]);
    }
}
