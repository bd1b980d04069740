//! JSON Report Repository Implementation
//!
//! ReportRepositoryのJSON実装

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::info;
use std::fs;
use std::path::PathBuf;

use crate::domain::repositories::report_repository::{ImportReport, ReportRepository};

/// JSONファイルにレポートを書き出すリポジトリ
pub struct JsonReportRepository;

impl JsonReportRepository {
    pub fn new() -> Self {
        Self
    }

    fn write_sync(path: &str, report: &ImportReport) -> Result<()> {
        let path = PathBuf::from(shellexpand::tilde(path).as_ref());

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).context("Failed to create report directory")?;
            }
        }

        let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;

        info!(
            "Wrote report with {} operations to {}",
            report.operations.len(),
            path.display()
        );
        Ok(())
    }
}

#[async_trait]
impl ReportRepository for JsonReportRepository {
    async fn write(&self, path: &str, report: &ImportReport) -> Result<()> {
        let path = path.to_string();
        let report = report.clone();
        tokio::task::spawn_blocking(move || Self::write_sync(&path, &report))
            .await
            .map_err(|e| anyhow::anyhow!("Failed to spawn blocking task: {}", e))?
    }
}

impl Default for JsonReportRepository {
    fn default() -> Self {
        Self::new()
    }
}
