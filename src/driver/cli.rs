//! CLI Argument Parsing
//!
//! CLIの引数解析

use clap::Parser;
use std::path::PathBuf;

use crate::adapter::config::DEFAULT_CONFIG_PATH;

/// 電話番号リストを連絡先サービスに一括登録するCLI
#[derive(Parser, Debug, Clone)]
#[command(name = "contact-importer")]
#[command(about = "Bulk-import phone numbers as contacts, resumably and within rate limits", long_about = None)]
pub struct Args {
    /// Text file with one phone number per line
    pub input: PathBuf,

    /// ISO country code applied to numbers without a calling code (e.g. KE)
    #[arg(long)]
    pub country: Option<String>,

    /// Write a JSON report of every processed line
    #[arg(long)]
    pub report: Option<String>,

    /// Dry run mode - parse and deduplicate only, never contact the service
    #[arg(long)]
    pub dry_run: bool,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,

    /// Session state file (overrides config)
    #[arg(long)]
    pub state: Option<String>,

    /// Records per batch (overrides config)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Concurrent submissions (overrides config)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Forget previously processed numbers for this session before running
    #[arg(long)]
    pub reset_session: bool,

    /// Export the valid numbers as a vCard file
    #[arg(long)]
    pub export_vcf: Option<String>,
}
