//! Contact Importer
//!
//! 電話番号リストを連絡先サービスに一括登録する

// coverage_nightly cfg が設定されている場合のみ coverage_attribute を有効化
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

use clap::Parser;
use std::process::ExitCode;

use contact_importer::adapter::config::Config;
use contact_importer::domain::errors::{error_chain_to_string, ImportError, EXIT_IO};
use contact_importer::driver::{Args, ContactImportWorkflow};

#[cfg_attr(coverage_nightly, coverage(off))]
#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let args = Args::parse();

    // Load configuration
    let config = match Config::load_or_default(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("✗ {}", error_chain_to_string(&e));
            return ExitCode::from(EXIT_IO);
        }
    };

    // Create workflow with injected dependencies
    let workflow = ContactImportWorkflow::new(config);

    match workflow.execute(args).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ImportError>() {
            Some(import_error) => {
                eprintln!("✗ {}", import_error);
                ExitCode::from(import_error.exit_code())
            }
            None => {
                eprintln!("✗ {}", error_chain_to_string(&e));
                ExitCode::FAILURE
            }
        },
    }
}
