//! Export Adapters
//!
//! 連絡先ファイルへの書き出し

pub mod vcf_exporter;
