//! VCF Exporter
//!
//! 電話番号をvCard 3.0形式で書き出す（端末の連絡先に直接取り込む用）

use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::PathBuf;

use crate::domain::entities::phone_record::PhoneRecord;

/// 1件分のvCardを組み立てる
///
/// 名前は `<prefix> <下4桁>`。行末はRFC 2426に従いCRLF
pub fn render_vcard(record: &PhoneRecord, name_prefix: &str) -> String {
    let suffix = record.last_digits(4);
    format!(
        "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:{prefix} {suffix}\r\nN:{suffix};{prefix};;;\r\nTEL;TYPE=CELL:{tel}\r\nEND:VCARD\r\n",
        prefix = escape(name_prefix),
        suffix = suffix,
        tel = record.display_number(),
    )
}

/// vCardのテキスト値のエスケープ
fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace(';', "\\;")
}

/// 有効なレコードをVCFファイルに書き出す
///
/// # Returns
///
/// 書き出した件数
///
/// # Errors
///
/// 書き込みに失敗した場合にエラーを返す
pub fn export(records: &[PhoneRecord], path: &str, name_prefix: &str) -> Result<usize> {
    let path = PathBuf::from(shellexpand::tilde(path).as_ref());

    let cards: Vec<String> = records
        .iter()
        .filter(|record| record.is_valid())
        .map(|record| render_vcard(record, name_prefix))
        .collect();

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).context("Failed to create export directory")?;
        }
    }
    fs::write(&path, cards.concat())
        .with_context(|| format!("Failed to write VCF file: {}", path.display()))?;

    info!("Exported {} contacts to {}", cards.len(), path.display());
    Ok(cards.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_render_vcard() {
        let record = PhoneRecord::valid("0712 345 678", 1, "254712345678");

        let card = render_vcard(&record, "Contact");

        assert_eq!(
            card,
            "BEGIN:VCARD\r\nVERSION:3.0\r\nFN:Contact 5678\r\nN:5678;Contact;;;\r\nTEL;TYPE=CELL:+254712345678\r\nEND:VCARD\r\n"
        );
    }

    #[test]
    fn test_render_escapes_prefix() {
        let record = PhoneRecord::valid("+85291234567", 1, "85291234567");

        let card = render_vcard(&record, "Lead; HK");

        assert!(card.contains("FN:Lead\\; HK 4567\r\n"));
    }

    #[test]
    fn test_export_skips_invalid() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contacts.vcf");
        let records = vec![
            PhoneRecord::valid("+254712345678", 1, "254712345678"),
            PhoneRecord::invalid("abc", 2, "unrecognized format"),
            PhoneRecord::valid("+14155550123", 3, "14155550123"),
        ];

        let count = export(&records, path.to_str().unwrap(), "Contact").unwrap();

        assert_eq!(count, 2);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.matches("BEGIN:VCARD").count(), 2);
        assert!(content.contains("TEL;TYPE=CELL:+14155550123"));
    }
}
