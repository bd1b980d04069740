//! # ContactBatch Value Object
//!
//! 送信対象レコードのバッチ

use super::phone_record::PhoneRecord;

/// 送信バッチ
///
/// 有効かつ未処理のレコードだけを含む。セッションは変更しない
#[derive(Debug, Clone)]
pub struct ContactBatch {
    records: Vec<PhoneRecord>,
}

impl ContactBatch {
    /// 新しいバッチを作成
    pub fn new(records: Vec<PhoneRecord>) -> Self {
        Self { records }
    }

    /// バッチ内のレコード数を返す
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// バッチが空かどうかを返す
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// レコードへの参照を返す
    pub fn records(&self) -> &[PhoneRecord] {
        &self.records
    }

    /// レコードの所有権を移動して返す
    pub fn into_records(self) -> Vec<PhoneRecord> {
        self.records
    }

    /// レコード列を最大サイズごとのバッチに遅延分割する
    ///
    /// `batch_size` が0の場合は全体を1バッチとする
    pub fn chunked(
        records: &[PhoneRecord],
        batch_size: usize,
    ) -> impl Iterator<Item = ContactBatch> + '_ {
        let size = if batch_size == 0 {
            records.len().max(1)
        } else {
            batch_size
        };
        records
            .chunks(size)
            .map(|chunk| ContactBatch::new(chunk.to_vec()))
    }

    /// バッチ数を計算
    pub fn count_for(total: usize, batch_size: usize) -> usize {
        if batch_size == 0 {
            return usize::from(total > 0);
        }
        total.div_ceil(batch_size)
    }
}

impl From<Vec<PhoneRecord>> for ContactBatch {
    fn from(records: Vec<PhoneRecord>) -> Self {
        Self::new(records)
    }
}
