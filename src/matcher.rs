//! Matcher Module
//!
//! XML由来の人物レコードから照合インデックスを構築し、表形式の行に
//! 文書番号を付与するモジュール。

use log::{debug, warn};
use rayon::prelude::*;
use std::collections::HashMap;

use crate::types::{IdentityKey, PersonRecord, TabularRow};

/// 照合キーから文書番号へのマッピング
///
/// 現在の姓と旧姓の両方のバリエーションを登録します。同じキーが
/// 複数のレコードに現れた場合は後のレコードが優先されます。
#[derive(Debug, Clone, Default)]
pub struct MatchIndex {
    entries: HashMap<IdentityKey, String>,
}

impl MatchIndex {
    /// 人物レコードの列からインデックスを構築
    ///
    /// 生年月日がちょうど3要素に分解できないレコードはスキップされます。
    pub fn build(records: &[PersonRecord]) -> Self {
        let mut entries = HashMap::new();
        let mut skipped = 0usize;

        for record in records {
            let keys = record.identity_keys();
            if keys.is_empty() {
                skipped += 1;
                continue;
            }
            for key in keys {
                entries.insert(key, record.document_id.clone());
            }
        }

        if skipped > 0 {
            warn!(
                "Skipped {} XML records whose birthday is not in DD.MM.YYYY form",
                skipped
            );
        }
        debug!("Built match index with {} keys", entries.len());

        Self { entries }
    }

    /// キーに対応する文書番号
    pub fn lookup(&self, key: &IdentityKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// 登録されているキーの数
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// インデックスが空かどうか
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 行に文書番号を付与する
    ///
    /// 一致する行の`document_number`のみを書き換え、一致しない行はそのままにします。
    /// 行の順序は保持されます。
    ///
    /// # 戻り値
    ///
    /// 一致した行の数
    pub fn apply(&self, rows: &mut [TabularRow]) -> usize {
        rows.par_iter_mut()
            .map(|row| match self.lookup(&row.identity_key()) {
                Some(document_id) => {
                    row.document_number = document_id.to_string();
                    1usize
                }
                None => 0usize,
            })
            .sum()
    }
}
