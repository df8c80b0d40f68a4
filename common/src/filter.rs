//! 結果フィルタ
//!
//! 指定された条件（ステータス・ファイル種別・意図）の完全一致の論理積で絞り込む。
//! 未指定の条件は制約にならない。並び順はサーバー応答の順序のまま。

use crate::types::{FileType, ResultRecord, ResultStatus};
use serde::{Deserialize, Serialize};

/// フィルタ条件
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub status: Option<ResultStatus>,
    #[serde(default)]
    pub file_type: Option<FileType>,
    #[serde(default)]
    pub business_intent: Option<String>,
}

impl FilterCriteria {
    /// 空文字は「指定なし」として扱う（セレクトボックスの未選択に相当）
    pub fn from_parts(
        status: Option<&str>,
        file_type: Option<&str>,
        business_intent: Option<&str>,
    ) -> Self {
        fn present(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }

        Self {
            status: present(status).map(ResultStatus::from),
            file_type: present(file_type).map(FileType::from),
            business_intent: present(business_intent).map(str::to_string),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.file_type.is_none() && self.business_intent.is_none()
    }

    pub fn matches(&self, record: &ResultRecord) -> bool {
        if let Some(status) = &self.status {
            if record.status.as_ref() != Some(status) {
                return false;
            }
        }
        if let Some(file_type) = &self.file_type {
            if record.file_type.as_ref() != Some(file_type) {
                return false;
            }
        }
        if let Some(intent) = &self.business_intent {
            if record.business_intent.as_ref() != Some(intent) {
                return false;
            }
        }
        true
    }
}

/// 条件に一致するレコードを元の順序のまま返す
pub fn filter<'a>(records: &'a [ResultRecord], criteria: &FilterCriteria) -> Vec<&'a ResultRecord> {
    records.iter().filter(|r| criteria.matches(r)).collect()
}
