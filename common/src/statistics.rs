//! 集計
//!
//! 毎回コレクション全体から再計算する純粋関数。差分更新はしない。
//! 「直近24時間」は呼び出し時刻に依存するため `now` を引数で受け取る。

use crate::types::ResultRecord;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 直近件数の集計窓
pub const RECENT_WINDOW_HOURS: i64 = 24;

/// 集計結果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_file_type: BTreeMap<String, usize>,
    pub by_intent: BTreeMap<String, usize>,
    pub recent_24h: usize,
}

impl Statistics {
    /// 完了件数（キーが無ければ0）
    pub fn completed(&self) -> usize {
        self.by_status.get("completed").copied().unwrap_or(0)
    }

    /// 出現したファイル種別の数
    pub fn file_type_count(&self) -> usize {
        self.by_file_type.len()
    }
}

/// 集計を実行
///
/// 欠損したステータス・種別・意図は `"undefined"` キーで数える。
pub fn aggregate(records: &[ResultRecord], now: DateTime<Utc>) -> Statistics {
    let cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
    let mut stats = Statistics {
        total: records.len(),
        ..Default::default()
    };

    for record in records {
        *stats.by_status.entry(record.status_key().to_string()).or_insert(0) += 1;
        *stats.by_file_type.entry(record.file_type_key().to_string()).or_insert(0) += 1;
        *stats.by_intent.entry(record.intent_key().to_string()).or_insert(0) += 1;

        if record.created_at.is_some_and(|created| created > cutoff) {
            stats.recent_24h += 1;
        }
    }

    stats
}
