//! 結果コレクションの保持
//!
//! サーバーから取得した最新のコレクションと現在のフィルタ条件を持つ。
//! 更新は常に丸ごと置き換え。並行に発行したリクエストの応答は
//! `RequestSequence` で新旧を判定し、古い応答で新しいデータを上書きしない。

use crate::filter::{filter, FilterCriteria};
use crate::types::ResultRecord;

/// 発行順の連番による応答ガード
///
/// `issue()` で採番し、応答到着時に `accept(seq)` する。既に受け入れた番号より
/// 古い応答は捨てる。
#[derive(Debug, Clone, Default)]
pub struct RequestSequence {
    issued: u64,
    accepted: u64,
}

impl RequestSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新しいリクエスト番号を発行
    pub fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    /// 応答を反映してよいか判定し、よければ受け入れ済みとして記録
    pub fn accept(&mut self, seq: u64) -> bool {
        if seq > self.accepted && seq <= self.issued {
            self.accepted = seq;
            true
        } else {
            false
        }
    }

    pub fn last_accepted(&self) -> u64 {
        self.accepted
    }

    pub fn last_issued(&self) -> u64 {
        self.issued
    }
}

/// 結果コレクションとフィルタ条件
#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Vec<ResultRecord>,
    criteria: FilterCriteria,
    loaded: bool,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// コレクションを丸ごと置き換える
    pub fn set_results(&mut self, results: Vec<ResultRecord>) {
        self.results = results;
        self.loaded = true;
    }

    pub fn results(&self) -> &[ResultRecord] {
        &self.results
    }

    /// 一度でも取得に成功したか
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn set_filter(&mut self, criteria: FilterCriteria) {
        self.criteria = criteria;
    }

    /// 現在の条件で絞り込んだビュー（サーバー応答の順序を保つ）
    pub fn filtered(&self) -> Vec<&ResultRecord> {
        filter(&self.results, &self.criteria)
    }

    pub fn find(&self, id: i64) -> Option<&ResultRecord> {
        self.results.iter().find(|r| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
