//! アクション説明カタログ
//!
//! アクションIDを人が読める説明文に変換する。既定の表に加えて、
//! JSONファイルで項目を追加・上書きできる。未知のIDは汎用の説明にフォールバックする。

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// アクションID → 説明文
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionCatalog {
    entries: HashMap<String, String>,
}

impl ActionCatalog {
    /// 組み込みの説明表
    pub fn builtin() -> Self {
        let mut catalog = Self::default();

        catalog.insert(
            "crm_escalation",
            "Escalated to CRM system due to complaint with urgent/angry tone",
        );
        catalog.insert(
            "risk_alert",
            "Risk alert triggered for potential fraud or high-value transaction",
        );
        catalog.insert(
            "high_value_invoice_approval",
            "High-value invoice flagged for approval workflow",
        );
        catalog.insert(
            "rfq_sales_notification",
            "Sales team notified of new RFQ submission",
        );
        catalog.insert(
            "compliance_team_alert",
            "Compliance team alerted of regulatory content",
        );

        catalog
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列（`{"action_id": "説明"}`）から読み込み
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(Error::Config("action catalog must be a JSON object".into()));
        }
        let catalog: Self = serde_json::from_value(value)?;
        Ok(catalog)
    }

    pub fn insert(&mut self, action: impl Into<String>, rationale: impl Into<String>) {
        self.entries.insert(action.into(), rationale.into());
    }

    pub fn get(&self, action: &str) -> Option<&str> {
        self.entries.get(action).map(String::as_str)
    }

    /// 説明文を取得（未登録なら `Custom action: {id}`）
    pub fn describe<'a>(&'a self, action: &str) -> Cow<'a, str> {
        match self.entries.get(action) {
            Some(rationale) => Cow::Borrowed(rationale.as_str()),
            None => Cow::Owned(format!("Custom action: {}", action)),
        }
    }

    /// 設定をマージ（後から追加した設定が優先）
    pub fn merge(&mut self, other: &ActionCatalog) {
        self.entries.extend(other.entries.clone());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
