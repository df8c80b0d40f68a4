//! 上流パイプラインのHTTP契約
//!
//! - `POST /upload`（multipart `file`）→ `{processing_id}`
//! - `GET /results` → `{success, results}`
//! - `GET /results/{id}` → `{success, result}`
//! - `POST /retry-action` → `{status, message}`
//! - `GET /health`

mod http;

pub use http::HttpApi;

use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use docflow_common::{ResultRecord, RetryRequest};
use serde::Deserialize;

/// ダッシュボードが使うAPI
///
/// 実装:
/// - `HttpApi`: reqwest による実サーバー接続
/// - テスト用のフェイク（tests/support）
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// ファイルをアップロードし、処理IDを返す
    async fn upload(&self, file_name: &str, data: Vec<u8>) -> Result<UploadResponse>;

    /// 全結果を取得
    async fn list_results(&self) -> Result<Vec<ResultRecord>>;

    /// 1件取得
    async fn get_result(&self, id: i64) -> Result<ResultRecord>;

    /// アクションを再実行
    async fn retry_action(&self, request: &RetryRequest) -> Result<RetryResponse>;

    /// 接続確認
    async fn health(&self) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadResponse {
    pub processing_id: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetryResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RetryResponse {
    /// 2xx でも `status: "failed"` なら失敗扱い
    pub fn is_success(&self) -> bool {
        self.status.as_deref() != Some("failed")
    }
}

/// `GET /results` の応答
#[derive(Debug, Deserialize)]
pub struct ResultsEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub results: Option<Vec<ResultRecord>>,
}

impl ResultsEnvelope {
    pub fn into_results(self) -> Result<Vec<ResultRecord>> {
        if !self.success {
            return Err(DashboardError::Data("Failed to load results".into()));
        }
        self.results
            .ok_or_else(|| DashboardError::Data("results フィールドがありません".into()))
    }
}

/// `GET /results/{id}` の応答
#[derive(Debug, Deserialize)]
pub struct ResultEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub result: Option<ResultRecord>,
}

impl ResultEnvelope {
    pub fn into_result(self) -> Result<ResultRecord> {
        if !self.success {
            return Err(DashboardError::Data("Failed to load result details".into()));
        }
        self.result
            .ok_or_else(|| DashboardError::Data("result フィールドがありません".into()))
    }
}

/// 2xx 以外の応答本文
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// 本文から detail を取り出す（JSONでなければ None）
    pub(crate) fn detail_from(body: &str) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_str(body).ok()?;
        match parsed.detail? {
            serde_json::Value::String(s) if !s.is_empty() => Some(s),
            serde_json::Value::String(_) | serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_envelope() {
        let envelope: ResultsEnvelope = serde_json::from_str(
            r#"{"success": true, "results": [{"id": 1, "filename": "a.pdf", "file_type": "pdf"}]}"#,
        )
        .unwrap();
        let results = envelope.into_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].filename, "a.pdf");
    }

    #[test]
    fn test_results_envelope_failure_is_data_error() {
        let envelope: ResultsEnvelope = serde_json::from_str(r#"{"success": false}"#).unwrap();
        assert!(matches!(envelope.into_results(), Err(DashboardError::Data(_))));

        let envelope: ResultsEnvelope = serde_json::from_str(r#"{"success": true}"#).unwrap();
        assert!(matches!(envelope.into_results(), Err(DashboardError::Data(_))));
    }

    #[test]
    fn test_result_envelope() {
        let envelope: ResultEnvelope =
            serde_json::from_str(r#"{"success": true, "result": {"id": 42}}"#).unwrap();
        assert_eq!(envelope.into_result().unwrap().id, 42);
    }

    #[test]
    fn test_retry_response_status() {
        let ok: RetryResponse =
            serde_json::from_str(r#"{"status": "success", "message": "done"}"#).unwrap();
        assert!(ok.is_success());
        let failed: RetryResponse = serde_json::from_str(r#"{"status": "failed"}"#).unwrap();
        assert!(!failed.is_success());
        assert!(RetryResponse::default().is_success());
    }

    #[test]
    fn test_error_body_detail() {
        assert_eq!(
            ErrorBody::detail_from(r#"{"detail": "Error processing file: boom"}"#),
            Some("Error processing file: boom".to_string())
        );
        assert_eq!(ErrorBody::detail_from("Internal Server Error"), None);
        assert_eq!(ErrorBody::detail_from(r#"{"detail": ""}"#), None);
        assert_eq!(ErrorBody::detail_from("{}"), None);
    }
}
