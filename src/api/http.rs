//! reqwest による DashboardApi 実装

use super::{DashboardApi, ErrorBody, ResultEnvelope, ResultsEnvelope, RetryResponse, UploadResponse};
use crate::error::{DashboardError, Result};
use async_trait::async_trait;
use docflow_common::{ResultRecord, RetryRequest};
use std::time::Duration;
use tracing::debug;

pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DashboardError::Config(format!("HTTPクライアント初期化エラー: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// 2xx 以外を `Http{status, detail}` に変換
    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(DashboardError::Http {
            status: status.as_u16(),
            detail: ErrorBody::detail_from(&body),
        })
    }
}

#[async_trait]
impl DashboardApi for HttpApi {
    async fn upload(&self, file_name: &str, data: Vec<u8>) -> Result<UploadResponse> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        debug!(file_name, size = data.len(), mime = %mime, "POST /upload");

        let part = reqwest::multipart::Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())
            .map_err(|e| DashboardError::Network(format!("Multipart error: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .client
            .post(self.url("/upload"))
            .multipart(form)
            .send()
            .await?;
        let resp = Self::check(resp).await?;

        let body: serde_json::Value = resp.json().await?;
        let processing_id = body
            .get("processing_id")
            .and_then(serde_json::Value::as_i64)
            .ok_or_else(|| DashboardError::Data("processing_id がありません".into()))?;
        Ok(UploadResponse { processing_id })
    }

    async fn list_results(&self) -> Result<Vec<ResultRecord>> {
        debug!("GET /results");
        let resp = self.client.get(self.url("/results")).send().await?;
        let envelope: ResultsEnvelope = Self::check(resp).await?.json().await?;
        envelope.into_results()
    }

    async fn get_result(&self, id: i64) -> Result<ResultRecord> {
        debug!(id, "GET /results/{{id}}");
        let resp = self
            .client
            .get(self.url(&format!("/results/{}", id)))
            .send()
            .await?;
        let envelope: ResultEnvelope = Self::check(resp).await?.json().await?;
        envelope.into_result()
    }

    async fn retry_action(&self, request: &RetryRequest) -> Result<RetryResponse> {
        debug!(
            processing_id = request.processing_id,
            action = %request.action_type,
            "POST /retry-action"
        );
        let resp = self
            .client
            .post(self.url("/retry-action"))
            .json(request)
            .send()
            .await?;
        let resp = Self::check(resp).await?;
        // 本文が空・非JSONでも 2xx なら受理とみなす
        let text = resp.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or_default())
    }

    async fn health(&self) -> Result<()> {
        let resp = self.client.get(self.url("/health")).send().await?;
        Self::check(resp).await?;
        Ok(())
    }
}
