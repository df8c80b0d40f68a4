//! テスト用のフェイクAPI・通知・描画

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use docflow_common::{ActionCatalog, ResultRecord, RetryRequest, Trace};
use docflow_dashboard::api::{DashboardApi, RetryResponse, UploadResponse};
use docflow_dashboard::dashboard::Dashboard;
use docflow_dashboard::error::{DashboardError, Result};
use docflow_dashboard::notify::{Notifier, Severity};
use docflow_dashboard::render::{DashboardView, Renderer};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// `GET /results` の1回分の応答
pub enum Scripted {
    Ok(Duration, Vec<ResultRecord>),
    Err(Duration),
}

/// `POST /upload` の挙動
#[derive(Clone)]
pub enum UploadBehavior {
    Accept { processing_id: i64, delay: Duration },
    Http { status: u16, detail: Option<String> },
    Network,
}

/// `POST /retry-action` の挙動
#[derive(Clone, Copy)]
pub enum RetryBehavior {
    Accept,
    Reject,
    Http,
    Network,
}

pub struct FakeApi {
    pub results: Mutex<Vec<ResultRecord>>,
    pub scripted: Mutex<VecDeque<Scripted>>,
    pub upload: Mutex<UploadBehavior>,
    pub retry: Mutex<RetryBehavior>,
    pub reachable: AtomicBool,
    pub panic_on_list: AtomicBool,
    pub list_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    pub retry_calls: AtomicUsize,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            results: Mutex::new(Vec::new()),
            scripted: Mutex::new(VecDeque::new()),
            upload: Mutex::new(UploadBehavior::Accept {
                processing_id: 42,
                delay: Duration::ZERO,
            }),
            retry: Mutex::new(RetryBehavior::Accept),
            reachable: AtomicBool::new(true),
            panic_on_list: AtomicBool::new(false),
            list_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            retry_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeApi {
    pub fn with_results(results: Vec<ResultRecord>) -> Self {
        let api = Self::default();
        *api.results.lock().unwrap() = results;
        api
    }

    pub fn script(&self, response: Scripted) {
        self.scripted.lock().unwrap().push_back(response);
    }

    pub fn set_upload(&self, behavior: UploadBehavior) {
        *self.upload.lock().unwrap() = behavior;
    }

    pub fn set_retry(&self, behavior: RetryBehavior) {
        *self.retry.lock().unwrap() = behavior;
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn upload(&self, file_name: &str, _data: Vec<u8>) -> Result<UploadResponse> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.upload.lock().unwrap().clone();
        match behavior {
            UploadBehavior::Accept {
                processing_id,
                delay,
            } => {
                tokio::time::sleep(delay).await;
                self.results.lock().unwrap().push(ResultRecord {
                    id: processing_id,
                    filename: file_name.to_string(),
                    file_type: Some("pdf".into()),
                    business_intent: Some("Invoice".to_string()),
                    status: Some("completed".into()),
                    ..Default::default()
                });
                Ok(UploadResponse { processing_id })
            }
            UploadBehavior::Http { status, detail } => Err(DashboardError::Http { status, detail }),
            UploadBehavior::Network => Err(DashboardError::Network("connection refused".into())),
        }
    }

    async fn list_results(&self) -> Result<Vec<ResultRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_on_list.load(Ordering::SeqCst) {
            panic!("list_results exploded");
        }
        let next = self.scripted.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Ok(delay, records)) => {
                tokio::time::sleep(delay).await;
                Ok(records)
            }
            Some(Scripted::Err(delay)) => {
                tokio::time::sleep(delay).await;
                Err(DashboardError::Http {
                    status: 503,
                    detail: None,
                })
            }
            None => Ok(self.results.lock().unwrap().clone()),
        }
    }

    async fn get_result(&self, id: i64) -> Result<ResultRecord> {
        self.results
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(DashboardError::Http {
                status: 404,
                detail: Some("Result not found".into()),
            })
    }

    async fn retry_action(&self, request: &RetryRequest) -> Result<RetryResponse> {
        self.retry_calls.fetch_add(1, Ordering::SeqCst);
        let behavior = *self.retry.lock().unwrap();
        match behavior {
            RetryBehavior::Accept => {
                // サーバー側でアクションが追加された状態を再現
                let mut results = self.results.lock().unwrap();
                if let Some(record) = results.iter_mut().find(|r| r.id == request.processing_id) {
                    if !record.actions_taken.contains(&request.action_type) {
                        record.actions_taken.push(request.action_type.clone());
                    }
                }
                Ok(RetryResponse {
                    status: Some("success".into()),
                    message: None,
                })
            }
            RetryBehavior::Reject => Ok(RetryResponse {
                status: Some("failed".into()),
                message: Some(format!("Failed to retry action {}", request.action_type)),
            }),
            RetryBehavior::Http => Err(DashboardError::Http {
                status: 404,
                detail: Some("Processing result not found".into()),
            }),
            RetryBehavior::Network => Err(DashboardError::Network("timeout".into())),
        }
    }

    async fn health(&self) -> Result<()> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DashboardError::Network("unreachable".into()))
        }
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub messages: Mutex<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.lock().unwrap().clone()
    }

    pub fn contains(&self, severity: Severity, message: &str) -> bool {
        self.messages()
            .iter()
            .any(|(s, m)| *s == severity && m == message)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push((severity, message.to_string()));
    }
}

#[derive(Default)]
pub struct CountingRenderer {
    pub renders: AtomicUsize,
    pub details: Mutex<Vec<Trace>>,
    pub last_view: Mutex<Option<DashboardView>>,
}

impl CountingRenderer {
    pub fn render_count(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    pub fn detail_count(&self) -> usize {
        self.details.lock().unwrap().len()
    }
}

impl Renderer for CountingRenderer {
    fn render(&self, view: &DashboardView) {
        self.renders.fetch_add(1, Ordering::SeqCst);
        *self.last_view.lock().unwrap() = Some(view.clone());
    }

    fn render_detail(&self, _record: &ResultRecord, trace: &Trace, _now: DateTime<Utc>) {
        self.details.lock().unwrap().push(trace.clone());
    }
}

pub struct Harness {
    pub api: Arc<FakeApi>,
    pub notifier: Arc<RecordingNotifier>,
    pub renderer: Arc<CountingRenderer>,
    pub dashboard: Dashboard,
}

pub fn harness(api: FakeApi) -> Harness {
    let api = Arc::new(api);
    let notifier = Arc::new(RecordingNotifier::default());
    let renderer = Arc::new(CountingRenderer::default());
    let dashboard = Dashboard::new(
        api.clone(),
        notifier.clone(),
        renderer.clone(),
        ActionCatalog::builtin(),
    );
    Harness {
        api,
        notifier,
        renderer,
        dashboard,
    }
}

pub fn record(id: i64, status: &str, file_type: &str) -> ResultRecord {
    ResultRecord {
        id,
        filename: format!("doc{}.{}", id, file_type),
        file_type: Some(file_type.into()),
        business_intent: Some("Invoice".to_string()),
        status: Some(status.into()),
        created_at: Some(Utc::now()),
        ..Default::default()
    }
}
