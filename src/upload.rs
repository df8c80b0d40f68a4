//! アップロード制御
//!
//! 状態機械（`docflow_common::UploadMachine`）を実際の送信に結び付ける。
//! 同時に進行できるアップロードは1件のみで、Idle 以外のときの新規送信は `UploadBusy`。
//! 終端後のリセットと詳細表示は遅延付きの後続処理として返し、呼び出し側がスケジュールする。

use crate::dashboard::Dashboard;
use crate::error::{DashboardError, Result};
use docflow_common::upload::{validate, FileCandidate};
use docflow_common::{FailureReason, ProgressMilestone, UploadMachine, UploadState};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// 終端状態の後に行う処理
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    /// 新しい結果の詳細（トレース）を開く
    OpenDetails { result_id: i64, after: Duration },
    /// Idle に戻してアップロードを再び受け付ける
    Reset { after: Duration },
}

impl FollowUp {
    pub fn delay(&self) -> Duration {
        match self {
            FollowUp::OpenDetails { after, .. } | FollowUp::Reset { after } => *after,
        }
    }
}

/// 1回分のアップロード結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReport {
    pub file_name: String,
    pub state: UploadState,
    pub follow_ups: Vec<FollowUp>,
}

impl UploadReport {
    pub fn result_id(&self) -> Option<i64> {
        match self.state {
            UploadState::Succeeded { result_id } => Some(result_id),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct UploadController {
    dashboard: Dashboard,
    machine: Arc<Mutex<UploadMachine>>,
    state_tx: Arc<watch::Sender<UploadState>>,
    reset_delay: Duration,
    detail_delay: Duration,
}

impl UploadController {
    pub fn new(dashboard: Dashboard, reset_delay: Duration, detail_delay: Duration) -> Self {
        let (state_tx, _) = watch::channel(UploadState::Idle);
        Self {
            dashboard,
            machine: Arc::new(Mutex::new(UploadMachine::new())),
            state_tx: Arc::new(state_tx),
            reset_delay,
            detail_delay,
        }
    }

    /// 状態変化の購読（進捗表示用）
    pub fn subscribe(&self) -> watch::Receiver<UploadState> {
        self.state_tx.subscribe()
    }

    pub async fn state(&self) -> UploadState {
        self.machine.lock().await.state().clone()
    }

    /// 直近の試行で通過した状態
    pub async fn history(&self) -> Vec<UploadState> {
        self.machine.lock().await.history().to_vec()
    }

    /// ファイルパスから送信（サイズはメタデータで判定し、超過時は読み込まない）
    pub async fn submit_path(&self, path: &Path) -> Result<UploadReport> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let size = tokio::fs::metadata(path).await?.len();
        let candidate = FileCandidate::new(file_name, size);

        let data = if validate(&candidate).is_ok() {
            tokio::fs::read(path).await?
        } else {
            Vec::new()
        };
        self.run(candidate, data).await
    }

    /// メモリ上のデータを送信
    pub async fn submit(&self, file_name: &str, data: Vec<u8>) -> Result<UploadReport> {
        let candidate = FileCandidate::new(file_name, data.len() as u64);
        self.run(candidate, data).await
    }

    async fn run(&self, candidate: FileCandidate, data: Vec<u8>) -> Result<UploadReport> {
        let notifier = self.dashboard.notifier();

        // Idle → Validating（進行中なら拒否）
        {
            let mut machine = self.machine.lock().await;
            if machine.state().is_active() {
                return Err(DashboardError::UploadBusy);
            }
            machine.begin()?;
            self.publish(&machine);

            if let Err(e) = machine.validate(&candidate) {
                self.publish(&machine);
                if let docflow_common::Error::Validation(v) = &e {
                    warn!(file = %candidate.file_name, error = %v, "アップロード前の検証に失敗");
                    notifier.error(v.user_message());
                }
                return Ok(self.report(&candidate, &machine));
            }

            machine.start_upload()?;
            self.publish(&machine);
            machine.advance(ProgressMilestone::Requesting)?;
            self.publish(&machine);
        }

        info!(file = %candidate.file_name, size = candidate.size, "アップロード開始");
        let response = self.dashboard.api().upload(&candidate.file_name, data).await;

        let mut machine = self.machine.lock().await;
        match response {
            Ok(resp) => {
                machine.acknowledge()?;
                self.publish(&machine);
                machine.succeed(resp.processing_id)?;
                self.publish(&machine);
                drop(machine);

                info!(file = %candidate.file_name, id = resp.processing_id, "アップロード完了");
                notifier.success(&format!(
                    "File \"{}\" processed successfully!",
                    candidate.file_name
                ));
                self.dashboard.refresh().await;

                let machine = self.machine.lock().await;
                Ok(self.report(&candidate, &machine))
            }
            Err(e) => {
                // 応答自体は届いた（2xx 以外）ときだけ Processing を経由する
                let reason = match &e {
                    DashboardError::Http { .. } | DashboardError::Data(_) => {
                        machine.acknowledge()?;
                        self.publish(&machine);
                        FailureReason::Server(e.reason())
                    }
                    _ => FailureReason::Network(e.reason()),
                };
                warn!(file = %candidate.file_name, error = %e, "アップロード失敗");
                notifier.error(&format!("Upload failed: {}", reason));
                machine.fail(reason)?;
                self.publish(&machine);
                Ok(self.report(&candidate, &machine))
            }
        }
    }

    fn report(&self, candidate: &FileCandidate, machine: &UploadMachine) -> UploadReport {
        let state = machine.state().clone();
        let mut follow_ups = Vec::new();
        if let UploadState::Succeeded { result_id } = state {
            follow_ups.push(FollowUp::OpenDetails {
                result_id,
                after: self.detail_delay,
            });
        }
        follow_ups.push(FollowUp::Reset {
            after: self.reset_delay,
        });
        UploadReport {
            file_name: candidate.file_name.clone(),
            state,
            follow_ups,
        }
    }

    fn publish(&self, machine: &UploadMachine) {
        self.state_tx.send_replace(machine.state().clone());
    }

    /// 後続処理を即時に実行（遅延は呼び出し側の責任）
    pub async fn run_follow_up(&self, follow_up: FollowUp) -> Result<()> {
        match follow_up {
            FollowUp::OpenDetails { result_id, .. } => {
                self.dashboard.show_details(result_id).await?;
            }
            FollowUp::Reset { .. } => {
                let mut machine = self.machine.lock().await;
                machine.reset()?;
                self.publish(&machine);
            }
        }
        Ok(())
    }

    /// 後続処理をそれぞれの遅延後に実行するタスクを起動
    pub fn schedule(&self, report: &UploadReport) -> Vec<JoinHandle<()>> {
        report
            .follow_ups
            .iter()
            .map(|&follow_up| {
                let this = self.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(follow_up.delay()).await;
                    if let Err(e) = this.run_follow_up(follow_up).await {
                        warn!(?follow_up, error = %e, "後続処理に失敗");
                    }
                })
            })
            .collect()
    }
}
