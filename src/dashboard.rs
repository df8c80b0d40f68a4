//! ダッシュボードのコントローラ
//!
//! アプリケーション状態（結果コレクション・フィルタ・集計・表示中のトレース）を1か所で持ち、
//! 更新・絞り込み・詳細表示・アクション再実行を受け付ける。描画は状態からの射影で、
//! 状態を変更した操作の最後に `Renderer` を呼ぶ。
//!
//! 集計と結果一覧は同じ `GET /results` を別々に並行で取得する。それぞれ連番で新旧を判定し、
//! 遅れて届いた古い応答は捨てる。

use crate::api::DashboardApi;
use crate::error::{DashboardError, Result};
use crate::notify::Notifier;
use crate::render::{project, DashboardView, Renderer};
use chrono::Utc;
use docflow_common::{
    aggregate, reconstruct, ActionCatalog, FilterCriteria, RequestSequence, ResultRecord,
    ResultStore, RetryRequest, Statistics, Trace,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// 詳細表示中の結果とそのトレース
#[derive(Debug, Clone)]
pub struct Detail {
    pub record: ResultRecord,
    pub trace: Trace,
}

/// パネルの取得状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PanelStatus {
    #[default]
    Loading,
    Ready,
    /// 直近の取得に失敗し、前回のデータを表示中
    Stale,
    /// 一度も取得できていない
    Failed,
}

impl PanelStatus {
    fn after_failure(self) -> Self {
        match self {
            PanelStatus::Ready | PanelStatus::Stale => PanelStatus::Stale,
            PanelStatus::Loading | PanelStatus::Failed => PanelStatus::Failed,
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    pub store: ResultStore,
    pub statistics: Statistics,
    pub statistics_status: PanelStatus,
    pub results_status: PanelStatus,
    pub detail: Option<Detail>,
    statistics_seq: RequestSequence,
    results_seq: RequestSequence,
}

/// 同時に発行した集計・一覧更新の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshOutcome {
    pub statistics_ok: bool,
    pub results_ok: bool,
}

impl RefreshOutcome {
    pub fn all_ok(&self) -> bool {
        self.statistics_ok && self.results_ok
    }
}

/// アクション再実行の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// 受理され、トレースを再取得した
    Retried,
    /// サーバーが失敗を返した
    Rejected,
    /// 通信できなかった
    Errored,
}

#[derive(Clone)]
pub struct Dashboard {
    api: Arc<dyn DashboardApi>,
    notifier: Arc<dyn Notifier>,
    renderer: Arc<dyn Renderer>,
    catalog: Arc<ActionCatalog>,
    state: Arc<Mutex<AppState>>,
}

impl Dashboard {
    pub fn new(
        api: Arc<dyn DashboardApi>,
        notifier: Arc<dyn Notifier>,
        renderer: Arc<dyn Renderer>,
        catalog: ActionCatalog,
    ) -> Self {
        Self {
            api,
            notifier,
            renderer,
            catalog: Arc::new(catalog),
            state: Arc::new(Mutex::new(AppState::default())),
        }
    }

    pub fn api(&self) -> Arc<dyn DashboardApi> {
        Arc::clone(&self.api)
    }

    pub fn notifier(&self) -> Arc<dyn Notifier> {
        Arc::clone(&self.notifier)
    }

    /// 集計パネルを更新
    ///
    /// 新しい応答が既に反映済みなら、この応答は捨てて `Ok(false)` を返す。
    pub async fn refresh_statistics(&self) -> Result<bool> {
        let seq = self.state.lock().await.statistics_seq.issue();
        let fetched = self.api.list_results().await;

        let mut state = self.state.lock().await;
        match fetched {
            Ok(records) => {
                if !state.statistics_seq.accept(seq) {
                    debug!(seq, "古い集計応答を破棄");
                    return Ok(false);
                }
                state.statistics = aggregate(&records, Utc::now());
                state.statistics_status = PanelStatus::Ready;
                Ok(true)
            }
            Err(e) => {
                if seq > state.statistics_seq.last_accepted() {
                    state.statistics_status = state.statistics_status.after_failure();
                }
                warn!(error = %e, "集計の取得に失敗（前回の値を表示）");
                Err(e)
            }
        }
    }

    /// 結果一覧を更新（コレクションは丸ごと置き換え）
    pub async fn refresh_results(&self) -> Result<bool> {
        let seq = self.state.lock().await.results_seq.issue();
        let fetched = self.api.list_results().await;

        let mut state = self.state.lock().await;
        match fetched {
            Ok(records) => {
                if !state.results_seq.accept(seq) {
                    debug!(seq, "古い一覧応答を破棄");
                    return Ok(false);
                }
                debug!(count = records.len(), "結果一覧を更新");
                state.store.set_results(records);
                state.results_status = PanelStatus::Ready;
                Ok(true)
            }
            Err(e) => {
                if seq > state.results_seq.last_accepted() {
                    state.results_status = state.results_status.after_failure();
                }
                warn!(error = %e, "結果一覧の取得に失敗（前回の値を表示）");
                Err(e)
            }
        }
    }

    /// 集計と一覧を並行に更新して描画（片方の失敗はもう片方に影響しない）
    pub async fn refresh(&self) -> RefreshOutcome {
        let (statistics, results) = tokio::join!(self.refresh_statistics(), self.refresh_results());
        let outcome = RefreshOutcome {
            statistics_ok: statistics.is_ok(),
            results_ok: results.is_ok(),
        };
        self.render().await;
        outcome
    }

    /// 手動更新（結果を通知する）
    pub async fn refresh_manual(&self) -> RefreshOutcome {
        let outcome = self.refresh().await;
        if outcome.all_ok() {
            self.notifier.success("Data refreshed successfully");
        } else {
            self.notifier.error("Failed to refresh data");
        }
        outcome
    }

    /// 絞り込み条件を変更（一覧を取得済みなら再描画）
    pub async fn set_filter(&self, criteria: FilterCriteria) {
        let loaded = {
            let mut state = self.state.lock().await;
            state.store.set_filter(criteria);
            state.store.is_loaded()
        };
        if loaded {
            self.render().await;
        }
    }

    /// 1件取得してトレースを再構成・表示
    pub async fn show_details(&self, id: i64) -> Result<Trace> {
        let record = match self.api.get_result(id).await {
            Ok(record) => record,
            Err(e) => {
                warn!(id, error = %e, "詳細の取得に失敗");
                self.notifier.error("Failed to load result details");
                return Err(e);
            }
        };

        let trace = reconstruct(&record, &self.catalog);
        self.renderer.render_detail(&record, &trace, Utc::now());
        self.state.lock().await.detail = Some(Detail {
            record,
            trace: trace.clone(),
        });
        Ok(trace)
    }

    /// アクションを再実行し、成功したらトレースを再取得する
    ///
    /// 失敗時は表示中のトレースを変更しない。重複排除はしない。
    pub async fn retry_action(&self, id: i64, action: &str) -> RetryOutcome {
        self.notifier.info(&format!("Retrying action: {}...", action));
        let request = RetryRequest {
            processing_id: id,
            action_type: action.to_string(),
        };

        match self.api.retry_action(&request).await {
            Ok(resp) if resp.is_success() => {
                info!(id, action, "アクション再実行を受理");
                self.notifier
                    .success(&format!("Action {} retried successfully", action));
                // 再取得の失敗は show_details 側で通知済み
                let _ = self.show_details(id).await;
                RetryOutcome::Retried
            }
            Ok(resp) => {
                warn!(id, action, message = ?resp.message, "アクション再実行が失敗");
                self.notifier
                    .error(&format!("Failed to retry action: {}", action));
                RetryOutcome::Rejected
            }
            Err(DashboardError::Http { status, .. }) => {
                warn!(id, action, status, "アクション再実行が拒否された");
                self.notifier
                    .error(&format!("Failed to retry action: {}", action));
                RetryOutcome::Rejected
            }
            Err(e) => {
                warn!(id, action, error = %e, "アクション再実行の通信エラー");
                self.notifier.error("Error retrying action");
                RetryOutcome::Errored
            }
        }
    }

    /// 現在の状態を描画
    pub async fn render(&self) {
        let view = self.view().await;
        self.renderer.render(&view);
    }

    pub async fn view(&self) -> DashboardView {
        let state = self.state.lock().await;
        project(&state, Utc::now())
    }

    pub async fn statistics(&self) -> Statistics {
        self.state.lock().await.statistics.clone()
    }

    pub async fn results(&self) -> Vec<ResultRecord> {
        self.state.lock().await.store.results().to_vec()
    }

    pub async fn filtered_ids(&self) -> Vec<i64> {
        let state = self.state.lock().await;
        state.store.filtered().iter().map(|r| r.id).collect()
    }

    pub async fn detail(&self) -> Option<Detail> {
        self.state.lock().await.detail.clone()
    }

    pub async fn panel_status(&self) -> (PanelStatus, PanelStatus) {
        let state = self.state.lock().await;
        (state.statistics_status, state.results_status)
    }
}
