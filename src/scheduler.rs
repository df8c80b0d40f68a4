//! 定期更新と接続監視
//!
//! - 起動直後に1回、その後は一定間隔で集計と一覧を更新する
//! - `GET /health` の疎通確認で接続断・復帰を検知し、復帰時は即座に更新する
//!
//! 各回の更新は別タスクで実行し、パニックしても通知だけ出してループを続ける。

use crate::dashboard::{Dashboard, RefreshOutcome};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

pub const UNEXPECTED_ERROR: &str = "An unexpected error occurred";

/// 接続状態の変化
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connectivity {
    Lost,
    Restored,
}

/// 疎通確認の結果から接続状態の変化を検出する
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    online: bool,
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        // 起動時は接続ありとみなす
        Self { online: true }
    }
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_online(&self) -> bool {
        self.online
    }

    pub fn observe(&mut self, reachable: bool) -> Option<Connectivity> {
        let change = match (self.online, reachable) {
            (true, false) => Some(Connectivity::Lost),
            (false, true) => Some(Connectivity::Restored),
            _ => None,
        };
        self.online = reachable;
        change
    }
}

#[derive(Clone)]
pub struct RefreshScheduler {
    dashboard: Dashboard,
    refresh_interval: Duration,
    probe_interval: Duration,
}

/// 起動したループのハンドル
pub struct SchedulerHandle {
    pub refresh: JoinHandle<()>,
    pub probe: JoinHandle<()>,
}

impl SchedulerHandle {
    pub fn abort(&self) {
        self.refresh.abort();
        self.probe.abort();
    }
}

impl RefreshScheduler {
    pub fn new(dashboard: Dashboard, refresh_interval: Duration, probe_interval: Duration) -> Self {
        Self {
            dashboard,
            refresh_interval,
            probe_interval,
        }
    }

    /// 1回分の更新。パニックは捕捉して通知する
    pub async fn tick(&self) -> Option<RefreshOutcome> {
        self.guarded(false).await
    }

    /// 結果を通知する更新（接続復帰時など）。パニックの扱いは `tick` と同じ
    pub async fn manual_tick(&self) -> Option<RefreshOutcome> {
        self.guarded(true).await
    }

    async fn guarded(&self, manual: bool) -> Option<RefreshOutcome> {
        let dashboard = self.dashboard.clone();
        let handle = tokio::spawn(async move {
            if manual {
                dashboard.refresh_manual().await
            } else {
                dashboard.refresh().await
            }
        });

        match handle.await {
            Ok(outcome) => {
                if !outcome.all_ok() {
                    debug!(?outcome, "定期更新の一部が失敗");
                }
                Some(outcome)
            }
            Err(e) if e.is_panic() => {
                error!(error = %e, "定期更新中にパニック");
                self.dashboard.notifier().error(UNEXPECTED_ERROR);
                None
            }
            Err(e) => {
                warn!(error = %e, "定期更新タスクが中断");
                None
            }
        }
    }

    /// 一定間隔の更新ループ（最初の tick は即時）
    pub async fn run_refresh_loop(self) {
        let mut ticker = interval(self.refresh_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// 疎通確認を1回行い、接続状態の変化を処理する
    pub async fn probe(&self, monitor: &mut ConnectivityMonitor) -> Option<Connectivity> {
        let reachable = self.dashboard.api().health().await.is_ok();
        let change = monitor.observe(reachable);
        let notifier = self.dashboard.notifier();

        match change {
            Some(Connectivity::Lost) => {
                warn!("接続が切断されました");
                notifier.error("Connection lost");
            }
            Some(Connectivity::Restored) => {
                info!("接続が復帰しました");
                notifier.success("Connection restored");
                self.manual_tick().await;
            }
            None => {}
        }
        change
    }

    pub async fn run_probe_loop(self) {
        let mut ticker = interval(self.probe_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut monitor = ConnectivityMonitor::new();

        loop {
            ticker.tick().await;
            self.probe(&mut monitor).await;
        }
    }

    /// 両ループを起動
    pub fn spawn(self) -> SchedulerHandle {
        info!(
            refresh_secs = self.refresh_interval.as_secs(),
            probe_secs = self.probe_interval.as_secs(),
            "定期更新を開始"
        );
        let probe = tokio::spawn(self.clone().run_probe_loop());
        let refresh = tokio::spawn(self.run_refresh_loop());
        SchedulerHandle { refresh, probe }
    }
}
