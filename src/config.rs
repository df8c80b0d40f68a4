use crate::error::{DashboardError, Result};
use docflow_common::ActionCatalog;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 接続先の環境変数（設定ファイルより優先）
pub const BASE_URL_ENV: &str = "DOCFLOW_BASE_URL";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub base_url: String,
    pub refresh_interval_secs: u64,
    pub probe_interval_secs: u64,
    pub timeout_seconds: u64,
    /// 終端状態から Idle に戻すまでの待ち時間
    pub reset_delay_ms: u64,
    /// アップロード成功後に詳細を開くまでの待ち時間
    pub detail_delay_ms: u64,
    pub toast_success_ms: u64,
    pub toast_error_ms: u64,
    /// アクション説明の追加定義（JSON）
    pub action_catalog: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".into(),
            refresh_interval_secs: 30,
            probe_interval_secs: 5,
            timeout_seconds: 30,
            reset_delay_ms: 2000,
            detail_delay_ms: 1000,
            toast_success_ms: 3000,
            toast_error_ms: 5000,
            action_catalog: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        Ok(config)
    }

    /// 指定パスから読み込み（無ければ既定値）
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| DashboardError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("docflow").join("config.json"))
    }

    fn apply_env(&mut self) {
        // 環境変数を優先
        if let Ok(url) = std::env::var(BASE_URL_ENV) {
            if !url.trim().is_empty() {
                self.base_url = url;
            }
        }
    }

    pub fn set_base_url(&mut self, url: String) -> Result<()> {
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(DashboardError::Config(format!(
                "URLは http:// または https:// で始めてください: {}",
                url
            )));
        }
        self.base_url = trimmed.to_string();
        self.save()
    }

    /// 組み込みの説明表に設定ファイルの定義を重ねたカタログ
    pub fn action_catalog(&self) -> Result<ActionCatalog> {
        let mut catalog = ActionCatalog::builtin();
        if let Some(path) = &self.action_catalog {
            let custom = ActionCatalog::from_file(path)?;
            catalog.merge(&custom);
        }
        Ok(catalog)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}
