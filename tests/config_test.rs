//! 設定ファイルテスト

use docflow_dashboard::config::Config;
use docflow_dashboard::error::DashboardError;
use std::time::Duration;
use tempfile::tempdir;

/// ファイルが無ければ既定値
#[test]
fn test_load_missing_file_uses_defaults() {
    let dir = tempdir().expect("Failed to create temp dir");
    let config = Config::load_from(&dir.path().join("config.json")).unwrap();

    assert_eq!(config.base_url, "http://localhost:5000");
    assert_eq!(config.refresh_interval(), Duration::from_secs(30));
    assert_eq!(config.reset_delay(), Duration::from_millis(2000));
    assert_eq!(config.detail_delay(), Duration::from_millis(1000));
    assert_eq!(config.toast_success_ms, 3000);
    assert_eq!(config.toast_error_ms, 5000);
    assert!(config.action_catalog.is_none());
}

/// 一部だけ書かれた設定は残りを既定値で補う
#[test]
fn test_partial_config_fills_defaults() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"base_url": "http://pipeline:8000", "refresh_interval_secs": 10}"#)
        .unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.base_url, "http://pipeline:8000");
    assert_eq!(config.refresh_interval(), Duration::from_secs(10));
    assert_eq!(config.probe_interval(), Duration::from_secs(5));
}

/// 保存と読み込み
#[test]
fn test_save_and_load() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("config.json");

    let config = Config {
        base_url: "https://docs.example.com".into(),
        timeout_seconds: 90,
        ..Config::default()
    };
    config.save_to(&path).expect("設定保存失敗");

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded.base_url, "https://docs.example.com");
    assert_eq!(loaded.timeout(), Duration::from_secs(90));
}

/// 壊れた設定ファイルはJSONエラー
#[test]
fn test_invalid_config_is_json_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(matches!(
        Config::load_from(&path),
        Err(DashboardError::JsonParse(_))
    ));
}

/// アクション定義ファイルは組み込みの表に重ねる
#[test]
fn test_action_catalog_merges_custom_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let catalog_path = dir.path().join("actions.json");
    std::fs::write(
        &catalog_path,
        r#"{"ledger_sync": "Posted to the general ledger", "risk_alert": "Fraud desk paged"}"#,
    )
    .unwrap();

    let config = Config {
        action_catalog: Some(catalog_path),
        ..Config::default()
    };
    let catalog = config.action_catalog().unwrap();

    assert_eq!(catalog.describe("ledger_sync"), "Posted to the general ledger");
    assert_eq!(catalog.describe("risk_alert"), "Fraud desk paged");
    assert_eq!(
        catalog.describe("crm_escalation"),
        "Escalated to CRM system due to complaint with urgent/angry tone"
    );
}

/// アクション定義が配列ならエラー
#[test]
fn test_action_catalog_rejects_array() {
    let dir = tempdir().expect("Failed to create temp dir");
    let catalog_path = dir.path().join("actions.json");
    std::fs::write(&catalog_path, r#"["crm_escalation"]"#).unwrap();

    let config = Config {
        action_catalog: Some(catalog_path),
        ..Config::default()
    };
    assert!(matches!(
        config.action_catalog(),
        Err(DashboardError::Common(docflow_common::Error::Config(_)))
    ));
}
