//! 描画
//!
//! `project` でアプリケーション状態を表示用の値に変換し、`Renderer` が出力する。
//! 射影は純粋関数（時刻は引数）。

use crate::dashboard::{AppState, PanelStatus};
use chrono::{DateTime, Utc};
use docflow_common::summary::{
    key_findings, relative_time, result_summary, results_count_label, ConfidenceTier, FlagClass,
};
use docflow_common::{FilterCriteria, ResultRecord, Trace};
use std::fmt::Write;

/// 集計パネル
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsPanel {
    pub status: PanelStatus,
    pub total: usize,
    pub recent_24h: usize,
    pub completed: usize,
    pub file_types: usize,
    pub by_file_type: Vec<(String, usize)>,
    pub by_intent: Vec<(String, usize)>,
}

/// 一覧の1行
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub id: i64,
    pub filename: String,
    pub file_type: String,
    pub business_intent: String,
    pub status: String,
    pub confidence_percent: i64,
    pub tier: ConfidenceTier,
    pub summary: String,
    pub flags: Vec<(String, FlagClass)>,
    pub actions: Vec<String>,
    pub created: String,
}

impl ResultRow {
    fn from_record(record: &ResultRecord, now: DateTime<Utc>) -> Self {
        let confidence_percent = record.confidence_percent();
        Self {
            id: record.id,
            filename: record.filename.clone(),
            file_type: record.file_type_key().to_string(),
            business_intent: record.intent_key().to_string(),
            status: record.status_key().to_string(),
            confidence_percent,
            tier: ConfidenceTier::from_percent(confidence_percent),
            summary: result_summary(record),
            flags: record
                .display_flags()
                .into_iter()
                .map(|flag| {
                    let class = FlagClass::classify(&flag);
                    (flag, class)
                })
                .collect(),
            actions: record.actions_taken.clone(),
            created: relative_time(record.created_at, now),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub stats: StatsPanel,
    pub results_status: PanelStatus,
    pub filter: FilterCriteria,
    pub count_label: String,
    pub rows: Vec<ResultRow>,
}

/// 状態 → 表示
pub fn project(state: &AppState, now: DateTime<Utc>) -> DashboardView {
    let stats = &state.statistics;
    let rows: Vec<ResultRow> = state
        .store
        .filtered()
        .into_iter()
        .map(|record| ResultRow::from_record(record, now))
        .collect();

    DashboardView {
        stats: StatsPanel {
            status: state.statistics_status,
            total: stats.total,
            recent_24h: stats.recent_24h,
            completed: stats.completed(),
            file_types: stats.file_type_count(),
            by_file_type: stats.by_file_type.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            by_intent: stats.by_intent.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        },
        results_status: state.results_status,
        filter: state.store.criteria().clone(),
        count_label: results_count_label(rows.len()),
        rows,
    }
}

pub trait Renderer: Send + Sync {
    fn render(&self, view: &DashboardView);

    fn render_detail(&self, record: &ResultRecord, trace: &Trace, now: DateTime<Utc>);
}

/// 端末出力
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleRenderer;

impl Renderer for ConsoleRenderer {
    fn render(&self, view: &DashboardView) {
        println!("{}", format_dashboard(view));
    }

    fn render_detail(&self, record: &ResultRecord, trace: &Trace, now: DateTime<Utc>) {
        println!("{}", format_detail(record, trace, now));
    }
}

fn tier_label(tier: ConfidenceTier) -> &'static str {
    match tier {
        ConfidenceTier::High => "high",
        ConfidenceTier::Medium => "medium",
        ConfidenceTier::Low => "low",
        ConfidenceTier::VeryLow => "very low",
    }
}

fn flag_marker(class: FlagClass) -> &'static str {
    match class {
        FlagClass::Urgent => "!",
        FlagClass::HighValue => "$",
        FlagClass::Regulatory => "§",
        FlagClass::Plain => "",
    }
}

pub fn format_stats(stats: &StatsPanel) -> String {
    let mut out = String::new();
    match stats.status {
        PanelStatus::Loading => {
            out.push_str("Loading statistics...\n");
            return out;
        }
        PanelStatus::Failed => {
            out.push_str("Failed to load statistics\n");
            return out;
        }
        PanelStatus::Stale => out.push_str("(statistics may be out of date)\n"),
        PanelStatus::Ready => {}
    }

    let _ = writeln!(
        out,
        "Total Processed: {} | Last 24 Hours: {} | Completed: {} | File Types: {}",
        stats.total, stats.recent_24h, stats.completed, stats.file_types
    );
    if !stats.by_file_type.is_empty() {
        out.push_str("By File Type:\n");
        for (key, count) in &stats.by_file_type {
            let _ = writeln!(out, "  {:<12} {}", key.to_uppercase(), count);
        }
    }
    if !stats.by_intent.is_empty() {
        out.push_str("By Business Intent:\n");
        for (key, count) in &stats.by_intent {
            let _ = writeln!(out, "  {:<24} {}", key, count);
        }
    }
    out
}

pub fn format_results(view: &DashboardView) -> String {
    let mut out = String::new();
    match view.results_status {
        PanelStatus::Loading => {
            out.push_str("Loading results...\n");
            return out;
        }
        PanelStatus::Failed => {
            out.push_str("Failed to load results\n");
            return out;
        }
        PanelStatus::Stale => out.push_str("(results may be out of date)\n"),
        PanelStatus::Ready => {}
    }

    let _ = writeln!(out, "Processing Results [{}]", view.count_label);
    if view.rows.is_empty() {
        out.push_str("No results found\n");
        return out;
    }
    for row in &view.rows {
        let _ = writeln!(
            out,
            "#{:<5} {:<28} {:<6} {:<18} {:<10} {:>3}% ({})  {}",
            row.id,
            row.filename,
            row.file_type.to_uppercase(),
            row.business_intent,
            row.status,
            row.confidence_percent,
            tier_label(row.tier),
            row.created
        );
        let _ = writeln!(out, "       {}", row.summary);
        if !row.flags.is_empty() {
            let flags: Vec<String> = row
                .flags
                .iter()
                .map(|(flag, class)| format!("{}{}", flag_marker(*class), flag))
                .collect();
            let _ = writeln!(out, "       flags: {}", flags.join(", "));
        }
        if !row.actions.is_empty() {
            let _ = writeln!(out, "       actions: {}", row.actions.join(", "));
        }
    }
    out
}

pub fn format_dashboard(view: &DashboardView) -> String {
    format!("{}\n{}", format_stats(&view.stats), format_results(view))
}

pub fn format_trace(trace: &Trace) -> String {
    let mut out = String::new();
    for stage in &trace.stages {
        let _ = writeln!(out, "{}  [{}]", stage.title, stage.completion.label());
        if let Some(at) = stage.timestamp {
            let _ = writeln!(out, "  at {}", at.format("%Y-%m-%d %H:%M:%S"));
        }
        for section in &stage.sections {
            let _ = writeln!(out, "  {}", section.heading);
            for field in &section.fields {
                let _ = writeln!(out, "    {}: {}", field.label, field.value);
            }
        }
        for entry in &stage.actions {
            let _ = writeln!(out, "  - {}: {}", entry.action, entry.rationale);
            let _ = writeln!(
                out,
                "    retry: docflow retry {} {}",
                entry.retry.processing_id, entry.retry.action_type
            );
        }
        for note in &stage.notes {
            let _ = writeln!(out, "  {}", note);
        }
    }
    out
}

pub fn format_detail(record: &ResultRecord, trace: &Trace, now: DateTime<Utc>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Result #{} - {}", record.id, record.filename);
    let _ = writeln!(
        out,
        "Status: {} | Created: {} | Updated: {}",
        record.status_key(),
        relative_time(record.created_at, now),
        relative_time(record.updated_at, now)
    );
    out.push_str("Key Findings:\n");
    for item in key_findings(record) {
        let _ = writeln!(out, "  • {}", item);
    }
    let flags = record.display_flags();
    if !flags.is_empty() {
        let _ = writeln!(out, "Flags: {}", flags.join(", "));
    }
    out.push('\n');
    out.push_str(&format_trace(trace));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use docflow_common::{aggregate, reconstruct, ActionCatalog};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn record(id: i64, status: &str) -> ResultRecord {
        ResultRecord {
            id,
            filename: format!("doc{}.pdf", id),
            file_type: Some("pdf".into()),
            business_intent: Some("Invoice".to_string()),
            status: Some(status.into()),
            flags: vec!["HIGH_VALUE_INVOICE".to_string()],
            created_at: Some(now() - Duration::minutes(5)),
            ..Default::default()
        }
    }

    #[test]
    fn test_project_loading_state() {
        let view = project(&AppState::default(), now());
        assert_eq!(view.stats.status, PanelStatus::Loading);
        assert!(view.rows.is_empty());
        assert!(format_dashboard(&view).contains("Loading results..."));
    }

    #[test]
    fn test_project_rows_follow_filter() {
        let mut state = AppState::default();
        let records = vec![record(1, "completed"), record(2, "failed")];
        state.statistics = aggregate(&records, now());
        state.statistics_status = PanelStatus::Ready;
        state.store.set_results(records);
        state.results_status = PanelStatus::Ready;
        state
            .store
            .set_filter(FilterCriteria::from_parts(Some("failed"), None, None));

        let view = project(&state, now());
        assert_eq!(view.count_label, "1 result");
        assert_eq!(view.rows[0].id, 2);
        assert_eq!(view.rows[0].created, "5 minutes ago");
        assert_eq!(view.rows[0].flags[0].1, FlagClass::HighValue);
        assert_eq!(view.stats.total, 2);
        assert_eq!(view.stats.completed, 1);

        let text = format_dashboard(&view);
        assert!(text.contains("Total Processed: 2"));
        assert!(text.contains("0 pages"));
    }

    #[test]
    fn test_empty_filtered_view() {
        let mut state = AppState::default();
        state.store.set_results(vec![record(1, "completed")]);
        state.results_status = PanelStatus::Ready;
        state
            .store
            .set_filter(FilterCriteria::from_parts(None, Some("email"), None));
        let text = format_results(&project(&state, now()));
        assert!(text.contains("0 results"));
        assert!(text.contains("No results found"));
    }

    #[test]
    fn test_stale_marker() {
        let mut state = AppState::default();
        state.results_status = PanelStatus::Stale;
        assert!(format_results(&project(&state, now())).contains("out of date"));
        state.results_status = PanelStatus::Failed;
        assert!(format_results(&project(&state, now())).contains("Failed to load results"));
    }

    #[test]
    fn test_format_trace_lists_actions_with_retry() {
        let mut r = record(7, "completed");
        r.actions_taken = vec!["crm_escalation".to_string(), "unknown_action_x".to_string()];
        let trace = reconstruct(&r, &ActionCatalog::builtin());
        let text = format_detail(&r, &trace, now());

        assert!(text.contains("Stage 1: Document Classification"));
        assert!(text.contains("Stage 2: PDF Agent Processing"));
        assert!(text.contains("Escalated to CRM system due to complaint with urgent/angry tone"));
        assert!(text.contains("Custom action: unknown_action_x"));
        assert!(text.contains("retry: docflow retry 7 crm_escalation"));
    }
}
