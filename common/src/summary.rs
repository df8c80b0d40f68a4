//! 一覧表示用の要約
//!
//! 結果一行分の要約文、主な所見、信頼度の段階、フラグ分類、相対時刻表記。

use crate::types::{field_text, FileType, ResultRecord};
use chrono::{DateTime, Utc};

/// 信頼度の段階（バッジ色に対応）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceTier {
    High,
    Medium,
    Low,
    VeryLow,
}

impl ConfidenceTier {
    pub fn from_percent(percent: i64) -> Self {
        match percent {
            p if p >= 80 => ConfidenceTier::High,
            p if p >= 60 => ConfidenceTier::Medium,
            p if p >= 40 => ConfidenceTier::Low,
            _ => ConfidenceTier::VeryLow,
        }
    }
}

/// フラグの分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagClass {
    Urgent,
    HighValue,
    Regulatory,
    Plain,
}

impl FlagClass {
    pub fn classify(flag: &str) -> Self {
        if flag.contains("URGENT") {
            FlagClass::Urgent
        } else if flag.contains("HIGH_VALUE") {
            FlagClass::HighValue
        } else if ["REGULATORY", "GDPR", "FDA"].iter().any(|k| flag.contains(k)) {
            FlagClass::Regulatory
        } else {
            FlagClass::Plain
        }
    }
}

/// 一覧の一行要約
pub fn result_summary(record: &ResultRecord) -> String {
    let data = &record.extracted_data;
    let text = |key: &str, fallback: &str| field_text(data, key).unwrap_or_else(|| fallback.to_string());

    match &record.file_type {
        Some(FileType::Email) => format!(
            "From: {} | Urgency: {} | Tone: {}",
            text("sender", "Unknown sender"),
            text("urgency", "normal"),
            text("tone", "neutral")
        ),
        Some(FileType::Json) => {
            let mut line = format!("{} fields", text("field_count", "0"));
            if let Some(amount) = field_text(data, "monetary_value") {
                line.push_str(&format!(" | Amount: {}", amount));
            }
            line
        }
        Some(FileType::Pdf) => {
            let mut line = format!("{} pages", text("page_count", "0"));
            if let Some(amount) = field_text(data, "total_amount") {
                line.push_str(&format!(" | Amount: ${}", amount));
            }
            line
        }
        _ => "Processed successfully".to_string(),
    }
}

/// 詳細画面の「主な所見」
pub fn key_findings(record: &ResultRecord) -> Vec<String> {
    let data = &record.extracted_data;
    let mut items = Vec::new();

    if let Some(reasoning) = record.reasoning() {
        items.push(format!("Classification: {}", reasoning));
    }

    let labelled: &[(&str, &str, &str)] = match &record.file_type {
        Some(FileType::Email) => &[("sender", "Sender", ""), ("urgency", "Urgency", ""), ("tone", "Tone", "")],
        Some(FileType::Pdf) => &[("page_count", "Pages", ""), ("total_amount", "Amount", "$")],
        Some(FileType::Json) => &[("field_count", "Fields", ""), ("monetary_value", "Value", "")],
        _ => &[],
    };
    for (key, label, prefix) in labelled {
        if let Some(value) = field_text(data, key) {
            items.push(format!("{}: {}{}", label, prefix, value));
        }
    }

    if items.is_empty() {
        items.push("No specific details extracted".to_string());
    }
    items
}

/// 相対時刻表記（1日以上前は絶対時刻）
pub fn relative_time(at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = at else {
        return "N/A".to_string();
    };
    let diff = (now - at).num_milliseconds();

    if diff < 60_000 {
        return "Just now".to_string();
    }
    if diff < 3_600_000 {
        let minutes = diff / 60_000;
        return format!("{} minute{} ago", minutes, plural(minutes));
    }
    if diff < 86_400_000 {
        let hours = diff / 3_600_000;
        return format!("{} hour{} ago", hours, plural(hours));
    }
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}

/// 件数バッジ
pub fn results_count_label(count: usize) -> String {
    format!("{} result{}", count, if count == 1 { "" } else { "s" })
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}
