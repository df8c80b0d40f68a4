//! 処理トレースの再構成
//!
//! 1件の結果レコードから3段階（分類 → エージェント抽出 → アクション振り分け）の
//! 表示用トレースを導出する。新たな計算はせず、レコードに既にある値だけを使う。
//! キャッシュはしない（詳細表示のたびに再構成する）。
//!
//! - Stage 1: metadata.confidence / reasoning / file_type / business_intent / created_at
//! - Stage 2: file_type ごとの抽出プロファイル（未知の種別は汎用プロファイル）
//! - Stage 3: actions_taken をカタログで説明文に変換し、再実行リクエストを添える

use crate::actions::ActionCatalog;
use crate::types::{display_text, field_text, FileType, ResultRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const NOT_DETECTED: &str = "Not detected";
pub const NONE_FOUND: &str = "None found";
pub const NO_REASONING: &str = "No reasoning provided";
pub const NO_ACTIONS_NOTE: &str = "No automated actions were triggered for this document.";
pub const NO_ACTIONS_HINT: &str =
    "Actions are triggered based on document content, urgency, tone, and business rules.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Classification,
    AgentExtraction,
    ActionRouting,
}

/// 完了マーカー
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Completion {
    Completed,
    ActionsExecuted,
    NoActionsRequired,
}

impl Completion {
    pub fn label(&self) -> &'static str {
        match self {
            Completion::Completed => "✓ Completed",
            Completion::ActionsExecuted => "✓ Actions Executed",
            Completion::NoActionsRequired => "• No Actions Required",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceField {
    pub label: &'static str,
    pub value: String,
}

impl TraceField {
    fn new(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TraceSection {
    pub heading: &'static str,
    pub fields: Vec<TraceField>,
}

/// `POST /retry-action` の本文
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetryRequest {
    pub processing_id: i64,
    pub action_type: String,
}

/// Stage 3 の1アクション分
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionEntry {
    pub action: String,
    pub rationale: String,
    pub retry: RetryRequest,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Stage {
    pub kind: StageKind,
    pub title: String,
    pub sections: Vec<TraceSection>,
    pub actions: Vec<ActionEntry>,
    pub notes: Vec<String>,
    #[serde(with = "crate::types::timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
    pub completion: Completion,
}

impl Stage {
    /// ラベルでフィールド値を探す（全セクション横断）
    pub fn field(&self, label: &str) -> Option<&str> {
        self.sections
            .iter()
            .flat_map(|s| s.fields.iter())
            .find(|f| f.label == label)
            .map(|f| f.value.as_str())
    }
}

/// 3段階トレース
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Trace {
    pub result_id: i64,
    pub stages: [Stage; 3],
}

impl Trace {
    pub fn classification(&self) -> &Stage {
        &self.stages[0]
    }

    pub fn extraction(&self) -> &Stage {
        &self.stages[1]
    }

    pub fn routing(&self) -> &Stage {
        &self.stages[2]
    }
}

/// ファイル種別ごとの抽出内容の読み方
pub trait ExtractionProfile: Sync {
    fn sections(&self, record: &ResultRecord) -> Vec<TraceSection>;
}

struct EmailProfile;
struct PdfProfile;
struct JsonProfile;
/// 未知の種別・種別欠損用
struct GenericProfile;

impl ExtractionProfile for EmailProfile {
    fn sections(&self, record: &ResultRecord) -> Vec<TraceSection> {
        let data = &record.extracted_data;
        let text = |key: &str, fallback: &str| field_text(data, key).unwrap_or_else(|| fallback.to_string());
        let has_attachments = data
            .get("has_attachments")
            .map(crate::types::is_truthy)
            .unwrap_or(false);

        vec![
            TraceSection {
                heading: "Email Analysis",
                fields: vec![
                    TraceField::new("Sender", text("sender", NOT_DETECTED)),
                    TraceField::new("Urgency", text("urgency", "Normal")),
                    TraceField::new("Tone", text("tone", "Neutral")),
                    TraceField::new("Sentiment", text("sentiment", "Neutral")),
                ],
            },
            TraceSection {
                heading: "Extracted Info",
                fields: vec![
                    TraceField::new("Content Length", format!("{} chars", text("content_length", "0"))),
                    TraceField::new("Has Attachments", if has_attachments { "Yes" } else { "No" }),
                    TraceField::new("Contact Info", text("contact_info", NONE_FOUND)),
                ],
            },
        ]
    }
}

impl ExtractionProfile for PdfProfile {
    fn sections(&self, record: &ResultRecord) -> Vec<TraceSection> {
        let data = &record.extracted_data;
        let text = |key: &str, fallback: &str| field_text(data, key).unwrap_or_else(|| fallback.to_string());
        let total_amount = field_text(data, "total_amount")
            .map(|amount| format!("${}", amount))
            .unwrap_or_else(|| "None".to_string());

        vec![
            TraceSection {
                heading: "PDF Analysis",
                fields: vec![
                    TraceField::new("Pages", text("page_count", "0")),
                    TraceField::new("Text Length", format!("{} chars", text("text_length", "0"))),
                    TraceField::new("Total Amount", total_amount),
                ],
            },
            TraceSection {
                heading: "Business Fields",
                fields: vec![
                    TraceField::new("Invoice Number", text("invoice_number", "Not found")),
                    TraceField::new("Phone", text("phone_number", "Not found")),
                    TraceField::new("Compliance", text("compliance_mentions", "None")),
                ],
            },
        ]
    }
}

impl ExtractionProfile for JsonProfile {
    fn sections(&self, record: &ResultRecord) -> Vec<TraceSection> {
        let data = &record.extracted_data;
        let text = |key: &str, fallback: &str| field_text(data, key).unwrap_or_else(|| fallback.to_string());
        let validation = record.validation_summary();

        vec![
            TraceSection {
                heading: "JSON Analysis",
                fields: vec![
                    TraceField::new("Field Count", text("field_count", "0")),
                    TraceField::new("Document ID", text("document_id", "Not found")),
                    TraceField::new("Monetary Value", text("monetary_value", "None")),
                ],
            },
            TraceSection {
                heading: "Validation",
                fields: vec![
                    TraceField::new("Schema Valid", if validation.is_valid { "Yes" } else { "No" }),
                    TraceField::new("Warnings", validation.warnings.to_string()),
                    TraceField::new(
                        "Data Quality",
                        if validation.warnings > 0 { "Issues Found" } else { "Good" },
                    ),
                ],
            },
        ]
    }
}

impl ExtractionProfile for GenericProfile {
    fn sections(&self, record: &ResultRecord) -> Vec<TraceSection> {
        if record.extracted_data.is_empty() {
            return Vec::new();
        }
        let fields = record
            .extracted_data
            .iter()
            .map(|(key, value)| TraceField {
                label: "Field",
                value: format!("{}: {}", key, display_text(value)),
            })
            .collect();
        vec![TraceSection {
            heading: "Extracted Data",
            fields,
        }]
    }
}

/// ファイル種別に対応する抽出プロファイル
pub fn profile_for(file_type: Option<&FileType>) -> &'static dyn ExtractionProfile {
    match file_type {
        Some(FileType::Email) => &EmailProfile,
        Some(FileType::Pdf) => &PdfProfile,
        Some(FileType::Json) => &JsonProfile,
        Some(FileType::Other(_)) | None => &GenericProfile,
    }
}

/// トレースを再構成（どのレコードに対しても必ず3段階を返す）
pub fn reconstruct(record: &ResultRecord, catalog: &ActionCatalog) -> Trace {
    Trace {
        result_id: record.id,
        stages: [
            classification_stage(record),
            extraction_stage(record),
            routing_stage(record, catalog),
        ],
    }
}

fn classification_stage(record: &ResultRecord) -> Stage {
    let reasoning = record.reasoning();
    // 表示上の区別のみ。reasoning があればルールベースとみなす
    let method = if reasoning.is_some() {
        "Rule-based analysis"
    } else {
        "AI classification"
    };

    Stage {
        kind: StageKind::Classification,
        title: "Stage 1: Document Classification".to_string(),
        sections: vec![
            TraceSection {
                heading: "Classification Results",
                fields: vec![
                    TraceField::new("File Type", record.file_type_key()),
                    TraceField::new("Business Intent", record.intent_key()),
                    TraceField::new("Confidence", format!("{}%", record.confidence_percent())),
                    TraceField::new("Method", method),
                ],
            },
            TraceSection {
                heading: "Reasoning",
                fields: vec![TraceField::new(
                    "Reasoning",
                    reasoning.unwrap_or_else(|| NO_REASONING.to_string()),
                )],
            },
        ],
        actions: Vec::new(),
        notes: Vec::new(),
        timestamp: record.created_at,
        completion: Completion::Completed,
    }
}

fn extraction_stage(record: &ResultRecord) -> Stage {
    let agent = record
        .processing_agent()
        .unwrap_or_else(|| format!("{}_agent", record.file_type_key()));

    let mut sections = vec![TraceSection {
        heading: "Agent Processing",
        fields: vec![TraceField::new("Processing Agent", agent)],
    }];
    let specific = profile_for(record.file_type.as_ref()).sections(record);
    let notes = if specific.is_empty() {
        vec!["No agent-specific details available.".to_string()]
    } else {
        Vec::new()
    };
    sections.extend(specific);

    Stage {
        kind: StageKind::AgentExtraction,
        title: format!(
            "Stage 2: {} Agent Processing",
            record.file_type_key().to_uppercase()
        ),
        sections,
        actions: Vec::new(),
        notes,
        timestamp: record.updated_at,
        completion: Completion::Completed,
    }
}

fn routing_stage(record: &ResultRecord, catalog: &ActionCatalog) -> Stage {
    let actions: Vec<ActionEntry> = record
        .actions_taken
        .iter()
        .map(|action| ActionEntry {
            action: action.clone(),
            rationale: catalog.describe(action).into_owned(),
            retry: RetryRequest {
                processing_id: record.id,
                action_type: action.clone(),
            },
        })
        .collect();

    let (sections, notes, completion) = if actions.is_empty() {
        (
            Vec::new(),
            vec![NO_ACTIONS_NOTE.to_string(), NO_ACTIONS_HINT.to_string()],
            Completion::NoActionsRequired,
        )
    } else {
        (
            vec![TraceSection {
                heading: "Action Router Results",
                fields: vec![TraceField::new("Actions Triggered", actions.len().to_string())],
            }],
            Vec::new(),
            Completion::ActionsExecuted,
        )
    };

    Stage {
        kind: StageKind::ActionRouting,
        title: "Stage 3: Action Router & Triggers".to_string(),
        sections,
        actions,
        notes,
        timestamp: record.updated_at,
        completion,
    }
}
