//! 処理結果の型定義
//!
//! 上流パイプライン（分類 → 抽出 → アクション振り分け）が返す1件分のレコード。
//! クライアントはレコードを書き換えない。更新は常にコレクション全体の置き換えで行う。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// 欠損値を集計・表示するときのキー
pub const UNDEFINED_KEY: &str = "undefined";

/// ファイル種別（未知の種別は `Other` に保持してそのまま扱う）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FileType {
    Pdf,
    Json,
    Email,
    Other(String),
}

impl FileType {
    pub fn as_str(&self) -> &str {
        match self {
            FileType::Pdf => "pdf",
            FileType::Json => "json",
            FileType::Email => "email",
            FileType::Other(s) => s,
        }
    }
}

impl From<String> for FileType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pdf" => FileType::Pdf,
            "json" => FileType::Json,
            "email" => FileType::Email,
            _ => FileType::Other(s),
        }
    }
}

impl From<&str> for FileType {
    fn from(s: &str) -> Self {
        FileType::from(s.to_string())
    }
}

impl From<FileType> for String {
    fn from(t: FileType) -> Self {
        match t {
            FileType::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 処理ステータス
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    Processing,
    /// エージェント処理済み・アクション振り分け前
    Processed,
    Completed,
    Failed,
    Other(String),
}

impl ResultStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ResultStatus::Processing => "processing",
            ResultStatus::Processed => "processed",
            ResultStatus::Completed => "completed",
            ResultStatus::Failed => "failed",
            ResultStatus::Other(s) => s,
        }
    }
}

impl From<String> for ResultStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "processing" => ResultStatus::Processing,
            "processed" => ResultStatus::Processed,
            "completed" => ResultStatus::Completed,
            "failed" => ResultStatus::Failed,
            _ => ResultStatus::Other(s),
        }
    }
}

impl From<&str> for ResultStatus {
    fn from(s: &str) -> Self {
        ResultStatus::from(s.to_string())
    }
}

impl From<ResultStatus> for String {
    fn from(s: ResultStatus) -> Self {
        match s {
            ResultStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 処理結果レコード
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: i64,

    #[serde(default)]
    pub filename: String,

    #[serde(default)]
    pub file_type: Option<FileType>,

    #[serde(default)]
    pub business_intent: Option<String>,

    #[serde(default)]
    pub status: Option<ResultStatus>,

    /// トップレベルの信頼度（通常は metadata.confidence 側に入る）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub extracted_data: Map<String, Value>,

    /// reasoning / processing_agent / validation_result / confidence など
    #[serde(default, deserialize_with = "null_as_default")]
    pub metadata: Map<String, Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub actions_taken: Vec<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub flags: Vec<String>,

    #[serde(default, with = "timestamp")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, with = "timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// metadata.validation_result の要約
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    pub is_valid: bool,
    pub warnings: usize,
}

impl ResultRecord {
    /// 集計・表示用のファイル種別キー
    pub fn file_type_key(&self) -> &str {
        self.file_type.as_ref().map(FileType::as_str).unwrap_or(UNDEFINED_KEY)
    }

    pub fn status_key(&self) -> &str {
        self.status.as_ref().map(ResultStatus::as_str).unwrap_or(UNDEFINED_KEY)
    }

    pub fn intent_key(&self) -> &str {
        self.business_intent.as_deref().unwrap_or(UNDEFINED_KEY)
    }

    /// 分類時の信頼度（0.0〜1.0）。metadata を優先し、無ければトップレベル、それも無ければ0
    pub fn classification_confidence(&self) -> f64 {
        self.metadata
            .get("confidence")
            .and_then(Value::as_f64)
            .or(self.confidence)
            .unwrap_or(0.0)
    }

    /// 信頼度のパーセント表記（四捨五入）
    pub fn confidence_percent(&self) -> i64 {
        (self.classification_confidence() * 100.0).round() as i64
    }

    pub fn reasoning(&self) -> Option<String> {
        field_text(&self.metadata, "reasoning")
    }

    pub fn processing_agent(&self) -> Option<String> {
        field_text(&self.metadata, "processing_agent")
    }

    pub fn validation_summary(&self) -> ValidationSummary {
        let Some(validation) = self.metadata.get("validation_result") else {
            return ValidationSummary::default();
        };
        ValidationSummary {
            is_valid: validation.get("is_valid").map(is_truthy).unwrap_or(false),
            warnings: validation
                .get("warnings")
                .and_then(Value::as_array)
                .map(Vec::len)
                .unwrap_or(0),
        }
    }

    /// 表示用フラグ。metadata.flags が配列ならそちらを優先する
    pub fn display_flags(&self) -> Vec<String> {
        match self.metadata.get("flags").and_then(Value::as_array) {
            Some(flags) => flags.iter().map(display_text).collect(),
            None => self.flags.clone(),
        }
    }
}

/// JSONの偽値（null / false / 0 / 空文字）を欠損とみなす
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// 値を表示用の文字列に変換
pub fn display_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        Value::Array(items) => items.iter().map(display_text).collect::<Vec<_>>().join(", "),
        Value::Object(_) => value.to_string(),
    }
}

/// マップから真値のフィールドだけを文字列で取り出す
pub fn field_text(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key).filter(|v| is_truthy(v)).map(display_text)
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// ISO-8601 タイムスタンプ（タイムゾーン無しはUTCとして扱う）
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    /// 解析できない文字列は `None`
    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        let raw = raw.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        NAIVE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&dt.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TimestampVisitor;

        impl<'de> Visitor<'de> for TimestampVisitor {
            type Value = Option<DateTime<Utc>>;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an ISO-8601 timestamp string or null")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(parse(value))
            }

            fn visit_none<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_unit<E>(self) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(None)
            }

            fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                deserializer.deserialize_any(self)
            }
        }

        deserializer.deserialize_option(TimestampVisitor)
    }
}
