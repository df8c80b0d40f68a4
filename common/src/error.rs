//! エラー型定義

use thiserror::Error;

/// アップロード前のローカル検証エラー（ネットワーク呼び出し前に判定）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File too large. Maximum size is 10MB. ({size} bytes > {limit} bytes)")]
    OversizedFile { size: u64, limit: u64 },

    #[error("Invalid file type '{extension}'. Please upload PDF, JSON, or Email files.")]
    UnsupportedType { extension: String },

    #[error("Please select a file to upload.")]
    EmptyFileName,
}

impl ValidationError {
    /// トースト表示用の短いメッセージ
    pub fn user_message(&self) -> &'static str {
        match self {
            ValidationError::OversizedFile { .. } => "File too large. Maximum size is 10MB.",
            ValidationError::UnsupportedType { .. } => {
                "Invalid file type. Please upload PDF, JSON, or Email files."
            }
            ValidationError::EmptyFileName => "Please select a file to upload.",
        }
    }
}

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Invalid upload transition: {from} -> {to}")]
    InvalidTransition { from: &'static str, to: &'static str },

    #[error("Upload attempted before validation")]
    NotValidated,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;
