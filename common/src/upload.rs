//! アップロード状態機械
//!
//! Idle → Validating → Uploading → Processing → {Succeeded | Failed} → Idle
//!
//! 後戻りは終端状態からの Idle リセットのみ。進捗率は表示用の固定マイルストーンで、
//! 実際の転送量とは無関係。タイマー処理は呼び出し側が持ち、ここでは遷移だけを扱う。

use crate::error::{Error, Result, ValidationError};
use std::fmt;

/// アップロード上限（10 MiB）
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// 受け付ける拡張子
pub const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "json", "txt", "eml", "msg"];

/// 失敗理由
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    OversizedFile,
    UnsupportedType,
    /// サーバーが返した detail、または HTTP ステータス由来のメッセージ
    Server(String),
    Network(String),
}

impl From<&ValidationError> for FailureReason {
    fn from(err: &ValidationError) -> Self {
        match err {
            ValidationError::OversizedFile { .. } => FailureReason::OversizedFile,
            ValidationError::UnsupportedType { .. } | ValidationError::EmptyFileName => {
                FailureReason::UnsupportedType
            }
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::OversizedFile => f.write_str("File too large. Maximum size is 10MB."),
            FailureReason::UnsupportedType => {
                f.write_str("Invalid file type. Please upload PDF, JSON, or Email files.")
            }
            FailureReason::Server(detail) => f.write_str(detail),
            FailureReason::Network(detail) => f.write_str(detail),
        }
    }
}

/// アップロード状態
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum UploadState {
    #[default]
    Idle,
    Validating,
    Uploading { progress: u8 },
    Processing,
    Succeeded { result_id: i64 },
    Failed { reason: FailureReason },
}

/// 状態の種類（進捗率などのペイロードを除いたもの）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Validating,
    Uploading,
    Processing,
    Succeeded,
    Failed,
}

impl UploadPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadPhase::Idle => "idle",
            UploadPhase::Validating => "validating",
            UploadPhase::Uploading => "uploading",
            UploadPhase::Processing => "processing",
            UploadPhase::Succeeded => "succeeded",
            UploadPhase::Failed => "failed",
        }
    }
}

impl UploadState {
    pub fn phase(&self) -> UploadPhase {
        match self {
            UploadState::Idle => UploadPhase::Idle,
            UploadState::Validating => UploadPhase::Validating,
            UploadState::Uploading { .. } => UploadPhase::Uploading,
            UploadState::Processing => UploadPhase::Processing,
            UploadState::Succeeded { .. } => UploadPhase::Succeeded,
            UploadState::Failed { .. } => UploadPhase::Failed,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Succeeded { .. } | UploadState::Failed { .. })
    }

    /// Idle 以外はアップロード中とみなす（終端状態もリセットまで操作不可）
    pub fn is_active(&self) -> bool {
        !matches!(self, UploadState::Idle)
    }
}

/// 表示用の進捗マイルストーン
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ProgressMilestone {
    Started,
    Requesting,
    ResponseReceived,
    Complete,
}

impl ProgressMilestone {
    pub fn percent(&self) -> u8 {
        match self {
            ProgressMilestone::Started => 10,
            ProgressMilestone::Requesting => 30,
            ProgressMilestone::ResponseReceived => 70,
            ProgressMilestone::Complete => 100,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ProgressMilestone::Started => "Uploading file...",
            ProgressMilestone::Requesting => "Classifying document...",
            ProgressMilestone::ResponseReceived => "Processing with agents...",
            ProgressMilestone::Complete => "Processing complete!",
        }
    }
}

/// 検証対象のファイル情報（中身は読まない）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub file_name: String,
    pub size: u64,
}

impl FileCandidate {
    pub fn new(file_name: impl Into<String>, size: u64) -> Self {
        Self {
            file_name: file_name.into(),
            size,
        }
    }

    /// 小文字化した拡張子（最後の `.` 以降）
    pub fn extension(&self) -> String {
        self.file_name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_lowercase()
    }
}

/// ローカル検証（サイズ → 拡張子の順）
pub fn validate(candidate: &FileCandidate) -> std::result::Result<(), ValidationError> {
    if candidate.file_name.trim().is_empty() {
        return Err(ValidationError::EmptyFileName);
    }
    if candidate.size > MAX_UPLOAD_BYTES {
        return Err(ValidationError::OversizedFile {
            size: candidate.size,
            limit: MAX_UPLOAD_BYTES,
        });
    }
    let extension = candidate.extension();
    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ValidationError::UnsupportedType { extension });
    }
    Ok(())
}

/// 1回分のアップロードの状態機械
#[derive(Debug, Clone, Default)]
pub struct UploadMachine {
    state: UploadState,
    progress: u8,
    /// 今回の試行で検証を通過したか
    validated: bool,
    history: Vec<UploadState>,
}

impl UploadMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// 表示用の進捗率（0〜100）
    pub fn progress(&self) -> u8 {
        self.progress
    }

    /// 現在の試行で通過した状態の履歴（`begin` でクリア）
    pub fn history(&self) -> &[UploadState] {
        &self.history
    }

    /// Idle → Validating
    pub fn begin(&mut self) -> Result<()> {
        self.require(&[UploadPhase::Idle], UploadPhase::Validating)?;
        self.history.clear();
        self.progress = 0;
        self.validated = false;
        self.history.push(UploadState::Idle);
        self.transition(UploadState::Validating);
        Ok(())
    }

    /// Validating のまま検証し、失敗なら Failed へ
    pub fn validate(&mut self, candidate: &FileCandidate) -> Result<()> {
        self.require(&[UploadPhase::Validating], UploadPhase::Validating)?;
        if let Err(err) = validate(candidate) {
            self.progress = ProgressMilestone::Complete.percent();
            self.transition(UploadState::Failed {
                reason: FailureReason::from(&err),
            });
            return Err(Error::Validation(err));
        }
        self.validated = true;
        Ok(())
    }

    /// Validating → Uploading(10%)。検証を通過していなければ送信させない
    pub fn start_upload(&mut self) -> Result<()> {
        self.require(&[UploadPhase::Validating], UploadPhase::Uploading)?;
        if !self.validated {
            return Err(Error::NotValidated);
        }
        self.progress = ProgressMilestone::Started.percent();
        self.transition(UploadState::Uploading {
            progress: self.progress,
        });
        Ok(())
    }

    /// Uploading 中の進捗を進める（後退はしない）
    pub fn advance(&mut self, milestone: ProgressMilestone) -> Result<()> {
        self.require(&[UploadPhase::Uploading], UploadPhase::Uploading)?;
        if milestone.percent() > self.progress {
            self.progress = milestone.percent();
            self.transition(UploadState::Uploading {
                progress: self.progress,
            });
        }
        Ok(())
    }

    /// Uploading → Processing（サーバーが受信を確認した）
    pub fn acknowledge(&mut self) -> Result<()> {
        self.require(&[UploadPhase::Uploading], UploadPhase::Processing)?;
        self.progress = self.progress.max(ProgressMilestone::ResponseReceived.percent());
        self.transition(UploadState::Processing);
        Ok(())
    }

    /// Processing → Succeeded
    pub fn succeed(&mut self, result_id: i64) -> Result<()> {
        self.require(&[UploadPhase::Processing], UploadPhase::Succeeded)?;
        self.progress = ProgressMilestone::Complete.percent();
        self.transition(UploadState::Succeeded { result_id });
        Ok(())
    }

    /// Validating / Uploading / Processing → Failed
    pub fn fail(&mut self, reason: FailureReason) -> Result<()> {
        self.require(
            &[
                UploadPhase::Validating,
                UploadPhase::Uploading,
                UploadPhase::Processing,
            ],
            UploadPhase::Failed,
        )?;
        self.progress = ProgressMilestone::Complete.percent();
        self.transition(UploadState::Failed { reason });
        Ok(())
    }

    /// 終端状態 → Idle
    pub fn reset(&mut self) -> Result<()> {
        self.require(&[UploadPhase::Succeeded, UploadPhase::Failed], UploadPhase::Idle)?;
        self.progress = 0;
        self.validated = false;
        self.transition(UploadState::Idle);
        Ok(())
    }

    fn require(&self, allowed: &[UploadPhase], to: UploadPhase) -> Result<()> {
        let from = self.state.phase();
        if allowed.contains(&from) {
            Ok(())
        } else {
            Err(Error::InvalidTransition {
                from: from.as_str(),
                to: to.as_str(),
            })
        }
    }

    fn transition(&mut self, next: UploadState) {
        self.history.push(next.clone());
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn phases(machine: &UploadMachine) -> Vec<UploadPhase> {
        let mut phases: Vec<UploadPhase> = machine.history().iter().map(UploadState::phase).collect();
        phases.dedup();
        phases
    }

    #[test]
    fn test_validate_size_limit() {
        assert!(validate(&FileCandidate::new("a.pdf", MAX_UPLOAD_BYTES)).is_ok());
        let err = validate(&FileCandidate::new("a.pdf", 11 * 1024 * 1024)).unwrap_err();
        assert!(matches!(err, ValidationError::OversizedFile { .. }));
    }

    #[test]
    fn test_validate_extensions() {
        for name in ["a.pdf", "b.JSON", "c.txt", "d.eml", "e.Msg"] {
            assert!(validate(&FileCandidate::new(name, 10)).is_ok(), "{}", name);
        }
        let err = validate(&FileCandidate::new("report.docx", 2048)).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsupportedType {
                extension: "docx".to_string()
            }
        );
        assert!(validate(&FileCandidate::new("noextension", 10)).is_err());
        assert!(matches!(
            validate(&FileCandidate::new("", 10)),
            Err(ValidationError::EmptyFileName)
        ));
    }

    #[test]
    fn test_happy_path_transitions() {
        let mut machine = UploadMachine::new();
        machine.begin().unwrap();
        machine.validate(&FileCandidate::new("invoice.pdf", 2048)).unwrap();
        machine.start_upload().unwrap();
        machine.advance(ProgressMilestone::Requesting).unwrap();
        machine.acknowledge().unwrap();
        assert_eq!(machine.progress(), 70);
        machine.succeed(42).unwrap();

        assert_eq!(machine.state(), &UploadState::Succeeded { result_id: 42 });
        assert_eq!(machine.progress(), 100);
        assert_eq!(
            phases(&machine),
            vec![
                UploadPhase::Idle,
                UploadPhase::Validating,
                UploadPhase::Uploading,
                UploadPhase::Processing,
                UploadPhase::Succeeded
            ]
        );

        machine.reset().unwrap();
        assert_eq!(machine.state(), &UploadState::Idle);
    }

    #[test]
    fn test_validation_failure_moves_to_failed() {
        let mut machine = UploadMachine::new();
        machine.begin().unwrap();
        let err = machine
            .validate(&FileCandidate::new("big.pdf", 11 * 1024 * 1024))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ValidationError::OversizedFile { .. })));
        assert_eq!(
            machine.state(),
            &UploadState::Failed {
                reason: FailureReason::OversizedFile
            }
        );
        // 検証に失敗した後はアップロードに進めない
        assert!(machine.start_upload().is_err());
    }

    #[test]
    fn test_no_backward_transitions() {
        let mut machine = UploadMachine::new();
        assert!(machine.acknowledge().is_err());
        assert!(machine.succeed(1).is_err());
        assert!(machine.reset().is_err());

        machine.begin().unwrap();
        assert!(machine.begin().is_err());
        machine.validate(&FileCandidate::new("memo.txt", 5)).unwrap();
        machine.start_upload().unwrap();
        machine.acknowledge().unwrap();
        assert!(machine.start_upload().is_err());
        assert!(machine.advance(ProgressMilestone::Requesting).is_err());
        // 処理中はリセットできない
        assert!(machine.reset().is_err());
    }

    #[test]
    fn test_upload_requires_validation() {
        let mut machine = UploadMachine::new();
        machine.begin().unwrap();
        assert!(matches!(machine.start_upload(), Err(Error::NotValidated)));
        assert_eq!(machine.state(), &UploadState::Validating);

        // リセット後の次の試行では検証済みフラグを持ち越さない
        machine.validate(&FileCandidate::new("memo.txt", 5)).unwrap();
        machine.fail(FailureReason::Network("offline".into())).unwrap();
        machine.reset().unwrap();
        machine.begin().unwrap();
        assert!(matches!(machine.start_upload(), Err(Error::NotValidated)));
    }

    #[test]
    fn test_progress_never_decreases() {
        let mut machine = UploadMachine::new();
        machine.begin().unwrap();
        machine.validate(&FileCandidate::new("memo.txt", 5)).unwrap();
        machine.start_upload().unwrap();
        machine.advance(ProgressMilestone::Requesting).unwrap();
        machine.advance(ProgressMilestone::Started).unwrap();
        assert_eq!(machine.state(), &UploadState::Uploading { progress: 30 });
    }

    #[test]
    fn test_server_failure() {
        let mut machine = UploadMachine::new();
        machine.begin().unwrap();
        machine.validate(&FileCandidate::new("memo.txt", 5)).unwrap();
        machine.start_upload().unwrap();
        machine.acknowledge().unwrap();
        machine
            .fail(FailureReason::Server("HTTP error! status: 500".to_string()))
            .unwrap();
        assert!(machine.state().is_terminal());
        assert!(machine.fail(FailureReason::Network("again".into())).is_err());
        machine.reset().unwrap();
        assert!(!machine.state().is_active());
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            FailureReason::Server("Error processing file: boom".into()).to_string(),
            "Error processing file: boom"
        );
        assert_eq!(
            FailureReason::OversizedFile.to_string(),
            "File too large. Maximum size is 10MB."
        );
    }
}
