//! DocFlow Dashboard Common Library
//!
//! 処理結果ダッシュボードの純粋なロジック（I/Oなし）。
//! フィルタ・集計・アップロード状態機械・トレース再構成を提供する。

pub mod actions;
pub mod error;
pub mod filter;
pub mod statistics;
pub mod store;
pub mod summary;
pub mod trace;
pub mod types;
pub mod upload;

pub use actions::ActionCatalog;
pub use error::{Error, Result, ValidationError};
pub use filter::{filter, FilterCriteria};
pub use statistics::{aggregate, Statistics};
pub use store::{RequestSequence, ResultStore};
pub use trace::{reconstruct, RetryRequest, Stage, Trace};
pub use types::{FileType, ResultRecord, ResultStatus, UNDEFINED_KEY};
pub use upload::{
    FailureReason, FileCandidate, ProgressMilestone, UploadMachine, UploadPhase, UploadState,
};
