//! DocFlow Dashboard
//!
//! 文書処理パイプラインの結果を取得・集計・表示するクライアント。
//! 純粋なロジックは `docflow_common`、通信・スケジュール・描画はこのクレート。

pub mod api;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod notify;
pub mod render;
pub mod scheduler;
pub mod upload;
