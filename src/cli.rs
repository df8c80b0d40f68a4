use clap::{Parser, Subcommand};
use docflow_common::FilterCriteria;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "docflow")]
#[command(about = "文書処理パイプラインの結果ダッシュボード", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 接続先URL（設定ファイル・環境変数より優先）
    #[arg(long, global = true)]
    pub base_url: Option<String>,
}

/// 一覧の絞り込み条件
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FilterArgs {
    /// ステータス (processing/processed/completed/failed)
    #[arg(long)]
    pub status: Option<String>,

    /// ファイル種別 (pdf/json/email)
    #[arg(long)]
    pub file_type: Option<String>,

    /// 業務意図（例: Invoice, Complaint, RFQ）
    #[arg(long)]
    pub intent: Option<String>,
}

impl FilterArgs {
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::from_parts(
            self.status.as_deref(),
            self.file_type.as_deref(),
            self.intent.as_deref(),
        )
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// ダッシュボードを表示し、定期更新を続ける（Ctrl-Cで終了）
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// ファイルをアップロードして処理する
    Upload {
        /// アップロードするファイル (pdf/json/txt/eml/msg, 10MBまで)
        #[arg(required = true)]
        file: PathBuf,

        /// 完了後にトレースを表示しない
        #[arg(long)]
        no_details: bool,
    },

    /// 処理結果の一覧を表示
    Results {
        #[command(flatten)]
        filter: FilterArgs,
    },

    /// 集計を表示
    Stats,

    /// 1件の処理トレースを表示
    Trace {
        /// 処理ID
        #[arg(required = true)]
        id: i64,
    },

    /// アクションを再実行
    Retry {
        /// 処理ID
        #[arg(required = true)]
        id: i64,

        /// アクション種別（例: crm_escalation）
        #[arg(required = true)]
        action: String,
    },

    /// 設定を表示/編集
    Config {
        /// 接続先URLを設定
        #[arg(long)]
        set_base_url: Option<String>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
