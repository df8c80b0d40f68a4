use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error(transparent)]
    Common(#[from] docflow_common::Error),

    #[error("通信エラー: {0}")]
    Network(String),

    /// 2xx 以外の応答。detail はサーバーが返した説明（無ければ None）
    #[error("HTTPエラー ({status}): {}", .detail.as_deref().unwrap_or("詳細なし"))]
    Http { status: u16, detail: Option<String> },

    #[error("レスポンス形式が不正: {0}")]
    Data(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("アップロード処理中です。完了するまでお待ちください")]
    UploadBusy,
}

impl From<reqwest::Error> for DashboardError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DashboardError::Data(err.to_string())
        } else {
            DashboardError::Network(err.to_string())
        }
    }
}

impl DashboardError {
    /// 通知に出す失敗理由
    ///
    /// HTTPエラーはサーバーの detail を優先し、無ければステータス由来の文言にする。
    pub fn reason(&self) -> String {
        match self {
            DashboardError::Http {
                detail: Some(detail),
                ..
            } => detail.clone(),
            DashboardError::Http { status, detail: None } => {
                format!("HTTP error! status: {}", status)
            }
            DashboardError::Network(message) | DashboardError::Data(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DashboardError>;
