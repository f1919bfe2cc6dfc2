use bridge_traits::error::BridgeError;
use core_bitable::BitableError;
use core_docx::DocxError;
use provider_feishu::FeishuError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Provider error: {0}")]
    Provider(#[from] BridgeError),

    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),

    #[error("Unsupported document: {0}")]
    Unsupported(String),

    #[error("Render error: {0}")]
    Render(#[from] DocxError),

    #[error("Table export error: {0}")]
    Export(#[from] BitableError),

    #[error("Refusing to clean output directory {0:?}")]
    UnsafeOutputDir(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Task failed: {0}")]
    Task(String),
}

impl From<FeishuError> for SyncError {
    fn from(error: FeishuError) -> Self {
        match error {
            FeishuError::InvalidUrl(msg) => SyncError::InvalidUrl(msg),
            other => SyncError::Provider(other.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
