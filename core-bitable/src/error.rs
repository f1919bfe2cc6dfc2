use bridge_traits::error::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BitableError {
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Invalid table URL: {0}")]
    InvalidUrl(String),

    #[error(
        "Failed to resolve bitable app token from {url}; the page must embed a table or point to a bitable file"
    )]
    UnresolvedContainer { url: String },

    #[error("No fields returned for table {table_id}")]
    NoFields { table_id: String },

    #[error("Failed to list {what}: {source}")]
    Remote {
        what: &'static str,
        #[source]
        source: BridgeError,
    },

    #[error("Unsupported export format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XLSX error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

impl From<provider_feishu::FeishuError> for BitableError {
    fn from(error: provider_feishu::FeishuError) -> Self {
        match error {
            provider_feishu::FeishuError::InvalidUrl(msg) => BitableError::InvalidUrl(msg),
            other => BitableError::Bridge(other.into()),
        }
    }
}

pub type Result<T> = std::result::Result<T, BitableError>;
