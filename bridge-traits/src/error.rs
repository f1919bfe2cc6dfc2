use thiserror::Error;

/// Failure surfaced by a host capability or the document provider
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Capability not available: {0}")]
    NotAvailable(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Non-2xx status without a usable business code
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Business error from the Open API envelope (`code != 0`)
    #[error("Remote service error (code {code}): {message}")]
    Remote { code: i64, message: String },

    #[error("Malformed payload: {0}")]
    Decode(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl BridgeError {
    /// Envelope code of a [`BridgeError::Remote`]
    pub fn remote_code(&self) -> Option<i64> {
        match self {
            BridgeError::Remote { code, .. } => Some(*code),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
