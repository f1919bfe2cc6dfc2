//! Error types for the Feishu provider

use thiserror::Error;

/// Feishu provider errors
#[derive(Error, Debug)]
pub enum FeishuError {
    /// Tenant token could not be obtained
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// HTTP request returned a non-success status
    #[error("Feishu HTTP error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Response envelope carried a non-zero business code
    #[error("Feishu API error (code {code}): {msg}")]
    Api { code: i64, msg: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// URL does not point at a supported resource
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] bridge_traits::error::BridgeError),
}

/// Result type for Feishu operations
pub type Result<T> = std::result::Result<T, FeishuError>;

impl From<FeishuError> for bridge_traits::error::BridgeError {
    fn from(error: FeishuError) -> Self {
        use bridge_traits::error::BridgeError;

        match error {
            FeishuError::Api { code, msg } => BridgeError::Remote { code, message: msg },
            FeishuError::AuthenticationFailed(msg) => {
                BridgeError::OperationFailed(format!("Authentication failed: {}", msg))
            }
            FeishuError::ApiError {
                status_code,
                message,
            } => BridgeError::Http {
                status: status_code,
                message,
            },
            FeishuError::ParseError(msg) => BridgeError::Decode(msg),
            FeishuError::InvalidUrl(msg) => BridgeError::InvalidInput(msg),
            FeishuError::BridgeError(e) => e,
        }
    }
}
