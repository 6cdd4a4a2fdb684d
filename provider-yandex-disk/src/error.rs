//! Error types for Yandex Disk provider

use bridge_traits::error::BridgeError;
use thiserror::Error;

/// Yandex Disk provider errors
#[derive(Error, Debug)]
pub enum YandexDiskError {
    /// Token missing, expired or rejected (401/403)
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// API request returned an error
    #[error("Yandex Disk API error (status {status_code}): {message}")]
    ApiError { status_code: u16, message: String },

    /// Resource not found
    #[error("Resource not found: {path}")]
    ResourceNotFound { path: String },

    /// Failed to parse API response
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// The download endpoint answered without a link
    #[error("No download link returned for {path}")]
    MissingDownloadLink { path: String },

    /// Bridge error
    #[error(transparent)]
    BridgeError(#[from] BridgeError),
}

/// Result type for Yandex Disk operations
pub type Result<T> = std::result::Result<T, YandexDiskError>;

impl YandexDiskError {
    /// Classify a non-2xx answer for `path`.
    pub fn from_status(path: &str, status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => YandexDiskError::AuthenticationFailed(message),
            404 => YandexDiskError::ResourceNotFound {
                path: path.to_string(),
            },
            _ => YandexDiskError::ApiError {
                status_code,
                message,
            },
        }
    }
}

impl From<YandexDiskError> for BridgeError {
    fn from(error: YandexDiskError) -> Self {
        match error {
            YandexDiskError::AuthenticationFailed(msg) => BridgeError::Status {
                status: 401,
                message: msg,
            },
            YandexDiskError::ApiError {
                status_code,
                message,
            } => BridgeError::Status {
                status: status_code,
                message,
            },
            YandexDiskError::ResourceNotFound { path } => BridgeError::Status {
                status: 404,
                message: format!("Resource not found: {}", path),
            },
            YandexDiskError::ParseError(msg) => {
                BridgeError::OperationFailed(format!("Parse error: {}", msg))
            }
            YandexDiskError::MissingDownloadLink { path } => {
                BridgeError::OperationFailed(format!("No download link for {}", path))
            }
            YandexDiskError::BridgeError(e) => e,
        }
    }
}
