use bridge_traits::error::BridgeError;
use core_convert::ConvertError;
use core_store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Metadata store error: {0}")]
    Store(#[from] StoreError),

    #[error("Remote store error: {0}")]
    Remote(#[from] BridgeError),

    /// The remote store refused our credentials.
    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Downloaded byte count differs from the size the listing announced.
    #[error("Size mismatch for {path}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        path: String,
        expected: u64,
        actual: u64,
    },

    #[error("Sync cancelled")]
    Cancelled,
}

impl SyncError {
    /// Whether the same download could succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_transient(),
            SyncError::Io(_) | SyncError::SizeMismatch { .. } => true,
            _ => false,
        }
    }
}

impl From<core_runtime::Error> for SyncError {
    fn from(error: core_runtime::Error) -> Self {
        SyncError::Config(error.to_string())
    }
}

impl From<tokio::task::JoinError> for SyncError {
    fn from(error: tokio::task::JoinError) -> Self {
        SyncError::Io(std::io::Error::other(error.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
