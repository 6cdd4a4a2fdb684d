use bridge_traits::error::BridgeError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported input: {0}")]
    Unsupported(String),

    #[error("Archive extraction failed: {0}")]
    Extraction(String),

    #[error("Failed to parse {0}")]
    Parse(String),

    /// The external job service rejected or failed the job.
    #[error("Transcription backend error: {0}")]
    Backend(String),

    /// An external tool (ffmpeg) failed or is missing.
    #[error("External tool failed: {0}")]
    Tool(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Converter reported success but wrote no artifact at {0}")]
    MissingOutput(PathBuf),

    #[error(transparent)]
    Bridge(#[from] BridgeError),
}

impl ConvertError {
    /// Transport-level failure talking to a remote service.
    pub fn is_transient(&self) -> bool {
        matches!(self, ConvertError::Bridge(e) if e.is_transient())
    }
}

impl From<tokio::task::JoinError> for ConvertError {
    fn from(error: tokio::task::JoinError) -> Self {
        ConvertError::Io(std::io::Error::other(error.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;
