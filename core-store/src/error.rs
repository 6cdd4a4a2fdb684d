use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    /// The `files` table does not have the shape this build expects.
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Metadata store is corrupt: {0}")]
    Corrupt(String),

    #[error("Invalid transcription transition for {path}: {from} -> {to}")]
    InvalidTransition {
        path: String,
        from: String,
        to: String,
    },

    #[error("Invalid transcription status: {0}")]
    InvalidStatus(String),

    #[error("Record violates an invariant: {0}")]
    InvalidRecord(String),

    #[error("File record not found: {path}")]
    NotFound { path: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Errors that mean the store cannot be trusted at all.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            StoreError::Migration(_) | StoreError::SchemaMismatch(_) | StoreError::Corrupt(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
