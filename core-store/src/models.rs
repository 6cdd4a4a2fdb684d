//! # File Record Model
//!
//! One [`FileRecord`] per remote path. A record is only written once the
//! side effect it describes (download, conversion or transcription
//! submission) has happened, so a missing row always means "retry".

use crate::error::{Result, StoreError};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Transcription lifecycle of a record.
///
/// `None -> Pending -> InProgress -> {Completed | Failed}`. `Pending` means
/// the job was submitted and its handle persisted but no poll has seen it
/// running yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptionStatus {
    #[default]
    None,
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TranscriptionStatus {
    /// An external job currently owns the path.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            TranscriptionStatus::Pending | TranscriptionStatus::InProgress
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TranscriptionStatus::Completed | TranscriptionStatus::Failed
        )
    }

    /// Get the string representation for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionStatus::None => "none",
            TranscriptionStatus::Pending => "pending",
            TranscriptionStatus::InProgress => "in_progress",
            TranscriptionStatus::Completed => "completed",
            TranscriptionStatus::Failed => "failed",
        }
    }

    /// Whether `self -> next` is a legal step of the state machine.
    ///
    /// Terminal states may only restart through a fresh submission.
    pub fn can_transition_to(&self, next: TranscriptionStatus) -> bool {
        use TranscriptionStatus::*;
        matches!(
            (self, next),
            (None, Pending)
                | (Pending, InProgress)
                | (Pending, Completed)
                | (Pending, Failed)
                | (InProgress, InProgress)
                | (InProgress, Completed)
                | (InProgress, Failed)
                | (Completed, Pending)
                | (Failed, Pending)
        )
    }
}

impl FromStr for TranscriptionStatus {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "" | "none" => Ok(TranscriptionStatus::None),
            "pending" => Ok(TranscriptionStatus::Pending),
            "in_progress" => Ok(TranscriptionStatus::InProgress),
            "completed" => Ok(TranscriptionStatus::Completed),
            "failed" => Ok(TranscriptionStatus::Failed),
            _ => Err(StoreError::InvalidStatus(s.to_string())),
        }
    }
}

impl std::fmt::Display for TranscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Persisted sync state of one remote path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Path relative to the sync root, `/`-separated (e.g. `A/doc.docx`)
    pub path: String,
    /// Size in bytes as last observed remotely
    pub size: u64,
    /// Remote modification token as last observed
    pub remote_modified: String,
    pub content_hash: Option<String>,
    /// Unix timestamp of the last successful materialization
    pub last_sync: i64,
    pub is_empty_placeholder: bool,
    /// Artifact path relative to the artifact root
    pub converted_artifact_path: Option<String>,
    pub transcription_status: TranscriptionStatus,
    pub transcription_operation_id: Option<String>,
    pub transcription_started_at: Option<i64>,
    /// Opaque JSON carried between transcription phases
    pub video_metadata: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl FileRecord {
    /// Record for a freshly materialized file, without artifact.
    pub fn new(
        path: impl Into<String>,
        size: u64,
        remote_modified: impl Into<String>,
        content_hash: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            path: path.into(),
            size,
            remote_modified: remote_modified.into(),
            content_hash: content_hash.filter(|h| !h.is_empty()),
            last_sync: now,
            is_empty_placeholder: false,
            converted_artifact_path: None,
            transcription_status: TranscriptionStatus::None,
            transcription_operation_id: None,
            transcription_started_at: None,
            video_metadata: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        let artifact = artifact.into();
        self.converted_artifact_path = (!artifact.is_empty()).then_some(artifact);
        self
    }

    /// Marks the record as owned by a just-submitted external job.
    pub fn with_pending_transcription(
        mut self,
        operation_id: impl Into<String>,
        started_at: i64,
        metadata: Option<String>,
    ) -> Self {
        self.converted_artifact_path = None;
        self.transcription_status = TranscriptionStatus::Pending;
        self.transcription_operation_id = Some(operation_id.into());
        self.transcription_started_at = Some(started_at);
        self.video_metadata = metadata;
        self
    }

    pub fn has_artifact(&self) -> bool {
        self.converted_artifact_path
            .as_deref()
            .is_some_and(|p| !p.is_empty())
    }

    /// Remote size and modification token both match.
    pub fn matches_remote(&self, size: u64, remote_modified: &str) -> bool {
        self.size == size && self.remote_modified == remote_modified
    }

    /// Checks the row-level invariants before a write.
    pub fn validate(&self) -> Result<()> {
        if self.path.is_empty() {
            return Err(StoreError::InvalidRecord("path cannot be empty".to_string()));
        }
        if self.transcription_status.is_active() && self.has_artifact() {
            return Err(StoreError::InvalidRecord(format!(
                "{} has an active transcription and an artifact",
                self.path
            )));
        }
        if self.transcription_status.is_active() && self.transcription_operation_id.is_none() {
            return Err(StoreError::InvalidRecord(format!(
                "{} has an active transcription without operation handle",
                self.path
            )));
        }
        Ok(())
    }
}

/// Partial update applied by the transcription coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptionUpdate {
    pub status: TranscriptionStatus,
    /// `Some` replaces the stored handle
    pub operation_id: Option<String>,
    pub started_at: Option<i64>,
    pub video_metadata: Option<String>,
    /// Set together with `Completed`
    pub artifact_path: Option<String>,
}

impl TranscriptionUpdate {
    pub fn status(status: TranscriptionStatus) -> Self {
        Self {
            status,
            operation_id: None,
            started_at: None,
            video_metadata: None,
            artifact_path: None,
        }
    }

    pub fn completed(artifact_path: impl Into<String>) -> Self {
        Self {
            artifact_path: Some(artifact_path.into()),
            ..Self::status(TranscriptionStatus::Completed)
        }
    }
}

/// Whether an upsert created or replaced a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// Aggregate numbers over the whole store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatistics {
    pub total: u64,
    pub placeholders: u64,
    pub materialized: u64,
    pub converted: u64,
    pub active_transcriptions: u64,
    pub total_size: u64,
}
