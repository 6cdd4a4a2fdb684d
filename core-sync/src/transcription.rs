//! # Transcription Coordinator
//!
//! Drives submitted transcription jobs to a terminal state.
//!
//! Every record whose status is `pending` or `in_progress` is polled through
//! the [`AsyncJobBackend`]. A finished job has its transcript rendered next
//! to the other artifacts and its record marked `completed`; a job the
//! service failed, or one older than the configured timeout, is marked
//! `failed`. A poll that cannot reach the service leaves the record as it
//! was so the next round tries again, until the job outlives the timeout.
//! The timeout applies whether or not the service answers, so
//! [`TranscriptionCoordinator::wait_for_all`] always terminates.

use bridge_traits::time::{Clock, SystemClock};
use chrono::{TimeZone, Utc};
use core_convert::{render_transcript, AsyncJobBackend, ConverterRegistry, OperationHandle, VideoMetadata};
use core_store::{FileRecord, FileRecordRepository, TranscriptionStatus, TranscriptionUpdate};
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::paths::sanitize_relative;

/// Outcome of polling one record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Completed,
    Failed,
    TimedOut,
    Running,
    /// The service could not be reached or the transcript could not be
    /// written; the record is unchanged
    Unreachable,
}

/// Tallies of one polling round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub polled: u64,
    pub completed: u64,
    pub failed: u64,
    pub running: u64,
    pub unreachable: u64,
}

impl PollSummary {
    fn add(&mut self, outcome: PollOutcome) {
        self.polled += 1;
        match outcome {
            PollOutcome::Completed => self.completed += 1,
            PollOutcome::Failed | PollOutcome::TimedOut => self.failed += 1,
            PollOutcome::Running => self.running += 1,
            PollOutcome::Unreachable => self.unreachable += 1,
        }
    }

    fn merge(&mut self, other: PollSummary) {
        self.polled += other.polled;
        self.completed += other.completed;
        self.failed += other.failed;
        self.running += other.running;
        self.unreachable += other.unreachable;
    }

    /// Records still owned by a job after the round.
    pub fn still_active(&self) -> u64 {
        self.running + self.unreachable
    }
}

pub struct TranscriptionCoordinator {
    repo: Arc<dyn FileRecordRepository>,
    backend: Arc<dyn AsyncJobBackend>,
    artifact_root: PathBuf,
    workers: usize,
    poll_interval: Duration,
    timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl TranscriptionCoordinator {
    pub fn new(
        repo: Arc<dyn FileRecordRepository>,
        backend: Arc<dyn AsyncJobBackend>,
        artifact_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            backend,
            artifact_root: artifact_root.into(),
            workers: 2,
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Poll every active record once before new work starts.
    #[instrument(skip(self))]
    pub async fn resume_pending(&self) -> Result<PollSummary> {
        let summary = self.poll_round().await?;
        if summary.polled > 0 {
            info!(
                polled = summary.polled,
                completed = summary.completed,
                failed = summary.failed,
                still_active = summary.still_active(),
                "Resumed pending transcriptions"
            );
        }
        Ok(summary)
    }

    /// Poll every active record once, with bounded concurrency.
    ///
    /// # Errors
    ///
    /// Only metadata store failures; per-job problems are tallied.
    pub async fn poll_round(&self) -> Result<PollSummary> {
        let active = self.repo.list_active_transcriptions().await?;
        if active.is_empty() {
            return Ok(PollSummary::default());
        }
        debug!(active = active.len(), "Polling transcriptions");

        let results: Vec<Result<PollOutcome>> = stream::iter(active)
            .map(|record| async move { self.poll_record(&record).await })
            .buffer_unordered(self.workers)
            .collect()
            .await;

        let mut summary = PollSummary::default();
        for result in results {
            summary.add(result?);
        }
        Ok(summary)
    }

    /// Repeat polling rounds until no record is active.
    ///
    /// Returns the accumulated tallies; cancellation stops between rounds.
    #[instrument(skip(self, cancel))]
    pub async fn wait_for_all(&self, cancel: &CancellationToken) -> Result<PollSummary> {
        let mut total = PollSummary::default();
        loop {
            let round = self.poll_round().await?;
            total.merge(round);
            if round.still_active() == 0 {
                break;
            }
            info!(
                remaining = round.still_active(),
                interval_secs = self.poll_interval.as_secs(),
                "Waiting for transcriptions"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
        Ok(total)
    }

    async fn poll_record(&self, record: &FileRecord) -> Result<PollOutcome> {
        let Some(operation_id) = record.transcription_operation_id.as_deref() else {
            warn!(path = %record.path, "Active transcription without operation handle");
            self.set_status(&record.path, TranscriptionStatus::Failed).await?;
            return Ok(PollOutcome::Failed);
        };

        let status = match self.backend.poll_status(&OperationHandle::new(operation_id)).await {
            Ok(status) => status,
            Err(e) => {
                warn!(path = %record.path, operation_id, error = %e, "Transcription poll failed");
                return self.unless_expired(record, operation_id, PollOutcome::Unreachable).await;
            }
        };

        if status.done {
            if let Some(error) = status.error {
                warn!(path = %record.path, operation_id, error = %error, "Transcription failed");
                self.set_status(&record.path, TranscriptionStatus::Failed).await?;
                return Ok(PollOutcome::Failed);
            }
            let text = status.result.unwrap_or_default();
            let artifact = match self.write_transcript(record, &text).await {
                Ok(artifact) => artifact,
                Err(e) => {
                    warn!(path = %record.path, error = %e, "Failed to write transcript, will retry");
                    return self.unless_expired(record, operation_id, PollOutcome::Unreachable).await;
                }
            };
            self.repo
                .update_transcription(&record.path, &TranscriptionUpdate::completed(&artifact))
                .await?;
            info!(path = %record.path, artifact = %artifact, "Transcription completed");
            return Ok(PollOutcome::Completed);
        }

        let outcome = self.unless_expired(record, operation_id, PollOutcome::Running).await?;
        if outcome == PollOutcome::Running
            && record.transcription_status != TranscriptionStatus::InProgress
        {
            self.set_status(&record.path, TranscriptionStatus::InProgress).await?;
        }
        Ok(outcome)
    }

    /// Mark the record failed if it outlived the timeout, else `otherwise`.
    async fn unless_expired(
        &self,
        record: &FileRecord,
        operation_id: &str,
        otherwise: PollOutcome,
    ) -> Result<PollOutcome> {
        if !self.is_expired(record) {
            return Ok(otherwise);
        }
        warn!(
            path = %record.path,
            operation_id,
            timeout_secs = self.timeout.as_secs(),
            "Transcription timed out"
        );
        self.set_status(&record.path, TranscriptionStatus::Failed).await?;
        Ok(PollOutcome::TimedOut)
    }

    fn is_expired(&self, record: &FileRecord) -> bool {
        let Some(started_at) = record.transcription_started_at else {
            return false;
        };
        let age = self.clock.unix_timestamp() - started_at;
        age >= 0 && age as u64 >= self.timeout.as_secs()
    }

    async fn set_status(&self, path: &str, status: TranscriptionStatus) -> Result<()> {
        self.repo
            .update_transcription(path, &TranscriptionUpdate::status(status))
            .await?;
        Ok(())
    }

    /// Render and write the transcript; returns its artifact-relative path.
    async fn write_transcript(&self, record: &FileRecord, text: &str) -> Result<String> {
        let metadata = self.metadata_for(record);
        let artifact = ConverterRegistry::artifact_relative_path(&sanitize_relative(&record.path), "md");
        let output = self.artifact_root.join(&artifact);
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&output, render_transcript(&metadata, text, self.clock.now())).await?;
        Ok(artifact)
    }

    /// Metadata saved at submission, or a reconstruction from the record.
    fn metadata_for(&self, record: &FileRecord) -> VideoMetadata {
        let saved = record
            .video_metadata
            .as_deref()
            .and_then(|raw| serde_json::from_str::<serde_json::Value>(raw).ok())
            .and_then(|value| VideoMetadata::from_json(&value).ok());
        if let Some(metadata) = saved {
            return metadata;
        }

        debug!(path = %record.path, "No usable video metadata, rebuilding from record");
        VideoMetadata {
            source_file: Path::new(&record.path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| record.path.clone()),
            size_bytes: record.size,
            language: String::new(),
            submitted_at: record
                .transcription_started_at
                .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
                .unwrap_or_else(|| self.clock.now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::time::FixedClock;
    use core_convert::{ConvertError, OperationStatus};
    use core_store::{create_test_pool, SqliteFileRecordRepository};
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct ScriptedBackend {
        statuses: Mutex<HashMap<String, std::result::Result<OperationStatus, String>>>,
    }

    impl ScriptedBackend {
        fn set(&self, id: &str, status: std::result::Result<OperationStatus, String>) {
            self.statuses.lock().unwrap().insert(id.to_string(), status);
        }
    }

    #[async_trait]
    impl AsyncJobBackend for ScriptedBackend {
        async fn submit(&self, _input: &Path) -> core_convert::Result<OperationHandle> {
            Ok(OperationHandle::new("unused"))
        }

        async fn poll_status(&self, handle: &OperationHandle) -> core_convert::Result<OperationStatus> {
            match self.statuses.lock().unwrap().get(&handle.id).cloned() {
                Some(Ok(status)) => Ok(status),
                Some(Err(message)) => Err(ConvertError::Bridge(BridgeError::Transient(message))),
                None => Ok(OperationStatus::default()),
            }
        }
    }

    fn done(text: &str) -> std::result::Result<OperationStatus, String> {
        Ok(OperationStatus {
            done: true,
            error: None,
            result: Some(text.to_string()),
        })
    }

    async fn fixture(
        clock: Arc<FixedClock>,
    ) -> (
        Arc<SqliteFileRecordRepository>,
        Arc<ScriptedBackend>,
        tempfile::TempDir,
        TranscriptionCoordinator,
    ) {
        let repo = Arc::new(SqliteFileRecordRepository::new(create_test_pool().await.unwrap()));
        let backend = Arc::new(ScriptedBackend::default());
        let dir = tempfile::tempdir().unwrap();
        let coordinator = TranscriptionCoordinator::new(repo.clone(), backend.clone(), dir.path())
            .with_poll_interval(Duration::from_millis(5))
            .with_timeout(Duration::from_secs(600))
            .with_clock(clock);
        (repo, backend, dir, coordinator)
    }

    async fn submitted(repo: &SqliteFileRecordRepository, path: &str, op: &str, started_at: i64) {
        let metadata = VideoMetadata {
            source_file: Path::new(path).file_name().unwrap().to_string_lossy().to_string(),
            size_bytes: 2048,
            language: "ru-RU".into(),
            submitted_at: Utc.timestamp_opt(started_at, 0).unwrap(),
        };
        let record = FileRecord::new(path, 2048, "T1", None, started_at).with_pending_transcription(
            op,
            started_at,
            Some(metadata.to_json().unwrap().to_string()),
        );
        repo.upsert(&record).await.unwrap();
    }

    #[tokio::test]
    async fn test_completed_job_writes_transcript() {
        let clock = Arc::new(FixedClock::from_timestamp(1_000));
        let (repo, backend, dir, coordinator) = fixture(clock).await;
        submitted(&repo, "V/talk.mp4", "op-1", 1_000).await;
        backend.set("op-1", done("hello world"));

        let summary = coordinator.poll_round().await.unwrap();
        assert_eq!(summary.completed, 1);

        let record = repo.get("V/talk.mp4").await.unwrap().unwrap();
        assert_eq!(record.transcription_status, TranscriptionStatus::Completed);
        assert_eq!(record.converted_artifact_path.as_deref(), Some("V/talk.mp4.md"));

        let transcript = std::fs::read_to_string(dir.path().join("V/talk.mp4.md")).unwrap();
        assert!(transcript.contains("source_file: talk.mp4"));
        assert!(transcript.contains("language: ru-RU"));
        assert!(transcript.contains("hello world"));
    }

    #[tokio::test]
    async fn test_running_job_moves_to_in_progress_then_times_out() {
        let clock = Arc::new(FixedClock::from_timestamp(1_000));
        let (repo, _backend, _dir, coordinator) = fixture(clock.clone()).await;
        submitted(&repo, "talk.mp4", "op-1", 1_000).await;

        assert_eq!(coordinator.poll_round().await.unwrap().running, 1);
        let record = repo.get("talk.mp4").await.unwrap().unwrap();
        assert_eq!(record.transcription_status, TranscriptionStatus::InProgress);

        clock.advance(chrono::Duration::seconds(600));
        assert_eq!(coordinator.poll_round().await.unwrap().failed, 1);
        let record = repo.get("talk.mp4").await.unwrap().unwrap();
        assert_eq!(record.transcription_status, TranscriptionStatus::Failed);
        assert!(record.converted_artifact_path.is_none());
    }

    #[tokio::test]
    async fn test_service_error_marks_failed() {
        let clock = Arc::new(FixedClock::from_timestamp(0));
        let (repo, backend, _dir, coordinator) = fixture(clock).await;
        submitted(&repo, "talk.mp4", "op-1", 0).await;
        backend.set(
            "op-1",
            Ok(OperationStatus {
                done: true,
                error: Some("unsupported codec".into()),
                result: None,
            }),
        );

        coordinator.poll_round().await.unwrap();
        let record = repo.get("talk.mp4").await.unwrap().unwrap();
        assert_eq!(record.transcription_status, TranscriptionStatus::Failed);
    }

    #[tokio::test]
    async fn test_unreachable_service_leaves_record_untouched() {
        let clock = Arc::new(FixedClock::from_timestamp(0));
        let (repo, backend, _dir, coordinator) = fixture(clock).await;
        submitted(&repo, "talk.mp4", "op-1", 0).await;
        backend.set("op-1", Err("connection refused".into()));

        let summary = coordinator.poll_round().await.unwrap();
        assert_eq!(summary.unreachable, 1);
        let record = repo.get("talk.mp4").await.unwrap().unwrap();
        assert_eq!(record.transcription_status, TranscriptionStatus::Pending);
    }

    #[tokio::test]
    async fn test_unreachable_service_still_times_out() {
        let clock = Arc::new(FixedClock::from_timestamp(1_000));
        let (repo, backend, _dir, coordinator) = fixture(clock).await;
        submitted(&repo, "talk.mp4", "op-1", 0).await;
        backend.set("op-1", Err("connection refused".into()));

        let total = tokio::time::timeout(
            Duration::from_secs(2),
            coordinator.wait_for_all(&CancellationToken::new()),
        )
        .await
        .expect("wait_for_all must finish once the job is past its timeout")
        .unwrap();

        assert_eq!(total.failed, 1);
        assert_eq!(total.unreachable, 0);
        let record = repo.get("talk.mp4").await.unwrap().unwrap();
        assert_eq!(record.transcription_status, TranscriptionStatus::Failed);
        assert!(repo.list_active_transcriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_all_returns_once_jobs_resolve() {
        let clock = Arc::new(FixedClock::from_timestamp(0));
        let (repo, backend, _dir, coordinator) = fixture(clock).await;
        submitted(&repo, "a.mp4", "op-a", 0).await;
        submitted(&repo, "b.mp4", "op-b", 0).await;
        backend.set("op-a", done("a"));

        let finisher = backend.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            finisher.set("op-b", done("b"));
        });

        let total = coordinator.wait_for_all(&CancellationToken::new()).await.unwrap();
        assert_eq!(total.completed, 2);
        assert!(repo.list_active_transcriptions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wait_for_all_honours_cancellation() {
        let clock = Arc::new(FixedClock::from_timestamp(0));
        let (repo, _backend, _dir, coordinator) = fixture(clock).await;
        submitted(&repo, "a.mp4", "op-a", 0).await;

        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = coordinator.wait_for_all(&cancel).await;
        assert!(matches!(result, Err(SyncError::Cancelled)));
    }

    #[tokio::test]
    async fn test_missing_metadata_falls_back_to_record() {
        let clock = Arc::new(FixedClock::from_timestamp(50));
        let (repo, backend, dir, coordinator) = fixture(clock).await;
        let record = FileRecord::new("clip.mov", 10, "T1", None, 0).with_pending_transcription("op-1", 0, None);
        repo.upsert(&record).await.unwrap();
        backend.set("op-1", done("text"));

        coordinator.poll_round().await.unwrap();
        let transcript = std::fs::read_to_string(dir.path().join("clip.mov.md")).unwrap();
        assert!(transcript.contains("# clip"));
    }
}
