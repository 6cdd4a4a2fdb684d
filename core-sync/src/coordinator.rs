//! # Sync Coordinator
//!
//! Runs one complete mirror pass.
//!
//! ## Workflow
//!
//! 1. Re-poll transcriptions left active by a previous run
//! 2. Obtain the remote listing (cache or walk)
//! 3. For each file, with `download_workers` in flight: skip policy,
//!    differential check, budget reservation, download, conversion, record write
//! 4. Write the failure list
//! 5. Remove what disappeared remotely
//! 6. Log the report
//! 7. Optionally wait for every transcription to resolve
//!
//! Per-file problems are tallied and never stop the batch. A metadata store
//! failure cancels the session and fails the run.
//!
//! ## Usage
//!
//! ```ignore
//! let coordinator = SyncCoordinator::new(config, store, repo, registry)
//!     .with_transcription(backend);
//! let report = coordinator.run(&cancel).await?;
//! println!("{} downloaded", report.downloaded());
//! ```

use bridge_traits::http::RetryPolicy;
use bridge_traits::storage::RemoteStore;
use bridge_traits::time::{Clock, SystemClock};
use core_convert::{AsyncJobBackend, ConverterRegistry, Dispatch};
use core_runtime::config::SyncConfig;
use core_store::{FileRecord, FileRecordRepository};
use futures::stream::{self, StreamExt};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::cleanup::CleanupAgent;
use crate::differential::{self, Decision, DownloadReason};
use crate::error::{Result, SyncError};
use crate::executor::DownloadExecutor;
use crate::listing_cache::ListingCache;
use crate::paths::sanitize_relative;
use crate::report::SyncReport;
use crate::session::SessionContext;
use crate::skip_policy::{Admission, SkipPolicy, SkipReason};
use crate::transcription::TranscriptionCoordinator;
use crate::walker::{RemoteFile, TreeWalker};

pub struct SyncCoordinator {
    config: SyncConfig,
    repo: Arc<dyn FileRecordRepository>,
    walker: TreeWalker,
    cache: ListingCache,
    skip: SkipPolicy,
    executor: DownloadExecutor,
    registry: ConverterRegistry,
    cleanup: CleanupAgent,
    transcription: Option<TranscriptionCoordinator>,
    clock: Arc<dyn Clock>,
}

impl SyncCoordinator {
    pub fn new(
        config: SyncConfig,
        store: Arc<dyn RemoteStore>,
        repo: Arc<dyn FileRecordRepository>,
        registry: ConverterRegistry,
    ) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let paths = &config.paths;

        let walker = TreeWalker::new(
            Arc::clone(&store),
            config.listing.page_size,
            config.concurrency.folder_scan_workers,
        );
        let cache = Self::listing_cache(&config, Arc::clone(&clock));
        let executor = DownloadExecutor::new(
            store,
            paths.download_dir.clone(),
            RetryPolicy::linear(config.retry.max_retries, config.retry.retry_delay),
        );
        let cleanup = CleanupAgent::new(
            Arc::clone(&repo),
            paths.download_dir.clone(),
            paths.artifact_dir.clone(),
        );

        Self {
            skip: SkipPolicy::new(config.skip.clone()),
            config,
            repo,
            walker,
            cache,
            executor,
            registry,
            cleanup,
            transcription: None,
            clock,
        }
    }

    fn listing_cache(config: &SyncConfig, clock: Arc<dyn Clock>) -> ListingCache {
        ListingCache::new(
            config.paths.listing_cache_dir.clone(),
            config.listing.cache_ttl,
            clock,
        )
        .enabled(config.listing.cache_enabled)
    }

    /// Track submitted transcriptions through `backend`.
    ///
    /// Without this, records stay `pending` until a later run that has one.
    pub fn with_transcription(mut self, backend: Arc<dyn AsyncJobBackend>) -> Self {
        let settings = &self.config.transcription;
        self.transcription = Some(
            TranscriptionCoordinator::new(
                Arc::clone(&self.repo),
                backend,
                self.config.paths.artifact_dir.clone(),
            )
            .with_workers(self.config.concurrency.transcription_poll_workers)
            .with_poll_interval(settings.poll_interval)
            .with_timeout(settings.timeout)
            .with_clock(Arc::clone(&self.clock)),
        );
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.walker = self.walker.with_clock(Arc::clone(&clock));
        self.cache = Self::listing_cache(&self.config, Arc::clone(&clock));
        self.transcription = self
            .transcription
            .map(|t| t.with_clock(Arc::clone(&clock)));
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transcription(&self) -> Option<&TranscriptionCoordinator> {
        self.transcription.as_ref()
    }

    fn artifact_root(&self) -> &PathBuf {
        &self.config.paths.artifact_dir
    }

    /// Run one full mirror pass.
    ///
    /// # Errors
    ///
    /// - [`SyncError::Credential`] / [`SyncError::Remote`] if the root
    ///   cannot be listed
    /// - [`SyncError::Store`] on any metadata store failure
    /// - [`SyncError::Cancelled`] if `cancel` fired; records written before
    ///   that point are kept
    #[instrument(skip(self, cancel), fields(root = %self.config.remote_root))]
    pub async fn run(&self, cancel: &CancellationToken) -> Result<SyncReport> {
        let started = Instant::now();
        let session = SessionContext::new(self.skip.budget_limit(), cancel.child_token());
        info!("Starting sync");

        if let Some(transcription) = &self.transcription {
            if self.config.transcription.check_pending_on_start {
                info!("Phase 1: Resuming pending transcriptions");
                let resumed = transcription.resume_pending().await?;
                session.tally(|r| {
                    r.transcriptions_completed += resumed.completed;
                    r.transcriptions_failed += resumed.failed;
                });
            }
        }

        info!("Phase 2: Listing remote tree");
        let (listing, cached) = self
            .cache
            .get_or_walk(
                &self.walker,
                &self.config.remote_root,
                &session.progress,
                &session.cancel,
            )
            .await?;
        session.tally(|r| {
            r.files_discovered = listing.files.len() as u64;
            r.folders_discovered = listing.folders.len() as u64;
            r.folders_failed = listing.failed_folders.len() as u64;
            r.listing_cached = cached;
        });

        info!(
            files = listing.files.len(),
            workers = self.config.concurrency.download_workers,
            "Phase 3: Processing files"
        );
        let mut fatal: Option<SyncError> = None;
        {
            let mut results = stream::iter(listing.files.iter())
                .map(|file| self.process_file(file, &session))
                .buffer_unordered(self.config.concurrency.download_workers.max(1));
            while let Some(result) = results.next().await {
                if let Err(e) = result {
                    if fatal.is_none() {
                        error!(error = %e, "Aborting sync");
                        session.cancel.cancel();
                        fatal = Some(e);
                    }
                }
            }
        }

        info!("Phase 4: Writing failure list");
        self.write_failure_list(&session.failures()).await;

        if let Some(e) = fatal {
            return Err(e);
        }

        if session.is_cancelled() {
            warn!("Sync cancelled, skipping cleanup");
        } else {
            info!("Phase 5: Cleaning up removed files");
            let cleanup = self.cleanup.run(&listing).await?;
            session.tally(|r| r.cleanup = cleanup);
        }

        info!("Phase 6: Summary");
        session.tally(|r| r.duration = started.elapsed());
        session.report().log_summary();
        match self.repo.statistics().await {
            Ok(stats) => info!(
                records = stats.total,
                converted = stats.converted,
                active_transcriptions = stats.active_transcriptions,
                mb = stats.total_size / (1024 * 1024),
                "Metadata store"
            ),
            Err(e) => warn!(error = %e, "Failed to read store statistics"),
        }

        if let Some(transcription) = &self.transcription {
            if self.config.transcription.wait_for_completion && !session.is_cancelled() {
                info!("Phase 7: Waiting for transcriptions");
                let waited = transcription.wait_for_all(&session.cancel).await?;
                session.tally(|r| {
                    r.transcriptions_completed += waited.completed;
                    r.transcriptions_failed += waited.failed;
                });
                info!(
                    completed = waited.completed,
                    failed = waited.failed,
                    "Transcriptions resolved"
                );
            }
        }

        if session.is_cancelled() {
            return Err(SyncError::Cancelled);
        }

        session.tally(|r| r.duration = started.elapsed());
        Ok(session.report())
    }

    /// One file through skip policy, differential check, download and
    /// conversion. Only metadata store failures are returned as errors.
    async fn process_file(&self, file: &RemoteFile, session: &SessionContext) -> Result<()> {
        if session.is_cancelled() {
            return Ok(());
        }

        if let Admission::Skipped(reason) = self.skip.evaluate(file, &session.budget) {
            Self::skip(file, reason, session);
            return Ok(());
        }

        let existing = self.repo.get(&file.relative).await?;
        let reason = match differential::decide(file, existing.as_ref(), self.artifact_root()).await {
            Decision::Download(reason) => reason,
            Decision::SkipUnchanged => {
                session.tally(|r| r.unchanged += 1);
                return Ok(());
            }
            Decision::SkipActiveOperation => {
                debug!(path = %file.relative, "Transcription in flight, leaving file alone");
                session.tally(|r| r.active_operation_skips += 1);
                return Ok(());
            }
        };

        // Only files that are really fetched hold budget bytes.
        let Some(reservation) = session.budget.try_reserve(file.size) else {
            Self::skip(file, SkipReason::TotalLimit, session);
            return Ok(());
        };

        let downloaded = match self.executor.download(file, &session.cancel).await {
            Ok(downloaded) => downloaded,
            Err(SyncError::Cancelled) => return Ok(()),
            Err(e) => {
                warn!(path = %file.relative, error = %e, "Download failed");
                session.add_failure(file.relative.clone());
                session.tally(|r| r.download_failures += 1);
                return Ok(());
            }
        };
        reservation.commit(downloaded.bytes);
        session.tally(|r| {
            match reason {
                DownloadReason::New => r.downloaded_new += 1,
                DownloadReason::Changed => r.updated += 1,
                DownloadReason::MissingArtifact => r.repaired += 1,
            }
            r.bytes_downloaded += downloaded.bytes;
        });
        debug!(path = %file.relative, reason = ?reason, bytes = downloaded.bytes, "Downloaded");

        let now = self.clock.unix_timestamp();
        let mut record = FileRecord::new(
            file.relative.clone(),
            file.size,
            file.modified.clone(),
            file.content_hash.clone(),
            now,
        );
        if let Some(existing) = &existing {
            record.created_at = existing.created_at;
        }

        if self.config.conversion.enabled {
            let dispatched = self
                .registry
                .dispatch(
                    &downloaded.local_path,
                    &sanitize_relative(&file.relative),
                    self.artifact_root(),
                )
                .await;

            match dispatched {
                Ok(Dispatch::NoConverter) => session.tally(|r| r.no_converter += 1),
                Ok(Dispatch::Converted { artifact, converter }) => {
                    debug!(path = %file.relative, artifact = %artifact, converter, "Converted");
                    record = record.with_artifact(artifact);
                    session.tally(|r| r.converted += 1);
                    if self.config.conversion.delete_originals_after_conversion {
                        if let Err(e) = tokio::fs::remove_file(&downloaded.local_path).await {
                            warn!(path = %file.relative, error = %e, "Failed to delete original");
                        }
                    }
                }
                Ok(Dispatch::Submitted { operation, converter, .. }) => {
                    info!(
                        path = %file.relative,
                        operation_id = %operation.operation_id,
                        converter,
                        "Conversion submitted"
                    );
                    record = record.with_pending_transcription(
                        operation.operation_id,
                        now,
                        Some(operation.metadata.to_string()),
                    );
                    session.tally(|r| r.transcriptions_submitted += 1);
                }
                Err(e) => {
                    warn!(path = %file.relative, error = %e, "Conversion failed, file will be retried");
                    if let Err(e) = tokio::fs::remove_file(&downloaded.local_path).await {
                        debug!(path = %file.relative, error = %e, "Could not remove failed source");
                    }
                    session.add_failure(file.relative.clone());
                    session.tally(|r| r.conversion_failures += 1);
                    return Ok(());
                }
            }
        }

        self.repo.upsert(&record).await?;
        Ok(())
    }

    fn skip(file: &RemoteFile, reason: SkipReason, session: &SessionContext) {
        debug!(path = %file.relative, reason = %reason, size = file.size, "Skipping file");
        session.tally(|r| r.record_skip(reason));
    }

    async fn write_failure_list(&self, failures: &[String]) {
        if failures.is_empty() {
            return;
        }
        let path = &self.config.paths.failed_list_path;
        let mut contents = failures.join("\n");
        contents.push('\n');

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(path = %path.display(), error = %e, "Failed to create failure list directory");
                return;
            }
        }
        match tokio::fs::write(path, contents).await {
            Ok(()) => info!(path = %path.display(), count = failures.len(), "Failure list written"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write failure list"),
        }
    }
}
