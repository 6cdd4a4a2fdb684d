//! # Cleanup Agent
//!
//! Reconciles local state with a full remote listing.
//!
//! Every record whose path no longer exists remotely loses its local
//! download, its artifact and the `_extracted` directory of an expanded
//! archive, then the record itself. Records below a folder that failed to
//! list are left alone because the walk could not see them. Afterwards
//! both roots are pruned of empty directories, deepest first.

use core_convert::ArchiveExpander;
use core_store::{FileRecord, FileRecordRepository};
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

use crate::error::Result;
use crate::paths::{is_within, local_path};
use crate::walker::RemoteListing;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub records_removed: u64,
    pub files_removed: u64,
    pub directories_removed: u64,
}

pub struct CleanupAgent {
    repo: Arc<dyn FileRecordRepository>,
    download_root: PathBuf,
    artifact_root: PathBuf,
}

impl CleanupAgent {
    pub fn new(
        repo: Arc<dyn FileRecordRepository>,
        download_root: impl Into<PathBuf>,
        artifact_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            repo,
            download_root: download_root.into(),
            artifact_root: artifact_root.into(),
        }
    }

    /// Remove everything the listing no longer contains.
    ///
    /// # Errors
    ///
    /// Metadata store failures. Local files that cannot be removed are
    /// logged and skipped.
    #[instrument(skip(self, listing), fields(root = %listing.root))]
    pub async fn run(&self, listing: &RemoteListing) -> Result<CleanupReport> {
        let remote: HashSet<&str> = listing.files.iter().map(|f| f.relative.as_str()).collect();
        let mut report = CleanupReport::default();

        for record in self.repo.list_all().await? {
            if remote.contains(record.path.as_str()) {
                continue;
            }
            if let Some(folder) = listing
                .failed_folders
                .iter()
                .find(|folder| is_within(&record.path, folder))
            {
                debug!(path = %record.path, folder = %folder, "Keeping record below unlisted folder");
                continue;
            }

            report.files_removed += self.remove_local(&record).await;
            if self.repo.delete(&record.path).await? {
                report.records_removed += 1;
                debug!(path = %record.path, "Removed stale record");
            }
        }

        for root in [&self.download_root, &self.artifact_root] {
            report.directories_removed += prune_empty_dirs(root.clone()).await;
        }

        if report != CleanupReport::default() {
            info!(
                records = report.records_removed,
                files = report.files_removed,
                directories = report.directories_removed,
                "Cleanup finished"
            );
        }
        Ok(report)
    }

    /// Delete the download, artifact and extraction directory of a record.
    async fn remove_local(&self, record: &FileRecord) -> u64 {
        let mut removed = 0;
        if remove_file(&local_path(&self.download_root, &record.path)).await {
            removed += 1;
        }
        if let Some(artifact) = record.converted_artifact_path.as_deref().filter(|a| !a.is_empty()) {
            let artifact = local_path(&self.artifact_root, artifact);
            if remove_file(&artifact).await {
                removed += 1;
            }
            let extracted = ArchiveExpander::extracted_dir(&artifact);
            match tokio::fs::remove_dir_all(&extracted).await {
                Ok(()) => {
                    debug!(path = %extracted.display(), "Removed extracted archive contents");
                    removed += 1;
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %extracted.display(), error = %e, "Failed to remove extracted contents"),
            }
        }
        removed
    }
}

async fn remove_file(path: &Path) -> bool {
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to remove file");
            false
        }
    }
}

/// Remove empty directories below `root` (never `root` itself).
async fn prune_empty_dirs(root: PathBuf) -> u64 {
    let result = tokio::task::spawn_blocking(move || {
        let mut removed = 0;
        for entry in WalkDir::new(&root).min_depth(1).contents_first(true) {
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_dir() {
                continue;
            }
            // Fails harmlessly on directories that still hold entries.
            if std::fs::remove_dir(entry.path()).is_ok() {
                removed += 1;
            }
        }
        removed
    })
    .await;

    match result {
        Ok(removed) => removed,
        Err(e) => {
            warn!(error = %e, "Directory pruning task failed");
            0
        }
    }
}
