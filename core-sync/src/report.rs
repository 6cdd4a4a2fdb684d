//! Outcome tallies of one sync run.

use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use crate::cleanup::CleanupReport;
use crate::skip_policy::SkipReason;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub files_discovered: u64,
    pub folders_discovered: u64,
    pub folders_failed: u64,
    /// Listing came from the cache instead of a fresh walk
    pub listing_cached: bool,

    pub downloaded_new: u64,
    pub updated: u64,
    /// Re-downloads triggered by a missing artifact
    pub repaired: u64,
    pub unchanged: u64,
    pub active_operation_skips: u64,
    pub skipped: BTreeMap<SkipReason, u64>,

    pub converted: u64,
    pub no_converter: u64,
    pub conversion_failures: u64,
    pub transcriptions_submitted: u64,
    pub download_failures: u64,
    pub bytes_downloaded: u64,

    pub cleanup: CleanupReport,

    pub transcriptions_completed: u64,
    pub transcriptions_failed: u64,

    #[serde(with = "duration_secs")]
    pub duration: Duration,
}

impl SyncReport {
    pub fn record_skip(&mut self, reason: SkipReason) {
        *self.skipped.entry(reason).or_default() += 1;
    }

    pub fn skipped_total(&self) -> u64 {
        self.skipped.values().sum()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> u64 {
        self.skipped.get(&reason).copied().unwrap_or(0)
    }

    /// Files materialized this run, whatever the reason.
    pub fn downloaded(&self) -> u64 {
        self.downloaded_new + self.updated + self.repaired
    }

    pub fn log_summary(&self) {
        let skipped: Vec<String> = self
            .skipped
            .iter()
            .map(|(reason, count)| format!("{}={}", reason, count))
            .collect();

        info!(
            files = self.files_discovered,
            folders = self.folders_discovered,
            failed_folders = self.folders_failed,
            cached_listing = self.listing_cached,
            "Remote tree"
        );
        info!(
            new = self.downloaded_new,
            updated = self.updated,
            repaired = self.repaired,
            unchanged = self.unchanged,
            active_operations = self.active_operation_skips,
            skipped = %skipped.join(", "),
            failures = self.download_failures,
            mb = self.bytes_downloaded / (1024 * 1024),
            "Downloads"
        );
        info!(
            converted = self.converted,
            no_converter = self.no_converter,
            failed = self.conversion_failures,
            transcriptions_submitted = self.transcriptions_submitted,
            transcriptions_completed = self.transcriptions_completed,
            transcriptions_failed = self.transcriptions_failed,
            "Conversions"
        );
        info!(
            records = self.cleanup.records_removed,
            files = self.cleanup.files_removed,
            directories = self.cleanup.directories_removed,
            "Cleanup"
        );
        info!(duration_secs = self.duration.as_secs_f64(), "Sync finished");
    }
}

mod duration_secs {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
