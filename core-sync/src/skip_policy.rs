//! # Skip Policy
//!
//! Decides which discovered files are deliberately not downloaded.
//!
//! Checks run in a fixed priority order:
//! 1. session byte budget (`total_limit`)
//! 2. category: video, image, configured exclusions
//! 3. per-file size ceiling (`large`)
//!
//! Admission does not hold any bytes. A file that actually has to be
//! fetched takes a [`BudgetReservation`] through
//! [`ByteBudget::try_reserve`] once the differential check asks for a
//! download, so unchanged files never occupy the budget.

use serde::Serialize;
use std::path::Path;

use core_convert::has_extension;
use core_runtime::config::SkipConfig;

use crate::session::ByteBudget;
use crate::walker::RemoteFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    TotalLimit,
    Video,
    Image,
    Excluded,
    Large,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::TotalLimit => "total_limit",
            SkipReason::Video => "video",
            SkipReason::Image => "image",
            SkipReason::Excluded => "excluded",
            SkipReason::Large => "large",
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    Skipped(SkipReason),
}

impl Admission {
    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            Admission::Skipped(reason) => Some(*reason),
            Admission::Admitted => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkipPolicy {
    config: SkipConfig,
}

impl SkipPolicy {
    pub fn new(config: SkipConfig) -> Self {
        Self { config }
    }

    /// Ceiling handed to the session budget.
    pub fn budget_limit(&self) -> Option<u64> {
        self.config
            .enforce_total_limit
            .then_some(self.config.max_total_size)
    }

    /// Category and size reasons, ignoring the budget.
    pub fn static_reason(&self, name: &str, size: u64) -> Option<SkipReason> {
        let path = Path::new(name);
        let config = &self.config;

        if config.skip_video_files && has_extension(path, &config.video_extensions) {
            return Some(SkipReason::Video);
        }
        if config.skip_image_files && has_extension(path, &config.image_extensions) {
            return Some(SkipReason::Image);
        }
        if has_extension(path, &config.excluded_extensions) {
            return Some(SkipReason::Excluded);
        }
        if config.skip_large_files && size > config.max_file_size {
            return Some(SkipReason::Large);
        }
        None
    }

    /// Budget against bytes materialized or in flight so far, then category,
    /// then size. The budget answer is advisory; the download itself must
    /// still win [`ByteBudget::try_reserve`].
    pub fn evaluate(&self, file: &RemoteFile, budget: &ByteBudget) -> Admission {
        if budget.would_exceed(file.size) {
            return Admission::Skipped(SkipReason::TotalLimit);
        }
        match self.static_reason(&file.name, file.size) {
            Some(reason) => Admission::Skipped(reason),
            None => Admission::Admitted,
        }
    }
}
