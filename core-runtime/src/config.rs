//! # Sync Configuration Module
//!
//! Provides configuration management for the disk mirror.
//!
//! ## Overview
//!
//! [`SyncConfig`] groups every tunable of a run: where files land locally,
//! which content is skipped, how wide each worker pool is, how failures are
//! retried and how conversions behave. Defaults reproduce the stock
//! behaviour; [`SyncConfigBuilder`] overrides them and validates the result
//! fail-fast, and [`SyncConfig::from_env`] reads `DISK_MIRROR_*` variables.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::SyncConfig;
//!
//! let config = SyncConfig::builder("/Documents")
//!     .data_dir("/var/lib/disk-mirror")
//!     .download_workers(8)
//!     .max_total_size(20 * 1024 * 1024 * 1024)
//!     .build()?;
//! ```
//!
//! ## Derived paths
//!
//! Unless overridden, every local path hangs off `data_dir`:
//!
//! | Path | Default |
//! |------|---------|
//! | downloads | `<data_dir>/downloaded_files` |
//! | artifacts | `<data_dir>/markdown_files` |
//! | database | `<data_dir>/metadata/sync_metadata.db` |
//! | listing cache | `<data_dir>/metadata` |
//! | failure list | `<data_dir>/failed_downloads.txt` |

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

const MB: u64 = 1024 * 1024;
const GB: u64 = 1024 * MB;

const ENV_PREFIX: &str = "DISK_MIRROR_";

/// Default video extensions, routed to transcription or skipped
pub const DEFAULT_VIDEO_EXTENSIONS: &[&str] = &[
    ".mp4", ".avi", ".mov", ".mkv", ".webm", ".flv", ".wmv", ".m4v", ".mpg", ".mpeg", ".3gp",
    ".ogv", ".vob", ".ts",
];

/// Default image extensions
pub const DEFAULT_IMAGE_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".svg", ".ico", ".heic",
    ".heif", ".raw", ".cr2", ".nef",
];

/// Local filesystem layout
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Verbatim copies of remote files
    pub download_dir: PathBuf,
    /// Converted artifacts, mirroring the download tree
    pub artifact_dir: PathBuf,
    /// SQLite metadata store
    pub database_path: PathBuf,
    /// Directory holding serialized listings
    pub listing_cache_dir: PathBuf,
    /// Newline-delimited list of paths that failed this run
    pub failed_list_path: PathBuf,
}

impl PathsConfig {
    pub fn under(data_dir: &Path) -> Self {
        Self {
            download_dir: data_dir.join("downloaded_files"),
            artifact_dir: data_dir.join("markdown_files"),
            database_path: data_dir.join("metadata").join("sync_metadata.db"),
            listing_cache_dir: data_dir.join("metadata"),
            failed_list_path: data_dir.join("failed_downloads.txt"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self::under(Path::new("localdata"))
    }
}

/// Which files are deliberately not downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkipConfig {
    pub skip_video_files: bool,
    pub video_extensions: Vec<String>,
    pub skip_image_files: bool,
    pub image_extensions: Vec<String>,
    /// Extensions never downloaded, regardless of size
    pub excluded_extensions: Vec<String>,
    pub skip_large_files: bool,
    /// Per-file ceiling in bytes
    pub max_file_size: u64,
    pub enforce_total_limit: bool,
    /// Per-session ceiling in bytes
    pub max_total_size: u64,
}

impl Default for SkipConfig {
    fn default() -> Self {
        Self {
            skip_video_files: false,
            video_extensions: to_owned_list(DEFAULT_VIDEO_EXTENSIONS),
            skip_image_files: true,
            image_extensions: to_owned_list(DEFAULT_IMAGE_EXTENSIONS),
            excluded_extensions: Vec::new(),
            skip_large_files: true,
            max_file_size: 100 * MB,
            enforce_total_limit: true,
            max_total_size: 10 * GB,
        }
    }
}

/// Worker pool sizes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    pub download_workers: usize,
    pub folder_scan_workers: usize,
    pub transcription_poll_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            download_workers: 5,
            folder_scan_workers: 5,
            transcription_poll_workers: 2,
        }
    }
}

/// Retry behaviour for network calls and downloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Total attempts per request or download
    pub max_retries: u32,
    /// Base backoff; attempt `n` waits `n * retry_delay`
    pub retry_delay: Duration,
    pub request_timeout: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Remote enumeration and its cache
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListingConfig {
    pub page_size: u32,
    pub cache_enabled: bool,
    pub cache_ttl: Duration,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            page_size: 1000,
            cache_enabled: true,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

/// Artifact format for tabular sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableOutput {
    #[default]
    Markdown,
    Csv,
}

impl FromStr for TableOutput {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "markdown" | "md" => Ok(Self::Markdown),
            "csv" => Ok(Self::Csv),
            other => Err(Error::Config(format!("Unknown table output: {}", other))),
        }
    }
}

/// Conversion of downloaded files into textual artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionConfig {
    pub enabled: bool,
    pub table_output: TableOutput,
    pub archives_enabled: bool,
    pub archive_max_depth: u32,
    /// PDF pages rendered per document; later pages are noted, not extracted
    pub pdf_max_pages: u32,
    pub delete_originals_after_conversion: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            table_output: TableOutput::Markdown,
            archives_enabled: true,
            archive_max_depth: 10,
            pdf_max_pages: 100,
            delete_originals_after_conversion: false,
        }
    }
}

/// Speech transcription of video files
#[derive(Clone, PartialEq, Eq)]
pub struct TranscriptionConfig {
    pub enabled: bool,
    /// Submit and return instead of blocking on each job
    pub async_mode: bool,
    pub submit_url: Option<String>,
    pub operations_url: Option<String>,
    pub api_key: Option<String>,
    pub language: String,
    pub ffmpeg_path: PathBuf,
    /// Videos above this size are not transcribed
    pub video_max_size: u64,
    pub poll_interval: Duration,
    /// Jobs older than this are marked failed
    pub timeout: Duration,
    /// Block at the end of a run until every job resolves
    pub wait_for_completion: bool,
    /// Re-poll jobs left running by a previous process before new work
    pub check_pending_on_start: bool,
}

impl std::fmt::Debug for TranscriptionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranscriptionConfig")
            .field("enabled", &self.enabled)
            .field("async_mode", &self.async_mode)
            .field("submit_url", &self.submit_url)
            .field("operations_url", &self.operations_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("language", &self.language)
            .field("ffmpeg_path", &self.ffmpeg_path)
            .field("video_max_size", &self.video_max_size)
            .field("poll_interval", &self.poll_interval)
            .field("timeout", &self.timeout)
            .field("wait_for_completion", &self.wait_for_completion)
            .field("check_pending_on_start", &self.check_pending_on_start)
            .finish()
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            async_mode: true,
            submit_url: None,
            operations_url: None,
            api_key: None,
            language: "ru-RU".to_string(),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            video_max_size: 500 * MB,
            poll_interval: Duration::from_secs(10),
            timeout: Duration::from_secs(600),
            wait_for_completion: true,
            check_pending_on_start: true,
        }
    }
}

/// Complete configuration of one sync run.
///
/// Use [`SyncConfigBuilder`] to construct validated instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Remote folder mirrored by the run, e.g. `/` or `/Documents`
    pub remote_root: String,
    pub paths: PathsConfig,
    pub skip: SkipConfig,
    pub concurrency: ConcurrencyConfig,
    pub retry: RetryConfig,
    pub listing: ListingConfig,
    pub conversion: ConversionConfig,
    pub transcription: TranscriptionConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            remote_root: "/".to_string(),
            paths: PathsConfig::default(),
            skip: SkipConfig::default(),
            concurrency: ConcurrencyConfig::default(),
            retry: RetryConfig::default(),
            listing: ListingConfig::default(),
            conversion: ConversionConfig::default(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

impl SyncConfig {
    /// Creates a new builder for the given remote root.
    pub fn builder(remote_root: impl Into<String>) -> SyncConfigBuilder {
        SyncConfigBuilder::new(remote_root)
    }

    /// Builds a configuration from `DISK_MIRROR_*` environment variables.
    ///
    /// Unset variables keep their defaults; malformed values are errors.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(&format!("{}{}", ENV_PREFIX, name)).filter(|v| !v.trim().is_empty())
        };

        let mut builder = SyncConfigBuilder::new(var("ROOT").unwrap_or_else(|| "/".to_string()));

        if let Some(dir) = var("DATA_DIR") {
            builder = builder.data_dir(dir);
        }
        if let Some(dir) = var("DOWNLOAD_DIR") {
            builder = builder.download_dir(dir);
        }
        if let Some(dir) = var("ARTIFACT_DIR") {
            builder = builder.artifact_dir(dir);
        }
        if let Some(path) = var("DATABASE_PATH") {
            builder = builder.database_path(path);
        }

        let mut config = builder.into_unvalidated();
        let parse_err = |name: &str, value: &str| {
            Error::InvalidVariable {
                variable: format!("{}{}", ENV_PREFIX, name),
                value: value.to_string(),
            }
        };

        macro_rules! read {
            ($name:literal => $target:expr) => {
                if let Some(value) = var($name) {
                    $target = value.trim().parse().map_err(|_| parse_err($name, &value))?;
                }
            };
        }
        macro_rules! read_bool {
            ($name:literal => $target:expr) => {
                if let Some(value) = var($name) {
                    $target = parse_bool(&value).ok_or_else(|| parse_err($name, &value))?;
                }
            };
        }
        macro_rules! read_secs {
            ($name:literal => $target:expr) => {
                if let Some(value) = var($name) {
                    let secs: u64 = value.trim().parse().map_err(|_| parse_err($name, &value))?;
                    $target = Duration::from_secs(secs);
                }
            };
        }

        read_bool!("SKIP_VIDEO_FILES" => config.skip.skip_video_files);
        read_bool!("SKIP_IMAGE_FILES" => config.skip.skip_image_files);
        read_bool!("SKIP_LARGE_FILES" => config.skip.skip_large_files);
        read_bool!("ENABLE_TOTAL_SIZE_LIMIT" => config.skip.enforce_total_limit);
        read!("MAX_FILE_SIZE" => config.skip.max_file_size);
        read!("MAX_TOTAL_SIZE" => config.skip.max_total_size);
        if let Some(list) = var("EXCLUDED_EXTENSIONS") {
            config.skip.excluded_extensions = parse_extension_list(&list);
        }

        read!("DOWNLOAD_WORKERS" => config.concurrency.download_workers);
        read!("FOLDER_SCAN_WORKERS" => config.concurrency.folder_scan_workers);
        read!("TRANSCRIPTION_POLL_WORKERS" => config.concurrency.transcription_poll_workers);

        read!("MAX_RETRIES" => config.retry.max_retries);
        read_secs!("RETRY_DELAY_SECS" => config.retry.retry_delay);
        read_secs!("REQUEST_TIMEOUT_SECS" => config.retry.request_timeout);

        read!("PAGE_SIZE" => config.listing.page_size);
        read_bool!("LISTING_CACHE" => config.listing.cache_enabled);
        read_secs!("LISTING_CACHE_TTL_SECS" => config.listing.cache_ttl);

        read_bool!("CONVERSION" => config.conversion.enabled);
        read!("TABLE_OUTPUT" => config.conversion.table_output);
        read_bool!("ARCHIVES" => config.conversion.archives_enabled);
        read!("ARCHIVE_MAX_DEPTH" => config.conversion.archive_max_depth);
        read!("PDF_MAX_PAGES" => config.conversion.pdf_max_pages);
        read_bool!("DELETE_ORIGINALS" => config.conversion.delete_originals_after_conversion);

        read_bool!("TRANSCRIPTION" => config.transcription.enabled);
        read_bool!("TRANSCRIPTION_ASYNC" => config.transcription.async_mode);
        config.transcription.submit_url = var("TRANSCRIPTION_SUBMIT_URL");
        config.transcription.operations_url = var("TRANSCRIPTION_OPERATIONS_URL");
        config.transcription.api_key = var("TRANSCRIPTION_API_KEY");
        if let Some(language) = var("TRANSCRIPTION_LANGUAGE") {
            config.transcription.language = language;
        }
        if let Some(ffmpeg) = var("FFMPEG_PATH") {
            config.transcription.ffmpeg_path = PathBuf::from(ffmpeg);
        }
        read!("VIDEO_MAX_SIZE" => config.transcription.video_max_size);
        read_secs!("TRANSCRIPTION_POLL_SECS" => config.transcription.poll_interval);
        read_secs!("TRANSCRIPTION_TIMEOUT_SECS" => config.transcription.timeout);
        read_bool!("WAIT_FOR_TRANSCRIPTIONS" => config.transcription.wait_for_completion);
        read_bool!("CHECK_PENDING_ON_START" => config.transcription.check_pending_on_start);

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.remote_root.trim().is_empty() {
            return Err(Error::Config("Remote root cannot be empty".to_string()));
        }
        if !self.remote_root.starts_with('/') {
            return Err(Error::Config(format!(
                "Remote root must be absolute, got {:?}",
                self.remote_root
            )));
        }
        if self.concurrency.download_workers == 0 {
            return Err(Error::Config("download_workers must be at least 1".to_string()));
        }
        if self.concurrency.folder_scan_workers == 0 {
            return Err(Error::Config("folder_scan_workers must be at least 1".to_string()));
        }
        if self.concurrency.transcription_poll_workers == 0 {
            return Err(Error::Config(
                "transcription_poll_workers must be at least 1".to_string(),
            ));
        }
        if self.retry.max_retries == 0 {
            return Err(Error::Config("max_retries must be at least 1".to_string()));
        }
        if self.listing.page_size == 0 {
            return Err(Error::Config("page_size must be at least 1".to_string()));
        }
        if self.transcription.enabled
            && (self.transcription.submit_url.is_none()
                || self.transcription.operations_url.is_none())
        {
            return Err(Error::Config(
                "Transcription is enabled but TRANSCRIPTION_SUBMIT_URL / \
                 TRANSCRIPTION_OPERATIONS_URL are not set"
                    .to_string(),
            ));
        }
        if self.transcription.poll_interval.is_zero() {
            return Err(Error::Config("transcription poll interval must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for constructing [`SyncConfig`] instances.
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    config: SyncConfig,
    data_dir: Option<PathBuf>,
    download_dir: Option<PathBuf>,
    artifact_dir: Option<PathBuf>,
    database_path: Option<PathBuf>,
}

impl SyncConfigBuilder {
    pub fn new(remote_root: impl Into<String>) -> Self {
        Self {
            config: SyncConfig {
                remote_root: remote_root.into(),
                ..SyncConfig::default()
            },
            data_dir: None,
            download_dir: None,
            artifact_dir: None,
            database_path: None,
        }
    }

    /// Sets the directory every default local path is derived from.
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    pub fn download_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.download_dir = Some(path.into());
        self
    }

    pub fn artifact_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.artifact_dir = Some(path.into());
        self
    }

    pub fn database_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.database_path = Some(path.into());
        self
    }

    pub fn skip(mut self, skip: SkipConfig) -> Self {
        self.config.skip = skip;
        self
    }

    pub fn max_file_size(mut self, bytes: u64) -> Self {
        self.config.skip.max_file_size = bytes;
        self
    }

    pub fn max_total_size(mut self, bytes: u64) -> Self {
        self.config.skip.max_total_size = bytes;
        self
    }

    pub fn download_workers(mut self, workers: usize) -> Self {
        self.config.concurrency.download_workers = workers;
        self
    }

    pub fn folder_scan_workers(mut self, workers: usize) -> Self {
        self.config.concurrency.folder_scan_workers = workers;
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = retry;
        self
    }

    pub fn listing(mut self, listing: ListingConfig) -> Self {
        self.config.listing = listing;
        self
    }

    pub fn conversion(mut self, conversion: ConversionConfig) -> Self {
        self.config.conversion = conversion;
        self
    }

    pub fn transcription(mut self, transcription: TranscriptionConfig) -> Self {
        self.config.transcription = transcription;
        self
    }

    fn into_unvalidated(self) -> SyncConfig {
        let mut config = self.config;
        if let Some(data_dir) = &self.data_dir {
            config.paths = PathsConfig::under(data_dir);
        }
        if let Some(dir) = self.download_dir {
            config.paths.download_dir = dir;
        }
        if let Some(dir) = self.artifact_dir {
            config.paths.artifact_dir = dir;
        }
        if let Some(path) = self.database_path {
            config.paths.database_path = path;
        }
        config
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> Result<SyncConfig> {
        let config = self.into_unvalidated();
        config.validate()?;
        Ok(config)
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parses `"zip, .7z ,RAR"` into `[".zip", ".7z", ".rar"]`.
fn parse_extension_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| item.trim().to_ascii_lowercase())
        .filter(|item| !item.is_empty())
        .map(|item| {
            if item.starts_with('.') {
                item
            } else {
                format!(".{}", item)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_match_stock_behaviour() {
        let config = SyncConfig::default();

        assert_eq!(config.skip.max_file_size, 100 * MB);
        assert_eq!(config.skip.max_total_size, 10 * GB);
        assert!(config.skip.video_extensions.contains(&".mkv".to_string()));
        assert_eq!(config.concurrency.download_workers, 5);
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.listing.cache_ttl, Duration::from_secs(300));
        assert_eq!(config.conversion.archive_max_depth, 10);
        assert_eq!(config.conversion.pdf_max_pages, 100);
        assert_eq!(
            config.paths.database_path,
            PathBuf::from("localdata/metadata/sync_metadata.db")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_derives_paths_from_data_dir() {
        let config = SyncConfig::builder("/Docs")
            .data_dir("/tmp/mirror")
            .artifact_dir("/tmp/md")
            .build()
            .unwrap();

        assert_eq!(config.paths.download_dir, PathBuf::from("/tmp/mirror/downloaded_files"));
        assert_eq!(config.paths.artifact_dir, PathBuf::from("/tmp/md"));
        assert_eq!(
            config.paths.failed_list_path,
            PathBuf::from("/tmp/mirror/failed_downloads.txt")
        );
    }

    #[test]
    fn test_validation_rejects_zero_workers() {
        let result = SyncConfig::builder("/").download_workers(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_relative_root() {
        assert!(SyncConfig::builder("Docs").build().is_err());
        assert!(SyncConfig::builder("  ").build().is_err());
    }

    #[test]
    fn test_transcription_requires_endpoints() {
        let result = SyncConfig::builder("/")
            .transcription(TranscriptionConfig {
                enabled: true,
                ..TranscriptionConfig::default()
            })
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            ("DISK_MIRROR_ROOT", "/Work"),
            ("DISK_MIRROR_DATA_DIR", "/data"),
            ("DISK_MIRROR_DOWNLOAD_WORKERS", "9"),
            ("DISK_MIRROR_SKIP_IMAGE_FILES", "no"),
            ("DISK_MIRROR_RETRY_DELAY_SECS", "1"),
            ("DISK_MIRROR_EXCLUDED_EXTENSIONS", "iso, .DMG"),
            ("DISK_MIRROR_TABLE_OUTPUT", "csv"),
        ]
        .into_iter()
        .collect();

        let config =
            SyncConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.remote_root, "/Work");
        assert_eq!(config.paths.download_dir, PathBuf::from("/data/downloaded_files"));
        assert_eq!(config.concurrency.download_workers, 9);
        assert!(!config.skip.skip_image_files);
        assert_eq!(config.retry.retry_delay, Duration::from_secs(1));
        assert_eq!(config.skip.excluded_extensions, vec![".iso", ".dmg"]);
        assert_eq!(config.conversion.table_output, TableOutput::Csv);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = SyncConfig::from_lookup(|key| {
            (key == "DISK_MIRROR_MAX_RETRIES").then(|| "many".to_string())
        });
        assert!(matches!(
            result,
            Err(Error::InvalidVariable { ref variable, .. }) if variable == "DISK_MIRROR_MAX_RETRIES"
        ));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let transcription = TranscriptionConfig {
            api_key: Some("super-secret".to_string()),
            ..TranscriptionConfig::default()
        };
        let rendered = format!("{:?}", transcription);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
