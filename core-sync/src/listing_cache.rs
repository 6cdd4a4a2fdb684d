//! # Listing Cache
//!
//! Reuses a recent full enumeration of the same root instead of walking the
//! remote tree again.
//!
//! One JSON document per root, named after a SHA-256 of the root path, is
//! written atomically (temp file + rename). Entries expire by age only; an
//! unreadable, mismatched or expired document is a miss. Listings with
//! failed folders are never stored.

use bridge_traits::time::Clock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::session::FolderProgress;
use crate::walker::{RemoteFile, RemoteListing, TreeWalker};

#[derive(Debug, Serialize, Deserialize)]
struct CachedListing {
    root: String,
    captured_at: i64,
    files: Vec<RemoteFile>,
    folders: Vec<String>,
}

pub struct ListingCache {
    dir: PathBuf,
    ttl: Duration,
    enabled: bool,
    clock: Arc<dyn Clock>,
}

impl ListingCache {
    pub fn new(dir: impl Into<PathBuf>, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            dir: dir.into(),
            ttl,
            enabled: true,
            clock,
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn path_for(&self, root: &str) -> PathBuf {
        let digest = hex::encode(Sha256::digest(root.as_bytes()));
        self.dir.join(format!("listing-{}.json", &digest[..16]))
    }

    /// A fresh listing for `root`, if one is cached.
    pub async fn load(&self, root: &str) -> Option<RemoteListing> {
        if !self.enabled {
            return None;
        }
        let path = self.path_for(root);
        let bytes = tokio::fs::read(&path).await.ok()?;
        let cached: CachedListing = match serde_json::from_slice(&bytes) {
            Ok(cached) => cached,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable listing cache");
                return None;
            }
        };
        if cached.root != root {
            debug!(root = %root, cached = %cached.root, "Listing cache belongs to another root");
            return None;
        }

        let age = self.clock.unix_timestamp() - cached.captured_at;
        if age < 0 || age as u64 >= self.ttl.as_secs() {
            debug!(root = %root, age_secs = age, "Listing cache expired");
            return None;
        }

        Some(RemoteListing {
            root: cached.root,
            files: cached.files,
            folders: cached.folders,
            failed_folders: Vec::new(),
            captured_at: cached.captured_at,
        })
    }

    /// Persist a complete listing; returns whether it was written.
    pub async fn store(&self, listing: &RemoteListing) -> Result<bool> {
        if !self.enabled || !listing.is_complete() {
            return Ok(false);
        }
        tokio::fs::create_dir_all(&self.dir).await?;

        let document = CachedListing {
            root: listing.root.clone(),
            captured_at: listing.captured_at,
            files: listing.files.clone(),
            folders: listing.folders.clone(),
        };
        let bytes = serde_json::to_vec(&document)?;

        let path = self.path_for(&listing.root);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), files = listing.files.len(), "Listing cached");
        Ok(true)
    }

    pub async fn invalidate(&self, root: &str) -> Result<()> {
        match tokio::fs::remove_file(self.path_for(root)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Cached listing if fresh, otherwise a new walk (cached afterwards).
    ///
    /// The boolean is `true` when the cache answered.
    pub async fn get_or_walk(
        &self,
        walker: &TreeWalker,
        root: &str,
        progress: &Arc<FolderProgress>,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<(RemoteListing, bool)> {
        if let Some(listing) = self.load(root).await {
            info!(root = %root, files = listing.files.len(), "Using cached remote listing");
            return Ok((listing, true));
        }

        let listing = walker.walk(root, progress, cancel).await?;
        if let Err(e) = self.store(&listing).await {
            warn!(root = %root, error = %e, "Failed to cache remote listing");
        }
        Ok((listing, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::time::FixedClock;

    fn listing(root: &str, captured_at: i64) -> RemoteListing {
        RemoteListing {
            root: root.to_string(),
            files: vec![RemoteFile {
                name: "a.txt".into(),
                path: format!("{}/a.txt", root),
                relative: "a.txt".into(),
                size: 3,
                modified: "2024-01-01T00:00:00+00:00".into(),
                content_hash: None,
            }],
            folders: vec![],
            failed_folders: vec![],
            captured_at,
        }
    }

    #[tokio::test]
    async fn test_store_then_load_within_ttl() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::from_timestamp(1_000));
        let cache = ListingCache::new(dir.path(), Duration::from_secs(300), clock.clone());

        assert!(cache.store(&listing("/Docs", 1_000)).await.unwrap());
        assert_eq!(cache.load("/Docs").await, Some(listing("/Docs", 1_000)));

        clock.advance(chrono::Duration::seconds(300));
        assert_eq!(cache.load("/Docs").await, None);
    }

    #[tokio::test]
    async fn test_incomplete_listing_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ListingCache::new(
            dir.path(),
            Duration::from_secs(300),
            Arc::new(FixedClock::from_timestamp(0)),
        );
        let mut partial = listing("/", 0);
        partial.failed_folders.push("A".into());

        assert!(!cache.store(&partial).await.unwrap());
        assert!(!cache.path_for("/").exists());
    }

    #[tokio::test]
    async fn test_corrupt_or_foreign_document_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ListingCache::new(
            dir.path(),
            Duration::from_secs(300),
            Arc::new(FixedClock::from_timestamp(0)),
        );

        std::fs::write(cache.path_for("/"), b"{not json").unwrap();
        assert_eq!(cache.load("/").await, None);

        let foreign = serde_json::json!({
            "root": "/Other", "captured_at": 0, "files": [], "folders": []
        });
        std::fs::write(cache.path_for("/"), foreign.to_string()).unwrap();
        assert_eq!(cache.load("/").await, None);
    }

    #[tokio::test]
    async fn test_invalidate_and_disabled() {
        let dir = tempfile::tempdir().unwrap();
        let clock = Arc::new(FixedClock::from_timestamp(10));
        let cache = ListingCache::new(dir.path(), Duration::from_secs(300), clock.clone());

        cache.store(&listing("/", 10)).await.unwrap();
        cache.invalidate("/").await.unwrap();
        cache.invalidate("/").await.unwrap();
        assert_eq!(cache.load("/").await, None);

        let disabled = ListingCache::new(dir.path(), Duration::from_secs(300), clock).enabled(false);
        assert!(!disabled.store(&listing("/", 10)).await.unwrap());
    }
}
