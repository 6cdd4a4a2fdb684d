//! # Remote Tree Walker
//!
//! Enumerates every file below a remote root.
//!
//! Each subfolder is listed by its own task; a semaphore sized by
//! `folder_scan_workers` bounds how many listings run at once. Pages are
//! requested until the store returns fewer entries than asked for.
//!
//! Only the root itself must be listable. Any deeper folder that fails is
//! logged, counted as empty and reported in
//! [`RemoteListing::failed_folders`].

use bridge_traits::storage::{RemoteEntry, RemoteStore};
use bridge_traits::time::{Clock, SystemClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::error::{Result, SyncError};
use crate::paths::{join_relative, join_remote};
use crate::session::FolderProgress;

/// A file discovered remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub name: String,
    /// Full path in the remote store
    pub path: String,
    /// Path relative to the sync root; the record key
    pub relative: String,
    pub size: u64,
    pub modified: String,
    pub content_hash: Option<String>,
}

/// Result of one full enumeration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteListing {
    pub root: String,
    /// Sorted by relative path
    pub files: Vec<RemoteFile>,
    /// Relative paths of every folder below the root
    pub folders: Vec<String>,
    /// Relative paths of folders that could not be listed
    pub failed_folders: Vec<String>,
    /// Unix timestamp at which the walk finished
    pub captured_at: i64,
}

impl RemoteListing {
    pub fn is_complete(&self) -> bool {
        self.failed_folders.is_empty()
    }
}

pub struct TreeWalker {
    store: Arc<dyn RemoteStore>,
    page_size: u32,
    workers: usize,
    clock: Arc<dyn Clock>,
}

impl TreeWalker {
    pub fn new(store: Arc<dyn RemoteStore>, page_size: u32, workers: usize) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
            workers: workers.max(1),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Every child of `path`, across pages.
    async fn list_all(
        store: &Arc<dyn RemoteStore>,
        path: &str,
        page_size: u32,
    ) -> bridge_traits::error::Result<Vec<RemoteEntry>> {
        let mut entries = Vec::new();
        let mut offset = 0u32;
        loop {
            let page = store.list_folder(path, page_size, offset).await?;
            let count = page.len() as u32;
            entries.extend(page);
            if count < page_size {
                break;
            }
            offset += count;
        }
        Ok(entries)
    }

    /// Walk the tree below `root` (an absolute remote path).
    ///
    /// # Errors
    ///
    /// Fails if the root itself cannot be listed or the run is cancelled.
    #[instrument(skip(self, progress, cancel))]
    pub async fn walk(
        &self,
        root: &str,
        progress: &Arc<FolderProgress>,
        cancel: &tokio_util::sync::CancellationToken,
    ) -> Result<RemoteListing> {
        let mut listing = RemoteListing {
            root: root.to_string(),
            ..Default::default()
        };

        let root_entries = Self::list_all(&self.store, root, self.page_size)
            .await
            .map_err(|e| match e.status() {
                Some(401) | Some(403) => SyncError::Credential(e.to_string()),
                _ => SyncError::Remote(e),
            })?;
        progress.tick(0);

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut tasks: JoinSet<(String, String, bridge_traits::error::Result<Vec<RemoteEntry>>)> =
            JoinSet::new();

        let mut pending = vec![(root.to_string(), String::new(), root_entries)];
        loop {
            for (folder_path, folder_relative, entries) in pending.drain(..) {
                for entry in entries {
                    let path = join_remote(&folder_path, &entry.name);
                    let relative = join_relative(&folder_relative, &entry.name);
                    if entry.is_folder() {
                        listing.folders.push(relative.clone());
                        let store = Arc::clone(&self.store);
                        let semaphore = Arc::clone(&semaphore);
                        let progress = Arc::clone(progress);
                        let page_size = self.page_size;
                        tasks.spawn(async move {
                            let result = match semaphore.acquire_owned().await {
                                Ok(_permit) => {
                                    let result = Self::list_all(&store, &path, page_size).await;
                                    let found = result
                                        .as_ref()
                                        .map(|e| e.iter().filter(|e| !e.is_folder()).count())
                                        .unwrap_or(0);
                                    progress.tick(found as u64);
                                    result
                                }
                                Err(e) => Err(bridge_traits::error::BridgeError::OperationFailed(
                                    e.to_string(),
                                )),
                            };
                            (path, relative, result)
                        });
                    } else {
                        listing.files.push(RemoteFile {
                            name: entry.name,
                            path,
                            relative,
                            size: entry.size,
                            modified: entry.modified,
                            content_hash: entry.content_hash.filter(|h| !h.is_empty()),
                        });
                    }
                }
            }

            let joined = tokio::select! {
                _ = cancel.cancelled() => {
                    tasks.abort_all();
                    return Err(SyncError::Cancelled);
                }
                joined = tasks.join_next() => joined,
            };
            let Some(joined) = joined else {
                break;
            };
            match joined? {
                (path, relative, Ok(entries)) => {
                    debug!(folder = %path, entries = entries.len(), "Folder listed");
                    pending.push((path, relative, entries));
                }
                (path, relative, Err(e)) => {
                    warn!(folder = %path, error = %e, "Failed to list folder, treating it as empty");
                    listing.failed_folders.push(relative);
                }
            }
        }

        listing.files.sort_by(|a, b| a.relative.cmp(&b.relative));
        listing.folders.sort();
        listing.failed_folders.sort();
        listing.captured_at = self.clock.unix_timestamp();

        info!(
            root = %root,
            files = listing.files.len(),
            folders = listing.folders.len(),
            failed_folders = listing.failed_folders.len(),
            "Remote tree enumerated"
        );
        Ok(listing)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::storage::{DownloadLink, RemoteEntryKind};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio_util::sync::CancellationToken;

    /// In-memory tree keyed by folder path.
    #[derive(Default)]
    pub(crate) struct TreeStore {
        pub folders: HashMap<String, Vec<RemoteEntry>>,
        pub broken: Vec<String>,
        pub calls: Mutex<Vec<(String, u32, u32)>>,
    }

    impl TreeStore {
        pub fn file(name: &str, size: u64) -> RemoteEntry {
            RemoteEntry {
                name: name.to_string(),
                path: String::new(),
                kind: RemoteEntryKind::File,
                size,
                modified: "2024-01-01T00:00:00+00:00".to_string(),
                content_hash: Some("abc".to_string()),
            }
        }

        pub fn folder(name: &str) -> RemoteEntry {
            RemoteEntry {
                kind: RemoteEntryKind::Folder,
                size: 0,
                content_hash: None,
                ..Self::file(name, 0)
            }
        }
    }

    #[async_trait]
    impl RemoteStore for TreeStore {
        async fn list_folder(
            &self,
            path: &str,
            limit: u32,
            offset: u32,
        ) -> bridge_traits::error::Result<Vec<RemoteEntry>> {
            self.calls.lock().unwrap().push((path.to_string(), limit, offset));
            if self.broken.iter().any(|b| b == path) {
                return Err(BridgeError::Transient("listing failed".into()));
            }
            let entries = self.folders.get(path).cloned().unwrap_or_default();
            Ok(entries
                .into_iter()
                .skip(offset as usize)
                .take(limit as usize)
                .collect())
        }

        async fn resolve_download(&self, _path: &str) -> bridge_traits::error::Result<DownloadLink> {
            Err(BridgeError::NotAvailable("downloads".into()))
        }

        async fn open_download(
            &self,
            _link: &DownloadLink,
        ) -> bridge_traits::error::Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            Err(BridgeError::NotAvailable("downloads".into()))
        }
    }

    fn tree() -> TreeStore {
        let mut store = TreeStore::default();
        store.folders.insert(
            "/Docs".into(),
            vec![TreeStore::folder("A"), TreeStore::file("root.txt", 1), TreeStore::folder("B")],
        );
        store.folders.insert(
            "/Docs/A".into(),
            vec![TreeStore::file("doc.docx", 500), TreeStore::folder("C")],
        );
        store.folders.insert("/Docs/A/C".into(), vec![TreeStore::file("deep.csv", 3)]);
        store.folders.insert("/Docs/B".into(), vec![]);
        store
    }

    #[tokio::test]
    async fn test_walk_collects_nested_files() {
        let walker = TreeWalker::new(Arc::new(tree()), 1000, 2);
        let listing = walker
            .walk("/Docs", &FolderProgress::new(), &CancellationToken::new())
            .await
            .unwrap();

        let relative: Vec<_> = listing.files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["A/C/deep.csv", "A/doc.docx", "root.txt"]);
        assert_eq!(listing.files[1].path, "/Docs/A/doc.docx");
        assert_eq!(listing.folders, vec!["A", "A/C", "B"]);
        assert!(listing.is_complete());
    }

    #[tokio::test]
    async fn test_pagination_stops_on_short_page() {
        let mut store = TreeStore::default();
        store.folders.insert(
            "/".into(),
            (0..5).map(|i| TreeStore::file(&format!("f{}", i), 1)).collect(),
        );
        let store = Arc::new(store);

        let walker = TreeWalker::new(store.clone(), 2, 1);
        let listing = walker
            .walk("/", &FolderProgress::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(listing.files.len(), 5);
        let calls = store.calls.lock().unwrap().clone();
        assert_eq!(
            calls,
            vec![("/".to_string(), 2, 0), ("/".to_string(), 2, 2), ("/".to_string(), 2, 4)]
        );
    }

    #[tokio::test]
    async fn test_failed_subfolder_is_reported() {
        let mut store = tree();
        store.broken.push("/Docs/A".into());

        let walker = TreeWalker::new(Arc::new(store), 1000, 3);
        let listing = walker
            .walk("/Docs", &FolderProgress::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(listing.failed_folders, vec!["A"]);
        let relative: Vec<_> = listing.files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(relative, vec!["root.txt"]);
    }

    #[tokio::test]
    async fn test_root_failure_aborts() {
        let mut store = tree();
        store.broken.push("/Docs".into());

        let walker = TreeWalker::new(Arc::new(store), 1000, 3);
        let result = walker
            .walk("/Docs", &FolderProgress::new(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(SyncError::Remote(_))));
    }

    #[tokio::test]
    async fn test_progress_counts_folders() {
        let progress = FolderProgress::new();
        TreeWalker::new(Arc::new(tree()), 1000, 2)
            .walk("/Docs", &progress, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(progress.processed(), 4);
    }
}
