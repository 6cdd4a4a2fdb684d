//! # Download Executor
//!
//! Streams one remote file to its local path.
//!
//! Each attempt resolves a fresh download link, streams the bytes into the
//! sanitized local path and checks the byte count against the listing.
//! Transport errors, local I/O errors and size mismatches are retried with
//! linear backoff; protocol errors such as a 404 fail the file at once.
//! A partial file never survives a failed or cancelled attempt.

use bridge_traits::http::RetryPolicy;
use bridge_traits::storage::RemoteStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::error::{Result, SyncError};
use crate::paths::local_path;
use crate::walker::RemoteFile;

/// A completed download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Downloaded {
    pub local_path: PathBuf,
    pub bytes: u64,
    pub attempts: u32,
}

pub struct DownloadExecutor {
    store: Arc<dyn RemoteStore>,
    download_root: PathBuf,
    retry: RetryPolicy,
}

impl DownloadExecutor {
    pub fn new(store: Arc<dyn RemoteStore>, download_root: impl Into<PathBuf>, retry: RetryPolicy) -> Self {
        Self {
            store,
            download_root: download_root.into(),
            retry,
        }
    }

    pub fn download_root(&self) -> &Path {
        &self.download_root
    }

    pub fn local_path_for(&self, relative: &str) -> PathBuf {
        local_path(&self.download_root, relative)
    }

    /// Download `file`, retrying transient failures.
    ///
    /// # Errors
    ///
    /// [`SyncError::Cancelled`] if the token fires, otherwise the error of
    /// the last attempt.
    #[instrument(skip(self, file, cancel), fields(path = %file.relative))]
    pub async fn download(&self, file: &RemoteFile, cancel: &CancellationToken) -> Result<Downloaded> {
        let dest = self.local_path_for(&file.relative);
        let mut attempt = 0;

        loop {
            attempt += 1;
            if cancel.is_cancelled() {
                return Err(SyncError::Cancelled);
            }

            let result = tokio::select! {
                _ = cancel.cancelled() => Err(SyncError::Cancelled),
                result = self.attempt(file, &dest) => result,
            };

            match result {
                Ok(bytes) => {
                    debug!(bytes, attempt, "Downloaded");
                    return Ok(Downloaded {
                        local_path: dest,
                        bytes,
                        attempts: attempt,
                    });
                }
                Err(e) => {
                    remove_partial(&dest).await;
                    if matches!(e, SyncError::Cancelled) {
                        return Err(e);
                    }
                    if !e.is_retryable() || attempt >= self.retry.max_attempts {
                        warn!(attempt, error = %e, "Download failed");
                        return Err(e);
                    }
                    let delay = self.retry.delay_for(attempt);
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Download attempt failed, retrying");
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(SyncError::Cancelled),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    async fn attempt(&self, file: &RemoteFile, dest: &Path) -> Result<u64> {
        let link = self.store.resolve_download(&file.path).await?;
        let mut reader = self.store.open_download(&link).await?;

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut out = tokio::fs::File::create(dest).await?;
        let bytes = tokio::io::copy(&mut reader, &mut out).await?;
        out.flush().await?;
        out.sync_all().await?;

        if bytes != file.size {
            return Err(SyncError::SizeMismatch {
                path: file.relative.clone(),
                expected: file.size,
                actual: bytes,
            });
        }
        Ok(bytes)
    }
}

async fn remove_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Removed partial download"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove partial download"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::BridgeError;
    use bridge_traits::storage::{DownloadLink, RemoteEntry};
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    enum Step {
        Bytes(&'static [u8]),
        Transient,
        NotFound,
        Hang,
    }

    struct ScriptedStore {
        steps: Mutex<VecDeque<Step>>,
    }

    impl ScriptedStore {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
            })
        }
    }

    #[async_trait]
    impl RemoteStore for ScriptedStore {
        async fn list_folder(&self, _: &str, _: u32, _: u32) -> bridge_traits::error::Result<Vec<RemoteEntry>> {
            Ok(vec![])
        }

        async fn resolve_download(&self, path: &str) -> bridge_traits::error::Result<DownloadLink> {
            Ok(DownloadLink {
                href: format!("https://dl.example{}", path),
            })
        }

        async fn open_download(
            &self,
            _link: &DownloadLink,
        ) -> bridge_traits::error::Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>> {
            let step = self.steps.lock().unwrap().pop_front();
            match step {
                Some(Step::Bytes(data)) => Ok(Box::new(data)),
                Some(Step::Transient) => Err(BridgeError::Transient("connection reset".into())),
                Some(Step::NotFound) | None => Err(BridgeError::Status {
                    status: 404,
                    message: "gone".into(),
                }),
                Some(Step::Hang) => {
                    let (reader, writer) = tokio::io::duplex(8);
                    std::mem::forget(writer);
                    Ok(Box::new(reader))
                }
            }
        }
    }

    fn file(size: u64) -> RemoteFile {
        RemoteFile {
            name: "doc.docx".into(),
            path: "/A/doc.docx".into(),
            relative: "A/doc.docx".into(),
            size,
            modified: "T1".into(),
            content_hash: None,
        }
    }

    fn executor(store: Arc<ScriptedStore>, root: &Path) -> DownloadExecutor {
        DownloadExecutor::new(store, root, RetryPolicy::linear(3, Duration::from_millis(1)))
    }

    #[tokio::test]
    async fn test_download_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptedStore::new(vec![Step::Bytes(b"hello")]);

        let done = executor(store, dir.path())
            .download(&file(5), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(done.local_path, dir.path().join("A/doc.docx"));
        assert_eq!(done.bytes, 5);
        assert_eq!(std::fs::read(&done.local_path).unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptedStore::new(vec![Step::Transient, Step::Bytes(b"hel"), Step::Bytes(b"hello")]);

        let done = executor(store, dir.path())
            .download(&file(5), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(done.attempts, 3);
    }

    #[tokio::test]
    async fn test_not_found_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptedStore::new(vec![Step::NotFound, Step::Bytes(b"hello")]);

        let err = executor(store.clone(), dir.path())
            .download(&file(5), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Remote(ref e) if e.is_not_found()));
        assert_eq!(store.steps.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_exhausted_retries_leave_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptedStore::new(vec![Step::Bytes(b"h"), Step::Bytes(b"he"), Step::Bytes(b"hel")]);

        let err = executor(store, dir.path())
            .download(&file(5), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::SizeMismatch { actual: 3, .. }));
        assert!(!dir.path().join("A/doc.docx").exists());
    }

    #[tokio::test]
    async fn test_cancellation_removes_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ScriptedStore::new(vec![Step::Hang]);
        let cancel = CancellationToken::new();

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            canceller.cancel();
        });

        let err = executor(store, dir.path())
            .download(&file(5), &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::Cancelled));
        assert!(!dir.path().join("A/doc.docx").exists());
    }
}
