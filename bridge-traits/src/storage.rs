//! Remote Store Abstraction
//!
//! The contract a hierarchical cloud store must satisfy to be mirrored:
//! paginated folder listing, download link resolution and byte streaming.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Kind of a remote entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteEntryKind {
    File,
    Folder,
}

/// One child of a remote folder, as reported by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    /// Full path inside the store, e.g. `/Docs/report.xlsx`
    pub path: String,
    pub kind: RemoteEntryKind,
    /// Size in bytes; folders report 0
    pub size: u64,
    /// Opaque, comparable modification token (ISO timestamp)
    pub modified: String,
    /// Checksum supplied by the store, if any
    pub content_hash: Option<String>,
}

impl RemoteEntry {
    pub fn is_folder(&self) -> bool {
        self.kind == RemoteEntryKind::Folder
    }
}

/// Short-lived link a file's bytes can be fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub href: String,
}

/// Remote hierarchical object store
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::RemoteStore;
///
/// async fn first_page(store: &dyn RemoteStore) -> Result<usize> {
///     let entries = store.list_folder("/", 1000, 0).await?;
///     Ok(entries.len())
/// }
/// ```
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// List one page of a folder's children.
    ///
    /// A page shorter than `limit` is the last one.
    async fn list_folder(&self, path: &str, limit: u32, offset: u32) -> Result<Vec<RemoteEntry>>;

    /// Resolve a transient download link for a file.
    async fn resolve_download(&self, path: &str) -> Result<DownloadLink>;

    /// Open a byte stream for a previously resolved link.
    async fn open_download(
        &self,
        link: &DownloadLink,
    ) -> Result<Box<dyn tokio::io::AsyncRead + Send + Unpin>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_kind_serde() {
        let entry = RemoteEntry {
            name: "A".to_string(),
            path: "/A".to_string(),
            kind: RemoteEntryKind::Folder,
            size: 0,
            modified: "2024-01-01T00:00:00+00:00".to_string(),
            content_hash: None,
        };

        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"kind\":\"folder\""));
        assert!(entry.is_folder());
    }
}
