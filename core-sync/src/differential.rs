//! Decides whether a discovered file must be fetched again.

use core_store::FileRecord;
use std::path::Path;

use crate::walker::RemoteFile;

/// Why a download is needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadReason {
    /// No record exists for the path
    New,
    /// Remote size or modification token changed
    Changed,
    /// The recorded artifact is gone from disk
    MissingArtifact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Download(DownloadReason),
    SkipUnchanged,
    /// An external job owns the path
    SkipActiveOperation,
}

/// Compare a remote file with its stored record.
///
/// `artifact_root` resolves the record's artifact path for the self-healing
/// existence check.
pub async fn decide(file: &RemoteFile, record: Option<&FileRecord>, artifact_root: &Path) -> Decision {
    let Some(record) = record else {
        return Decision::Download(DownloadReason::New);
    };

    if record.transcription_status.is_active() {
        return Decision::SkipActiveOperation;
    }

    let unchanged = record.matches_remote(file.size, &file.modified);

    if let Some(artifact) = record.converted_artifact_path.as_deref().filter(|a| !a.is_empty()) {
        let exists = tokio::fs::try_exists(artifact_root.join(artifact))
            .await
            .unwrap_or(false);
        if !exists {
            return Decision::Download(DownloadReason::MissingArtifact);
        }
    }

    if unchanged {
        Decision::SkipUnchanged
    } else {
        Decision::Download(DownloadReason::Changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(size: u64, modified: &str) -> RemoteFile {
        RemoteFile {
            name: "doc.docx".into(),
            path: "/A/doc.docx".into(),
            relative: "A/doc.docx".into(),
            size,
            modified: modified.into(),
            content_hash: None,
        }
    }

    fn record(size: u64, modified: &str) -> FileRecord {
        FileRecord::new("A/doc.docx", size, modified, None, 0)
    }

    #[tokio::test]
    async fn test_new_file_is_downloaded() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            decide(&remote(500, "T1"), None, dir.path()).await,
            Decision::Download(DownloadReason::New)
        );
    }

    #[tokio::test]
    async fn test_unchanged_without_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let stored = record(500, "T1");
        assert_eq!(
            decide(&remote(500, "T1"), Some(&stored), dir.path()).await,
            Decision::SkipUnchanged
        );
        assert_eq!(
            decide(&remote(600, "T1"), Some(&stored), dir.path()).await,
            Decision::Download(DownloadReason::Changed)
        );
        assert_eq!(
            decide(&remote(500, "T2"), Some(&stored), dir.path()).await,
            Decision::Download(DownloadReason::Changed)
        );
    }

    #[tokio::test]
    async fn test_artifact_presence_drives_self_healing() {
        let dir = tempfile::tempdir().unwrap();
        let stored = record(500, "T1").with_artifact("A/doc.docx.md");

        assert_eq!(
            decide(&remote(500, "T1"), Some(&stored), dir.path()).await,
            Decision::Download(DownloadReason::MissingArtifact)
        );

        std::fs::create_dir_all(dir.path().join("A")).unwrap();
        std::fs::write(dir.path().join("A/doc.docx.md"), "# doc").unwrap();
        assert_eq!(
            decide(&remote(500, "T1"), Some(&stored), dir.path()).await,
            Decision::SkipUnchanged
        );
    }

    #[tokio::test]
    async fn test_active_operation_wins() {
        let dir = tempfile::tempdir().unwrap();
        let stored = record(500, "T1").with_pending_transcription("op-1", 0, None);
        assert_eq!(
            decide(&remote(900, "T9"), Some(&stored), dir.path()).await,
            Decision::SkipActiveOperation
        );
    }
}
