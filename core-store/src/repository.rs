//! # File Record Repository
//!
//! Persistence of [`FileRecord`]s.
//!
//! ## Overview
//!
//! Every read-modify-write sequence (existence check followed by insert or
//! update, status transition checks) runs inside one transaction while the
//! repository's write lock is held, so concurrent workers touching different
//! paths cannot lose each other's updates.

use crate::{
    FileRecord, Result, StoreError, StoreStatistics, TranscriptionStatus, TranscriptionUpdate,
    UpsertOutcome,
};
use async_trait::async_trait;
use sqlx::{FromRow, SqlitePool};
use tokio::sync::Mutex;
use tracing::debug;

// ============================================================================
// Repository Trait
// ============================================================================

/// Repository trait for file record persistence
#[async_trait]
pub trait FileRecordRepository: Send + Sync {
    /// Find the record for a root-relative path
    async fn get(&self, path: &str) -> Result<Option<FileRecord>>;

    /// Insert the record, or replace the existing row with the same path
    ///
    /// `created_at` of an existing row is preserved.
    ///
    /// # Errors
    ///
    /// Returns an error if the record violates a row invariant or the
    /// database operation fails
    async fn upsert(&self, record: &FileRecord) -> Result<UpsertOutcome>;

    /// Replace the artifact path of an existing record
    async fn update_artifact_path(&self, path: &str, artifact: Option<&str>) -> Result<()>;

    /// Apply a validated transcription transition and return the new row
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidTransition`] if the state machine forbids
    /// the step, [`StoreError::NotFound`] if no row exists
    async fn update_transcription(
        &self,
        path: &str,
        update: &TranscriptionUpdate,
    ) -> Result<FileRecord>;

    /// Records whose transcription is pending or in progress
    async fn list_active_transcriptions(&self) -> Result<Vec<FileRecord>>;

    /// Every stored path
    async fn list_paths(&self) -> Result<Vec<String>>;

    /// Every stored record, ordered by path
    async fn list_all(&self) -> Result<Vec<FileRecord>>;

    /// Remove a record; returns whether a row existed
    async fn delete(&self, path: &str) -> Result<bool>;

    /// Remove every record; returns the number of rows removed
    async fn clear_all(&self) -> Result<u64>;

    /// Aggregate counts and sizes
    async fn statistics(&self) -> Result<StoreStatistics>;
}

// ============================================================================
// SQLite Implementation
// ============================================================================

/// SQLite implementation of FileRecordRepository
pub struct SqliteFileRecordRepository {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl SqliteFileRecordRepository {
    /// Create a new SQLite file record repository
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            write_lock: Mutex::new(()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

const SELECT_COLUMNS: &str = r#"
    SELECT path, size, remote_modified, content_hash, last_sync,
           is_empty_placeholder, converted_artifact_path, transcription_status,
           transcription_operation_id, transcription_started_at, video_metadata,
           created_at, updated_at
    FROM files
"#;

/// Database row representation of a file record
#[derive(Debug, FromRow)]
struct FileRecordRow {
    path: String,
    size: i64,
    remote_modified: String,
    content_hash: Option<String>,
    last_sync: i64,
    is_empty_placeholder: bool,
    converted_artifact_path: Option<String>,
    transcription_status: String,
    transcription_operation_id: Option<String>,
    transcription_started_at: Option<i64>,
    video_metadata: Option<String>,
    created_at: i64,
    updated_at: i64,
}

impl TryFrom<FileRecordRow> for FileRecord {
    type Error = StoreError;

    fn try_from(row: FileRecordRow) -> Result<Self> {
        Ok(FileRecord {
            path: row.path,
            size: row.size.max(0) as u64,
            remote_modified: row.remote_modified,
            content_hash: row.content_hash,
            last_sync: row.last_sync,
            is_empty_placeholder: row.is_empty_placeholder,
            converted_artifact_path: row.converted_artifact_path.filter(|p| !p.is_empty()),
            transcription_status: row.transcription_status.parse()?,
            transcription_operation_id: row.transcription_operation_id,
            transcription_started_at: row.transcription_started_at,
            video_metadata: row.video_metadata,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[async_trait]
impl FileRecordRepository for SqliteFileRecordRepository {
    async fn get(&self, path: &str) -> Result<Option<FileRecord>> {
        let row = sqlx::query_as::<_, FileRecordRow>(&format!("{} WHERE path = ?", SELECT_COLUMNS))
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;

        row.map(FileRecord::try_from).transpose()
    }

    async fn upsert(&self, record: &FileRecord) -> Result<UpsertOutcome> {
        record.validate()?;

        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let existing: Option<(i64,)> = sqlx::query_as("SELECT created_at FROM files WHERE path = ?")
            .bind(&record.path)
            .fetch_optional(&mut *tx)
            .await?;

        let updated_at = now();
        let outcome = match existing {
            Some(_) => {
                sqlx::query(
                    r#"
                    UPDATE files SET
                        size = ?,
                        remote_modified = ?,
                        content_hash = ?,
                        last_sync = ?,
                        is_empty_placeholder = ?,
                        converted_artifact_path = ?,
                        transcription_status = ?,
                        transcription_operation_id = ?,
                        transcription_started_at = ?,
                        video_metadata = ?,
                        updated_at = ?
                    WHERE path = ?
                    "#,
                )
                .bind(record.size as i64)
                .bind(&record.remote_modified)
                .bind(&record.content_hash)
                .bind(record.last_sync)
                .bind(record.is_empty_placeholder)
                .bind(&record.converted_artifact_path)
                .bind(record.transcription_status.as_str())
                .bind(&record.transcription_operation_id)
                .bind(record.transcription_started_at)
                .bind(&record.video_metadata)
                .bind(updated_at)
                .bind(&record.path)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Updated
            }
            None => {
                sqlx::query(
                    r#"
                    INSERT INTO files (
                        path, size, remote_modified, content_hash, last_sync,
                        is_empty_placeholder, converted_artifact_path, transcription_status,
                        transcription_operation_id, transcription_started_at, video_metadata,
                        created_at, updated_at
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(&record.path)
                .bind(record.size as i64)
                .bind(&record.remote_modified)
                .bind(&record.content_hash)
                .bind(record.last_sync)
                .bind(record.is_empty_placeholder)
                .bind(&record.converted_artifact_path)
                .bind(record.transcription_status.as_str())
                .bind(&record.transcription_operation_id)
                .bind(record.transcription_started_at)
                .bind(&record.video_metadata)
                .bind(record.created_at)
                .bind(updated_at)
                .execute(&mut *tx)
                .await?;
                UpsertOutcome::Inserted
            }
        };

        tx.commit().await?;
        debug!(path = %record.path, outcome = ?outcome, "File record written");
        Ok(outcome)
    }

    async fn update_artifact_path(&self, path: &str, artifact: Option<&str>) -> Result<()> {
        let _guard = self.write_lock.lock().await;

        let result = sqlx::query(
            "UPDATE files SET converted_artifact_path = ?, updated_at = ? WHERE path = ?",
        )
        .bind(artifact.filter(|a| !a.is_empty()))
        .bind(now())
        .bind(path)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn update_transcription(
        &self,
        path: &str,
        update: &TranscriptionUpdate,
    ) -> Result<FileRecord> {
        let _guard = self.write_lock.lock().await;
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, FileRecordRow>(&format!("{} WHERE path = ?", SELECT_COLUMNS))
            .bind(path)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })?;
        let mut record = FileRecord::try_from(row)?;

        let current = record.transcription_status;
        if !current.can_transition_to(update.status) {
            return Err(StoreError::InvalidTransition {
                path: path.to_string(),
                from: current.to_string(),
                to: update.status.to_string(),
            });
        }

        record.transcription_status = update.status;
        if let Some(operation_id) = &update.operation_id {
            record.transcription_operation_id = Some(operation_id.clone());
        }
        if let Some(started_at) = update.started_at {
            record.transcription_started_at = Some(started_at);
        }
        if let Some(metadata) = &update.video_metadata {
            record.video_metadata = Some(metadata.clone());
        }
        match update.status {
            TranscriptionStatus::Completed => {
                record.converted_artifact_path =
                    update.artifact_path.clone().filter(|a| !a.is_empty());
            }
            TranscriptionStatus::Pending | TranscriptionStatus::InProgress => {
                record.converted_artifact_path = None;
            }
            TranscriptionStatus::Failed | TranscriptionStatus::None => {}
        }
        record.updated_at = now();
        record.validate()?;

        sqlx::query(
            r#"
            UPDATE files SET
                converted_artifact_path = ?,
                transcription_status = ?,
                transcription_operation_id = ?,
                transcription_started_at = ?,
                video_metadata = ?,
                updated_at = ?
            WHERE path = ?
            "#,
        )
        .bind(&record.converted_artifact_path)
        .bind(record.transcription_status.as_str())
        .bind(&record.transcription_operation_id)
        .bind(record.transcription_started_at)
        .bind(&record.video_metadata)
        .bind(record.updated_at)
        .bind(path)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        debug!(path = %path, from = %current, to = %record.transcription_status, "Transcription status updated");
        Ok(record)
    }

    async fn list_active_transcriptions(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecordRow>(&format!(
            "{} WHERE transcription_status IN ('pending', 'in_progress') ORDER BY transcription_started_at",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(FileRecord::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn list_paths(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as("SELECT path FROM files ORDER BY path")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(path,)| path).collect())
    }

    async fn list_all(&self) -> Result<Vec<FileRecord>> {
        let rows = sqlx::query_as::<_, FileRecordRow>(&format!("{} ORDER BY path", SELECT_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(FileRecord::try_from)
            .collect::<Result<Vec<_>>>()
    }

    async fn delete(&self, path: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM files WHERE path = ?")
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_all(&self) -> Result<u64> {
        let _guard = self.write_lock.lock().await;
        let result = sqlx::query("DELETE FROM files").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn statistics(&self) -> Result<StoreStatistics> {
        let (total, placeholders, converted, active, total_size): (i64, i64, i64, i64, i64) =
            sqlx::query_as(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN is_empty_placeholder THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN converted_artifact_path IS NOT NULL THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN transcription_status IN ('pending', 'in_progress') THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_empty_placeholder THEN 0 ELSE size END), 0)
                FROM files
                "#,
            )
            .fetch_one(&self.pool)
            .await?;

        Ok(StoreStatistics {
            total: total as u64,
            placeholders: placeholders as u64,
            materialized: (total - placeholders) as u64,
            converted: converted as u64,
            active_transcriptions: active as u64,
            total_size: total_size as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_test_pool;
    use std::sync::Arc;

    async fn repository() -> SqliteFileRecordRepository {
        SqliteFileRecordRepository::new(create_test_pool().await.unwrap())
    }

    #[tokio::test]
    async fn test_upsert_inserts_then_updates() {
        let repo = repository().await;
        let record = FileRecord::new("A/doc.docx", 500, "T1", Some("md5".into()), 100)
            .with_artifact("A/doc.docx.md");

        assert_eq!(repo.upsert(&record).await.unwrap(), UpsertOutcome::Inserted);

        let mut changed = record.clone();
        changed.size = 600;
        changed.remote_modified = "T2".to_string();
        changed.created_at = 999;
        assert_eq!(repo.upsert(&changed).await.unwrap(), UpsertOutcome::Updated);

        let stored = repo.get("A/doc.docx").await.unwrap().unwrap();
        assert_eq!(stored.size, 600);
        assert_eq!(stored.remote_modified, "T2");
        assert_eq!(stored.created_at, 100, "created_at survives updates");
        assert_eq!(stored.converted_artifact_path.as_deref(), Some("A/doc.docx.md"));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let repo = repository().await;
        assert!(repo.get("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_upsert_rejects_invalid_record() {
        let repo = repository().await;
        let mut record =
            FileRecord::new("v.mp4", 1, "T1", None, 0).with_pending_transcription("op", 0, None);
        record.converted_artifact_path = Some("v.mp4.md".into());

        assert!(matches!(
            repo.upsert(&record).await,
            Err(StoreError::InvalidRecord(_))
        ));
        assert!(repo.get("v.mp4").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_transcription_lifecycle() {
        let repo = repository().await;
        let record = FileRecord::new("clips/talk.mp4", 10, "T1", None, 0)
            .with_pending_transcription("op-42", 50, Some("{\"duration\":3}".into()));
        repo.upsert(&record).await.unwrap();

        let active = repo.list_active_transcriptions().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].transcription_operation_id.as_deref(), Some("op-42"));

        let running = repo
            .update_transcription(
                "clips/talk.mp4",
                &TranscriptionUpdate::status(TranscriptionStatus::InProgress),
            )
            .await
            .unwrap();
        assert_eq!(running.transcription_status, TranscriptionStatus::InProgress);

        let done = repo
            .update_transcription(
                "clips/talk.mp4",
                &TranscriptionUpdate::completed("clips/talk.mp4.md"),
            )
            .await
            .unwrap();
        assert_eq!(done.converted_artifact_path.as_deref(), Some("clips/talk.mp4.md"));
        assert_eq!(done.video_metadata.as_deref(), Some("{\"duration\":3}"));
        assert!(repo.list_active_transcriptions().await.unwrap().is_empty());

        let illegal = repo
            .update_transcription(
                "clips/talk.mp4",
                &TranscriptionUpdate::status(TranscriptionStatus::InProgress),
            )
            .await;
        assert!(matches!(illegal, Err(StoreError::InvalidTransition { .. })));
    }

    #[tokio::test]
    async fn test_update_transcription_missing_row() {
        let repo = repository().await;
        let result = repo
            .update_transcription("ghost", &TranscriptionUpdate::status(TranscriptionStatus::Failed))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_delete_and_clear() {
        let repo = repository().await;
        for path in ["a", "b", "c"] {
            repo.upsert(&FileRecord::new(path, 1, "T", None, 0)).await.unwrap();
        }

        assert!(repo.delete("b").await.unwrap());
        assert!(!repo.delete("b").await.unwrap());
        assert_eq!(repo.list_paths().await.unwrap(), vec!["a", "c"]);

        assert_eq!(repo.clear_all().await.unwrap(), 2);
        assert!(repo.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_artifact_path() {
        let repo = repository().await;
        repo.upsert(&FileRecord::new("r.csv", 3, "T", None, 0)).await.unwrap();

        repo.update_artifact_path("r.csv", Some("r.csv.md")).await.unwrap();
        let stored = repo.get("r.csv").await.unwrap().unwrap();
        assert_eq!(stored.converted_artifact_path.as_deref(), Some("r.csv.md"));

        assert!(matches!(
            repo.update_artifact_path("missing", None).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_statistics() {
        let repo = repository().await;
        repo.upsert(&FileRecord::new("a", 100, "T", None, 0).with_artifact("a.md"))
            .await
            .unwrap();
        repo.upsert(&FileRecord::new("b", 50, "T", None, 0)).await.unwrap();
        let mut placeholder = FileRecord::new("c", 1000, "T", None, 0);
        placeholder.is_empty_placeholder = true;
        repo.upsert(&placeholder).await.unwrap();

        let stats = repo.statistics().await.unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.placeholders, 1);
        assert_eq!(stats.materialized, 2);
        assert_eq!(stats.converted, 1);
        assert_eq!(stats.total_size, 150);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_do_not_lose_rows() {
        let repo = Arc::new(repository().await);

        let handles: Vec<_> = (0..20)
            .map(|i| {
                let repo = Arc::clone(&repo);
                tokio::spawn(async move {
                    let record = FileRecord::new(format!("dir/file-{}", i), i, "T", None, 0);
                    repo.upsert(&record).await.unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(repo.list_paths().await.unwrap().len(), 20);
    }
}
