//! # Database Connection Pool Module
//!
//! Provides the SQLite connection pool backing the metadata store.
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for better concurrency (multiple readers, one writer)
//! - **Connection Pooling**: Configurable min/max connections with timeouts
//! - **Automatic Migrations**: Runs on initialization
//! - **Verification**: Health check, integrity check and column check; any
//!   failure is fatal because the run must not proceed on an inconsistent store
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_store::db::{DatabaseConfig, create_pool};
//!
//! let config = DatabaseConfig::new("localdata/metadata/sync_metadata.db");
//! let pool = create_pool(config).await?;
//! ```
//!
//! ## Testing
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::{Result, StoreError};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Columns the `files` table must carry.
const REQUIRED_COLUMNS: &[&str] = &[
    "path",
    "size",
    "remote_modified",
    "content_hash",
    "last_sync",
    "is_empty_placeholder",
    "converted_artifact_path",
    "transcription_status",
    "transcription_operation_id",
    "transcription_started_at",
    "video_metadata",
    "created_at",
    "updated_at",
];

/// Database configuration for SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database URL, `sqlite:<path>` or `sqlite::memory:`
    pub database_url: String,

    /// File backing the database, if any
    pub database_path: Option<PathBuf>,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// Maximum lifetime of a connection
    pub max_lifetime: Option<Duration>,

    /// Maximum idle time for a connection before being closed
    pub idle_timeout: Option<Duration>,
}

impl DatabaseConfig {
    /// Create a new database configuration with the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            database_path: Some(path),
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Some(Duration::from_secs(1800)),
            idle_timeout: Some(Duration::from_secs(600)),
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// Every SQLite connection to `:memory:` opens its own database, so the
    /// pool is pinned to a single long-lived connection.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            database_path: None,
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: None,
            idle_timeout: None,
        }
    }

    /// Set the minimum number of connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function:
/// 1. Creates the parent directory of a file-backed database
/// 2. Configures SQLite connection options (WAL mode, create if missing)
/// 3. Creates a connection pool with the specified configuration
/// 4. Runs database migrations
/// 5. Verifies health, integrity and schema
///
/// # Errors
///
/// Returns an error if:
/// - The database file cannot be accessed
/// - Connection pool creation fails
/// - Migrations fail
/// - The integrity check or the schema check fails
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        max_connections = config.max_connections,
        "Opening metadata store"
    );

    if let Some(parent) = config.database_path.as_ref().and_then(|p| p.parent()) {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let connect_options = SqliteConnectOptions::from_str(&config.database_url)?
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(10));

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .max_lifetime(config.max_lifetime)
        .idle_timeout(config.idle_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            StoreError::Database(e)
        })?;

    run_migrations(&pool).await?;
    health_check(&pool).await?;
    verify_integrity(&pool).await?;
    verify_schema(&pool).await?;

    info!("Metadata store ready");
    Ok(pool)
}

/// Create a connection pool for testing with in-memory database
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    create_pool(DatabaseConfig::in_memory()).await
}

async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| {
            warn!(error = %e, "Migration failed");
            StoreError::Migration(e.to_string())
        })?;

    Ok(())
}

async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        StoreError::Database(e)
    })?;
    Ok(())
}

async fn verify_integrity(pool: &Pool<Sqlite>) -> Result<()> {
    let row = sqlx::query("PRAGMA quick_check").fetch_one(pool).await?;
    let verdict: String = row.try_get(0)?;

    if verdict != "ok" {
        warn!(verdict = %verdict, "Metadata store integrity check failed");
        return Err(StoreError::Corrupt(verdict));
    }
    Ok(())
}

async fn verify_schema(pool: &Pool<Sqlite>) -> Result<()> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info('files')")
        .fetch_all(pool)
        .await?;

    let columns: Vec<String> = rows
        .iter()
        .map(|row| row.try_get::<String, _>("name"))
        .collect::<std::result::Result<_, _>>()?;

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !columns.iter().any(|c| c == required))
        .collect();

    if !missing.is_empty() {
        return Err(StoreError::SchemaMismatch(format!(
            "files table is missing columns: {}",
            missing.join(", ")
        )));
    }
    Ok(())
}
