//! # Metadata Store
//!
//! Durable per-file sync state backed by SQLite.
//!
//! ## Overview
//!
//! The store is the correctness oracle of the mirror: a [`FileRecord`] is
//! written only after the download, conversion or transcription submission
//! it describes has completed, so any missing or stale row is safe to retry.
//!
//! - [`db`]: pool creation, migrations, integrity and schema verification
//! - [`models`]: [`FileRecord`], [`TranscriptionStatus`] state machine
//! - [`repository`]: [`FileRecordRepository`] and its SQLite implementation

pub mod db;
pub mod error;
pub mod models;
pub mod repository;

pub use db::{create_pool, create_test_pool, DatabaseConfig};
pub use error::{Result, StoreError};
pub use models::{
    FileRecord, StoreStatistics, TranscriptionStatus, TranscriptionUpdate, UpsertOutcome,
};
pub use repository::{FileRecordRepository, SqliteFileRecordRepository};
