//! # Incremental Sync Engine
//!
//! Mirrors a remote tree into local storage, one run at a time.
//!
//! ## Overview
//!
//! A run enumerates the remote tree, decides per file whether anything has
//! to happen, downloads what changed, hands the result to the conversion
//! registry and records the outcome in the metadata store. Unchanged files
//! cost one record lookup. Files that vanished remotely are cleaned up
//! afterwards, and video transcriptions submitted to an external service are
//! followed until they resolve.
//!
//! ## Components
//!
//! - **Tree Walker** (`walker`): paginated, concurrent remote enumeration
//! - **Listing Cache** (`listing_cache`): TTL-bound reuse of a full listing
//! - **Skip Policy** (`skip_policy`): budget, category and size exclusions
//! - **Differential Updater** (`differential`): download-or-skip decision
//! - **Download Executor** (`executor`): streaming download with retries
//! - **Transcription Coordinator** (`transcription`): polls async jobs
//! - **Cleanup Agent** (`cleanup`): removes what the remote no longer has
//! - **Sync Coordinator** (`coordinator`): runs all of the above

pub mod cleanup;
pub mod coordinator;
pub mod differential;
pub mod error;
pub mod executor;
pub mod listing_cache;
pub mod paths;
pub mod report;
pub mod session;
pub mod skip_policy;
pub mod transcription;
pub mod walker;

pub use cleanup::{CleanupAgent, CleanupReport};
pub use coordinator::SyncCoordinator;
pub use differential::{Decision, DownloadReason};
pub use error::{Result, SyncError};
pub use executor::{DownloadExecutor, Downloaded};
pub use listing_cache::ListingCache;
pub use report::SyncReport;
pub use session::{BudgetReservation, ByteBudget, FolderProgress, SessionContext};
pub use skip_policy::{Admission, SkipPolicy, SkipReason};
pub use transcription::{PollOutcome, PollSummary, TranscriptionCoordinator};
pub use walker::{RemoteFile, RemoteListing, TreeWalker};
