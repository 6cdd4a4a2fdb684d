//! # Host Bridge Traits
//!
//! Boundaries between the sync engine and the outside world.
//!
//! ## Overview
//!
//! The engine never talks to the network, a credential source, or the
//! wall clock directly. Each of those is a trait defined here and
//! implemented elsewhere (`bridge-desktop`, `provider-*`, or test fakes).
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Async HTTP with retry of transport failures
//! - [`RemoteStore`](storage::RemoteStore) - Paginated listing and streaming downloads
//! - [`TokenProvider`](auth::TokenProvider) - Bearer token source, refreshed by the implementor
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use [`BridgeError`](error::BridgeError). Implementations
//! classify failures so callers can decide what to retry:
//!
//! - transport failures and timeouts become [`BridgeError::Transient`]
//! - non-2xx answers become [`BridgeError::Status`]
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so they can be shared across
//! worker tasks behind an `Arc`.

pub mod auth;
pub mod error;
pub mod http;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use auth::TokenProvider;
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use storage::{DownloadLink, RemoteEntry, RemoteEntryKind, RemoteStore};
pub use time::{Clock, FixedClock, SystemClock};
