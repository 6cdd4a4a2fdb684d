//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop and server hosts.
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` (rustls, streaming downloads)
//! - `TokenProvider` backed by a static token or environment variable
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, StaticTokenProvider};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let http_client = ReqwestHttpClient::with_timeout(Duration::from_secs(30))?;
//!     let tokens = StaticTokenProvider::from_env("DISK_MIRROR_TOKEN")?;
//!     // Hand both to a provider connector
//!     Ok(())
//! }
//! ```

mod auth;
mod http;

pub use auth::StaticTokenProvider;
pub use http::ReqwestHttpClient;
