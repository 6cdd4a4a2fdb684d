//! # Yandex Disk Provider
//!
//! Implements `RemoteStore` for the Yandex Disk REST API v1.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated folder listing (`GET /resources`, `_embedded.items`)
//! - Download link resolution (`GET /resources/download`)
//! - Streaming downloads through the host `HttpClient`
//! - Retry of transport failures; non-2xx answers are terminal

pub mod connector;
pub mod error;
pub mod types;

pub use connector::YandexDiskConnector;
pub use error::{Result, YandexDiskError};
