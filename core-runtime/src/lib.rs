//! # Core Runtime Module
//!
//! Foundational runtime infrastructure shared by every crate of the mirror:
//! - Logging and tracing infrastructure
//! - Configuration management
//!
//! ## Overview
//!
//! Nothing here touches the network or the metadata store. The binary builds
//! a [`config::SyncConfig`], calls [`logging::init_logging`], and hands the
//! config down to the sync coordinator.

pub mod config;
pub mod error;
pub mod logging;

pub use config::SyncConfig;
pub use error::{Error, Result};
