//! Core types and shared functionality for obx-offline.
//!
//! This crate provides:
//! - Named cache stores with a SQLite backend
//! - Request/response snapshots and the `Network` seam
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod model;
pub mod network;
pub mod url;

pub use cache::{CacheDb, CacheStore, StoreSummary};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use model::{Request, RequestMode, Response};
pub use network::Network;
