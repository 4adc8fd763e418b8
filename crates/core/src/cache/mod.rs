//! SQLite-backed storage for named cache stores.
//!
//! A single database holds every store the agent owns. Each store is a
//! key-value map from request identity to response snapshot:
//!
//! - Stores are created on first open and deleted as a unit
//! - Entries cascade with their store
//! - Writes are UPSERTs, so the last write per key wins
//! - WAL mode lets background writes overlap with reads

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use stores::{CacheStore, StoreSummary};
