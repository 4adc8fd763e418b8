//! Client code for obx-offline.
//!
//! This crate provides the HTTP network leg used by the agent and the host.

pub mod fetch;

pub use fetch::{FetchClient, FetchConfig};
