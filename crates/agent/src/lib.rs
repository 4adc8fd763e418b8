//! The offline-caching agent.
//!
//! Three parts, leaf first:
//! - [`GenerationManager`] owns the current cache generation: precache at
//!   install, purge of every other store at activate
//! - [`RequestClassifier`] decides whether a request is in scope and which
//!   strategy serves it
//! - [`Strategies`] serves navigations network-first and assets
//!   stale-while-revalidate
//!
//! [`ServiceAgent`] ties them together behind the [`LifecycleEvent`]
//! interface.

pub mod agent;
pub mod background;
pub mod classify;
pub mod event;
pub mod generation;
pub mod host;
pub mod strategy;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::ServiceAgent;
pub use background::BackgroundTasks;
pub use classify::{Classification, RequestClassifier};
pub use event::{EventOutcome, FetchOutcome, LifecycleEvent, ResponseFuture};
pub use generation::{ActivateReport, Generation, GenerationConfig, GenerationManager, InstallReport};
pub use host::Host;
pub use strategy::Strategies;
