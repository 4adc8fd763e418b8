//! The host environment's side of the lifecycle.

use async_trait::async_trait;
use obx_core::Error;

/// Lifecycle hooks the host environment provides to the agent.
#[async_trait]
pub trait Host: Send + Sync {
    /// Let a freshly installed agent activate without waiting for the
    /// sessions controlled by the previous one to close.
    async fn skip_waiting(&self) -> Result<(), Error>;

    /// Route fetches from every open client through the agent, including
    /// clients opened before it activated.
    async fn claim_clients(&self) -> Result<(), Error>;
}
