//! The network seam used by the agent.

use async_trait::async_trait;

use crate::{Error, Request, Response};

/// Something that can send a request over the network.
///
/// Any HTTP status is a successful fetch; only transport failures (offline,
/// DNS, timeouts, oversized bodies) are errors.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}
