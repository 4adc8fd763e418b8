//! The lifecycle event interface between host and agent.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use obx_core::{Error, Request, Response};

use crate::{ActivateReport, InstallReport};

/// A response still being produced by a strategy.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send + 'static>>;

/// Signals the host delivers to the agent.
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    Install,
    Activate,
    Fetch(Request),
}

/// The agent's answer to an intercepted fetch.
pub enum FetchOutcome {
    /// The agent will produce the response.
    Handled(ResponseFuture),
    /// Out of scope: the host performs its default network fetch.
    NotHandled,
}

impl FetchOutcome {
    /// Drive a handled response to completion; `None` when not handled.
    pub async fn response(self) -> Option<Result<Response, Error>> {
        match self {
            FetchOutcome::Handled(fut) => Some(fut.await),
            FetchOutcome::NotHandled => None,
        }
    }
}

impl fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchOutcome::Handled(_) => f.write_str("Handled(..)"),
            FetchOutcome::NotHandled => f.write_str("NotHandled"),
        }
    }
}

/// What handling an event produced.
#[derive(Debug)]
pub enum EventOutcome {
    Installed(InstallReport),
    Activated(ActivateReport),
    Fetch(FetchOutcome),
}
