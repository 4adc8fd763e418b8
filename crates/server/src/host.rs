//! Host environment for the agent.
//!
//! Tracks the agent's registration, honours skip-waiting and client claims,
//! and decides whether a fetch goes through the agent at all. Until the
//! agent controls clients, every fetch goes straight to the network.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use obx_agent::{ActivateReport, Host, InstallReport, ServiceAgent};
use obx_core::{AppConfig, CacheDb, Error, Network, Request, Response};
use schemars::JsonSchema;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::HostError;

/// Where the agent is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Install failed; a new install attempt may follow.
    Redundant,
}

/// Client control flags flipped by the agent through [`Host`].
#[derive(Debug, Default)]
pub struct ClientControl {
    skipped_waiting: AtomicBool,
    controlling: AtomicBool,
}

impl ClientControl {
    pub fn skipped_waiting(&self) -> bool {
        self.skipped_waiting.load(Ordering::SeqCst)
    }

    pub fn controlling(&self) -> bool {
        self.controlling.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Host for ClientControl {
    async fn skip_waiting(&self) -> Result<(), Error> {
        self.skipped_waiting.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), Error> {
        self.controlling.store(true, Ordering::SeqCst);
        tracing::info!("agent now controls all clients");
        Ok(())
    }
}

/// A fetch as seen by the page.
#[derive(Debug, Clone)]
pub struct Intercepted {
    pub response: Response,
    /// Whether the agent produced the response.
    pub handled: bool,
}

/// Runs one agent registration.
pub struct HostRuntime {
    agent: ServiceAgent,
    control: Arc<ClientControl>,
    network: Arc<dyn Network>,
    state: Mutex<RegistrationState>,
}

impl HostRuntime {
    pub fn new(config: &AppConfig, db: CacheDb, network: Arc<dyn Network>) -> Result<Self, Error> {
        let control = Arc::new(ClientControl::default());
        let agent = ServiceAgent::from_app_config(config, db, network.clone(), control.clone())?;
        Ok(Self { agent, control, network, state: Mutex::new(RegistrationState::Parsed) })
    }

    pub fn agent(&self) -> &ServiceAgent {
        &self.agent
    }

    pub async fn state(&self) -> RegistrationState {
        *self.state.lock().await
    }

    /// Install then activate, as a page registering the agent would.
    pub async fn register(&self) -> Result<ActivateReport, HostError> {
        self.install().await?;
        self.activate().await
    }

    /// Run the install step. A failure marks the registration redundant.
    ///
    /// The registration reads `Installing` while the step runs; overlapping
    /// lifecycle calls are refused with [`HostError::Busy`].
    pub async fn install(&self) -> Result<InstallReport, HostError> {
        {
            let mut state = self.state.lock().await;
            if matches!(*state, RegistrationState::Installing | RegistrationState::Activating) {
                return Err(HostError::Busy(*state));
            }
            *state = RegistrationState::Installing;
        }

        let result = self.agent.install().await;

        let mut state = self.state.lock().await;
        match result {
            Ok(report) => {
                *state = RegistrationState::Installed;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "install failed, registration is redundant");
                *state = RegistrationState::Redundant;
                Err(e.into())
            }
        }
    }

    /// Run the activate step. Requires a completed install.
    pub async fn activate(&self) -> Result<ActivateReport, HostError> {
        let previous = {
            let mut state = self.state.lock().await;
            match *state {
                RegistrationState::Installed | RegistrationState::Activated => {}
                RegistrationState::Installing | RegistrationState::Activating => return Err(HostError::Busy(*state)),
                other => return Err(HostError::NotInstalled(other)),
            }
            if !self.control.skipped_waiting() {
                return Err(HostError::Waiting);
            }
            std::mem::replace(&mut *state, RegistrationState::Activating)
        };

        let result = self.agent.activate().await;

        let mut state = self.state.lock().await;
        match result {
            Ok(report) => {
                *state = RegistrationState::Activated;
                Ok(report)
            }
            Err(e) => {
                tracing::warn!(error = %e, "activation failed");
                *state = previous;
                Err(e.into())
            }
        }
    }

    /// Perform a page fetch, through the agent when it controls clients.
    pub async fn fetch(&self, request: Request) -> Result<Intercepted, Error> {
        if self.control.controlling()
            && let Some(response) = self.agent.fetch(request.clone()).response().await
        {
            return Ok(Intercepted { response: response?, handled: true });
        }

        let response = self.network.fetch(&request).await?;
        Ok(Intercepted { response, handled: false })
    }
}
