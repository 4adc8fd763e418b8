//! Structured errors for the obx-offline host.

use rmcp::model::{ErrorCode, ErrorData as McpError};

use crate::host::RegistrationState;

/// Errors raised by the host around the agent's lifecycle.
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// Activation requested before a successful install.
    #[error("NOT_INSTALLED: agent is {0:?}")]
    NotInstalled(RegistrationState),

    /// Another lifecycle step is still running.
    #[error("LIFECYCLE_BUSY: agent is {0:?}")]
    Busy(RegistrationState),

    /// Installed agent is waiting for the clients of its predecessor to close.
    #[error("WAITING: installed agent has not skipped waiting")]
    Waiting,

    /// The agent itself failed.
    #[error(transparent)]
    Agent(#[from] obx_core::Error),
}

impl From<HostError> for McpError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::Agent(e) => e.into(),
            other => {
                let code = match other {
                    HostError::NotInstalled(_) => -32023,
                    HostError::Waiting => -32025,
                    _ => -32024,
                };
                McpError { code: ErrorCode(code), message: other.to_string().into(), data: None }
            }
        }
    }
}
