//! agent_install / agent_activate tool implementations.
//!
//! Let an MCP client retry a lifecycle step after a failure, the way a
//! browser retries a failed service worker registration.

use obx_agent::{ActivateReport, InstallReport};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use super::json_result;
use crate::host::{HostRuntime, RegistrationState};

/// Output of a lifecycle tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct LifecycleOutput {
    /// Registration state after the step.
    pub state: RegistrationState,
    /// Store owned by this agent's generation.
    pub store: String,
    /// URLs written at install.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cached: Option<Vec<String>>,
    /// Stale stores removed at activate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<Vec<String>>,
    /// Why cleanup stopped early, if it did.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,
}

pub async fn install_impl(runtime: &HostRuntime) -> Result<CallToolResult, McpError> {
    let InstallReport { store, cached } = runtime.install().await?;
    let output = LifecycleOutput {
        state: runtime.state().await,
        store,
        cached: Some(cached),
        deleted: None,
        cleanup_error: None,
    };
    json_result(&output)
}

pub async fn activate_impl(runtime: &HostRuntime) -> Result<CallToolResult, McpError> {
    let ActivateReport { store, deleted, cleanup_error } = runtime.activate().await?;
    let output =
        LifecycleOutput { state: runtime.state().await, store, cached: None, deleted: Some(deleted), cleanup_error };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::runtime;
    use crate::tools::result_json;

    #[tokio::test]
    async fn test_install_then_activate() {
        let (runtime, _) = runtime().await;

        let installed = result_json(&install_impl(&runtime).await.unwrap());
        assert_eq!(installed["state"], "installed");
        assert_eq!(installed["store"], "obx-cache-v1");
        assert_eq!(installed["cached"].as_array().unwrap().len(), 7);

        let activated = result_json(&activate_impl(&runtime).await.unwrap());
        assert_eq!(activated["state"], "activated");
        assert!(activated["deleted"].as_array().unwrap().is_empty());
        assert!(activated.get("cleanup_error").is_none());
    }

    #[tokio::test]
    async fn test_activate_without_install() {
        let (runtime, _) = runtime().await;
        let err = activate_impl(&runtime).await.unwrap_err();
        assert_eq!(err.code.0, -32023);
    }
}
