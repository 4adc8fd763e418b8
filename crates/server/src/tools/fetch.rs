//! agent_fetch tool implementation.
//!
//! Performs a page fetch through the host, so the agent intercepts it when
//! it controls clients and the request is in scope.

use obx_core::{Error, Request, RequestMode};
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::json_result;
use crate::host::HostRuntime;

/// Input parameters for agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchParams {
    /// Absolute URL, or a path resolved against the configured origin.
    pub url: String,

    /// Treat the request as a top-level page navigation.
    #[serde(default)]
    pub navigate: bool,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Optional Accept header.
    #[serde(default)]
    pub accept: Option<String>,
}

fn default_method() -> String {
    "GET".into()
}

/// Output structure for agent_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AgentFetchOutput {
    /// The requested URL after resolution.
    pub url: String,
    /// URL the response came from.
    pub final_url: String,
    pub status: u16,
    /// Whether the agent produced the response (false: plain network).
    pub handled: bool,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body as text, lossily decoded.
    pub body: String,
    pub body_bytes: usize,
}

pub async fn fetch_impl(runtime: &HostRuntime, params: AgentFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(Error::InvalidInput("url cannot be empty".into()).into());
    }

    let origin = runtime.agent().classifier().origin();
    let url = obx_core::url::resolve(origin, &params.url).map_err(Error::from)?;
    let mode = if params.navigate { RequestMode::Navigate } else { RequestMode::NoCors };

    let mut request = Request::new(params.method, url, mode);
    if let Some(accept) = params.accept {
        request = request.with_header("Accept", accept);
    }

    let requested = request.url.to_string();
    let intercepted = runtime.fetch(request).await?;
    let response = intercepted.response;

    let output = AgentFetchOutput {
        url: requested,
        final_url: response.url.clone(),
        status: response.status,
        handled: intercepted.handled,
        content_type: response.content_type().map(str::to_string),
        body: String::from_utf8_lossy(&response.body).into_owned(),
        body_bytes: response.body.len(),
        headers: response.headers,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::runtime;
    use crate::tools::result_json;
    use std::sync::atomic::Ordering;

    fn params(url: &str, navigate: bool) -> AgentFetchParams {
        AgentFetchParams { url: url.into(), navigate, method: default_method(), accept: None }
    }

    #[tokio::test]
    async fn test_fetch_empty_url() {
        let (runtime, _) = runtime().await;
        let result = fetch_impl(&runtime, params("  ", false)).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_fetch_relative_path_resolves_against_origin() {
        let (runtime, _) = runtime().await;
        let output = result_json(&fetch_impl(&runtime, params("./icons/icon.svg", false)).await.unwrap());
        assert_eq!(output["url"], "http://localhost:8080/icons/icon.svg");
        assert_eq!(output["handled"], false);
        assert_eq!(output["body"], "ok /icons/icon.svg");
    }

    #[tokio::test]
    async fn test_fetch_offline_navigation_after_register() {
        let (runtime, network) = runtime().await;
        runtime.register().await.unwrap();
        network.offline.store(true, Ordering::SeqCst);

        let output = result_json(&fetch_impl(&runtime, params("/reports", true)).await.unwrap());
        assert_eq!(output["handled"], true);
        assert_eq!(output["status"], 200);
        assert_eq!(output["body"], "ok /offline.html");
    }

    #[tokio::test]
    async fn test_fetch_offline_uncached_asset_fails() {
        let (runtime, network) = runtime().await;
        runtime.register().await.unwrap();
        network.offline.store(true, Ordering::SeqCst);

        let err = fetch_impl(&runtime, params("/charts.js", false)).await.unwrap_err();
        assert_eq!(err.code.0, -32008);
    }
}
