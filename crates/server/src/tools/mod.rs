//! MCP tool implementations.
//!
//! Each tool drives one host-side operation on the agent and returns its
//! result as pretty-printed JSON text.

pub mod cache;
pub mod fetch;
pub mod lifecycle;

pub use cache::stores_impl;
pub use fetch::{AgentFetchParams, fetch_impl};
pub use lifecycle::{activate_impl, install_impl};

use obx_core::Error;
use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use serde::Serialize;

/// Serialize `output` as the tool's text content.
pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn result_json(result: &CallToolResult) -> serde_json::Value {
    let content = serde_json::to_value(&result.content[0]).unwrap();
    let text = content
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
