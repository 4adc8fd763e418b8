//! cache_stores tool implementation.
//!
//! Lists every store in the cache storage and marks the current one.

use obx_core::StoreSummary;
use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;

use super::json_result;
use crate::host::HostRuntime;

/// Output from the cache_stores tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheStoresOutput {
    /// Name of the store for the running generation.
    pub current: String,
    /// Every store, oldest first.
    pub stores: Vec<StoreSummary>,
}

pub async fn stores_impl(runtime: &HostRuntime) -> Result<CallToolResult, McpError> {
    let generations = runtime.agent().generations();
    let stores = generations.db().store_summaries().await?;
    let output = CacheStoresOutput { current: generations.current_store_name().to_string(), stores };
    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::tests::runtime;
    use crate::tools::result_json;

    #[tokio::test]
    async fn test_stores_before_install() {
        let (runtime, _) = runtime().await;
        let output = result_json(&stores_impl(&runtime).await.unwrap());
        assert_eq!(output["current"], "obx-cache-v1");
        assert!(output["stores"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stores_after_register() {
        let (runtime, _) = runtime().await;
        runtime.agent().generations().db().open_store("obx-cache-v0").await.unwrap();
        runtime.register().await.unwrap();

        let output = result_json(&stores_impl(&runtime).await.unwrap());
        let stores = output["stores"].as_array().unwrap();
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0]["name"], "obx-cache-v1");
        assert_eq!(stores[0]["entries"], 7);
    }
}
