//! search_internet tool - search the web using Serper
//!
//! Returns the provider's raw JSON response so the agent sees every field
//! (organic results, knowledge graph, related questions).

use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use crate::config::WebSearchConfig;
use crate::error::ToolError;
use crate::tools::{require_str, BoxFuture, Tool, ToolOutput};

/// Tool for searching the web using Serper
pub struct SearchInternetTool {
    config: WebSearchConfig,
}

impl SearchInternetTool {
    pub fn new(config: WebSearchConfig) -> Self {
        Self { config }
    }

    async fn search(&self, query: &str, n_results: u64) -> Result<Value, ToolError> {
        let api_key = self.config.get_api_key().ok_or_else(|| {
            ToolError::ExecutionFailed(format!(
                "Search API key not configured. Set {} or api_key in [web_search] config.",
                self.config.api_key_env
            ))
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create HTTP client: {}", e)))?;

        debug!("Searching for {:?} ({} results)", query, n_results);

        let response = client
            .post(&self.config.endpoint)
            .header("X-API-KEY", api_key)
            .json(&json!({ "q": query, "num": n_results }))
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Search request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ToolError::ExecutionFailed(format!(
                "Search provider error: {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to parse search response: {}", e)))
    }
}

impl Tool for SearchInternetTool {
    fn name(&self) -> &str {
        "search_internet"
    }

    fn description(&self) -> &str {
        "Searches the internet for a given query."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                },
                "n_results": {
                    "type": "integer",
                    "description": "Number of results to return",
                    "default": self.config.default_results
                }
            },
            "required": ["query"]
        })
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let query = require_str(&params, "query")?;
            if query.trim().is_empty() {
                return Err(ToolError::InvalidParams("query must not be empty".into()));
            }

            let n_results = match params.get("n_results") {
                None | Some(Value::Null) => u64::from(self.config.default_results),
                Some(value) => value.as_u64().ok_or_else(|| {
                    ToolError::InvalidParams("n_results must be a positive integer".into())
                })?,
            };

            let body = self.search(query, n_results).await?;
            Ok(ToolOutput::success(body))
        })
    }
}
