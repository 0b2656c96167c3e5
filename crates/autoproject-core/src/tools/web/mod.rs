//! Web tools for fetching and processing web content

mod metadata;
mod scrape;
mod search;

pub use metadata::{fetch_metadata, parse_metadata, PageMetadata, PageMetadataTool};
pub use scrape::{chunk_text, extract_text, PageScrapeTool};
pub use search::SearchInternetTool;

use std::time::Duration;

use crate::error::ToolError;

const USER_AGENT: &str = concat!("autoproject/", env!("CARGO_PKG_VERSION"));

/// Fetch a page body as text, failing on non-success status
pub(crate) async fn fetch_html(url: &url::Url) -> Result<String, ToolError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to create client: {}", e)))?;

    let response = client
        .get(url.as_str())
        .send()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to fetch URL: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ToolError::ExecutionFailed(format!(
            "HTTP error: {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown")
        )));
    }

    response
        .text()
        .await
        .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read response: {}", e)))
}
