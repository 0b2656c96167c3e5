//! page_metadata tool - title, description and social metadata of a page

use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;
use crate::tool_params;
use crate::tools::{require_url, BoxFuture, Tool, ToolOutput};

use super::fetch_html;

/// Metadata found on a webpage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub url: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub site_name: String,
    pub favicon: String,
    pub keywords: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Fetch a page and extract its metadata
pub async fn fetch_metadata(url: &url::Url) -> Result<PageMetadata, ToolError> {
    let html = fetch_html(url).await?;
    Ok(parse_metadata(url, &html))
}

/// Extract metadata from an HTML document; absent values are empty strings
pub fn parse_metadata(url: &url::Url, html: &str) -> PageMetadata {
    let doc = Html::parse_document(html);

    let title = first_non_empty([
        meta_content(&doc, r#"meta[property="og:title"]"#),
        element_text(&doc, "title"),
    ]);
    let description = first_non_empty([
        meta_content(&doc, r#"meta[name="description"]"#),
        meta_content(&doc, r#"meta[property="og:description"]"#),
    ]);
    let image = meta_content(&doc, r#"meta[property="og:image"]"#)
        .map(|src| resolve(url, &src))
        .unwrap_or_default();
    let favicon = select_attr(&doc, r#"link[rel~="icon"]"#, "href")
        .or_else(|| select_attr(&doc, r#"link[rel="shortcut icon"]"#, "href"))
        .map(|href| resolve(url, &href))
        .unwrap_or_else(|| resolve(url, "/favicon.ico"));

    PageMetadata {
        url: url.to_string(),
        title,
        description,
        image,
        site_name: meta_content(&doc, r#"meta[property="og:site_name"]"#).unwrap_or_default(),
        favicon,
        keywords: meta_content(&doc, r#"meta[name="keywords"]"#).unwrap_or_default(),
        kind: meta_content(&doc, r#"meta[property="og:type"]"#).unwrap_or_default(),
    }
}

fn meta_content(doc: &Html, selector: &str) -> Option<String> {
    select_attr(doc, selector, "content")
}

fn select_attr(doc: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .find(|v| !v.is_empty())
}

fn element_text(doc: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    doc.select(&selector)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .find(|v| !v.is_empty())
}

fn first_non_empty<const N: usize>(candidates: [Option<String>; N]) -> String {
    candidates.into_iter().flatten().next().unwrap_or_default()
}

fn resolve(base: &url::Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Tool exposing [`fetch_metadata`]
pub struct PageMetadataTool;

impl PageMetadataTool {
    pub fn new() -> Self {
        Self
    }
}

impl Default for PageMetadataTool {
    fn default() -> Self {
        Self::new()
    }
}

impl Tool for PageMetadataTool {
    fn name(&self) -> &str {
        "page_metadata"
    }

    fn description(&self) -> &str {
        "Fetches metadata from a URL."
    }

    fn parameters_schema(&self) -> Value {
        tool_params!(url: "string" => "The URL of the page to inspect")
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, Result<ToolOutput, ToolError>> {
        Box::pin(async move {
            let url = require_url(&params)?;
            let metadata = fetch_metadata(&url).await?;
            let content = serde_json::to_value(metadata)
                .map_err(|e| ToolError::ExecutionFailed(e.to_string()))?;
            Ok(ToolOutput::success(content))
        })
    }
}
