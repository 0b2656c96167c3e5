//! Tool system for remote agents
//!
//! Tools are the local functions a remote run may ask us to invoke. Each tool has:
//! - A name and one-line description (shown to the planner and the agent)
//! - A JSON schema for parameters
//! - An execute method

pub mod browser;
pub mod web;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Error, Result, ToolError};

/// Boxed future type for object-safe async trait methods
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Output from a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The returned value, serialized back to the run as JSON
    pub content: Value,
}

impl ToolOutput {
    pub fn success(content: impl Into<Value>) -> Self {
        Self {
            content: content.into(),
        }
    }

    /// Text form submitted as the tool call's output
    pub fn to_submission(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.content)?)
    }
}

/// Tool definition for LLM consumption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Core trait for all tools
pub trait Tool: Send + Sync {
    /// Tool name (used by LLM to invoke)
    fn name(&self) -> &str;

    /// Description of what the tool does
    fn description(&self) -> &str;

    /// JSON schema for parameters
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with given parameters
    fn execute(&self, params: Value) -> BoxFuture<'_, std::result::Result<ToolOutput, ToolError>>;

    /// Convert to tool definition for LLM
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// Registry of available tools
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// List all available tools, sorted by name
    pub fn list(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(|t| t.to_definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Name to one-line description, as handed to the planner
    pub fn function_list(&self) -> BTreeMap<String, String> {
        self.tools
            .values()
            .map(|t| (t.name().to_string(), t.description().to_string()))
            .collect()
    }

    /// A registry holding only the named tools.
    ///
    /// Every name must be registered here.
    pub fn scoped<S: AsRef<str>>(&self, names: &[S]) -> Result<ToolRegistry> {
        let mut scoped = ToolRegistry::new();
        for name in names {
            let name = name.as_ref();
            let tool = self
                .get(name)
                .ok_or_else(|| Error::UnknownTool(name.to_string()))?;
            scoped.register(tool);
        }
        Ok(scoped)
    }
}

/// Build the registry of every tool the planner may hand out
pub fn create_standard_registry(config: &Config) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(web::PageMetadataTool::new()));
    registry.register(Arc::new(browser::PageScreenshotTool::new(config.browser.clone())));
    registry.register(Arc::new(web::PageScrapeTool::new(config.scrape.chunk_size)));
    registry.register(Arc::new(web::SearchInternetTool::new(config.web_search.clone())));
    registry
}

/// Read a required string parameter
pub(crate) fn require_str<'a>(params: &'a Value, key: &str) -> std::result::Result<&'a str, ToolError> {
    params[key]
        .as_str()
        .ok_or_else(|| ToolError::InvalidParams(format!("{} is required", key)))
}

/// Parse and check an http(s) URL parameter
pub(crate) fn require_url(params: &Value) -> std::result::Result<url::Url, ToolError> {
    let raw = require_str(params, "url")?;
    let parsed = url::Url::parse(raw)
        .map_err(|e| ToolError::InvalidParams(format!("Invalid URL: {}", e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ToolError::InvalidParams(
            "Only HTTP and HTTPS URLs are supported".into(),
        ));
    }

    Ok(parsed)
}

/// Helper macro for creating tool parameter schemas
#[macro_export]
macro_rules! tool_params {
    ($($field:ident : $type:expr => $desc:expr),* $(,)?) => {
        serde_json::json!({
            "type": "object",
            "properties": {
                $( stringify!($field): { "type": $type, "description": $desc } ),*
            },
            "required": [ $( stringify!($field) ),* ]
        })
    };
}
