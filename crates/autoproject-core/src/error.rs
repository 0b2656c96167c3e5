//! Error types for Autoproject Core

use thiserror::Error;

/// Result type alias using Autoproject Error
pub type Result<T> = std::result::Result<T, Error>;

/// Autoproject error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Task '{task}' depends on undefined task '{dependency}'")]
    UndefinedDependency { task: String, dependency: String },

    #[error("Dependency cycle between tasks: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("No task became ready in a full pass; pending: {}", .0.join(", "))]
    Stalled(Vec<String>),

    #[error("Duplicate task title: {0}")]
    DuplicateTask(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Remote service error: {0}")]
    Remote(String),

    #[error("Run {run_id} failed: {reason}")]
    RunFailed { run_id: String, reason: String },

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("Invalid project: {0}")]
    InvalidProject(String),

    #[error("Planner error: {0}")]
    Planner(String),

    #[error("Operator error: {0}")]
    Operator(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error comes from the project's own shape rather than a
    /// remote service or tool.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UndefinedDependency { .. }
                | Error::DependencyCycle(_)
                | Error::Stalled(_)
                | Error::DuplicateTask(_)
                | Error::UnknownTool(_)
        )
    }
}

/// Tool-specific errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
