//! Autoproject Core - goal-driven project planning and execution
//!
//! This crate provides the core functionality for autoproject:
//! - Project model (assistants, tasks, requirements) with JSON load/save
//! - Agent directory reconciling assistants with remote agent identities
//! - Conversation channel and the tool-call bridge for remote runs
//! - Dependency-driven task scheduling with an operator checkpoint
//! - Planner and tool functions (metadata, screenshot, scrape, search)

pub mod agents;
pub mod config;
pub mod conversation;
pub mod error;
pub mod planner;
pub mod project;
pub mod remote;
pub mod run;
pub mod scheduler;
pub mod tools;

pub use agents::{agent_name, AgentDirectory, AgentParams, AgentService, AgentSettings, RemoteAgent};
pub use config::{Config, ConfigManager, RunConfig};
pub use conversation::{Conversation, MessageRole, ThreadMessage, ThreadService};
pub use error::{Error, Result, ToolError};
pub use planner::Planner;
pub use project::{Assistant, Project, Requirement, Task};
pub use remote::OpenAiClient;
pub use run::{Run, RunRequest, RunService, RunState, ToolBridge, ToolCallRequest, ToolOutputEntry};
pub use scheduler::{ExecutionReport, Operator, Scheduler, TaskOutcome};
pub use tools::{create_standard_registry, Tool, ToolDefinition, ToolOutput, ToolRegistry};
