//! Remote runs and the tool-call bridge
//!
//! A run is one execution of a remote agent against the project thread. While
//! it needs local tool results it sits in [`RunState::RequiresToolInput`]; the
//! [`ToolBridge`] resolves the whole batch of pending calls against the task's
//! tools, submits every output in one request and keeps going until the run
//! completes or fails.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::{Error, Result, ToolError};
use crate::tools::{ToolDefinition, ToolRegistry};

/// A tool invocation requested by a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    /// JSON-encoded arguments as produced by the model
    pub arguments: String,
}

/// Output for one pending call, keyed by the call id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutputEntry {
    pub tool_call_id: String,
    pub output: String,
}

/// Lifecycle state of a remote run
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Running,
    RequiresToolInput { calls: Vec<ToolCallRequest> },
    Completed,
    Failed { reason: String },
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Completed | RunState::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    pub state: RunState,
}

/// Parameters for starting a run
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub thread_id: String,
    pub agent_id: String,
    pub additional_instructions: Option<String>,
    /// Tool schemas the run may call; empty means none
    pub tools: Vec<ToolDefinition>,
}

/// Remote run-control interface.
///
/// Every method waits for the run to leave [`RunState::Running`] before
/// returning, under whatever wait policy the implementation was built with.
#[async_trait]
pub trait RunService: Send + Sync {
    async fn create_and_poll(&self, request: &RunRequest) -> Result<Run>;

    /// Wait on a run that was observed running
    async fn poll(&self, run: &Run) -> Result<Run>;

    async fn submit_tool_outputs_and_poll(&self, run: &Run, outputs: &[ToolOutputEntry]) -> Result<Run>;
}

/// Services tool-call rounds of a run from a registry of local tools
pub struct ToolBridge {
    registry: ToolRegistry,
}

impl ToolBridge {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    /// Schemas of every tool this bridge can service
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.registry.list()
    }

    /// Drive `run` until it completes. A failed run is an error.
    pub async fn drive(&self, service: &dyn RunService, mut run: Run) -> Result<Run> {
        loop {
            run = match &run.state {
                RunState::Completed => return Ok(run),
                RunState::Failed { reason } => {
                    return Err(Error::RunFailed {
                        run_id: run.id.clone(),
                        reason: reason.clone(),
                    });
                }
                RunState::Running => service.poll(&run).await?,
                RunState::RequiresToolInput { calls } => {
                    info!("Run {} requested {} tool call(s)", run.id, calls.len());
                    let outputs = self.resolve_batch(calls).await?;
                    service.submit_tool_outputs_and_poll(&run, &outputs).await?
                }
            };
        }
    }

    /// Invoke every call in order. Any failure aborts the whole batch, so
    /// the result always has one entry per call.
    pub async fn resolve_batch(&self, calls: &[ToolCallRequest]) -> Result<Vec<ToolOutputEntry>> {
        let mut outputs = Vec::with_capacity(calls.len());
        for call in calls {
            outputs.push(self.resolve(call).await?);
        }
        Ok(outputs)
    }

    async fn resolve(&self, call: &ToolCallRequest) -> Result<ToolOutputEntry> {
        let tool = self
            .registry
            .get(&call.name)
            .ok_or_else(|| Error::UnknownTool(call.name.clone()))?;

        let params = parse_arguments(call)?;
        debug!("Calling {} ({}) with {}", call.name, call.id, params);

        let output = tool.execute(params).await?;

        Ok(ToolOutputEntry {
            tool_call_id: call.id.clone(),
            output: output.to_submission()?,
        })
    }
}

fn parse_arguments(call: &ToolCallRequest) -> Result<Value> {
    if call.arguments.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    serde_json::from_str(&call.arguments).map_err(|e| {
        ToolError::InvalidParams(format!("arguments for {} are not valid JSON: {}", call.name, e)).into()
    })
}
