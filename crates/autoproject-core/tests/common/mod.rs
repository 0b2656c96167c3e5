//! In-memory fakes of the remote interfaces and the operator

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use autoproject_core::error::ToolError;
use autoproject_core::tools::BoxFuture;
use autoproject_core::{
    AgentParams, AgentService, Error, MessageRole, Operator, RemoteAgent, Result, Run, RunRequest, RunService,
    RunState, Task, ThreadMessage, ThreadService, Tool, ToolCallRequest, ToolOutput, ToolOutputEntry,
};
use parking_lot::Mutex;
use serde_json::{json, Value};

#[derive(Default)]
struct FakeState {
    next_id: u32,
    agents: Vec<RemoteAgent>,
    threads: HashMap<String, Vec<ThreadMessage>>,
    /// States handed out for runs not yet created, in creation order
    scripts: VecDeque<Vec<RunState>>,
    /// Remaining states of live runs
    runs: HashMap<String, VecDeque<RunState>>,
    run_requests: Vec<RunRequest>,
    submissions: Vec<Vec<ToolOutputEntry>>,
    events: Vec<String>,
    silent: bool,
}

impl FakeState {
    fn id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}_{}", prefix, self.next_id)
    }

    fn push_message(&mut self, thread_id: &str, role: MessageRole, content: &str) -> ThreadMessage {
        let message = ThreadMessage {
            id: self.id("msg"),
            role,
            content: content.to_string(),
        };
        self.threads
            .entry(thread_id.to_string())
            .or_default()
            .push(message.clone());
        message
    }

    /// Advance a run to its next scripted state. Completing a run appends
    /// the agent's reply unless the fake is silent.
    fn advance(&mut self, run_id: &str, thread_id: &str) -> Run {
        let state = self
            .runs
            .get_mut(run_id)
            .and_then(|states| states.pop_front())
            .unwrap_or(RunState::Completed);

        if state == RunState::Completed && !self.silent {
            let last_user = self
                .threads
                .get(thread_id)
                .and_then(|messages| messages.iter().rev().find(|m| m.role == MessageRole::User))
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.push_message(thread_id, MessageRole::Assistant, &format!("done: {}", last_user));
        }

        Run {
            id: run_id.to_string(),
            thread_id: thread_id.to_string(),
            state,
        }
    }
}

/// Fake agent, thread and run service sharing one state
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue the states of the next created run
    pub fn script_run(&self, states: Vec<RunState>) {
        self.state.lock().scripts.push_back(states);
    }

    /// Completed runs no longer write an agent reply
    pub fn set_silent(&self, silent: bool) {
        self.state.lock().silent = silent;
    }

    pub fn seed_agent(&self, agent: RemoteAgent) {
        self.state.lock().agents.push(agent);
    }

    pub fn agents(&self) -> Vec<RemoteAgent> {
        self.state.lock().agents.clone()
    }

    pub fn events(&self) -> Vec<String> {
        self.state.lock().events.clone()
    }

    pub fn submissions(&self) -> Vec<Vec<ToolOutputEntry>> {
        self.state.lock().submissions.clone()
    }

    pub fn run_requests(&self) -> Vec<RunRequest> {
        self.state.lock().run_requests.clone()
    }

    pub fn messages(&self, thread_id: &str) -> Vec<ThreadMessage> {
        self.state
            .lock()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Contents of user messages in posting order, across all threads
    pub fn user_posts(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("message:user:").map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl AgentService for FakeRemote {
    async fn list_agents(&self) -> Result<Vec<RemoteAgent>> {
        let mut state = self.state.lock();
        state.events.push("list_agents".into());
        Ok(state.agents.clone())
    }

    async fn create_agent(&self, params: &AgentParams) -> Result<RemoteAgent> {
        let mut state = self.state.lock();
        let agent = RemoteAgent {
            id: state.id("asst"),
            name: params.name.clone(),
            description: Some(params.description.clone()),
            instructions: Some(params.instructions.clone()),
            model: params.model.clone(),
            temperature: Some(params.temperature),
        };
        state.events.push(format!("create_agent:{}", params.name));
        state.agents.push(agent.clone());
        Ok(agent)
    }

    async fn update_agent(&self, id: &str, params: &AgentParams) -> Result<RemoteAgent> {
        let mut state = self.state.lock();
        state.events.push(format!("update_agent:{}", id));
        let agent = state
            .agents
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| Error::Remote(format!("No such assistant: {}", id)))?;
        agent.name = params.name.clone();
        agent.description = Some(params.description.clone());
        agent.instructions = Some(params.instructions.clone());
        agent.model = params.model.clone();
        agent.temperature = Some(params.temperature);
        Ok(agent.clone())
    }
}

#[async_trait]
impl ThreadService for FakeRemote {
    async fn create_thread(&self) -> Result<String> {
        let mut state = self.state.lock();
        let id = state.id("thread");
        state.threads.insert(id.clone(), Vec::new());
        state.events.push("create_thread".into());
        Ok(id)
    }

    async fn add_message(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<ThreadMessage> {
        let mut state = self.state.lock();
        state.events.push(format!("message:{}:{}", role.as_str(), content));
        Ok(state.push_message(thread_id, role, content))
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>> {
        let state = self.state.lock();
        Ok(state.threads.get(thread_id).and_then(|m| m.last().cloned()))
    }
}

#[async_trait]
impl RunService for FakeRemote {
    async fn create_and_poll(&self, request: &RunRequest) -> Result<Run> {
        let mut state = self.state.lock();
        let run_id = state.id("run");
        let script = state.scripts.pop_front().unwrap_or_default();
        state.runs.insert(run_id.clone(), script.into());
        state.run_requests.push(request.clone());
        state.events.push(format!("run:{}", request.agent_id));
        Ok(state.advance(&run_id, &request.thread_id))
    }

    async fn poll(&self, run: &Run) -> Result<Run> {
        let mut state = self.state.lock();
        state.events.push(format!("poll:{}", run.id));
        Ok(state.advance(&run.id, &run.thread_id))
    }

    async fn submit_tool_outputs_and_poll(&self, run: &Run, outputs: &[ToolOutputEntry]) -> Result<Run> {
        let mut state = self.state.lock();
        state.events.push(format!("submit:{}:{}", run.id, outputs.len()));
        state.submissions.push(outputs.to_vec());
        Ok(state.advance(&run.id, &run.thread_id))
    }
}

/// Operator that records every callback
#[derive(Default)]
pub struct RecordingOperator {
    started: Mutex<Vec<String>>,
    responses: Mutex<Vec<(String, Option<String>)>>,
    confirmed: Mutex<Vec<String>>,
    reply: String,
    fail_on: Option<String>,
}

impl RecordingOperator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            ..Default::default()
        })
    }

    /// Confirmation of the task titled `title` fails
    pub fn failing_on(title: &str) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(title.to_string()),
            ..Default::default()
        })
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().clone()
    }

    pub fn responses(&self) -> Vec<(String, Option<String>)> {
        self.responses.lock().clone()
    }

    pub fn confirmed(&self) -> Vec<String> {
        self.confirmed.lock().clone()
    }
}

#[async_trait]
impl Operator for RecordingOperator {
    fn task_started(&self, task: &Task) {
        self.started.lock().push(task.title.clone());
    }

    fn task_response(&self, task: &Task, response: Option<&str>) {
        self.responses
            .lock()
            .push((task.title.clone(), response.map(str::to_string)));
    }

    async fn confirm(&self, task: &Task) -> Result<String> {
        if self.fail_on.as_deref() == Some(task.title.as_str()) {
            return Err(Error::Operator("input closed".into()));
        }
        self.confirmed.lock().push(task.title.clone());
        Ok(self.reply.clone())
    }
}

/// Tool that echoes its arguments back
pub struct EchoTool {
    pub name: &'static str,
}

impl Tool for EchoTool {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        "Echoes its arguments."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn execute(&self, params: Value) -> BoxFuture<'_, std::result::Result<ToolOutput, ToolError>> {
        Box::pin(async move { Ok(ToolOutput::success(json!({ "echo": params }))) })
    }
}

/// Tool that always fails
pub struct BrokenTool;

impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn description(&self) -> &str {
        "Always fails."
    }

    fn parameters_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    fn execute(&self, _params: Value) -> BoxFuture<'_, std::result::Result<ToolOutput, ToolError>> {
        Box::pin(async { Err(ToolError::ExecutionFailed("boom".into())) })
    }
}

pub fn call(id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest {
        id: id.into(),
        name: name.into(),
        arguments: arguments.into(),
    }
}
