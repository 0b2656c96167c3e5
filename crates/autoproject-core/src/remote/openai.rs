//! OpenAI Assistants v2 client
//!
//! One HTTP client serves all three remote interfaces: assistants are the
//! agent identities, threads carry the project conversation and runs execute
//! an assistant against a thread.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::debug;

use super::logging::{log_api_call, ApiLogEntry};
use crate::agents::{AgentParams, AgentService, RemoteAgent};
use crate::config::{ModelConfig, OpenAiConfig, RunConfig};
use crate::conversation::{MessageRole, ThreadMessage, ThreadService};
use crate::error::{Error, Result};
use crate::run::{Run, RunRequest, RunService, RunState, ToolCallRequest, ToolOutputEntry};

const PAGE_LIMIT: u32 = 100;

/// Client for the OpenAI Assistants API
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    run: RunConfig,
}

impl OpenAiClient {
    /// Build a client from configuration. Fails when no API key is available.
    pub fn new(config: &OpenAiConfig, run: RunConfig) -> Result<Self> {
        let api_key = config.get_api_key().ok_or_else(|| {
            Error::Config(format!(
                "API key not configured. Set {} or api_key in [openai] config.",
                config.api_key_env
            ))
        })?;
        Self::with_base_url(&config.base_url, api_key, run)
    }

    pub fn with_base_url(base_url: &str, api_key: impl Into<String>, run: RunConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| Error::Remote(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            run,
        })
    }

    /// Single chat completion constrained to a JSON object reply; returns
    /// the reply text
    pub async fn chat_json(&self, settings: &ModelConfig, system: &str, user: &str) -> Result<String> {
        let body = json!({
            "model": settings.model,
            "temperature": settings.temperature,
            "response_format": { "type": "json_object" },
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let completion: ChatCompletion = self.send(Method::POST, "/chat/completions", Some(&body)).await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Remote("Chat completion returned no content".to_string()))
    }

    async fn send<T: DeserializeOwned>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, path);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2");
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let message = e.to_string();
                log_api_call(ApiLogEntry {
                    method: method.as_str(),
                    path,
                    request: body,
                    error: Some(&message),
                    ..Default::default()
                });
                return Err(Error::Remote(format!("{} {} failed: {}", method, path, message)));
            }
        };

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::Remote(format!("{} {}: failed to read response: {}", method, path, e)))?;

        log_api_call(ApiLogEntry {
            method: method.as_str(),
            path,
            request: body,
            status: Some(status.as_u16()),
            response: Some(&text),
            ..Default::default()
        });

        if !status.is_success() {
            return Err(Error::Remote(format!(
                "{} {} returned {}: {}",
                method,
                path,
                status.as_u16(),
                api_error_message(&text)
            )));
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let run: ApiRun = self
            .send(Method::GET, &format!("/threads/{}/runs/{}", thread_id, run_id), None)
            .await?;
        run.into_run()
    }

    /// Apply the configured wait policy to a run
    async fn wait(&self, run: Run) -> Result<Run> {
        match self.run.timeout() {
            Some(limit) => tokio::time::timeout(limit, self.wait_until_settled(run))
                .await
                .map_err(|_| Error::Timeout(limit.as_secs()))?,
            None => self.wait_until_settled(run).await,
        }
    }

    async fn wait_until_settled(&self, mut run: Run) -> Result<Run> {
        while run.state == RunState::Running {
            tokio::time::sleep(self.run.poll_interval()).await;
            run = self.retrieve_run(&run.thread_id, &run.id).await?;
        }
        debug!("Run {} settled: {:?}", run.id, run.state);
        Ok(run)
    }
}

#[async_trait]
impl AgentService for OpenAiClient {
    async fn list_agents(&self) -> Result<Vec<RemoteAgent>> {
        let mut agents = Vec::new();
        let mut after: Option<String> = None;

        loop {
            let path = match &after {
                Some(cursor) => format!("/assistants?limit={}&after={}", PAGE_LIMIT, cursor),
                None => format!("/assistants?limit={}", PAGE_LIMIT),
            };
            let page: ListPage<ApiAssistant> = self.send(Method::GET, &path, None).await?;
            let next = page.next_cursor();
            agents.extend(page.data.into_iter().map(ApiAssistant::into_agent));

            match next {
                Some(cursor) => after = Some(cursor),
                None => break,
            }
        }

        Ok(agents)
    }

    async fn create_agent(&self, params: &AgentParams) -> Result<RemoteAgent> {
        let assistant: ApiAssistant = self
            .send(Method::POST, "/assistants", Some(&agent_body(params)))
            .await?;
        Ok(assistant.into_agent())
    }

    async fn update_agent(&self, id: &str, params: &AgentParams) -> Result<RemoteAgent> {
        let assistant: ApiAssistant = self
            .send(Method::POST, &format!("/assistants/{}", id), Some(&agent_body(params)))
            .await?;
        Ok(assistant.into_agent())
    }
}

#[async_trait]
impl ThreadService for OpenAiClient {
    async fn create_thread(&self) -> Result<String> {
        let thread: ApiObject = self.send(Method::POST, "/threads", Some(&json!({}))).await?;
        Ok(thread.id)
    }

    async fn add_message(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<ThreadMessage> {
        let body = json!({ "role": role.as_str(), "content": content });
        let message: ApiMessage = self
            .send(Method::POST, &format!("/threads/{}/messages", thread_id), Some(&body))
            .await?;
        Ok(message.into_message())
    }

    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>> {
        let page: ListPage<ApiMessage> = self
            .send(
                Method::GET,
                &format!("/threads/{}/messages?limit=1&order=desc", thread_id),
                None,
            )
            .await?;
        Ok(page.data.into_iter().next().map(ApiMessage::into_message))
    }
}

#[async_trait]
impl RunService for OpenAiClient {
    async fn create_and_poll(&self, request: &RunRequest) -> Result<Run> {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();

        let mut body = json!({
            "assistant_id": request.agent_id,
            "tools": tools,
        });
        if let Some(extra) = &request.additional_instructions {
            body["additional_instructions"] = Value::String(extra.clone());
        }

        let run: ApiRun = self
            .send(Method::POST, &format!("/threads/{}/runs", request.thread_id), Some(&body))
            .await?;
        self.wait(run.into_run()?).await
    }

    async fn poll(&self, run: &Run) -> Result<Run> {
        self.wait(run.clone()).await
    }

    async fn submit_tool_outputs_and_poll(&self, run: &Run, outputs: &[ToolOutputEntry]) -> Result<Run> {
        let body = json!({ "tool_outputs": outputs });
        let submitted: ApiRun = self
            .send(
                Method::POST,
                &format!("/threads/{}/runs/{}/submit_tool_outputs", run.thread_id, run.id),
                Some(&body),
            )
            .await?;
        self.wait(submitted.into_run()?).await
    }
}

fn agent_body(params: &AgentParams) -> Value {
    json!({
        "name": params.name,
        "description": params.description,
        "instructions": params.instructions,
        "model": params.model,
        "temperature": params.temperature,
    })
}

/// Message from an API error body, or the raw body when it has none
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

/// Map a remote run status onto [`RunState`]
fn map_status(
    status: &str,
    tool_calls: Option<Vec<ToolCallRequest>>,
    last_error: Option<String>,
) -> Result<RunState> {
    Ok(match status {
        "queued" | "in_progress" | "cancelling" => RunState::Running,
        "requires_action" => RunState::RequiresToolInput {
            calls: tool_calls.unwrap_or_default(),
        },
        "completed" => RunState::Completed,
        "failed" | "cancelled" | "expired" | "incomplete" => RunState::Failed {
            reason: last_error.unwrap_or_else(|| status.to_string()),
        },
        other => return Err(Error::Remote(format!("Unknown run status: {}", other))),
    })
}

#[derive(Deserialize)]
struct ListPage<T> {
    data: Vec<T>,
    #[serde(default)]
    has_more: bool,
    #[serde(default)]
    last_id: Option<String>,
}

impl<T> ListPage<T> {
    fn next_cursor(&self) -> Option<String> {
        if self.has_more { self.last_id.clone() } else { None }
    }
}

#[derive(Deserialize)]
struct ApiObject {
    id: String,
}

#[derive(Deserialize)]
struct ApiAssistant {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    instructions: Option<String>,
    #[serde(default)]
    model: String,
    #[serde(default)]
    temperature: Option<f32>,
}

impl ApiAssistant {
    fn into_agent(self) -> RemoteAgent {
        RemoteAgent {
            id: self.id,
            name: self.name.unwrap_or_default(),
            description: self.description,
            instructions: self.instructions,
            model: self.model,
            temperature: self.temperature,
        }
    }
}

#[derive(Deserialize)]
struct ApiMessage {
    id: String,
    role: MessageRole,
    #[serde(default)]
    content: Vec<ApiContent>,
}

#[derive(Deserialize)]
struct ApiContent {
    #[serde(default)]
    text: Option<ApiText>,
}

#[derive(Deserialize)]
struct ApiText {
    value: String,
}

impl ApiMessage {
    fn into_message(self) -> ThreadMessage {
        let content = self
            .content
            .into_iter()
            .filter_map(|part| part.text.map(|t| t.value))
            .collect::<Vec<_>>()
            .join("\n");
        ThreadMessage {
            id: self.id,
            role: self.role,
            content,
        }
    }
}

#[derive(Deserialize)]
struct ApiRun {
    id: String,
    thread_id: String,
    status: String,
    #[serde(default)]
    required_action: Option<RequiredAction>,
    #[serde(default)]
    last_error: Option<LastError>,
}

#[derive(Deserialize)]
struct RequiredAction {
    submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Deserialize)]
struct SubmitToolOutputs {
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunctionCall,
}

#[derive(Deserialize)]
struct ApiFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct LastError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ApiRun {
    fn into_run(self) -> Result<Run> {
        let calls = self.required_action.map(|action| {
            action
                .submit_tool_outputs
                .tool_calls
                .into_iter()
                .map(|call| ToolCallRequest {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect()
        });
        let reason = self.last_error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{}: {}", code, message),
            (None, Some(message)) => message,
            (Some(code), None) => code,
            (None, None) => "unknown error".to_string(),
        });

        Ok(Run {
            state: map_status(&self.status, calls, reason)?,
            id: self.id,
            thread_id: self.thread_id,
        })
    }
}

#[derive(Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}
