//! Planner - turns goals into a project plan
//!
//! One chat completion produces the whole project document: assistants,
//! tasks with their dependencies and tool functions, and any requirements
//! the available functions cannot cover.

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::{Error, Result};
use crate::project::Project;
use crate::remote::OpenAiClient;

const SYSTEM_PROMPT: &str = "You are a project planner. Reply with a single JSON object and nothing else.";

const PROJECT_SHAPE: &str = r#"{
    "reference": "short-kebab-case-project-name",
    "goals": ["goal"],
    "assistants": [
        {"name": "string", "role": "string", "instructions": "backstory, written to the assistant", "tools": []}
    ],
    "tasks": [
        {
            "title": "unique string",
            "instructions": "string",
            "assigned_to": {"name": "string", "role": "string", "instructions": "string", "tools": []},
            "done": false,
            "depends_on": ["title of another task"],
            "functions": ["function name"]
        }
    ],
    "requirements": [
        {"title": "string", "description": "string"}
    ]
}"#;

/// Builds project plans with a chat model
pub struct Planner {
    client: OpenAiClient,
    settings: ModelConfig,
}

impl Planner {
    pub fn new(client: OpenAiClient, settings: ModelConfig) -> Self {
        Self { client, settings }
    }

    /// The user prompt sent for `goals`
    pub fn build_prompt(goals: &[String], function_list: &BTreeMap<String, String>) -> String {
        let functions = serde_json::to_string(function_list).unwrap_or_else(|_| "{}".to_string());
        format!(
            "This is the list of goals for the project: {goals:?}\n\
             Break the goals down into tasks to create a project plan.\n\
             Create unique assistants with roles, skills and backstory necessary to complete the tasks.\n\
             Create a number of assistants with efficiency in mind, do not create more assistants than tasks.\n\
             The backstory must be written as if speaking to that assistant (it will be a prompt for an LLM).\n\
             Assign tasks to assistants with efficiency in mind.\n\
             These are the functions that can be used by tasks: {functions}\n\
             If the task will require external resources or API functions that you cannot provide,\n\
             list them as requirements for the project.\n\
             When thinking about requirements, be aware that you are an LLM without access to\n\
             the Internet and will need various functions to be able to see, view and interact\n\
             with the project and Internet.\n\
             \n\
             Respond with a JSON object of this shape:\n{PROJECT_SHAPE}"
        )
    }

    /// Ask the model for a plan and validate it
    pub async fn plan(&self, goals: &[String], function_list: &BTreeMap<String, String>) -> Result<Project> {
        info!("Planning project for {} goal(s) with {}", goals.len(), self.settings.model);
        let prompt = Self::build_prompt(goals, function_list);
        let reply = self.client.chat_json(&self.settings, SYSTEM_PROMPT, &prompt).await?;
        debug!("Planner reply: {} bytes", reply.len());

        parse_plan(&reply, goals)
    }
}

/// Parse a planner reply into a validated project
pub fn parse_plan(reply: &str, goals: &[String]) -> Result<Project> {
    let mut project = Project::from_json(reply).map_err(|e| match e {
        Error::InvalidProject(msg) => Error::Planner(format!("unusable plan: {}", msg)),
        other => other,
    })?;

    if project.assistants.len() > project.tasks.len() {
        return Err(Error::Planner(format!(
            "plan has {} assistants for {} tasks",
            project.assistants.len(),
            project.tasks.len()
        )));
    }

    if project.goals.is_empty() {
        project.goals = goals.to_vec();
    }

    Ok(project)
}
