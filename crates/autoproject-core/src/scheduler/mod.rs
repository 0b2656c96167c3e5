//! Task scheduler - runs a project's task graph to completion
//!
//! Tasks run one at a time in declared order as soon as every task they
//! depend on is done. Each task is posted to the shared conversation, run on
//! its assistant's remote identity with the task's tools, reviewed by the
//! operator, and only then marked done.

mod graph;

pub use graph::check_graph;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::agents::{AgentDirectory, AgentService, AgentSettings};
use crate::conversation::{Conversation, ThreadService};
use crate::error::{Error, Result};
use crate::project::{Project, Task};
use crate::run::{RunRequest, RunService, ToolBridge};
use crate::tools::ToolRegistry;

/// The human in the loop.
///
/// `confirm` is the checkpoint after every task: the scheduler is suspended
/// until it returns, and the task is marked done only when it returns `Ok`.
/// An empty reply still counts as confirmation.
#[async_trait]
pub trait Operator: Send + Sync {
    /// A task is about to start
    fn task_started(&self, task: &Task);

    /// The agent's answer, or `None` when the thread's latest message is not
    /// an agent message
    fn task_response(&self, task: &Task, response: Option<&str>);

    async fn confirm(&self, task: &Task) -> Result<String>;
}

/// Record of one completed task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskOutcome {
    pub title: String,
    pub assistant: String,
    pub response: Option<String>,
    pub operator_reply: String,
}

/// Result of a full project execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub thread_id: String,
    /// Completed tasks in completion order
    pub outcomes: Vec<TaskOutcome>,
}

/// Executes projects against the remote agent service
pub struct Scheduler {
    agents: Arc<dyn AgentService>,
    threads: Arc<dyn ThreadService>,
    runs: Arc<dyn RunService>,
    registry: ToolRegistry,
    operator: Arc<dyn Operator>,
    settings: AgentSettings,
}

impl Scheduler {
    pub fn new(
        agents: Arc<dyn AgentService>,
        threads: Arc<dyn ThreadService>,
        runs: Arc<dyn RunService>,
        registry: ToolRegistry,
        operator: Arc<dyn Operator>,
    ) -> Self {
        Self {
            agents,
            threads,
            runs,
            registry,
            operator,
            settings: AgentSettings::default(),
        }
    }

    /// Model settings for reconciled agents
    pub fn with_agent_settings(mut self, settings: AgentSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Drive every task of `project` to done.
    ///
    /// Tasks already marked done are treated as satisfied. On error the
    /// in-flight task stays not done.
    pub async fn execute(&self, project: &mut Project) -> Result<ExecutionReport> {
        check_graph(project)?;
        for task in project.tasks.iter().filter(|t| !t.done) {
            self.registry.scoped(task.functions.as_slice())?;
        }

        let mut directory = AgentDirectory::new(&project.reference, self.settings.clone());
        directory.reconcile_all(self.agents.as_ref(), project).await?;

        let conversation = Conversation::open(Arc::clone(&self.threads)).await?;
        conversation.post(&kickoff_message(project)).await?;

        let index: HashMap<String, usize> = project
            .tasks
            .iter()
            .enumerate()
            .map(|(i, task)| (task.title.clone(), i))
            .collect();

        let mut outcomes = Vec::new();

        while !project.is_complete() {
            let mut progressed = 0;

            for i in 0..project.tasks.len() {
                if project.tasks[i].done || !is_ready(&project.tasks, &index, i)? {
                    continue;
                }

                let outcome = self
                    .run_task(&mut directory, &conversation, &project.tasks[i])
                    .await?;
                project.tasks[i].done = true;
                info!("Task '{}' done", project.tasks[i].title);
                outcomes.push(outcome);
                progressed += 1;
            }

            check_progress(&project.tasks, progressed)?;
        }

        Ok(ExecutionReport {
            thread_id: conversation.thread_id().to_string(),
            outcomes,
        })
    }

    async fn run_task(
        &self,
        directory: &mut AgentDirectory,
        conversation: &Conversation,
        task: &Task,
    ) -> Result<TaskOutcome> {
        let assistant = &task.assigned_to;
        self.operator.task_started(task);
        info!("Starting task '{}' for {}", task.title, assistant.name);

        let bridge = ToolBridge::new(self.registry.scoped(task.functions.as_slice())?);
        let agent = directory.identity_for(self.agents.as_ref(), assistant).await?;

        conversation.post(&task.instructions).await?;

        let request = RunRequest {
            thread_id: conversation.thread_id().to_string(),
            agent_id: agent.id.clone(),
            additional_instructions: Some(format!("{}, please {}", assistant.name, task.instructions)),
            tools: bridge.definitions(),
        };
        let run = self.runs.create_and_poll(&request).await?;
        let run = bridge.drive(self.runs.as_ref(), run).await?;
        debug!("Run {} for task '{}' completed", run.id, task.title);

        let response = conversation.latest_response().await?;
        self.operator.task_response(task, response.as_deref());

        let operator_reply = self.operator.confirm(task).await?;

        Ok(TaskOutcome {
            title: task.title.clone(),
            assistant: assistant.name.clone(),
            response,
            operator_reply,
        })
    }
}

fn is_ready(tasks: &[Task], index: &HashMap<String, usize>, i: usize) -> Result<bool> {
    let task = &tasks[i];
    for dependency in &task.depends_on {
        let j = index.get(dependency).ok_or_else(|| Error::UndefinedDependency {
            task: task.title.clone(),
            dependency: dependency.clone(),
        })?;
        if !tasks[*j].done {
            return Ok(false);
        }
    }
    Ok(true)
}

/// A pass that finished nothing while tasks remain can never finish them
fn check_progress(tasks: &[Task], progressed: usize) -> Result<()> {
    if progressed > 0 {
        return Ok(());
    }
    let pending: Vec<String> = tasks
        .iter()
        .filter(|t| !t.done)
        .map(|t| t.title.clone())
        .collect();
    if pending.is_empty() {
        Ok(())
    } else {
        Err(Error::Stalled(pending))
    }
}

fn kickoff_message(project: &Project) -> String {
    format!(
        "I would like to complete project {} with goals {:?}.",
        project.reference, project.goals
    )
}
