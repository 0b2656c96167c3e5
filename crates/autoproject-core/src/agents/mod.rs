//! Agent directory
//!
//! Maps logical [`Assistant`] roles onto persistent remote agent identities.
//! Each assistant of a project owns exactly one remote identity, keyed by the
//! deterministic name `"{reference}-{name}-{role}"`. Reconciliation is an
//! upsert: an identity with that name is updated in place, otherwise one is
//! created. Re-running a saved project therefore never duplicates agents.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::ModelConfig;
use crate::error::Result;
use crate::project::{Assistant, Project};

/// A persistent agent identity hosted by the remote service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAgent {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
}

/// Fields written on create and update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParams {
    pub name: String,
    pub description: String,
    pub instructions: String,
    pub model: String,
    pub temperature: f32,
}

/// Model settings applied to every reconciled agent
pub type AgentSettings = ModelConfig;

/// Remote agent-management interface
#[async_trait]
pub trait AgentService: Send + Sync {
    /// Every identity visible to this account
    async fn list_agents(&self) -> Result<Vec<RemoteAgent>>;

    async fn create_agent(&self, params: &AgentParams) -> Result<RemoteAgent>;

    async fn update_agent(&self, id: &str, params: &AgentParams) -> Result<RemoteAgent>;
}

/// Deterministic remote name for an assistant of a project
pub fn agent_name(reference: &str, assistant: &Assistant) -> String {
    format!("{}-{}-{}", reference, assistant.name, assistant.role)
}

/// Parameters an assistant's remote identity should carry
pub fn agent_params(reference: &str, assistant: &Assistant, settings: &AgentSettings) -> AgentParams {
    AgentParams {
        name: agent_name(reference, assistant),
        description: format!("{} for project {}.", assistant.role, reference),
        instructions: format!(
            "Your name is {}. You are a {}. {}",
            assistant.name, assistant.role, assistant.instructions
        ),
        model: settings.model.clone(),
        temperature: settings.temperature,
    }
}

/// Create or update the remote identity for `assistant`
pub async fn reconcile(
    service: &dyn AgentService,
    assistant: &Assistant,
    reference: &str,
    settings: &AgentSettings,
) -> Result<RemoteAgent> {
    let params = agent_params(reference, assistant, settings);
    let existing = service
        .list_agents()
        .await?
        .into_iter()
        .find(|agent| agent.name == params.name);

    match existing {
        Some(agent) => {
            debug!("Updating agent {} ({})", params.name, agent.id);
            service.update_agent(&agent.id, &params).await
        }
        None => {
            debug!("Creating agent {}", params.name);
            service.create_agent(&params).await
        }
    }
}

/// Reconciled identities for one project execution, keyed by remote name
#[derive(Debug, Clone)]
pub struct AgentDirectory {
    reference: String,
    settings: AgentSettings,
    agents: HashMap<String, RemoteAgent>,
}

impl AgentDirectory {
    pub fn new(reference: impl Into<String>, settings: AgentSettings) -> Self {
        Self {
            reference: reference.into(),
            settings,
            agents: HashMap::new(),
        }
    }

    /// Reconcile every assistant declared by the project, in order
    pub async fn reconcile_all(&mut self, service: &dyn AgentService, project: &Project) -> Result<()> {
        for assistant in &project.assistants {
            info!(
                "Creating/updating assistant {} with role {} for project {}",
                assistant.name, assistant.role, self.reference
            );
            self.reconcile(service, assistant).await?;
        }
        Ok(())
    }

    /// Reconcile one assistant and remember its identity
    pub async fn reconcile(&mut self, service: &dyn AgentService, assistant: &Assistant) -> Result<RemoteAgent> {
        let agent = reconcile(service, assistant, &self.reference, &self.settings).await?;
        self.agents.insert(agent_name(&self.reference, assistant), agent.clone());
        Ok(agent)
    }

    /// The identity for `assistant`, reconciling it first if this run has
    /// not seen it yet
    pub async fn identity_for(
        &mut self,
        service: &dyn AgentService,
        assistant: &Assistant,
    ) -> Result<RemoteAgent> {
        match self.get(assistant) {
            Some(agent) => Ok(agent.clone()),
            None => self.reconcile(service, assistant).await,
        }
    }

    pub fn get(&self, assistant: &Assistant) -> Option<&RemoteAgent> {
        self.agents.get(&agent_name(&self.reference, assistant))
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}
