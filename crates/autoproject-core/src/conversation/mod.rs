//! Conversation channel
//!
//! One remote thread per project execution. Every task posts into it and
//! every run reads from it, so agents see the whole history of the project.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

/// A message stored in a remote thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
}

/// Remote conversation-thread interface
#[async_trait]
pub trait ThreadService: Send + Sync {
    /// Create an empty thread, returning its id
    async fn create_thread(&self) -> Result<String>;

    async fn add_message(&self, thread_id: &str, role: MessageRole, content: &str) -> Result<ThreadMessage>;

    /// Most recently inserted message, if any
    async fn latest_message(&self, thread_id: &str) -> Result<Option<ThreadMessage>>;
}

/// The shared thread of one project execution
pub struct Conversation {
    service: Arc<dyn ThreadService>,
    thread_id: String,
}

impl Conversation {
    /// Create a fresh thread
    pub async fn open(service: Arc<dyn ThreadService>) -> Result<Self> {
        let thread_id = service.create_thread().await?;
        debug!("Opened thread {}", thread_id);
        Ok(Self { service, thread_id })
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    /// Append a user message
    pub async fn post(&self, text: &str) -> Result<()> {
        self.service
            .add_message(&self.thread_id, MessageRole::User, text)
            .await?;
        Ok(())
    }

    /// Text of the latest message when an agent wrote it.
    ///
    /// A user message at the head of the thread means the agent did not
    /// answer; that is reported as `None`, never as a response.
    pub async fn latest_response(&self) -> Result<Option<String>> {
        let latest = self.service.latest_message(&self.thread_id).await?;
        Ok(latest
            .filter(|message| message.role == MessageRole::Assistant)
            .map(|message| message.content))
    }
}
