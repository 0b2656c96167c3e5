//! Project model
//!
//! A project is the aggregate produced by the planner: the assistants that
//! will do the work, the tasks they are assigned and any requirements the
//! planner could not cover. It is persisted as a single JSON document.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Logical assistant role, mapped onto a remote agent identity at run time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assistant {
    pub name: String,
    pub role: String,
    pub instructions: String,
    #[serde(default)]
    pub tools: Vec<String>,
}

impl Assistant {
    pub fn new(
        name: impl Into<String>,
        role: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            instructions: instructions.into(),
            tools: Vec::new(),
        }
    }
}

/// A capability the planner decided the project needs but cannot provide
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    pub title: String,
    pub description: String,
}

/// Unit of work assigned to an assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub title: String,
    pub instructions: String,
    pub assigned_to: Assistant,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub functions: Vec<String>,
}

impl Task {
    pub fn new(
        title: impl Into<String>,
        instructions: impl Into<String>,
        assigned_to: Assistant,
    ) -> Self {
        Self {
            title: title.into(),
            instructions: instructions.into(),
            assigned_to,
            done: false,
            depends_on: Vec::new(),
            functions: Vec::new(),
        }
    }

    pub fn with_dependency(mut self, title: impl Into<String>) -> Self {
        self.depends_on.push(title.into());
        self
    }

    pub fn with_function(mut self, name: impl Into<String>) -> Self {
        self.functions.push(name.into());
        self
    }
}

/// Aggregate root for one planned project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identifier used to namespace remote agent identities
    pub reference: String,
    pub goals: Vec<String>,
    pub assistants: Vec<Assistant>,
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub requirements: Vec<Requirement>,
}

impl Project {
    pub fn new(reference: impl Into<String>, goals: Vec<String>) -> Self {
        Self {
            reference: reference.into(),
            goals,
            assistants: Vec::new(),
            tasks: Vec::new(),
            requirements: Vec::new(),
        }
    }

    /// Parse and validate a project document
    pub fn from_json(json: &str) -> Result<Self> {
        let project: Project = serde_json::from_str(json)
            .map_err(|e| Error::InvalidProject(e.to_string()))?;
        project.validate()?;
        Ok(project)
    }

    /// Serialize as pretty JSON indented with four spaces
    pub fn to_json(&self) -> Result<String> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(buf).map_err(|e| Error::InvalidProject(e.to_string()))
    }

    /// Load a project from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let project = Self::from_json(&content).map_err(|e| match e {
            Error::InvalidProject(msg) => {
                Error::InvalidProject(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })?;
        debug!(
            "Loaded project {} from {} ({} tasks)",
            project.reference,
            path.display(),
            project.tasks.len()
        );
        Ok(project)
    }

    /// Save the project to a JSON file, creating the parent directory
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        debug!("Saved project {} to {}", self.reference, path.display());
        Ok(())
    }

    /// Structural checks that do not depend on the dependency graph
    pub fn validate(&self) -> Result<()> {
        if self.reference.trim().is_empty() {
            return Err(Error::InvalidProject("reference must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.title.as_str()) {
                return Err(Error::DuplicateTask(task.title.clone()));
            }
        }

        Ok(())
    }

    pub fn task(&self, title: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.title == title)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.done).count()
    }

    pub fn is_complete(&self) -> bool {
        self.pending_count() == 0
    }
}
