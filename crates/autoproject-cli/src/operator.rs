//! Console operator - prints task progress and waits for the user after
//! every task

use async_trait::async_trait;
use console::style;
use dialoguer::Input;

use autoproject_core::{Error, Operator, Result, Task};

pub struct ConsoleOperator;

#[async_trait]
impl Operator for ConsoleOperator {
    fn task_started(&self, task: &Task) {
        println!();
        println!("{} {}", style("Task:").bold(), style(&task.title).cyan());
        println!("{}: {}", style(&task.assigned_to.role).bold().yellow(), task.instructions);
    }

    fn task_response(&self, task: &Task, response: Option<&str>) {
        match response {
            Some(text) => println!("{}: {}", style(&task.assigned_to.name).bold().green(), text),
            None => println!("{}", style(format!("{} did not answer.", task.assigned_to.name)).dim()),
        }
    }

    async fn confirm(&self, task: &Task) -> Result<String> {
        tracing::debug!("Waiting for operator on task '{}'", task.title);

        // dialoguer blocks on the terminal
        let reply = tokio::task::spawn_blocking(|| {
            Input::<String>::new()
                .with_prompt(">")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|e| Error::Operator(format!("Prompt task failed: {}", e)))?
        .map_err(|e| Error::Operator(e.to_string()))?;

        Ok(reply)
    }
}
