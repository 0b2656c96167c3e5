//! Autoproject CLI
//!
//! Turns goals into a project plan (or loads a saved one), then runs every
//! task with remote assistants, pausing for the user after each task.

mod operator;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use console::style;

use autoproject_core::{create_standard_registry, ConfigManager, OpenAiClient, Planner, Project, Scheduler};
use operator::ConsoleOperator;

#[derive(Parser)]
#[command(name = "autoproject")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Create a project plan and execute it with AI assistants", long_about = None)]
struct Cli {
    /// Load a saved project by name instead of planning
    #[arg(short, long, value_name = "NAME")]
    load: Option<String>,

    /// Save the planned project under this name before execution
    #[arg(short, long, value_name = "NAME")]
    save: Option<String>,

    /// Path to the config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// The goals for the project
    goals: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Keep the operator prompt readable unless asked for more
    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose {
            "info,autoproject_core=debug"
        } else {
            "warn"
        })
        .init();

    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    }
    .context("Failed to load configuration")?;
    let config = manager
        .into_effective()
        .context("Invalid environment override")?;

    let client = OpenAiClient::new(&config.openai, config.run.clone())?;
    let registry = create_standard_registry(&config);

    let mut project = match &cli.load {
        Some(name) => {
            let path = config.general.project_path(name);
            println!("Loading project from {}", path.display());
            Project::load(&path).with_context(|| format!("Failed to load project {}", name))?
        }
        None => {
            if cli.goals.is_empty() {
                bail!("No goals given. Pass goals as arguments or use --load NAME.");
            }

            let planner = Planner::new(client.clone(), config.planner.clone());
            let project = planner
                .plan(&cli.goals, &registry.function_list())
                .await
                .context("Failed to create project plan")?;

            if let Some(name) = &cli.save {
                let path = config.general.project_path(name);
                println!("Saving project to {}", path.display());
                project
                    .save(&path)
                    .with_context(|| format!("Failed to save project {}", name))?;
            }
            project
        }
    };

    print_project(&project);

    let client = Arc::new(client);
    let scheduler = Scheduler::new(
        client.clone(),
        client.clone(),
        client,
        registry,
        Arc::new(ConsoleOperator),
    )
    .with_agent_settings(config.assistant.clone());

    let report = scheduler.execute(&mut project).await?;
    tracing::info!(
        "Project {} finished on thread {} ({} tasks)",
        project.reference,
        report.thread_id,
        report.outcomes.len()
    );

    println!();
    println!("{}", style("All tasks are done!").bold().green());
    Ok(())
}

fn print_project(project: &Project) {
    println!();
    println!("{} {}", style("Project:").bold(), style(&project.reference).cyan());
    for goal in &project.goals {
        println!("  {} {}", style("goal").dim(), goal);
    }

    println!("{}", style("Assistants:").bold());
    for assistant in &project.assistants {
        println!("  {} ({})", style(&assistant.name).green(), assistant.role);
    }

    println!("{}", style("Tasks:").bold());
    for task in &project.tasks {
        let marker = if task.done { style("[x]").green() } else { style("[ ]").dim() };
        println!("  {} {} - {}", marker, style(&task.title).yellow(), task.assigned_to.name);
        if !task.depends_on.is_empty() {
            println!("      {} {}", style("after").dim(), task.depends_on.join(", "));
        }
        if !task.functions.is_empty() {
            println!("      {} {}", style("uses").dim(), task.functions.join(", "));
        }
    }

    if !project.requirements.is_empty() {
        println!("{}", style("Requirements:").bold());
        for requirement in &project.requirements {
            println!("  {}: {}", style(&requirement.title).magenta(), requirement.description);
        }
    }
}
