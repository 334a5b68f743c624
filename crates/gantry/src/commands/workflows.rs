//! Workflows command - list, enable and disable workflows.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::{Style, style};

use super::Context;

/// Arguments for the workflows command.
#[derive(Args, Debug)]
pub struct WorkflowsArgs {
    #[command(subcommand)]
    pub command: WorkflowsCommand,
}

#[derive(Subcommand, Debug)]
pub enum WorkflowsCommand {
    /// List workflows at the default branch
    List {
        /// Repository name from the config
        repo: String,
    },

    /// Allow a workflow to be dispatched again
    Enable {
        /// Repository name from the config
        repo: String,
        /// Workflow file name
        workflow: String,
    },

    /// Refuse further dispatches of a workflow
    Disable {
        /// Repository name from the config
        repo: String,
        /// Workflow file name
        workflow: String,
    },
}

/// Run the workflows command.
pub async fn run(args: WorkflowsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        WorkflowsCommand::List { repo } => cmd_list(&repo, ctx),
        WorkflowsCommand::Enable { repo, workflow } => cmd_set_enabled(&repo, &workflow, true, ctx),
        WorkflowsCommand::Disable { repo, workflow } => {
            cmd_set_enabled(&repo, &workflow, false, ctx)
        }
    }
}

fn cmd_list(name: &str, ctx: &Context) -> Result<()> {
    let (repo, git) = ctx.repository(name)?;
    let service = ctx.service()?;
    let workflows = service
        .list_workflows(&repo, &git)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&workflows)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if workflows.is_empty() {
        println!("{}", dim.apply_to("No workflows found"));
        return Ok(());
    }

    println!("{}", style(format!("Workflows in {}", repo.full_name())).bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    for wf in &workflows {
        let state = if wf.disabled {
            style("disabled").red()
        } else if wf.dispatchable {
            style("dispatchable").green()
        } else {
            style("no trigger").yellow()
        };
        println!(
            "  {:<24} {} {}",
            wf.id,
            state,
            dim.apply_to(wf.name.as_deref().unwrap_or(""))
        );
    }
    Ok(())
}

fn cmd_set_enabled(name: &str, workflow: &str, enabled: bool, ctx: &Context) -> Result<()> {
    let (repo, git) = ctx.repository(name)?;
    let service = ctx.service()?;
    service
        .set_workflow_enabled(&repo, &git, workflow, enabled)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;

    if ctx.json_output {
        let output = serde_json::json!({ "workflow": workflow, "enabled": enabled });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        let verb = if enabled { "Enabled" } else { "Disabled" };
        println!("{} {} {}", style("✓").green(), verb, style(workflow).bold());
    }
    Ok(())
}
