//! Runs command - inspect recorded runs.

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use console::{Style, style};

use super::Context;

/// Arguments for the runs command.
#[derive(Args, Debug)]
pub struct RunsArgs {
    #[command(subcommand)]
    pub command: RunsCommand,
}

#[derive(Subcommand, Debug)]
pub enum RunsCommand {
    /// List the most recent runs of a repository
    List {
        /// Repository name from the config
        repo: String,

        /// Maximum runs to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Show the jobs of a run
    Jobs {
        /// Run ID
        run_id: i64,
    },
}

/// Run the runs command.
pub async fn run(args: RunsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        RunsCommand::List { repo, limit } => cmd_list(&repo, limit, ctx),
        RunsCommand::Jobs { run_id } => cmd_jobs(run_id, ctx),
    }
}

fn cmd_list(name: &str, limit: usize, ctx: &Context) -> Result<()> {
    let (repo, _) = ctx.repository(name)?;
    let runs = ctx
        .service()?
        .list_runs(&repo, limit)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&runs)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    if runs.is_empty() {
        println!("{}", dim.apply_to("No runs yet"));
        return Ok(());
    }

    for run in &runs {
        println!(
            "{} {:<10} {:<20} {} {}",
            style(format!("#{}", run.index)).cyan(),
            run.status.as_str(),
            run.workflow_id,
            run.ref_short_name(),
            dim.apply_to(&run.title)
        );
    }
    Ok(())
}

fn cmd_jobs(run_id: i64, ctx: &Context) -> Result<()> {
    let jobs = ctx
        .service()?
        .run_jobs(run_id)
        .map_err(|e| anyhow!("{} ({})", e, e.kind()))?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&jobs)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    for job in &jobs {
        let needs = if job.needs.is_empty() {
            String::new()
        } else {
            format!(" needs {}", job.needs.join(", "))
        };
        println!(
            "  {:<10} {}{}",
            job.status.as_str(),
            job.name,
            dim.apply_to(needs)
        );
    }
    Ok(())
}
