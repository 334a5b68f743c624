//! Dispatch command - run a workflow at a branch or tag.

use anyhow::{Result, anyhow};
use clap::Args;
use console::{Style, style};
use gantry_dispatch::{DispatchError, DispatchRequest, SuppliedInputs};
use gantry_types::{Job, Run};
use serde::Serialize;

use super::Context;

/// Arguments for the dispatch command.
#[derive(Args, Debug)]
pub struct DispatchArgs {
    /// Repository name from the config
    pub repo: String,

    /// Workflow file name (e.g. build.yml)
    pub workflow: String,

    /// Branch or tag to run against
    #[arg(short = 'r', long = "ref")]
    pub git_ref: String,

    /// Workflow input as name=value (repeatable)
    #[arg(short, long = "input", value_name = "NAME=VALUE")]
    pub inputs: Vec<String>,
}

#[derive(Serialize)]
struct DispatchOutput<'a> {
    run: &'a Run,
    jobs: &'a [Job],
    superseded: &'a [i64],
}

/// Run the dispatch command.
pub async fn run(args: DispatchArgs, ctx: &Context) -> Result<()> {
    let inputs = SuppliedInputs::parse_pairs(&args.inputs).map_err(|e| anyhow!(e))?;
    let doer = ctx.user()?;
    let (repo, git) = ctx.repository(&args.repo)?;
    let service = ctx.service()?;

    let outcome = service
        .dispatch(DispatchRequest {
            doer: &doer,
            repo: &repo,
            git: &git,
            workflow_id: &args.workflow,
            ref_name: &args.git_ref,
            inputs: &inputs,
        })
        .await
        .map_err(|e| describe_error(e, ctx))?;

    if ctx.json_output {
        let output = DispatchOutput {
            run: &outcome.run,
            jobs: &outcome.jobs,
            superseded: outcome.superseded.cancelled(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    let run = &outcome.run;
    println!(
        "{} {} #{} {}",
        style("✓").green(),
        style(&run.workflow_id).bold(),
        run.index,
        dim.apply_to(format!("(run {})", run.id))
    );
    println!("  {} {}", dim.apply_to("title: "), run.title);
    println!("  {} {}", dim.apply_to("ref:   "), run.ref_name);
    println!("  {} {}", dim.apply_to("commit:"), run.commit_sha);
    println!();
    for job in &outcome.jobs {
        println!(
            "  {} {} {}",
            style(job.status.as_str()).cyan(),
            job.name,
            dim.apply_to(format!("[{}]", job.runs_on.join(", ")))
        );
    }

    let superseded = outcome.superseded.cancelled();
    if !superseded.is_empty() {
        println!();
        println!(
            "{}",
            dim.apply_to(format!("Cancelled superseded runs: {superseded:?}"))
        );
    }

    Ok(())
}

fn describe_error(err: DispatchError, ctx: &Context) -> anyhow::Error {
    if ctx.verbose
        && let Some(locale) = err.locale()
    {
        let dim = Style::new().dim();
        eprintln!(
            "{}",
            dim.apply_to(format!("locale: {} {:?}", locale.key, locale.args))
        );
    }
    anyhow!("{} ({})", err, err.kind())
}
