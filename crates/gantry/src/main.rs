//! Gantry - workflow dispatch for git repositories
//!
//! Main entry point for the Gantry CLI.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use gantry_config::{Discovery, GantryConfig};

mod commands;

use commands::{config, dispatch, runs, workflows};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Gantry - workflow dispatch for git repositories
#[derive(Parser)]
#[command(name = "gantry")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Use this config file instead of discovering one
    #[arg(long, global = true, env = "GANTRY_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Dispatch a workflow at a branch or tag
    Dispatch(dispatch::DispatchArgs),

    /// List, enable and disable workflows
    Workflows(workflows::WorkflowsArgs),

    /// Inspect recorded runs
    Runs(runs::RunsArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Discovery::new()
        .explicit(cli.config.clone())
        .load()
        .context("loading configuration")?;

    // Console (human-readable) + rotating JSON file
    let _guard = init_tracing(&loaded.config, cli.verbose);
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let ctx = commands::Context {
        json_output: cli.json,
        verbose: cli.verbose,
        loaded,
    };

    match cli.command {
        Commands::Dispatch(args) => dispatch::run(args, &ctx).await,
        Commands::Workflows(args) => workflows::run(args, &ctx).await,
        Commands::Runs(args) => runs::run(args, &ctx).await,
        Commands::Config(args) => config::run(args, &ctx).await,
    }
}

fn init_tracing(
    config: &GantryConfig,
    verbose: bool,
) -> tracing_appender::non_blocking::WorkerGuard {
    let logging = config.logging.clone().unwrap_or_default();
    let filter = match logging.filter {
        Some(filter) => filter,
        None if verbose => {
            "gantry=debug,gantry_dispatch=debug,gantry_store=debug,gantry_workflow=debug,info"
                .to_string()
        }
        None => "gantry=info,gantry_dispatch=info,warn".to_string(),
    };

    let log_dir = logging
        .dir
        .or_else(|| gantry_config::user_config_dir().map(|d| d.join("logs")))
        .unwrap_or_else(|| PathBuf::from("logs"));
    let file_appender = tracing_appender::rolling::daily(&log_dir, "gantry.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    use tracing_subscriber::prelude::*;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(tracing_subscriber::EnvFilter::new(filter)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_filter(tracing_subscriber::EnvFilter::new(
                    "gantry=trace,gantry_dispatch=trace,gantry_store=trace,gantry_workflow=trace,gantry_git=trace,info",
                )),
        )
        .init();

    guard
}
