//! Config command - configuration management.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use gantry_config::{
    DEFAULT_WORKFLOW_DIRS, GantryConfig, StoreConfig, UserConfig, WorkflowsConfig,
};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show the resolved configuration
    Show,

    /// Show which config files are loaded and their precedence
    Which,

    /// Write a starter config file
    Init {
        /// Write ./gantry.toml instead of the user config file
        #[arg(long)]
        project: bool,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },

    /// Show the user configuration file path
    Path,
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Which => cmd_which(ctx),
        ConfigCommand::Init { project, force } => cmd_init(project, force, ctx),
        ConfigCommand::Path => cmd_path(ctx),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let config = &ctx.loaded.config;
    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", style("Resolved configuration").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    println!("store:          {}", config.store_path().display());
    println!("server:         {}", config.server_url());
    println!("workflow dirs:  {}", config.workflow_dirs().join(", "));
    match &config.user {
        Some(user) => println!("user:           {} ({})", user.login, user.id),
        None => println!("user:           {}", dim.apply_to("(not set)")),
    }
    if config.repositories.is_empty() {
        println!("repositories:   {}", dim.apply_to("(none)"));
    } else {
        println!("repositories:");
        for (name, repo) in &config.repositories {
            println!("  {:<14}{}", name, dim.apply_to(repo.path.display()));
        }
    }
    Ok(())
}

fn cmd_which(ctx: &Context) -> Result<()> {
    let sources = &ctx.loaded.sources;
    if ctx.json_output {
        let output: Vec<_> = sources
            .iter()
            .map(|s| {
                serde_json::json!({
                    "layer": s.layer.to_string(),
                    "path": s.path,
                    "loaded": s.loaded,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let dim = Style::new().dim();
    println!("{}", dim.apply_to("Lowest precedence first"));
    for source in sources {
        let marker = if source.loaded {
            style("loaded").green()
        } else {
            style("missing").dim()
        };
        println!(
            "  {:<8} {:<8} {}",
            dim.apply_to(source.layer),
            marker,
            source.path.display()
        );
    }
    for warning in &ctx.loaded.warnings {
        println!("  {} {}", style("warning:").yellow(), warning);
    }
    Ok(())
}

fn cmd_init(project: bool, force: bool, ctx: &Context) -> Result<()> {
    let path = if project {
        gantry_config::project_config_path(&std::env::current_dir()?)
    } else {
        gantry_config::user_config_path()
            .ok_or_else(|| anyhow::anyhow!("could not determine the config directory"))?
    };
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to replace it",
            path.display()
        );
    }

    let starter = GantryConfig {
        store: Some(StoreConfig {
            path: Some(ctx.loaded.config.store_path()),
        }),
        workflows: Some(WorkflowsConfig {
            dirs: DEFAULT_WORKFLOW_DIRS.iter().map(|d| d.to_string()).collect(),
        }),
        user: Some(UserConfig {
            id: 1,
            login: whoami(),
            full_name: String::new(),
            email: String::new(),
        }),
        ..GantryConfig::new()
    };
    gantry_config::save_config(&starter, &path)?;
    tracing::info!(path = %path.display(), "wrote starter config");

    if ctx.json_output {
        println!("{}", serde_json::json!({ "path": path }));
    } else {
        println!("{} wrote {}", style("✓").green(), path.display());
    }
    Ok(())
}

fn whoami() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "gantry".to_string())
}

fn cmd_path(ctx: &Context) -> Result<()> {
    match gantry_config::user_config_path() {
        Some(path) if ctx.json_output => {
            println!("{}", serde_json::json!({ "path": path }));
        }
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("could not determine the config directory"),
    }
    Ok(())
}
