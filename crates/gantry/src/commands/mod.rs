//! CLI command handlers.

pub mod config;
pub mod dispatch;
pub mod runs;
pub mod workflows;

use std::sync::Arc;

use anyhow::{Context as _, Result};
use console::Style;
use gantry_config::LoadedConfig;
use gantry_dispatch::{DispatchConfig, DispatchService, LogNotifier};
use gantry_git::Git2Repository;
use gantry_store::SqliteStore;
use gantry_types::{Repository, User};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// Resolved configuration and where it came from.
    pub loaded: LoadedConfig,
}

impl Context {
    /// Open the run store and build a dispatch service over it.
    pub fn service(&self) -> Result<DispatchService> {
        let config = &self.loaded.config;
        let path = config.store_path();
        if self.verbose {
            let dim = Style::new().dim();
            eprintln!("{}", dim.apply_to(format!("Store: {}", path.display())));
        }
        let store = SqliteStore::open(&path)
            .with_context(|| format!("opening store at {}", path.display()))?;
        Ok(DispatchService::new(
            Arc::new(store),
            Arc::new(LogNotifier),
            DispatchConfig::from(config),
        ))
    }

    /// A configured repository plus a handle on its git data.
    pub fn repository(&self, name: &str) -> Result<(Repository, Git2Repository)> {
        let rc = self.loaded.config.repository(name)?;
        let git = Git2Repository::open(&rc.path)
            .with_context(|| format!("opening repository at {}", rc.path.display()))?;
        let repo = Repository {
            id: rc.id,
            owner_id: rc.owner_id,
            owner_name: rc.owner.clone(),
            name: rc.name.clone().unwrap_or_else(|| name.to_string()),
            description: rc.description.clone(),
            default_branch: rc.default_branch.clone().unwrap_or_default(),
            is_private: rc.private,
        };
        Ok((repo, git))
    }

    /// The configured triggering user.
    pub fn user(&self) -> Result<User> {
        let uc = self.loaded.config.user()?;
        Ok(User {
            id: uc.id,
            login: uc.login.clone(),
            full_name: uc.full_name.clone(),
            email: uc.email.clone(),
        })
    }
}
