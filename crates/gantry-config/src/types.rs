//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [store]                  # run/job database
//! [workflows]              # where workflow files live inside a repository
//! [user]                   # identity recorded as the triggering user
//! [repositories.widgets]   # named repositories
//! [logging]                # console filter and log directory
//! [server]                 # base URL rendered into workflow contexts
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Workflow directories searched when none are configured.
pub const DEFAULT_WORKFLOW_DIRS: &[&str] = &[".gitea/workflows", ".github/workflows"];

/// Base URL used when `[server] url` is unset.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:3000";

/// Default database filename inside the data directory.
const DEFAULT_DB_FILE: &str = "gantry.db";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g., project-local
/// overrides) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GantryConfig {
    /// Run/job store configuration.
    pub store: Option<StoreConfig>,

    /// Workflow discovery configuration.
    pub workflows: Option<WorkflowsConfig>,

    /// Triggering user.
    pub user: Option<UserConfig>,

    /// Named repositories.
    pub repositories: BTreeMap<String, RepositoryConfig>,

    /// Logging configuration.
    pub logging: Option<LoggingConfig>,

    /// Server identity.
    pub server: Option<ServerConfig>,
}

impl GantryConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    pub fn merge(&mut self, other: GantryConfig) {
        if other.store.is_some() {
            self.store = other.store;
        }

        if other.workflows.is_some() {
            self.workflows = other.workflows;
        }

        if other.user.is_some() {
            self.user = other.user;
        }

        for (name, repo) in other.repositories {
            self.repositories.insert(name, repo);
        }

        if other.logging.is_some() {
            self.logging = other.logging;
        }

        if other.server.is_some() {
            self.server = other.server;
        }
    }

    /// Database path, falling back to the platform data directory.
    pub fn store_path(&self) -> PathBuf {
        if let Some(path) = self.store.as_ref().and_then(|s| s.path.clone()) {
            return path;
        }
        dirs::data_dir()
            .map(|d| d.join("gantry").join(DEFAULT_DB_FILE))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE))
    }

    /// Directories searched for workflow files, in priority order.
    pub fn workflow_dirs(&self) -> Vec<String> {
        match &self.workflows {
            Some(w) if !w.dirs.is_empty() => w.dirs.clone(),
            _ => DEFAULT_WORKFLOW_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }

    /// Base URL of the forge, without a trailing slash.
    pub fn server_url(&self) -> String {
        self.server
            .as_ref()
            .and_then(|s| s.url.as_deref())
            .unwrap_or(DEFAULT_SERVER_URL)
            .trim_end_matches('/')
            .to_string()
    }

    /// Look up a named repository.
    pub fn repository(&self, name: &str) -> crate::Result<&RepositoryConfig> {
        self.repositories
            .get(name)
            .ok_or_else(|| ConfigError::RepositoryNotFound(name.to_string()))
    }

    /// The configured triggering user.
    pub fn user(&self) -> crate::Result<&UserConfig> {
        self.user.as_ref().ok_or_else(|| ConfigError::MissingField {
            field: "user".to_string(),
            context: "config".to_string(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Store configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite database path.
    pub path: Option<PathBuf>,
}

/// Workflow discovery section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowsConfig {
    /// Directories (relative to the repository root) holding workflow files.
    /// The first directory that exists at a commit wins.
    pub dirs: Vec<String>,
}

/// The user recorded as having triggered CLI dispatches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserConfig {
    pub id: i64,
    pub login: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub email: String,
}

/// A repository the CLI can dispatch against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryConfig {
    /// Path to the git repository on disk.
    pub path: PathBuf,
    pub id: i64,
    pub owner: String,
    #[serde(default)]
    pub owner_id: i64,
    /// Repository name; defaults to the config key.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: String,
    /// Overrides the branch HEAD points at.
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub private: bool,
}

/// Logging configuration section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Console `EnvFilter` directive, e.g. `gantry=debug,info`.
    pub filter: Option<String>,
    /// Directory for the rolling JSON log.
    pub dir: Option<PathBuf>,
}

/// Server section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Public base URL, e.g. `https://git.example.com`.
    pub url: Option<String>,
}
