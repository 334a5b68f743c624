//! Locating and layering config files.
//!
//! Layers, lowest precedence first:
//! 1. user: `config.toml` in `$GANTRY_CONFIG_DIR`, or in the platform
//!    config directory under `gantry/`
//! 2. project: `gantry.toml` in the working directory
//!
//! An explicit file (the CLI's `--config`) replaces discovery entirely and,
//! unlike discovered layers, must exist and parse.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::{ConfigError, GantryConfig, Result};

const PROJECT_FILE: &str = "gantry.toml";
const USER_FILE: &str = "config.toml";
const APP_DIR: &str = "gantry";
const CONFIG_DIR_ENV: &str = "GANTRY_CONFIG_DIR";

/// Which layer a config file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    User,
    Project,
    Explicit,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Project => "project",
            Self::Explicit => "explicit",
        })
    }
}

/// A config file that was considered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigSource {
    pub layer: Layer,
    pub path: PathBuf,
    /// False when the file is absent or was skipped as unreadable.
    pub loaded: bool,
}

/// Merged configuration plus where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: GantryConfig,
    /// Every file considered, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// One entry per discovered layer that failed to load.
    pub warnings: Vec<String>,
}

impl LoadedConfig {
    /// Paths that actually contributed to `config`.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter_map(|s| s.loaded.then_some(s.path.as_path()))
            .collect()
    }
}

/// Where to look for config files.
///
/// Defaults to the user config directory and the current directory.
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    user_dir: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    explicit: Option<PathBuf>,
}

impl Discovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look for `config.toml` here instead of the user config directory.
    pub fn user_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.user_dir = Some(dir.into());
        self
    }

    /// Look for `gantry.toml` here instead of the current directory.
    pub fn project_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(dir.into());
        self
    }

    /// Load only this file, skipping discovery.
    pub fn explicit(mut self, path: Option<PathBuf>) -> Self {
        self.explicit = path;
        self
    }

    pub fn load(&self) -> Result<LoadedConfig> {
        if let Some(path) = &self.explicit {
            return Ok(LoadedConfig {
                config: load_config_file(path)?,
                sources: vec![ConfigSource {
                    layer: Layer::Explicit,
                    path: path.clone(),
                    loaded: true,
                }],
                warnings: Vec::new(),
            });
        }

        let mut loaded = LoadedConfig {
            config: GantryConfig::new(),
            sources: Vec::new(),
            warnings: Vec::new(),
        };

        let user = self
            .user_dir
            .clone()
            .or_else(user_config_dir)
            .map(|dir| dir.join(USER_FILE));
        if let Some(path) = user {
            merge_layer(&mut loaded, Layer::User, path);
        }

        let project = match &self.project_dir {
            Some(dir) => dir.join(PROJECT_FILE),
            None => PathBuf::from(PROJECT_FILE),
        };
        merge_layer(&mut loaded, Layer::Project, project);

        Ok(loaded)
    }
}

/// Discover and merge the user and project layers.
pub fn load_config(project_dir: Option<&Path>) -> Result<LoadedConfig> {
    let mut discovery = Discovery::new();
    if let Some(dir) = project_dir {
        discovery = discovery.project_dir(dir);
    }
    discovery.load()
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<GantryConfig> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    GantryConfig::from_toml(&contents)
}

/// Write `config` to `path`, creating parent directories.
pub fn save_config(config: &GantryConfig, path: &Path) -> Result<()> {
    let write_err = |path: &Path| {
        let path = path.display().to_string();
        move |source| ConfigError::WriteFile { path, source }
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(write_err(parent))?;
    }
    std::fs::write(path, config.to_toml()?).map_err(write_err(path))
}

/// Path of the user-layer config file.
pub fn user_config_path() -> Option<PathBuf> {
    user_config_dir().map(|dir| dir.join(USER_FILE))
}

/// `$GANTRY_CONFIG_DIR` when set, otherwise `gantry/` in the platform
/// config directory.
pub fn user_config_dir() -> Option<PathBuf> {
    match std::env::var_os(CONFIG_DIR_ENV) {
        Some(dir) if !dir.is_empty() => Some(PathBuf::from(dir)),
        _ => dirs::config_dir().map(|dir| dir.join(APP_DIR)),
    }
}

/// Path of the project-layer config file in `dir`.
pub fn project_config_path(dir: &Path) -> PathBuf {
    dir.join(PROJECT_FILE)
}

/// Merge one discovered layer. Absent files are recorded as not loaded;
/// broken ones are skipped with a warning.
fn merge_layer(loaded: &mut LoadedConfig, layer: Layer, path: PathBuf) {
    let mut ok = false;
    if path.is_file() {
        match load_config_file(&path) {
            Ok(config) => {
                loaded.config.merge(config);
                ok = true;
            }
            Err(e) => loaded
                .warnings
                .push(format!("skipping {layer} config {}: {e}", path.display())),
        }
    }
    loaded.sources.push(ConfigSource {
        layer,
        path,
        loaded: ok,
    });
}
