//! Configuration system for gantry.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (user config, project overrides, or one explicit file)
//! - The store location, workflow directories, and logging filters
//! - Named repositories the CLI can dispatch against
//! - The identity recorded as the triggering user

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, Discovery, Layer, LoadedConfig, load_config, load_config_file,
    project_config_path, save_config, user_config_dir, user_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
