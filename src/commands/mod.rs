//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the `strata`
//! command-line tool. Each subcommand is defined in its own file.
//!
//! ## Structure
//!
//! Each command module contains:
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and the shared
//!   [`Context`] and performs the command's logic through the `strata`
//!   library.

pub mod compile;
pub mod completions;
pub mod resolve;
pub mod set_item;
pub mod tree;
pub mod validate;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, ValueEnum};
use log::debug;
use serde::Serialize;

use strata::config::{self, Config};
use strata::defaults::DEFAULT_CONFIG_FILENAME;
use strata::engine::Engine;
use strata::output::OutputConfig;
use strata::store::Scope;
use strata::suggestions;

/// Project environment selection shared by every engine command
#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    /// Project id
    #[arg(short, long, value_name = "PROJECT")]
    pub project: String,

    /// Environment of the project
    #[arg(short, long, value_name = "ENV", default_value = "live")]
    pub environment: String,
}

impl ScopeArgs {
    pub fn scope(&self) -> Scope {
        Scope::new(&self.project, &self.environment)
    }
}

/// Serialization format for command output
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    pub fn render<T: Serialize>(self, value: &T) -> Result<String> {
        Ok(match self {
            OutputFormat::Json => serde_json::to_string_pretty(value)?,
            OutputFormat::Yaml => serde_yaml::to_string(value)?,
        })
    }
}

/// Global settings every command runs under
#[derive(Debug, Clone)]
pub struct Context {
    /// Explicit `--config` path; a missing explicit file is an error
    pub config_path: Option<PathBuf>,
    /// `--storage` override of the configured storage root
    pub storage: Option<PathBuf>,
    pub output: OutputConfig,
}

impl Context {
    /// Load the configuration
    ///
    /// Without `--config`, `strata.yaml` in the working directory is used
    /// when present and an empty configuration otherwise.
    pub fn config(&self) -> Result<Config> {
        let mut config = match &self.config_path {
            Some(path) => load(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILENAME);
                if default_path.exists() {
                    load(default_path)?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILENAME);
                    Config::default()
                }
            }
        };
        if let Some(storage) = &self.storage {
            config.storage = Some(storage.clone());
        }
        Ok(config)
    }

    pub fn engine(&self) -> Result<Engine> {
        Engine::from_config(&self.config()?).map_err(suggestions::explain)
    }
}

fn load(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Err(suggestions::config_not_found(path));
    }
    debug!("Loading configuration from {}", path.display());
    config::from_file(path).map_err(|e| {
        anyhow::anyhow!("Failed to load config from {}: {}", path.display(), e)
    })
}
