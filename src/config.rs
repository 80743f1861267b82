//! # Configuration Schema and Parsing
//!
//! This module defines the data structures that represent the `strata.yaml`
//! configuration file, and the logic for parsing and validating it.
//!
//! ```yaml
//! storage: ./data
//! sync:
//!   timeout-ms: 5000
//! defaults:
//!   icon: file
//!   editor: struct
//! projects:
//!   blog:
//!     sync:
//!       enabled: true
//!       url: https://remote.example.com/api
//!       token: secret
//!       project: remote-blog
//!       environments: [live]
//! ```
//!
//! Every section is optional. An empty file is a valid configuration with
//! no sync-enabled project.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::compile::SchemaDefaults;
use crate::defaults::DEFAULT_SYNC_TIMEOUT_MS;
use crate::error::{Error, Result};

/// Engine-wide sync settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SyncSettings {
    /// Bound for every remote call, in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    DEFAULT_SYNC_TIMEOUT_MS
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_SYNC_TIMEOUT_MS,
        }
    }
}

/// Remote link of a single project
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectSync {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    /// Project id on the remote instance, defaults to the local project id
    #[serde(default)]
    pub project: Option<String>,
    /// Environments linked to the remote; empty means all of them
    #[serde(default)]
    pub environments: Vec<String>,
}

impl ProjectSync {
    /// Whether `environment` is linked to the remote
    pub fn covers(&self, environment: &str) -> bool {
        self.enabled
            && (self.environments.is_empty() || self.environments.iter().any(|e| e == environment))
    }
}

/// Per-project settings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub sync: ProjectSync,
}

/// The parsed `strata.yaml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the file-backed local store
    #[serde(default)]
    pub storage: Option<PathBuf>,
    #[serde(default)]
    pub sync: SyncSettings,
    #[serde(default)]
    pub defaults: SchemaDefaults,
    #[serde(default)]
    pub projects: BTreeMap<String, ProjectConfig>,
}

impl Config {
    /// Check the configuration for values the engine cannot work with
    ///
    /// An enabled project link needs a URL that parses, and the sync
    /// timeout must be positive.
    pub fn validate(&self) -> Result<()> {
        if self.sync.timeout_ms == 0 {
            return Err(Error::ConfigParse {
                message: "sync.timeout-ms must be greater than zero".to_string(),
                hint: Some(format!(
                    "Remove the key to use the default of {}ms",
                    DEFAULT_SYNC_TIMEOUT_MS
                )),
            });
        }

        for (name, project) in &self.projects {
            if !project.sync.enabled {
                continue;
            }
            let url = project.sync.url.as_deref().ok_or_else(|| Error::ConfigParse {
                message: format!("Project '{}' has sync enabled but no url", name),
                hint: Some("Add `url:` under the project's `sync:` section".to_string()),
            })?;
            url::Url::parse(url).map_err(|e| Error::ConfigParse {
                message: format!("Project '{}' has an invalid sync url '{}': {}", name, url, e),
                hint: Some("Use an absolute URL such as https://remote.example.com/api".to_string()),
            })?;
        }

        Ok(())
    }
}

/// Parses a YAML string into a validated [`Config`]
pub fn parse(yaml_content: &str) -> Result<Config> {
    let blank = yaml_content
        .lines()
        .map(str::trim)
        .all(|line| line.is_empty() || line.starts_with('#'));
    if blank {
        return Ok(Config::default());
    }
    let config: Config = serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: None,
    })?;
    config.validate()?;
    Ok(config)
}

/// Parse a [`Config`] from a YAML file path
pub fn from_file<P: AsRef<std::path::Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(Error::Io)?;
    parse(&content)
}
