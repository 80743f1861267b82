//! Editors and deployers known to the engine
//!
//! The registry is built by the composition root and handed to the engine.
//! Nothing in the crate looks editors or deployers up through global state.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::defaults::DEFAULT_FIELD_EDITOR;
use crate::error::{Error, Result};

/// Something a deployer can publish
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artifact {
    /// Path of the artifact relative to the deploy target
    pub path: String,
    pub content: Value,
}

/// Result of a push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployOutcome {
    pub deployed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// A publish target
pub trait Deployer: Send + Sync {
    /// Identifier the deployer is registered under
    fn id(&self) -> &str;

    fn push(&self, artifact: &Artifact) -> Result<DeployOutcome>;
}

/// Explicit table of editor ids and deployers
#[derive(Clone, Default)]
pub struct Registry {
    editors: BTreeSet<String>,
    deployers: BTreeMap<String, Arc<dyn Deployer>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("editors", &self.editors)
            .field("deployers", &self.deployers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry that knows the built-in field editors
    pub fn with_builtin_editors() -> Self {
        let mut registry = Self::new();
        for editor in [
            DEFAULT_FIELD_EDITOR,
            "string",
            "number",
            "boolean",
            "date",
            "array",
            "dropdown",
            "media-reference",
            "content-reference",
            "rich-text",
            "tags",
            "url",
        ] {
            registry.register_editor(editor);
        }
        registry
    }

    pub fn register_editor(&mut self, id: &str) {
        self.editors.insert(id.to_string());
    }

    pub fn has_editor(&self, id: &str) -> bool {
        self.editors.contains(id)
    }

    pub fn editors(&self) -> impl Iterator<Item = &str> {
        self.editors.iter().map(String::as_str)
    }

    /// Register a deployer under its own id, replacing any previous one
    pub fn register_deployer(&mut self, deployer: Arc<dyn Deployer>) {
        self.deployers.insert(deployer.id().to_string(), deployer);
    }

    pub fn deployer(&self, id: &str) -> Option<Arc<dyn Deployer>> {
        self.deployers.get(id).cloned()
    }

    /// Push `artifact` through the deployer registered as `id`
    pub fn deploy(&self, id: &str, artifact: &Artifact) -> Result<DeployOutcome> {
        let deployer = self
            .deployer(id)
            .ok_or_else(|| Error::not_found("deployer", id))?;
        deployer.push(artifact)
    }
}
