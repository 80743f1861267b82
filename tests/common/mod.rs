//! Shared test utilities for integration and E2E tests.
//!
//! This module provides fixtures for a storage directory laid out the way
//! `FileStore` lays it out, plus a small mock remote endpoint.
//!
//! ## Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = TestFixture::new().with_collection("blog", "live", "schemas", docs);
//!     let mut cmd = fixture.command();
//!     cmd.args(["compile", "post", "-p", "blog"]).assert().success();
//! }
//! ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_fs::prelude::*;
use serde_json::Value;
use strata::error::{Error, Result};
use strata::remote::{RemoteEndpoint, RemoteWrite};
use strata::store::Scope;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    #[allow(unused_imports)]
    pub use assert_fs::TempDir;
    pub use predicates::prelude::*;

    #[allow(unused_imports)]
    pub use super::configs;
    #[allow(unused_imports)]
    pub use super::{FakeRemote, RemoteBehavior, TestFixture};
}

/// Common `strata.yaml` snippets for testing.
#[allow(dead_code)]
pub mod configs {
    /// Configuration without any linked project.
    pub const EMPTY: &str = "# strata configuration\n";

    /// Configuration with a short sync timeout and custom defaults.
    pub const WITH_DEFAULTS: &str = r#"
sync:
  timeout-ms: 250
defaults:
  icon: page
  editor: struct
"#;

    /// Invalid YAML for error testing.
    pub const INVALID_YAML: &str = "sync: [unclosed";

    /// Configuration with a key strata does not know.
    pub const UNKNOWN_KEY: &str = "colour: blue\n";
}

/// A test fixture with a config file and a `FileStore` storage directory.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

#[allow(dead_code)]
impl TestFixture {
    /// Create a new fixture with an empty configuration.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        fixture.with_config(configs::EMPTY)
    }

    /// Replace `strata.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("strata.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Seed one collection of the local store.
    pub fn with_collection(
        self,
        project: &str,
        environment: &str,
        collection: &str,
        documents: Vec<Value>,
    ) -> Self {
        let body = serde_json::to_string_pretty(&documents).expect("Failed to encode documents");
        self.temp_dir
            .child(format!("data/{}/{}.{}.json", project, environment, collection))
            .write_str(&body)
            .expect("Failed to write collection");
        self
    }

    /// Read back one collection of the local store.
    pub fn collection(&self, project: &str, environment: &str, collection: &str) -> Vec<Value> {
        let path = self
            .storage_path()
            .join(project)
            .join(format!("{}.{}.json", environment, collection));
        match std::fs::read_to_string(path) {
            Ok(body) => serde_json::from_str(&body).expect("Collection is not a JSON array"),
            Err(_) => Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("strata.yaml")
    }

    pub fn storage_path(&self) -> PathBuf {
        self.temp_dir.path().join("data")
    }

    /// A `strata` command with `--config` and `--storage` pointing into the fixture.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = cargo_bin_cmd!("strata");
        cmd.current_dir(self.path())
            .env_remove("STRATA_CONFIG")
            .env_remove("STRATA_STORAGE")
            .arg("--config")
            .arg(self.config_path())
            .arg("--storage")
            .arg(self.storage_path())
            .arg("--color")
            .arg("never");
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// How a [`FakeRemote`] answers
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum RemoteBehavior {
    /// Serve the stored resources and accept writes
    Serve,
    /// Serve the stored resources but answer writes with "not handled"
    ReadOnly,
    /// Fail every call with a network error
    Unreachable,
    /// Sleep before answering every call
    Slow(Duration),
}

/// An in-memory remote endpoint
#[allow(dead_code)]
pub struct FakeRemote {
    behavior: RemoteBehavior,
    resources: Mutex<HashMap<String, Vec<Value>>>,
    writes: Mutex<Vec<(String, String, Option<Value>)>>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new(behavior: RemoteBehavior) -> Self {
        Self {
            behavior,
            resources: Mutex::new(HashMap::new()),
            writes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_resource(self, class: &str, documents: Vec<Value>) -> Self {
        self.resources
            .lock()
            .unwrap()
            .insert(class.to_string(), documents);
        self
    }

    /// Every write the remote accepted or declined, in order
    pub fn writes(&self) -> Vec<(String, String, Option<Value>)> {
        self.writes.lock().unwrap().clone()
    }

    fn answer(&self) -> Result<()> {
        match &self.behavior {
            RemoteBehavior::Unreachable => Err(Error::Network {
                url: "fake://remote".to_string(),
                message: "connection refused".to_string(),
            }),
            RemoteBehavior::Slow(delay) => {
                std::thread::sleep(*delay);
                Ok(())
            }
            _ => Ok(()),
        }
    }
}

impl RemoteEndpoint for FakeRemote {
    fn get_resource(&self, _scope: &Scope, class: &str) -> Result<Option<Vec<Value>>> {
        self.answer()?;
        Ok(self.resources.lock().unwrap().get(class).cloned())
    }

    fn set_resource_item(
        &self,
        _scope: &Scope,
        class: &str,
        id: &str,
        item: Option<&Value>,
    ) -> Result<RemoteWrite> {
        self.answer()?;
        self.writes
            .lock()
            .unwrap()
            .push((class.to_string(), id.to_string(), item.cloned()));
        Ok(RemoteWrite {
            handled: matches!(self.behavior, RemoteBehavior::Serve),
        })
    }
}
