//! # Remote Endpoints
//!
//! A sync-enabled environment is linked to a remote, authoritative instance.
//! This module defines the [`RemoteEndpoint`] seam the sync layer talks to,
//! an HTTP implementation of it, and the [`Remotes`] directory that maps a
//! project environment to its endpoint.
//!
//! ## Wire protocol
//!
//! - `GET {url}/{remoteProject}/{environment}/{class}` returns a JSON array of
//!   documents. `404` means the remote has no such resource.
//! - `POST {url}/{remoteProject}/{environment}/{class}/{id}` with a JSON body
//!   upserts an item, `DELETE` on the same path removes it. `404`, `405` and
//!   `501` mean the remote does not support mutating this class.
//!
//! Requests carry `Authorization: Bearer <token>` when a token is configured.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use reqwest::StatusCode;
use serde_json::Value;

use crate::config::{Config, ProjectSync};
use crate::error::{Error, Result};
use crate::store::Scope;

/// Result of a remote write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoteWrite {
    /// `false` when the remote does not support this operation for the class
    pub handled: bool,
}

/// Trait for talking to a remote instance
///
/// This trait allows for mocking remote endpoints in tests.
pub trait RemoteEndpoint: Send + Sync {
    /// Fetch the remote form of `class`, or `None` if the remote has none
    fn get_resource(&self, scope: &Scope, class: &str) -> Result<Option<Vec<Value>>>;

    /// Upsert (`Some`) or delete (`None`) a single item of `class`
    fn set_resource_item(
        &self,
        scope: &Scope,
        class: &str,
        id: &str,
        item: Option<&Value>,
    ) -> Result<RemoteWrite>;
}

/// HTTP implementation of [`RemoteEndpoint`]
pub struct HttpRemote {
    base_url: String,
    token: Option<String>,
    remote_project: Option<String>,
    timeout: Duration,
    client: reqwest::blocking::Client,
}

impl fmt::Debug for HttpRemote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpRemote")
            .field("base_url", &self.base_url)
            .field("remote_project", &self.remote_project)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl HttpRemote {
    /// Create a client for `base_url`
    ///
    /// `remote_project` replaces the local project id in request paths when
    /// the remote instance names the project differently.
    pub fn new(
        base_url: &str,
        token: Option<String>,
        remote_project: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        url::Url::parse(base_url)?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(concat!("strata/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Network {
                url: base_url.to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            remote_project,
            timeout,
            client,
        })
    }

    /// URL of `class` (and optionally one of its items) for `scope`
    pub fn resource_url(&self, scope: &Scope, class: &str, id: Option<&str>) -> String {
        let project = self.remote_project.as_deref().unwrap_or(&scope.project);
        let mut url = format!(
            "{}/{}/{}/{}",
            self.base_url,
            project,
            scope.environment,
            class.trim_matches('/')
        );
        if let Some(id) = id {
            url.push('/');
            url.push_str(id);
        }
        url
    }

    fn authorize(
        &self,
        request: reqwest::blocking::RequestBuilder,
    ) -> reqwest::blocking::RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

fn network_error(url: &str, timeout: Duration, error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout {
            operation: format!("request to {}", url),
            after_ms: timeout.as_millis() as u64,
        }
    } else {
        Error::Network {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

impl RemoteEndpoint for HttpRemote {
    fn get_resource(&self, scope: &Scope, class: &str) -> Result<Option<Vec<Value>>> {
        let url = self.resource_url(scope, class, None);
        debug!("GET {}", url);
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .map_err(|e| network_error(&url, self.timeout, e))?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !resp.status().is_success() {
            return Err(Error::Network {
                url,
                message: format!("unexpected status {}", resp.status()),
            });
        }

        let body: Value = resp.json().map_err(|e| Error::RemoteProtocol {
            url: url.clone(),
            message: e.to_string(),
        })?;
        match body {
            Value::Null => Ok(None),
            Value::Array(documents) => Ok(Some(documents)),
            other => Err(Error::RemoteProtocol {
                url,
                message: format!("expected a JSON array, got {}", json_kind(&other)),
            }),
        }
    }

    fn set_resource_item(
        &self,
        scope: &Scope,
        class: &str,
        id: &str,
        item: Option<&Value>,
    ) -> Result<RemoteWrite> {
        let url = self.resource_url(scope, class, Some(id));
        let request = match item {
            Some(item) => {
                debug!("POST {}", url);
                self.client.post(&url).json(item)
            }
            None => {
                debug!("DELETE {}", url);
                self.client.delete(&url)
            }
        };
        let resp = self
            .authorize(request)
            .send()
            .map_err(|e| network_error(&url, self.timeout, e))?;

        match resp.status() {
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
                Ok(RemoteWrite { handled: false })
            }
            status if status.is_success() => Ok(RemoteWrite { handled: true }),
            status => Err(Error::Network {
                url,
                message: format!("unexpected status {}", status),
            }),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Endpoint linked to one project, with the sync settings deciding coverage
#[derive(Clone)]
struct Link {
    endpoint: Arc<dyn RemoteEndpoint>,
    sync: ProjectSync,
}

/// Directory of remote endpoints, keyed by project
///
/// Built once by the composition root, either from [`Config`] or by hand.
#[derive(Clone, Default)]
pub struct Remotes {
    links: HashMap<String, Link>,
}

impl fmt::Debug for Remotes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut projects: Vec<&String> = self.links.keys().collect();
        projects.sort();
        f.debug_struct("Remotes").field("projects", &projects).finish()
    }
}

impl Remotes {
    /// A directory with no linked project
    pub fn none() -> Self {
        Self::default()
    }

    /// Build HTTP endpoints for every project with sync enabled
    pub fn from_config(config: &Config) -> Result<Self> {
        let timeout = Duration::from_millis(config.sync.timeout_ms);
        let mut remotes = Self::none();
        for (name, project) in &config.projects {
            let sync = &project.sync;
            if !sync.enabled {
                continue;
            }
            let url = sync.url.as_deref().ok_or_else(|| Error::ConfigParse {
                message: format!("Project '{}' has sync enabled but no url", name),
                hint: None,
            })?;
            let endpoint = HttpRemote::new(url, sync.token.clone(), sync.project.clone(), timeout)?;
            remotes.links.insert(
                name.clone(),
                Link {
                    endpoint: Arc::new(endpoint),
                    sync: sync.clone(),
                },
            );
        }
        Ok(remotes)
    }

    /// Link `project` to `endpoint` for `environments` (empty means all)
    pub fn link(
        mut self,
        project: &str,
        endpoint: Arc<dyn RemoteEndpoint>,
        environments: Vec<String>,
    ) -> Self {
        let sync = ProjectSync {
            enabled: true,
            environments,
            ..Default::default()
        };
        self.links.insert(project.to_string(), Link { endpoint, sync });
        self
    }

    /// Endpoint for `scope`, if its environment is sync-enabled
    pub fn endpoint_for(&self, scope: &Scope) -> Option<Arc<dyn RemoteEndpoint>> {
        self.links
            .get(&scope.project)
            .filter(|link| link.sync.covers(&scope.environment))
            .map(|link| Arc::clone(&link.endpoint))
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}
