//! # Local/Remote Synchronization
//!
//! For a sync-enabled environment, a resource class has a local persisted
//! form and a remote form. [`SyncResolver`] reconciles the two on read and
//! routes writes to the authoritative store.
//!
//! ## Reads
//!
//! Resolution is a small state machine threaded through [`Step`]:
//!
//! ```text
//! Fetch ──Fallback──▶ Local ──▶ Return
//!   │
//!   └──Ok──▶ Merge ──▶ Return
//! ```
//!
//! The remote fetch falls back to the local store when the environment has
//! no endpoint, when the endpoint fails or does not answer within the
//! configured timeout, and when it answers with an absent or empty result.
//! A remote answer whose documents do not decode as the class's
//! [`DocumentKind`] counts as a protocol fault and falls back as well.
//! Sync is strictly additive: transient faults are logged as warnings and
//! never reach the caller. Caching is the engine's concern and wraps the
//! whole machine.
//!
//! ## Writes
//!
//! The remote is tried first. A handled remote write short-circuits the local
//! store, which stays a stale read replica. When the remote reports the
//! operation as unsupported, or when it fails transiently, the write lands in
//! the local store: `None` removes the document, `Some` upserts it.

use std::collections::HashSet;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::remote::{RemoteEndpoint, RemoteWrite, Remotes};
use crate::schema::Schema;
use crate::store::{document_id, LocalStore, Scope};

/// Which side wins when both stores hold the same identity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precedence {
    Local,
    Remote,
}

/// How the remote form of a class combines with the local one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// A non-empty remote result replaces the local one entirely
    ReplaceOnRemotePresent,
    /// Union of identities; local order first, remote-only items appended
    UnionMerge { prefer: Precedence },
}

/// Shape every remote document of a class must decode as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    /// Any JSON value
    Plain,
    /// A schema document
    Schema,
}

impl DocumentKind {
    /// Check remote documents before they take part in a merge
    pub fn check(self, documents: &[Value]) -> std::result::Result<(), String> {
        match self {
            DocumentKind::Plain => Ok(()),
            DocumentKind::Schema => documents
                .iter()
                .try_for_each(|document| Schema::from_document(document).map(|_| ()))
                .map_err(|e| e.to_string()),
        }
    }
}

/// A named category of synchronizable data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceClass {
    /// Name used on the remote wire
    pub name: String,
    /// Local collection backing the class
    pub collection: String,
    pub policy: MergePolicy,
    /// Whether the class is a flat, folder-tagged tree
    pub tree: bool,
    pub documents: DocumentKind,
}

impl ResourceClass {
    pub fn schemas() -> Self {
        Self {
            documents: DocumentKind::Schema,
            ..Self::custom(
                "schemas",
                "schemas",
                MergePolicy::UnionMerge {
                    prefer: Precedence::Local,
                },
            )
        }
    }

    pub fn media_tree() -> Self {
        Self {
            tree: true,
            ..Self::custom("media/tree", "media", MergePolicy::ReplaceOnRemotePresent)
        }
    }

    pub fn content() -> Self {
        Self::custom(
            "content",
            "content",
            MergePolicy::UnionMerge {
                prefer: Precedence::Local,
            },
        )
    }

    pub fn forms() -> Self {
        Self::custom(
            "forms",
            "forms",
            MergePolicy::UnionMerge {
                prefer: Precedence::Local,
            },
        )
    }

    pub fn custom(name: &str, collection: &str, policy: MergePolicy) -> Self {
        Self {
            name: name.to_string(),
            collection: collection.to_string(),
            policy,
            tree: false,
            documents: DocumentKind::Plain,
        }
    }

    /// Look up one of the built-in classes by name
    pub fn named(name: &str) -> Option<Self> {
        match name {
            "schemas" => Some(Self::schemas()),
            "media/tree" | "media" => Some(Self::media_tree()),
            "content" => Some(Self::content()),
            "forms" => Some(Self::forms()),
            _ => None,
        }
    }

    /// Names accepted by [`ResourceClass::named`]
    pub fn known_names() -> &'static [&'static str] {
        &["schemas", "media/tree", "content", "forms"]
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Outcome of one step of the resolution machine
#[derive(Debug)]
pub enum Step<T> {
    Ok(T),
    /// Continue with local behaviour; the reason is logged
    Fallback(String),
    Fatal(Error),
}

impl<T> Step<T> {
    /// Classify a remote call result
    ///
    /// Transient sync errors become a fallback, anything else is fatal.
    pub fn from_remote(result: Result<T>) -> Self {
        match result {
            Ok(value) => Step::Ok(value),
            Err(e) if e.is_transient() => Step::Fallback(e.to_string()),
            Err(e) => Step::Fatal(e),
        }
    }
}

/// Result of [`SyncResolver::write`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOutcome {
    pub written_remotely: bool,
}

/// Reconciles local and remote forms of resource classes
#[derive(Debug, Clone)]
pub struct SyncResolver {
    remotes: Remotes,
    timeout: Duration,
}

impl SyncResolver {
    pub fn new(remotes: Remotes, timeout: Duration) -> Self {
        Self { remotes, timeout }
    }

    pub fn remotes(&self) -> &Remotes {
        &self.remotes
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run `call` on a helper thread, abandoning it after the timeout
    ///
    /// An abandoned call keeps running detached; its result is dropped.
    fn bounded<T, F>(&self, operation: String, call: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        thread::Builder::new()
            .name("strata-sync".to_string())
            .spawn(move || {
                // The receiver is gone if the call was abandoned
                let _ = tx.send(call());
            })
            .map_err(|e| Error::Network {
                url: operation.clone(),
                message: format!("failed to start remote call: {}", e),
            })?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout {
                operation,
                after_ms: self.timeout.as_millis() as u64,
            }),
            Err(RecvTimeoutError::Disconnected) => Err(Error::Network {
                url: operation,
                message: "remote call ended without a result".to_string(),
            }),
        }
    }

    /// Fetch step: remote documents, or the reason to fall back
    fn fetch(&self, scope: &Scope, class: &ResourceClass) -> Step<Vec<Value>> {
        let endpoint = match self.remotes.endpoint_for(scope) {
            Some(endpoint) => endpoint,
            None => return Step::Fallback(format!("{} is not sync-enabled", scope)),
        };

        let operation = format!("fetch of {} for {}", class, scope);
        let call_scope = scope.clone();
        let call_class = class.name.clone();
        let documents = class.documents;
        let result = self.bounded(operation.clone(), move || {
            endpoint.get_resource(&call_scope, &call_class)
        });
        let result = result.and_then(|answer| match answer {
            Some(remote) => documents
                .check(&remote)
                .map(|()| Some(remote))
                .map_err(|message| Error::RemoteProtocol {
                    url: operation,
                    message,
                }),
            None => Ok(None),
        });

        match Step::from_remote(result) {
            Step::Ok(Some(documents)) if !documents.is_empty() => Step::Ok(documents),
            Step::Ok(_) => Step::Fallback(format!("remote has no {} for {}", class, scope)),
            Step::Fallback(reason) => {
                warn!(
                    "Remote fetch of {} for {} failed, using local store: {}",
                    class, scope, reason
                );
                Step::Fallback(reason)
            }
            Step::Fatal(e) => Step::Fatal(e),
        }
    }

    /// Resolve the canonical view of `class` in `scope`
    ///
    /// `local_fetch` is invoked at most once, and only when the local form is
    /// needed.
    pub fn resolve<F>(&self, scope: &Scope, class: &ResourceClass, local_fetch: F) -> Result<Vec<Value>>
    where
        F: FnOnce() -> Result<Vec<Value>>,
    {
        match self.fetch(scope, class) {
            Step::Ok(remote) => {
                debug!("Merging remote {} for {} ({:?})", class, scope, class.policy);
                match class.policy {
                    MergePolicy::ReplaceOnRemotePresent => Ok(remote),
                    MergePolicy::UnionMerge { prefer } => {
                        Ok(union_merge(local_fetch()?, remote, prefer))
                    }
                }
            }
            Step::Fallback(reason) => {
                debug!("Resolving {} for {} locally: {}", class, scope, reason);
                local_fetch()
            }
            Step::Fatal(e) => Err(e),
        }
    }

    /// Write (`Some`) or delete (`None`) one item of `class`
    pub fn write(
        &self,
        scope: &Scope,
        class: &ResourceClass,
        id: &str,
        item: Option<Value>,
        store: &dyn LocalStore,
    ) -> Result<WriteOutcome> {
        if let Some(endpoint) = self.remotes.endpoint_for(scope) {
            match self.write_remote(endpoint, scope, class, id, item.clone()) {
                Step::Ok(RemoteWrite { handled: true }) => {
                    info!("Wrote {} '{}' to the remote for {}", class, id, scope);
                    return Ok(WriteOutcome {
                        written_remotely: true,
                    });
                }
                Step::Ok(RemoteWrite { handled: false }) => {
                    debug!(
                        "Remote for {} does not support writing {}, writing locally",
                        scope, class
                    );
                }
                Step::Fallback(reason) => {
                    warn!(
                        "Remote write of {} '{}' for {} failed, writing locally: {}",
                        class, id, scope, reason
                    );
                }
                Step::Fatal(e) => return Err(e),
            }
        }

        match item {
            Some(document) => {
                store.upsert(scope, &class.collection, id, document)?;
                info!("Upserted {} '{}' in the local store for {}", class, id, scope);
            }
            None => {
                let removed = store.remove_one(scope, &class.collection, id)?;
                info!(
                    "Removed {} '{}' from the local store for {} (found: {})",
                    class, id, scope, removed
                );
            }
        }

        Ok(WriteOutcome {
            written_remotely: false,
        })
    }

    fn write_remote(
        &self,
        endpoint: Arc<dyn RemoteEndpoint>,
        scope: &Scope,
        class: &ResourceClass,
        id: &str,
        item: Option<Value>,
    ) -> Step<RemoteWrite> {
        let operation = format!("write of {} '{}' for {}", class, id, scope);
        let call_scope = scope.clone();
        let call_class = class.name.clone();
        let call_id = id.to_string();
        Step::from_remote(self.bounded(operation, move || {
            endpoint.set_resource_item(&call_scope, &call_class, &call_id, item.as_ref())
        }))
    }
}

/// Union of local and remote documents by `id`
///
/// Local order is kept and remote-only documents are appended in remote
/// order. Documents that came from the remote are flagged `remote` and
/// `locked`, since they are read-only locally. Remote documents without a
/// string `id` are skipped, and only the first of repeated remote ids counts.
pub fn union_merge(local: Vec<Value>, remote: Vec<Value>, prefer: Precedence) -> Vec<Value> {
    let mut merged = local;
    let mut seen = HashSet::new();
    for document in remote {
        let id = match document_id(&document) {
            Some(id) => id.to_string(),
            None => {
                warn!("Skipping remote document without a string id: {}", document);
                continue;
            }
        };
        if !seen.insert(id.clone()) {
            warn!("Skipping repeated remote document '{}'", id);
            continue;
        }
        let position = merged
            .iter()
            .position(|d| document_id(d) == Some(id.as_str()));
        match (position, prefer) {
            (Some(_), Precedence::Local) => {}
            (Some(index), Precedence::Remote) => merged[index] = flag_remote(document),
            (None, _) => merged.push(flag_remote(document)),
        }
    }
    merged
}

fn flag_remote(document: Value) -> Value {
    match document {
        Value::Object(mut object) => {
            object.insert("remote".to_string(), Value::Bool(true));
            object.insert("locked".to_string(), Value::Bool(true));
            Value::Object(object)
        }
        other => other,
    }
}
