//! # Local Document Store
//!
//! The engine persists documents through the [`LocalStore`] trait: a
//! document-oriented store keyed by project, environment and collection.
//! Collections are named per environment (`"{environment}.{collection}"`),
//! so every environment of a project owns its own copy of each collection.
//!
//! Two implementations are provided:
//!
//! - [`MemoryStore`]: in-process and insertion-ordered, used by tests and by
//!   embedders that bring their own persistence.
//! - [`FileStore`]: one JSON array file per collection under a storage root,
//!   used by the CLI.
//!
//! Documents are opaque JSON objects. The only field the store looks at is
//! the string `id`, which is the identity used by `upsert` and `remove_one`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::debug;
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// A project environment, the unit every resource is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Scope {
    pub project: String,
    pub environment: String,
}

impl Scope {
    pub fn new(project: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            environment: environment.into(),
        }
    }

    /// Name of the environment-specific collection backing `collection`
    pub fn collection(&self, collection: &str) -> String {
        format!("{}.{}", self.environment, collection)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.environment)
    }
}

/// Document selection for [`LocalStore::find`]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Filter {
    /// Every document in the collection
    #[default]
    All,
    /// The document with the given `id`
    Id(String),
    /// Documents whose top-level fields equal all the given values
    Fields(Map<String, Value>),
}

impl Filter {
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Filter::All => true,
            Filter::Id(id) => document_id(document) == Some(id.as_str()),
            Filter::Fields(fields) => fields
                .iter()
                .all(|(key, expected)| document.get(key) == Some(expected)),
        }
    }
}

/// The string `id` of a document, if it has one
pub fn document_id(document: &Value) -> Option<&str> {
    document.get("id").and_then(Value::as_str)
}

/// A document store keyed by project, environment and collection
pub trait LocalStore: Send + Sync {
    /// Return the documents of `collection` matching `filter`, in stored order
    fn find(&self, scope: &Scope, collection: &str, filter: &Filter) -> Result<Vec<Value>>;

    /// Insert or replace the document with `id`
    ///
    /// The stored document always carries `id` as its `id` field.
    fn upsert(&self, scope: &Scope, collection: &str, id: &str, document: Value) -> Result<()>;

    /// Remove the document with `id`, returning whether one was removed
    fn remove_one(&self, scope: &Scope, collection: &str, id: &str) -> Result<bool>;
}

fn with_id(id: &str, document: Value) -> Result<Value> {
    match document {
        Value::Object(mut object) => {
            object.insert("id".to_string(), Value::String(id.to_string()));
            Ok(Value::Object(object))
        }
        other => Err(Error::InvalidDocument {
            collection: String::new(),
            message: format!("expected a JSON object for '{}', got {}", id, other),
        }),
    }
}

/// Replace or append a document in an ordered collection
fn upsert_into(documents: &mut Vec<Value>, id: &str, document: Value) {
    match documents.iter().position(|d| document_id(d) == Some(id)) {
        Some(index) => documents[index] = document,
        None => documents.push(document),
    }
}

/// Remove a document from an ordered collection
fn remove_from(documents: &mut Vec<Value>, id: &str) -> bool {
    match documents.iter().position(|d| document_id(d) == Some(id)) {
        Some(index) => {
            documents.remove(index);
            true
        }
        None => false,
    }
}

type CollectionKey = (String, String);

/// In-process store, shared between clones
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<CollectionKey, Vec<Value>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with documents, replacing existing content
    pub fn seed(&self, scope: &Scope, collection: &str, documents: Vec<Value>) -> Result<()> {
        let mut collections = self.collections.write().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })?;
        collections.insert(
            (scope.project.clone(), scope.collection(collection)),
            documents,
        );
        Ok(())
    }
}

impl LocalStore for MemoryStore {
    fn find(&self, scope: &Scope, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        let collections = self.collections.read().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })?;
        let key = (scope.project.clone(), scope.collection(collection));
        Ok(collections
            .get(&key)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|d| filter.matches(d))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn upsert(&self, scope: &Scope, collection: &str, id: &str, document: Value) -> Result<()> {
        let document = with_id(id, document).map_err(|e| relabel(e, scope, collection))?;
        let mut collections = self.collections.write().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })?;
        let key = (scope.project.clone(), scope.collection(collection));
        upsert_into(collections.entry(key).or_default(), id, document);
        Ok(())
    }

    fn remove_one(&self, scope: &Scope, collection: &str, id: &str) -> Result<bool> {
        let mut collections = self.collections.write().map_err(|_| Error::LockPoisoned {
            context: "memory store".to_string(),
        })?;
        let key = (scope.project.clone(), scope.collection(collection));
        Ok(collections
            .get_mut(&key)
            .map(|documents| remove_from(documents, id))
            .unwrap_or(false))
    }
}

fn relabel(error: Error, scope: &Scope, collection: &str) -> Error {
    match error {
        Error::InvalidDocument { message, .. } => Error::InvalidDocument {
            collection: format!("{}:{}", scope.project, scope.collection(collection)),
            message,
        },
        other => other,
    }
}

/// File-backed store: `<root>/<project>/<environment>.<collection>.json`
///
/// Each collection is a JSON array. Writes go to a sibling temporary file
/// that is renamed over the original, so readers never see a torn file.
/// A process-wide lock serializes read-modify-write cycles of this handle.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    write_lock: Arc<RwLock<()>>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `collection` in `scope`
    pub fn collection_path(&self, scope: &Scope, collection: &str) -> PathBuf {
        let file_name = format!("{}.json", scope.collection(collection).replace('/', "_"));
        self.root.join(&scope.project).join(file_name)
    }

    fn read_collection(&self, path: &Path) -> Result<Vec<Value>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        match serde_json::from_str::<Value>(&content)? {
            Value::Array(documents) => Ok(documents),
            _ => Err(Error::Storage {
                message: format!("{} does not contain a JSON array", path.display()),
            }),
        }
    }

    fn write_collection(&self, path: &Path, documents: &[Value]) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, serde_json::to_vec_pretty(documents)?)?;
        fs::rename(&tmp_path, path)?;
        debug!("Wrote {} document(s) to {}", documents.len(), path.display());
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn find(&self, scope: &Scope, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        let _guard = self.write_lock.read().map_err(|_| Error::LockPoisoned {
            context: "file store".to_string(),
        })?;
        let documents = self.read_collection(&self.collection_path(scope, collection))?;
        Ok(documents.into_iter().filter(|d| filter.matches(d)).collect())
    }

    fn upsert(&self, scope: &Scope, collection: &str, id: &str, document: Value) -> Result<()> {
        let document = with_id(id, document).map_err(|e| relabel(e, scope, collection))?;
        let _guard = self.write_lock.write().map_err(|_| Error::LockPoisoned {
            context: "file store".to_string(),
        })?;
        let path = self.collection_path(scope, collection);
        let mut documents = self.read_collection(&path)?;
        upsert_into(&mut documents, id, document);
        self.write_collection(&path, &documents)
    }

    fn remove_one(&self, scope: &Scope, collection: &str, id: &str) -> Result<bool> {
        let _guard = self.write_lock.write().map_err(|_| Error::LockPoisoned {
            context: "file store".to_string(),
        })?;
        let path = self.collection_path(scope, collection);
        let mut documents = self.read_collection(&path)?;
        let removed = remove_from(&mut documents, id);
        if removed {
            self.write_collection(&path, &documents)?;
        }
        Ok(removed)
    }
}
