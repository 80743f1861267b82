//! # Resolution Engine
//!
//! [`Engine`] is the public face of the crate. It owns the resolution cache
//! and wires the local store, the remote directory, the schema resolver and
//! the registry together.
//!
//! ## Reads
//!
//! Every read consults the cache first. On a miss the sync layer resolves the
//! resource (remote first, local fallback) and the result is cached unless a
//! write invalidated the cache while it was being computed.
//!
//! ## Writes
//!
//! Every write is persisted through the sync layer first and only then
//! invalidates the cache entries it affects:
//!
//! - resource and tree entries of the same project environment and class,
//! - for schemas, the compiled entry of the written schema, the entries of
//!   its descendants in the set the write was checked against, and every
//!   compiled entry whose ancestor chain contains it.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;

use crate::cache::{CacheKey, CachedValue, ResolutionCache, ResourceKey, SchemaKey};
use crate::compile::{CompiledSchema, SchemaResolver};
use crate::config::Config;
use crate::defaults::default_storage_root;
use crate::error::{Error, Result};
use crate::path::normalize_folder;
use crate::registry::{Artifact, DeployOutcome, Registry};
use crate::remote::Remotes;
use crate::schema::{Schema, SchemaSet, SchemaType};
use crate::store::{document_id, FileStore, Filter, LocalStore, Scope};
use crate::sync::{ResourceClass, SyncResolver, WriteOutcome};
use crate::tree::{build_tree, items_from_documents, TreeItem};

/// How serious a validation finding is
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// What a validation finding is about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum IssueKind {
    Cycle { cycle: String },
    MissingParent { detail: String },
    UnknownEditor { editor: String },
    DanglingTab { field: String, tab: String },
}

/// A single validation finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub schema_id: String,
    pub severity: Severity,
    #[serde(flatten)]
    pub kind: IssueKind,
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            IssueKind::Cycle { cycle } => write!(f, "{}: inheritance cycle {}", self.schema_id, cycle),
            IssueKind::MissingParent { detail } => {
                write!(f, "{}: missing ancestor {}", self.schema_id, detail)
            }
            IssueKind::UnknownEditor { editor } => {
                write!(f, "{}: editor '{}' is not registered", self.schema_id, editor)
            }
            IssueKind::DanglingTab { field, tab } => write!(
                f,
                "{}: field '{}' references undefined tab '{}'",
                self.schema_id, field, tab
            ),
        }
    }
}

/// Findings of [`Engine::validate`], ordered by schema id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub checked: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Warning)
    }

    /// Whether the report passes; `strict` also fails on warnings
    pub fn is_ok(&self, strict: bool) -> bool {
        if strict {
            self.issues.is_empty()
        } else {
            self.errors().next().is_none()
        }
    }
}

/// The resolution engine
pub struct Engine {
    store: Arc<dyn LocalStore>,
    sync: SyncResolver,
    resolver: SchemaResolver,
    registry: Registry,
    cache: ResolutionCache,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("sync", &self.sync)
            .field("resolver", &self.resolver)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl Engine {
    pub fn new(
        config: &Config,
        store: Arc<dyn LocalStore>,
        remotes: Remotes,
        registry: Registry,
    ) -> Self {
        Self {
            store,
            sync: SyncResolver::new(remotes, Duration::from_millis(config.sync.timeout_ms)),
            resolver: SchemaResolver::new(config.defaults.clone()),
            registry,
            cache: ResolutionCache::new(),
        }
    }

    /// Build an engine over a file store and the configured HTTP remotes
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let root = config.storage.clone().unwrap_or_else(default_storage_root);
        debug!("Using storage root {}", root.display());
        Ok(Self::new(
            config,
            Arc::new(FileStore::new(root)),
            Remotes::from_config(config)?,
            Registry::with_builtin_editors(),
        ))
    }

    pub fn store(&self) -> &dyn LocalStore {
        self.store.as_ref()
    }

    pub fn cache(&self) -> &ResolutionCache {
        &self.cache
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// The canonical view of `class` in `scope`
    pub fn resolve(&self, scope: &Scope, class: &ResourceClass) -> Result<Vec<Value>> {
        let key = CacheKey::Resource(ResourceKey::new(scope, &class.name, None));
        let value = self.cache.get_or_compute(key.clone(), || {
            let documents = self.sync.resolve(scope, class, || {
                self.store.find(scope, &class.collection, &Filter::All)
            })?;
            Ok(CachedValue::Resources(documents))
        })?;
        into_resources(&key, value)
    }

    /// A single item of the canonical view of `class`
    pub fn resolve_item(&self, scope: &Scope, class: &ResourceClass, id: &str) -> Result<Value> {
        let key = CacheKey::Resource(ResourceKey::new(scope, &class.name, Some(id)));
        let value = self.cache.get_or_compute(key.clone(), || {
            let document = self
                .resolve(scope, class)?
                .into_iter()
                .find(|d| document_id(d) == Some(id))
                .ok_or_else(|| Error::not_found(&class.name, id))?;
            Ok(CachedValue::Resources(vec![document]))
        })?;
        into_resources(&key, value)?
            .into_iter()
            .next()
            .ok_or_else(|| Error::not_found(&class.name, id))
    }

    /// The media library as a rooted tree
    pub fn media_tree(&self, scope: &Scope) -> Result<Vec<TreeItem>> {
        self.tree(scope, &ResourceClass::media_tree())
    }

    /// Any tree-shaped class as a rooted tree
    pub fn tree(&self, scope: &Scope, class: &ResourceClass) -> Result<Vec<TreeItem>> {
        let key = CacheKey::Tree(ResourceKey::new(scope, &class.name, None));
        let value = self.cache.get_or_compute(key.clone(), || {
            let documents = self.sync.resolve(scope, class, || {
                self.store.find(scope, &class.collection, &Filter::All)
            })?;
            Ok(CachedValue::Tree(build_tree(items_from_documents(&documents))))
        })?;
        match value {
            CachedValue::Tree(tree) => Ok(tree),
            _ => Err(unexpected_entry(&key)),
        }
    }

    /// Set (`Some`) or remove (`None`) one media item
    ///
    /// The item is stored under `id` with its folder normalized.
    pub fn write_tree_item(
        &self,
        scope: &Scope,
        id: &str,
        item: Option<TreeItem>,
    ) -> Result<WriteOutcome> {
        let document = item.map(|mut item| {
            item.id = id.to_string();
            item.folder = normalize_folder(&item.folder);
            item.to_document()
        });
        self.write(scope, &ResourceClass::media_tree(), id, document)
    }

    /// Like [`Engine::write_tree_item`], returning the fresh tree
    pub fn set_tree_item(
        &self,
        scope: &Scope,
        id: &str,
        item: Option<TreeItem>,
    ) -> Result<Vec<TreeItem>> {
        self.write_tree_item(scope, id, item)?;
        self.media_tree(scope)
    }

    /// Write (`Some`) or delete (`None`) one item of `class`
    pub fn write(
        &self,
        scope: &Scope,
        class: &ResourceClass,
        id: &str,
        item: Option<Value>,
    ) -> Result<WriteOutcome> {
        self.write_with_dependents(scope, class, id, item, &[])
    }

    /// Persist, then invalidate `id` along with the compiled `dependents`
    fn write_with_dependents(
        &self,
        scope: &Scope,
        class: &ResourceClass,
        id: &str,
        item: Option<Value>,
        dependents: &[String],
    ) -> Result<WriteOutcome> {
        let outcome = self.sync.write(scope, class, id, item, self.store.as_ref())?;
        self.invalidate_after_write(scope, class, id, dependents)?;
        Ok(outcome)
    }

    fn invalidate_after_write(
        &self,
        scope: &Scope,
        class: &ResourceClass,
        id: &str,
        dependents: &[String],
    ) -> Result<()> {
        let schemas = class.name == ResourceClass::schemas().name;
        let removed = self.cache.invalidate(|key, value| match key {
            CacheKey::Resource(k) | CacheKey::Tree(k) => k.in_scope(scope) && k.class == class.name,
            CacheKey::Schema(k) => {
                schemas
                    && k.in_scope(scope)
                    && (k.id == id
                        || dependents.contains(&k.id)
                        || matches!(value, CachedValue::Schema(compiled) if compiled.depends_on(id)))
            }
        })?;
        debug!(
            "Write of {} '{}' for {} invalidated {} cache entr(ies)",
            class, id, scope, removed
        );
        Ok(())
    }

    /// Every schema visible in `scope`, local and remote
    pub fn schema_set(&self, scope: &Scope) -> Result<SchemaSet> {
        SchemaSet::from_documents(&self.resolve(scope, &ResourceClass::schemas())?)
    }

    /// Compile `schema_id` against its ancestor chain
    pub fn compile(&self, scope: &Scope, schema_id: &str) -> Result<CompiledSchema> {
        let key = CacheKey::Schema(SchemaKey::new(scope, schema_id));
        let value = self.cache.get_or_compute(key.clone(), || {
            let set = self.schema_set(scope)?;
            Ok(CachedValue::Schema(self.resolver.compile(&set, schema_id)?))
        })?;
        into_schema(&key, value)
    }

    /// Compile every schema of `scope` in parallel, ordered by id
    ///
    /// One schema failing does not fail the others.
    pub fn compile_all(&self, scope: &Scope) -> Result<Vec<(String, Result<CompiledSchema>)>> {
        let set = self.schema_set(scope)?;
        Ok(set
            .ids()
            .into_par_iter()
            .map(|id| {
                let key = CacheKey::Schema(SchemaKey::new(scope, &id));
                let compiled = self
                    .cache
                    .get_or_compute(key.clone(), || {
                        Ok(CachedValue::Schema(self.resolver.compile(&set, &id)?))
                    })
                    .and_then(|value| into_schema(&key, value));
                (id, compiled)
            })
            .collect())
    }

    /// Check every schema of `scope` for broken chains and dangling references
    pub fn validate(&self, scope: &Scope) -> Result<ValidationReport> {
        let set = self.schema_set(scope)?;
        let mut report = ValidationReport {
            checked: set.len(),
            issues: Vec::new(),
        };

        for id in set.ids() {
            let compiled = match self.resolver.compile(&set, &id) {
                Ok(compiled) => compiled,
                Err(Error::CycleDetected { cycle }) => {
                    report.issues.push(ValidationIssue {
                        schema_id: id,
                        severity: Severity::Error,
                        kind: IssueKind::Cycle { cycle },
                    });
                    continue;
                }
                Err(Error::NotFound { id: detail, .. }) => {
                    report.issues.push(ValidationIssue {
                        schema_id: id,
                        severity: Severity::Error,
                        kind: IssueKind::MissingParent { detail },
                    });
                    continue;
                }
                Err(e) => return Err(e),
            };

            if compiled.schema_type == SchemaType::Field {
                if let Some(editor) = &compiled.editor_id {
                    if !self.registry.has_editor(editor) {
                        report.issues.push(ValidationIssue {
                            schema_id: id.clone(),
                            severity: Severity::Warning,
                            kind: IssueKind::UnknownEditor {
                                editor: editor.clone(),
                            },
                        });
                    }
                }
            }

            for (field, tab) in compiled.dangling_tab_references() {
                report.issues.push(ValidationIssue {
                    schema_id: id.clone(),
                    severity: Severity::Warning,
                    kind: IssueKind::DanglingTab { field, tab },
                });
            }
        }

        Ok(report)
    }

    /// Persist `schema`, rejecting edits of locked schemas and new cycles
    pub fn write_schema(&self, scope: &Scope, schema: Schema) -> Result<WriteOutcome> {
        let mut set = self.schema_set(scope)?;
        if let Some(existing) = set.get(&schema.id) {
            if existing.locked {
                return Err(Error::Locked {
                    id: schema.id.clone(),
                });
            }
        }

        let id = schema.id.clone();
        let document = schema.to_document()?;
        set.insert(schema);
        // Dangling parents are reported by `validate`, not rejected
        if let Err(e @ Error::CycleDetected { .. }) = set.ancestors(&id) {
            return Err(e);
        }

        let dependents = set.descendants(&id);
        self.write_with_dependents(scope, &ResourceClass::schemas(), &id, Some(document), &dependents)
    }

    /// Delete a schema, rejecting locked ones
    pub fn delete_schema(&self, scope: &Scope, id: &str) -> Result<WriteOutcome> {
        let set = self.schema_set(scope)?;
        let existing = set.get(id).ok_or_else(|| Error::not_found("Schema", id))?;
        if existing.locked {
            return Err(Error::Locked { id: id.to_string() });
        }

        let dependents = set.descendants(id);
        if !dependents.is_empty() {
            warn!(
                "Deleting schema '{}' for {} leaves {} without an ancestor: {}",
                id,
                scope,
                dependents.len(),
                dependents.join(", ")
            );
        }
        self.write_with_dependents(scope, &ResourceClass::schemas(), id, None, &dependents)
    }

    /// Publish an artifact through a registered deployer
    pub fn deploy(&self, deployer: &str, artifact: &Artifact) -> Result<DeployOutcome> {
        self.registry.deploy(deployer, artifact)
    }
}

fn unexpected_entry(key: &CacheKey) -> Error {
    Error::Storage {
        message: format!("cache entry for {} has an unexpected kind", key),
    }
}

fn into_resources(key: &CacheKey, value: CachedValue) -> Result<Vec<Value>> {
    match value {
        CachedValue::Resources(documents) => Ok(documents),
        _ => Err(unexpected_entry(key)),
    }
}

fn into_schema(key: &CacheKey, value: CachedValue) -> Result<CompiledSchema> {
    match value {
        CachedValue::Schema(compiled) => Ok(compiled),
        _ => Err(unexpected_entry(key)),
    }
}
