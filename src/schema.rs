//! # Schema Data Model
//!
//! Schemas describe content types (`content`) and field types (`field`). A
//! schema may name a parent through `parentSchemaId`, forming an ancestor
//! chain that the [`compile`](crate::compile) module folds into a single
//! view.
//!
//! Schemas are stored as JSON documents with camelCase keys. Any key this
//! module does not know about is kept in an `extra` map so that documents
//! survive a read/modify/write cycle unchanged.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Kind of schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    /// A content type, made of tabs and fields
    #[default]
    Content,
    /// A field type, rendered by an editor
    Field,
}

/// Definition of a single field under `fields.properties`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub config: Value,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The `fields` block of a schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Fields {
    #[serde(default)]
    pub properties: BTreeMap<String, FieldDefinition>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A stored schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_schema_id: Option<String>,
    #[serde(default, rename = "type")]
    pub schema_type: SchemaType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// Editor used to render values of this schema (field schemas only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_child_schemas: Vec<String>,
    #[serde(default)]
    pub tabs: BTreeMap<String, String>,
    #[serde(default)]
    pub fields: Fields,
    /// System-provided schemas are locked against structural edits
    #[serde(default)]
    pub locked: bool,
    /// Set on schemas that came from a remote instance
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub remote: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Schema {
    pub fn new(id: impl Into<String>, schema_type: SchemaType) -> Self {
        Self {
            id: id.into(),
            schema_type,
            ..Default::default()
        }
    }

    /// Parse a stored document into a schema
    pub fn from_document(document: &Value) -> Result<Self> {
        serde_json::from_value(document.clone()).map_err(|e| Error::InvalidDocument {
            collection: "schemas".to_string(),
            message: e.to_string(),
        })
    }

    /// Serialize the schema into a storable document
    pub fn to_document(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// The parent id, treating an empty string as "no parent"
    pub fn parent_id(&self) -> Option<&str> {
        self.parent_schema_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// An id-indexed set of schemas from one project environment
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemas: HashMap<String, Schema>,
}

impl SchemaSet {
    pub fn new(schemas: impl IntoIterator<Item = Schema>) -> Self {
        Self {
            schemas: schemas.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }

    /// Build a set from stored documents
    ///
    /// Fails on the first document that is not a valid schema.
    pub fn from_documents(documents: &[Value]) -> Result<Self> {
        let schemas = documents
            .iter()
            .map(Schema::from_document)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(schemas))
    }

    pub fn get(&self, id: &str) -> Option<&Schema> {
        self.schemas.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.schemas.contains_key(id)
    }

    /// Insert or replace a schema, returning the previous version
    pub fn insert(&mut self, schema: Schema) -> Option<Schema> {
        self.schemas.insert(schema.id.clone(), schema)
    }

    pub fn remove(&mut self, id: &str) -> Option<Schema> {
        self.schemas.remove(id)
    }

    /// All schema ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.schemas.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Walk the ancestor chain of `id`
    ///
    /// Returns the chain ordered from the root-most ancestor down to `id`
    /// itself. Fails with `CycleDetected` when the walk revisits a schema and
    /// with `NotFound` when `id` or any referenced parent does not exist.
    pub fn ancestors(&self, id: &str) -> Result<Vec<&Schema>> {
        let mut walk: Vec<&Schema> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut current = self.get(id).ok_or_else(|| Error::not_found("Schema", id))?;

        loop {
            if !seen.insert(current.id.as_str()) {
                let mut cycle: Vec<&str> = walk.iter().map(|s| s.id.as_str()).collect();
                cycle.push(current.id.as_str());
                return Err(Error::CycleDetected {
                    cycle: cycle.join(" -> "),
                });
            }
            walk.push(current);

            // The walk visits each schema at most once, so it is bounded by the set size
            debug_assert!(walk.len() <= self.schemas.len());

            match current.parent_id() {
                Some(parent_id) => {
                    current = self.get(parent_id).ok_or_else(|| Error::NotFound {
                        kind: "Schema".to_string(),
                        id: format!("{} (parent of '{}')", parent_id, current.id),
                    })?;
                }
                None => break,
            }
        }

        walk.reverse();
        Ok(walk)
    }

    /// Ids of every schema whose ancestor chain passes through `id`
    ///
    /// The result excludes `id` itself and skips schemas whose chain is
    /// broken (cycle or missing parent), since those never compile.
    pub fn descendants(&self, id: &str) -> Vec<String> {
        let mut result: Vec<String> = self
            .schemas
            .keys()
            .filter(|candidate| candidate.as_str() != id)
            .filter(|candidate| {
                self.ancestors(candidate)
                    .map(|chain| chain.iter().any(|s| s.id == id))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        result.sort();
        result
    }
}
