//! # Schema Compilation
//!
//! Folds a schema's ancestor chain into one [`CompiledSchema`].
//!
//! ## Precedence
//!
//! The chain is walked from `schemaId` up through `parentSchemaId` links and
//! then reversed, so folding happens root-most ancestor first:
//!
//! 1.  `tabs` and `fields.properties` of each ancestor are overlaid onto the
//!     accumulator. A more specific ancestor overwrites same-key entries from a
//!     less specific one.
//! 2.  `icon`, `editorId` and `defaultTabId` take the most specific non-empty
//!     value, as does a non-empty `allowedChildSchemas` list.
//! 3.  Entries not owned by the compiled schema itself are tagged with the id
//!     of the ancestor that supplied them. They are visible to the child but
//!     read-only from its perspective.
//!
//! A missing icon falls back to the engine default; a field schema whose chain
//! never names an editor falls back to the default editor. Content schemas
//! never carry an editor.
//!
//! Compilation is all-or-nothing: a cycle or a dangling parent reference fails
//! the whole call and no partial result is produced.

use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::defaults::{DEFAULT_FIELD_EDITOR, DEFAULT_ICON};
use crate::error::Result;
use crate::schema::{FieldDefinition, SchemaSet, SchemaType};

/// Engine-level fallbacks for values no ancestor supplies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaDefaults {
    pub icon: String,
    pub editor: String,
}

impl Default for SchemaDefaults {
    fn default() -> Self {
        Self {
            icon: DEFAULT_ICON.to_string(),
            editor: DEFAULT_FIELD_EDITOR.to_string(),
        }
    }
}

/// A tab as seen by the compiled schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledTab {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
}

impl CompiledTab {
    pub fn is_inherited(&self) -> bool {
        self.inherited_from.is_some()
    }
}

/// A field as seen by the compiled schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledField {
    #[serde(flatten)]
    pub definition: FieldDefinition,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<String>,
}

impl CompiledField {
    pub fn is_inherited(&self) -> bool {
        self.inherited_from.is_some()
    }
}

/// The fully resolved view of a schema and its ancestors
///
/// Derived on demand and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSchema {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_tab_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_child_schemas: Vec<String>,
    pub tabs: BTreeMap<String, CompiledTab>,
    pub properties: BTreeMap<String, CompiledField>,
    /// Ids of the folded chain, root-most first, ending with `id`
    pub chain: Vec<String>,
    pub locked: bool,
}

impl CompiledSchema {
    /// Ids of the ancestors, excluding the schema itself
    pub fn ancestor_ids(&self) -> &[String] {
        &self.chain[..self.chain.len().saturating_sub(1)]
    }

    /// Whether the chain passes through `schema_id` (including itself)
    pub fn depends_on(&self, schema_id: &str) -> bool {
        self.chain.iter().any(|id| id == schema_id)
    }

    /// Whether the tab `key` may be structurally edited from this schema
    pub fn can_edit_tab(&self, key: &str) -> bool {
        !self.locked && self.tabs.get(key).is_some_and(|tab| !tab.is_inherited())
    }

    /// Whether the field `key` may be structurally edited from this schema
    pub fn can_edit_field(&self, key: &str) -> bool {
        !self.locked
            && self
                .properties
                .get(key)
                .is_some_and(|field| !field.is_inherited())
    }

    /// Tab ids referenced by fields but not defined on any tab
    pub fn dangling_tab_references(&self) -> Vec<(String, String)> {
        self.properties
            .iter()
            .filter_map(|(key, field)| {
                let tab_id = field.definition.tab_id.as_deref()?;
                // "meta" is the implicit tab every content schema has
                if tab_id == "meta" || self.tabs.contains_key(tab_id) {
                    None
                } else {
                    Some((key.clone(), tab_id.to_string()))
                }
            })
            .collect()
    }
}

/// Resolves schemas against their ancestor chain
#[derive(Debug, Clone, Default)]
pub struct SchemaResolver {
    defaults: SchemaDefaults,
}

impl SchemaResolver {
    pub fn new(defaults: SchemaDefaults) -> Self {
        Self { defaults }
    }

    pub fn defaults(&self) -> &SchemaDefaults {
        &self.defaults
    }

    /// Compile `schema_id` against the schemas in `set`
    ///
    /// # Errors
    ///
    /// - `CycleDetected` when the ancestor walk revisits a schema.
    /// - `NotFound` when `schema_id` or any referenced parent is missing.
    pub fn compile(&self, set: &SchemaSet, schema_id: &str) -> Result<CompiledSchema> {
        let chain = set.ancestors(schema_id)?;
        debug!(
            "Compiling schema '{}' through {} ancestor(s)",
            schema_id,
            chain.len() - 1
        );

        let leaf = chain[chain.len() - 1];

        let mut tabs: BTreeMap<String, CompiledTab> = BTreeMap::new();
        let mut properties: BTreeMap<String, CompiledField> = BTreeMap::new();
        let mut icon: Option<&str> = None;
        let mut editor_id: Option<&str> = None;
        let mut default_tab_id: Option<&str> = None;
        let mut allowed_child_schemas: &[String] = &[];

        for schema in &chain {
            let inherited_from = if schema.id == leaf.id {
                None
            } else {
                Some(schema.id.clone())
            };

            for (key, label) in &schema.tabs {
                tabs.insert(
                    key.clone(),
                    CompiledTab {
                        label: label.clone(),
                        inherited_from: inherited_from.clone(),
                    },
                );
            }

            for (key, definition) in &schema.fields.properties {
                properties.insert(
                    key.clone(),
                    CompiledField {
                        definition: definition.clone(),
                        inherited_from: inherited_from.clone(),
                    },
                );
            }

            icon = non_empty(schema.icon.as_deref()).or(icon);
            editor_id = non_empty(schema.editor_id.as_deref()).or(editor_id);
            default_tab_id = non_empty(schema.default_tab_id.as_deref()).or(default_tab_id);
            if !schema.allowed_child_schemas.is_empty() {
                allowed_child_schemas = &schema.allowed_child_schemas;
            }
        }

        let editor_id = match leaf.schema_type {
            SchemaType::Field => Some(
                editor_id
                    .map(str::to_string)
                    .unwrap_or_else(|| self.defaults.editor.clone()),
            ),
            SchemaType::Content => None,
        };

        Ok(CompiledSchema {
            id: leaf.id.clone(),
            name: leaf.name.clone(),
            schema_type: leaf.schema_type,
            icon: icon
                .map(str::to_string)
                .unwrap_or_else(|| self.defaults.icon.clone()),
            editor_id,
            default_tab_id: default_tab_id.map(str::to_string),
            allowed_child_schemas: allowed_child_schemas.to_vec(),
            tabs,
            properties,
            chain: chain.iter().map(|s| s.id.clone()).collect(),
            locked: leaf.locked,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::schema::Schema;

    fn content(id: &str, parent: Option<&str>) -> Schema {
        Schema {
            parent_schema_id: parent.map(str::to_string),
            ..Schema::new(id, SchemaType::Content)
        }
    }

    fn field(label: &str, tab: &str) -> FieldDefinition {
        FieldDefinition {
            label: Some(label.to_string()),
            tab_id: Some(tab.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_compile_merges_parent_tabs() {
        let mut base = content("base", None);
        base.tabs.insert("meta".to_string(), "Meta".to_string());
        let mut child = content("child", Some("base"));
        child.tabs.insert("extra".to_string(), "Extra".to_string());

        let set = SchemaSet::new(vec![base, child]);
        let compiled = SchemaResolver::default().compile(&set, "child").unwrap();

        assert_eq!(compiled.tabs.len(), 2);
        assert_eq!(compiled.tabs["meta"].label, "Meta");
        assert_eq!(compiled.tabs["extra"].label, "Extra");
        assert_eq!(compiled.tabs["meta"].inherited_from.as_deref(), Some("base"));
        assert!(!compiled.tabs["extra"].is_inherited());
    }

    #[test]
    fn test_compile_precedence_three_levels() {
        let mut grandparent = content("g", None);
        grandparent
            .fields
            .properties
            .insert("title".to_string(), field("G title", "content"));
        grandparent
            .fields
            .properties
            .insert("body".to_string(), field("G body", "content"));

        let mut parent = content("p", Some("g"));
        parent
            .fields
            .properties
            .insert("title".to_string(), field("P title", "content"));
        parent
            .fields
            .properties
            .insert("body".to_string(), field("P body", "content"));

        let mut child = content("s", Some("p"));
        child
            .fields
            .properties
            .insert("body".to_string(), field("S body", "content"));

        let set = SchemaSet::new(vec![grandparent, parent, child]);
        let compiled = SchemaResolver::default().compile(&set, "s").unwrap();

        // Overridden in P, untouched in S -> P's value
        let title = &compiled.properties["title"];
        assert_eq!(title.definition.label.as_deref(), Some("P title"));
        assert_eq!(title.inherited_from.as_deref(), Some("p"));

        // Overridden again in S -> S's value
        let body = &compiled.properties["body"];
        assert_eq!(body.definition.label.as_deref(), Some("S body"));
        assert!(!body.is_inherited());

        assert_eq!(compiled.chain, vec!["g", "p", "s"]);
        assert_eq!(compiled.ancestor_ids(), &["g".to_string(), "p".to_string()]);
    }

    #[test]
    fn test_compile_icon_most_specific_non_empty() {
        let mut base = content("base", None);
        base.icon = Some("book".to_string());
        let mut middle = content("middle", Some("base"));
        middle.icon = Some("".to_string());
        let leaf = content("leaf", Some("middle"));

        let set = SchemaSet::new(vec![base, middle, leaf]);
        let compiled = SchemaResolver::default().compile(&set, "leaf").unwrap();
        assert_eq!(compiled.icon, "book");
    }

    #[test]
    fn test_compile_icon_falls_back_to_default() {
        let set = SchemaSet::new(vec![content("lonely", None)]);
        let resolver = SchemaResolver::new(SchemaDefaults {
            icon: "question".to_string(),
            editor: "json".to_string(),
        });
        let compiled = resolver.compile(&set, "lonely").unwrap();
        assert_eq!(compiled.icon, "question");
        assert_eq!(compiled.editor_id, None);
    }

    #[test]
    fn test_compile_field_schema_editor_inheritance() {
        let mut string = Schema::new("string", SchemaType::Field);
        string.editor_id = Some("string-editor".to_string());
        let mut slug = Schema::new("slug", SchemaType::Field);
        slug.parent_schema_id = Some("string".to_string());
        let bare = Schema::new("bare", SchemaType::Field);

        let set = SchemaSet::new(vec![string, slug, bare]);
        let resolver = SchemaResolver::default();

        let compiled = resolver.compile(&set, "slug").unwrap();
        assert_eq!(compiled.editor_id.as_deref(), Some("string-editor"));

        let compiled = resolver.compile(&set, "bare").unwrap();
        assert_eq!(compiled.editor_id.as_deref(), Some(DEFAULT_FIELD_EDITOR));
    }

    #[test]
    fn test_compile_default_tab_and_allowed_children() {
        let mut base = content("base", None);
        base.default_tab_id = Some("content".to_string());
        base.allowed_child_schemas = vec!["section".to_string()];
        let mut page = content("page", Some("base"));
        page.allowed_child_schemas = vec!["article".to_string(), "gallery".to_string()];
        let mut article = content("article", Some("page"));
        article.default_tab_id = Some("seo".to_string());

        let set = SchemaSet::new(vec![base, page, article]);
        let compiled = SchemaResolver::default().compile(&set, "article").unwrap();

        assert_eq!(compiled.default_tab_id.as_deref(), Some("seo"));
        assert_eq!(compiled.allowed_child_schemas, vec!["article", "gallery"]);
    }

    #[test]
    fn test_compile_cycle_fails() {
        let set = SchemaSet::new(vec![content("a", Some("b")), content("b", Some("a"))]);
        let result = SchemaResolver::default().compile(&set, "a");
        assert!(matches!(result, Err(Error::CycleDetected { .. })));
    }

    #[test]
    fn test_compile_self_reference_fails() {
        let set = SchemaSet::new(vec![content("me", Some("me"))]);
        let result = SchemaResolver::default().compile(&set, "me");
        assert!(matches!(result, Err(Error::CycleDetected { .. })));
    }

    #[test]
    fn test_compile_missing_schema_fails() {
        let set = SchemaSet::default();
        let result = SchemaResolver::default().compile(&set, "ghost");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_compile_missing_parent_fails() {
        let set = SchemaSet::new(vec![content("orphan", Some("gone"))]);
        let result = SchemaResolver::default().compile(&set, "orphan");
        assert!(matches!(result, Err(Error::NotFound { .. })));
    }

    #[test]
    fn test_compile_is_deterministic() {
        let mut base = content("base", None);
        for i in 0..20 {
            base.tabs.insert(format!("tab{}", i), format!("Tab {}", i));
        }
        let set = SchemaSet::new(vec![base, content("child", Some("base"))]);
        let resolver = SchemaResolver::default();

        let first = serde_json::to_string(&resolver.compile(&set, "child").unwrap()).unwrap();
        let second = serde_json::to_string(&resolver.compile(&set, "child").unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_locked_and_inherited_entries_are_not_editable() {
        let mut base = content("base", None);
        base.tabs.insert("meta".to_string(), "Meta".to_string());
        let mut child = content("child", Some("base"));
        child.tabs.insert("own".to_string(), "Own".to_string());

        let mut system = content("system", None);
        system.locked = true;
        system.tabs.insert("own".to_string(), "Own".to_string());

        let set = SchemaSet::new(vec![base, child, system]);
        let resolver = SchemaResolver::default();

        let compiled = resolver.compile(&set, "child").unwrap();
        assert!(compiled.can_edit_tab("own"));
        assert!(!compiled.can_edit_tab("meta"));
        assert!(!compiled.can_edit_tab("missing"));

        let compiled = resolver.compile(&set, "system").unwrap();
        assert!(compiled.locked);
        assert!(!compiled.can_edit_tab("own"));
    }

    #[test]
    fn test_depends_on() {
        let set = SchemaSet::new(vec![content("base", None), content("child", Some("base"))]);
        let compiled = SchemaResolver::default().compile(&set, "child").unwrap();
        assert!(compiled.depends_on("base"));
        assert!(compiled.depends_on("child"));
        assert!(!compiled.depends_on("other"));
    }

    #[test]
    fn test_dangling_tab_references() {
        let mut schema = content("page", None);
        schema.tabs.insert("content".to_string(), "Content".to_string());
        schema
            .fields
            .properties
            .insert("title".to_string(), field("Title", "content"));
        schema
            .fields
            .properties
            .insert("slug".to_string(), field("Slug", "seo"));
        schema
            .fields
            .properties
            .insert("author".to_string(), field("Author", "meta"));

        let set = SchemaSet::new(vec![schema]);
        let compiled = SchemaResolver::default().compile(&set, "page").unwrap();
        assert_eq!(
            compiled.dangling_tab_references(),
            vec![("slug".to_string(), "seo".to_string())]
        );
    }
}
