//! # Flat-to-Tree Materialization
//!
//! Hierarchical resources such as the media library are stored as a flat
//! collection of items, each tagged with the folder it lives in. This module
//! turns such a collection into a consistent tree view:
//!
//! - every folder is passed through [`normalize_folder`],
//! - exactly one root item `{ id: "*", folder: "/" }` is present,
//! - the relative order of the remaining items is preserved.
//!
//! No implicit sorting happens here. Callers that need parents before
//! children use [`sort_by_depth`].

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::{folder_depth, normalize_folder, ROOT_FOLDER};

/// Identifier of the synthesized root item
pub const ROOT_ID: &str = "*";

/// A single item of a flat, folder-tagged collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeItem {
    /// Item identity
    pub id: String,
    /// Folder the item lives in
    #[serde(default)]
    pub folder: String,
    /// Remaining document fields, passed through unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TreeItem {
    pub fn new(id: impl Into<String>, folder: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            folder: folder.into(),
            extra: Map::new(),
        }
    }

    /// The synthesized root item
    pub fn root() -> Self {
        Self::new(ROOT_ID, ROOT_FOLDER)
    }

    pub fn is_root(&self) -> bool {
        self.id == ROOT_ID
    }

    /// Convert a stored document into a tree item
    ///
    /// Returns `None` when the document has no string `id`. A missing or
    /// non-string `folder` is treated as the root folder.
    pub fn from_document(document: &Value) -> Option<Self> {
        let object = document.as_object()?;
        let id = object.get("id")?.as_str()?.to_string();
        let folder = object
            .get("folder")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        let extra = object
            .iter()
            .filter(|(key, _)| key.as_str() != "id" && key.as_str() != "folder")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        Some(Self { id, folder, extra })
    }

    /// Convert the item back into a storable document
    pub fn to_document(&self) -> Value {
        let mut object = self.extra.clone();
        object.insert("id".to_string(), Value::String(self.id.clone()));
        object.insert("folder".to_string(), Value::String(self.folder.clone()));
        Value::Object(object)
    }
}

/// Convert stored documents into tree items, skipping unusable documents
pub fn items_from_documents(documents: &[Value]) -> Vec<TreeItem> {
    documents
        .iter()
        .filter_map(|document| {
            let item = TreeItem::from_document(document);
            if item.is_none() {
                warn!("Skipping tree document without a string id: {}", document);
            }
            item
        })
        .collect()
}

/// Build a rooted tree from a flat sequence of items
///
/// Every folder is normalized, the root item is forced onto `/`, duplicate
/// root items after the first are dropped, and a root is prepended when the
/// input has none.
pub fn build_tree(items: Vec<TreeItem>) -> Vec<TreeItem> {
    let mut tree = Vec::with_capacity(items.len() + 1);
    let mut has_root = false;

    for mut item in items {
        if item.is_root() {
            if has_root {
                continue;
            }
            has_root = true;
            item.folder = ROOT_FOLDER.to_string();
        } else {
            item.folder = normalize_folder(&item.folder);
        }
        tree.push(item);
    }

    if !has_root {
        tree.insert(0, TreeItem::root());
    }

    tree
}

/// Apply a point update to a tree
///
/// Replaces the entry with a matching `id`, removes it when `item` is `None`,
/// or appends it when the id is new. The item's own `id` is overwritten with
/// `id`. The result is passed through [`build_tree`] again, so removing the
/// root re-synthesizes it.
pub fn set_item(tree: Vec<TreeItem>, id: &str, item: Option<TreeItem>) -> Vec<TreeItem> {
    let mut tree = tree;
    let position = tree.iter().position(|existing| existing.id == id);

    match (position, item) {
        (Some(index), Some(mut item)) => {
            item.id = id.to_string();
            tree[index] = item;
        }
        (Some(index), None) => {
            tree.remove(index);
        }
        (None, Some(mut item)) => {
            item.id = id.to_string();
            tree.push(item);
        }
        (None, None) => {}
    }

    build_tree(tree)
}

/// Stable sort by folder depth, shallowest first
pub fn sort_by_depth(items: &mut [TreeItem]) {
    items.sort_by_key(|item| folder_depth(&item.folder));
}

/// Items that live directly in `folder`, excluding the root item
pub fn children_of<'a>(tree: &'a [TreeItem], folder: &str) -> Vec<&'a TreeItem> {
    let folder = normalize_folder(folder);
    tree.iter()
        .filter(|item| !item.is_root() && item.folder == folder)
        .collect()
}
