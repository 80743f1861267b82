//! # Strata
//!
//! Layered resource resolution and synchronization for multi-tenant content
//! projects. Each project runs one or more environments, and an environment
//! may be linked to a remote, authoritative instance. This library provides
//! the engine that turns layered, partially synced data into one canonical
//! view and routes writes to the right store.
//!
//! ## Quick Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use strata::config::Config;
//! use strata::engine::Engine;
//! use strata::registry::Registry;
//! use strata::remote::Remotes;
//! use strata::store::{MemoryStore, Scope};
//!
//! let store = MemoryStore::new();
//! let scope = Scope::new("blog", "live");
//! store
//!     .seed(&scope, "schemas", vec![
//!         json!({"id": "base", "tabs": {"meta": "Meta"}}),
//!         json!({"id": "child", "parentSchemaId": "base", "tabs": {"extra": "Extra"}}),
//!     ])
//!     .unwrap();
//!
//! let engine = Engine::new(
//!     &Config::default(),
//!     Arc::new(store),
//!     Remotes::none(),
//!     Registry::with_builtin_editors(),
//! );
//!
//! let compiled = engine.compile(&scope, "child").unwrap();
//! assert_eq!(compiled.tabs.len(), 2);
//! assert!(compiled.tabs["meta"].is_inherited());
//! ```
//!
//! ## Core Concepts
//!
//! - **Folders (`path`)**: a total, idempotent normalizer for folder strings.
//! - **Trees (`tree`)**: flat, folder-tagged items materialized into a tree
//!   that always has exactly one root item.
//! - **Schemas (`schema`, `compile`)**: content-type schemas that inherit tabs,
//!   fields and metadata from a chain of parents, compiled into one view with
//!   cycle detection.
//! - **Sync (`sync`, `remote`, `store`)**: remote-first reads with a local
//!   fallback, per-class merge policies, and write routing.
//! - **Cache (`cache`)**: memoized results with explicit, epoch-guarded
//!   invalidation after every write.
//! - **Engine (`engine`)**: the composition root tying it all together, with
//!   an explicit `registry` of editors and deployers.

pub mod cache;
pub mod compile;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod output;
pub mod path;
pub mod registry;
pub mod remote;
pub mod schema;
pub mod store;
pub mod suggestions;
pub mod sync;
pub mod tree;

#[cfg(test)]
mod compile_proptest;
#[cfg(test)]
mod path_proptest;
