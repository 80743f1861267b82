//! In-process memoization of resolved resources, trees and compiled schemas
//!
//! The cache is the only mutable state shared between resolution flows. It
//! never expires entries by time: the engine invalidates explicitly after
//! every write it performs.
//!
//! Every invalidation bumps an epoch. [`ResolutionCache::get_or_compute`]
//! remembers the epoch it started under and only stores its result if no
//! invalidation happened in the meantime, so a read that races a write can
//! never put pre-write data back into the cache.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use log::debug;
use serde_json::Value;

use crate::compile::CompiledSchema;
use crate::error::{Error, Result};
use crate::store::Scope;
use crate::tree::TreeItem;

/// Key of a resolved resource collection or item
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub project: String,
    pub environment: String,
    pub class: String,
    pub id: Option<String>,
}

impl ResourceKey {
    pub fn new(scope: &Scope, class: &str, id: Option<&str>) -> Self {
        Self {
            project: scope.project.clone(),
            environment: scope.environment.clone(),
            class: class.to_string(),
            id: id.map(str::to_string),
        }
    }

    pub fn in_scope(&self, scope: &Scope) -> bool {
        self.project == scope.project && self.environment == scope.environment
    }
}

/// Key of a compiled schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    pub project: String,
    pub environment: String,
    pub id: String,
}

impl SchemaKey {
    pub fn new(scope: &Scope, id: &str) -> Self {
        Self {
            project: scope.project.clone(),
            environment: scope.environment.clone(),
            id: id.to_string(),
        }
    }

    pub fn in_scope(&self, scope: &Scope) -> bool {
        self.project == scope.project && self.environment == scope.environment
    }
}

/// Cache key combining the kind of entry with its scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Resource(ResourceKey),
    Tree(ResourceKey),
    Schema(SchemaKey),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Resource(key) | CacheKey::Tree(key) => {
                let kind = if matches!(self, CacheKey::Tree(_)) {
                    "tree"
                } else {
                    "resource"
                };
                write!(
                    f,
                    "{} {}/{}/{}",
                    kind, key.project, key.environment, key.class
                )?;
                if let Some(id) = &key.id {
                    write!(f, "/{}", id)?;
                }
                Ok(())
            }
            CacheKey::Schema(key) => {
                write!(f, "schema {}/{}/{}", key.project, key.environment, key.id)
            }
        }
    }
}

/// A memoized value
#[derive(Debug, Clone, PartialEq)]
pub enum CachedValue {
    Resources(Vec<Value>),
    Tree(Vec<TreeItem>),
    Schema(CompiledSchema),
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, CachedValue>,
    epoch: u64,
}

/// Thread-safe cache for resolution results
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    state: Arc<RwLock<CacheState>>,
}

impl ResolutionCache {
    /// Create a new empty cache
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, CacheState>> {
        self.state.read().map_err(|_| Error::LockPoisoned {
            context: "resolution cache".to_string(),
        })
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, CacheState>> {
        self.state.write().map_err(|_| Error::LockPoisoned {
            context: "resolution cache".to_string(),
        })
    }

    /// Get a value from the cache without computing
    pub fn get(&self, key: &CacheKey) -> Result<Option<CachedValue>> {
        Ok(self.read()?.entries.get(key).cloned())
    }

    /// Unconditionally insert a value
    pub fn put(&self, key: CacheKey, value: CachedValue) -> Result<()> {
        self.write()?.entries.insert(key, value);
        Ok(())
    }

    /// Current invalidation epoch
    pub fn epoch(&self) -> Result<u64> {
        Ok(self.read()?.epoch)
    }

    /// Insert a value only if no invalidation happened since `epoch`
    ///
    /// Returns whether the value was stored.
    pub fn put_if_current(&self, epoch: u64, key: CacheKey, value: CachedValue) -> Result<bool> {
        let mut state = self.write()?;
        if state.epoch != epoch {
            debug!("Discarding stale computation for {}", key);
            return Ok(false);
        }
        state.entries.insert(key, value);
        Ok(true)
    }

    /// Remove every entry whose key matches `predicate`
    ///
    /// Always bumps the epoch, even when nothing matched, so in-flight
    /// computations started before the invalidation are not stored.
    pub fn invalidate<P>(&self, predicate: P) -> Result<usize>
    where
        P: Fn(&CacheKey, &CachedValue) -> bool,
    {
        let mut state = self.write()?;
        let before = state.entries.len();
        state.entries.retain(|key, value| !predicate(key, value));
        state.epoch = state.epoch.wrapping_add(1);
        let removed = before - state.entries.len();
        debug!("Invalidated {} cache entr(ies)", removed);
        Ok(removed)
    }

    /// Get a cached value, or compute and cache it if not present
    ///
    /// When `compute` fails nothing is stored and the error is returned.
    pub fn get_or_compute<F>(&self, key: CacheKey, compute: F) -> Result<CachedValue>
    where
        F: FnOnce() -> Result<CachedValue>,
    {
        let epoch = {
            let state = self.read()?;
            if let Some(cached) = state.entries.get(&key) {
                debug!("Cache hit for {}", key);
                return Ok(cached.clone());
            }
            state.epoch
        };

        debug!("Cache miss for {}", key);
        let value = compute()?;
        self.put_if_current(epoch, key, value.clone())?;
        Ok(value)
    }

    /// Check if a key exists in the cache
    pub fn contains(&self, key: &CacheKey) -> Result<bool> {
        Ok(self.read()?.entries.contains_key(key))
    }

    /// Get the number of cached entries
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.entries.len())
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.entries.is_empty())
    }

    /// Clear all cached entries
    pub fn clear(&self) -> Result<()> {
        let mut state = self.write()?;
        state.entries.clear();
        state.epoch = state.epoch.wrapping_add(1);
        Ok(())
    }
}
