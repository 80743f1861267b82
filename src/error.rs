//! # Error Handling
//!
//! This module defines the centralized error type for `strata`. It uses the
//! `thiserror` library to derive a single `Error` enum covering every failure
//! the engine can observe, and a `Result<T>` alias used throughout the crate.
//!
//! ## Propagation
//!
//! Only a subset of the variants ever reach a caller of the engine's public
//! read and write operations:
//!
//! - `CycleDetected` and `NotFound` are surfaced as failures of the call that
//!   observed them.
//! - `Network`, `RemoteProtocol` and `Timeout` are *transient sync errors*.
//!   The sync layer logs them and falls back to the local store; they are
//!   only visible to code that talks to a `RemoteEndpoint` directly.
//! - `Storage`, `InvalidDocument`, `Io` and the serialization wrappers come
//!   from the local store and propagate unchanged.
//!
//! `Error::is_transient()` is the single place that encodes this split.

use thiserror::Error;

/// Main error type for strata operations
#[derive(Error, Debug)]
pub enum Error {
    /// A schema's ancestor chain revisits a schema already seen in the walk.
    #[error("Cycle detected in schema inheritance: {cycle}")]
    CycleDetected { cycle: String },

    /// A referenced schema or resource does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// The remote endpoint could not be reached or answered with a failure status.
    #[error("Network operation error: {url} - {message}")]
    Network { url: String, message: String },

    /// The remote endpoint answered with a body that could not be decoded.
    #[error("Malformed remote response from {url}: {message}")]
    RemoteProtocol { url: String, message: String },

    /// A remote call did not complete within the configured bound.
    #[error("Remote {operation} timed out after {after_ms}ms")]
    Timeout { operation: String, after_ms: u64 },

    /// A structural edit was attempted on a locked (system-provided) schema.
    #[error("Schema '{id}' is locked and cannot be structurally modified")]
    Locked { id: String },

    /// The local store failed to read or persist a collection.
    #[error("Storage error: {message}")]
    Storage { message: String },

    /// A stored document does not have the expected shape.
    #[error("Invalid document in {collection}: {message}")]
    InvalidDocument { collection: String, message: String },

    /// An error occurred while parsing or validating the `strata.yaml` file.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error indicating that a lock guarding shared state has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A URL parsing error, wrapped from `url::ParseError`.
    #[error("URL parsing error: {0}")]
    UrlParse(#[from] url::ParseError),
}

impl Error {
    /// Shorthand for a `NotFound` error of the given kind.
    pub fn not_found(kind: &str, id: &str) -> Self {
        Error::NotFound {
            kind: kind.to_string(),
            id: id.to_string(),
        }
    }

    /// Returns true for faults that the sync layer absorbs by falling back
    /// to the local store.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Network { .. } | Error::RemoteProtocol { .. } | Error::Timeout { .. }
        )
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
