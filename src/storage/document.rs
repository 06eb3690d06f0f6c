//! Document store abstraction
//!
//! A minimal key/value document API (collection + key → JSON object) with
//! the two conditional primitives the ledger needs: create-if-absent and
//! write-if-unchanged. Every successful write bumps the document version.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Top-level document fields
pub type Document = Map<String, Value>;

/// A document together with the version it was read at
#[derive(Debug, Clone, PartialEq)]
pub struct VersionedDocument {
    pub version: u64,
    pub fields: Document,
}

/// Errors raised by document store implementations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Backend not reachable (closed pool, injected outage, ...)
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Document serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled
    #[error("Storage task failed: {0}")]
    TaskJoin(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reads a document. `None` when it does not exist.
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<VersionedDocument>>;

    /// Unconditional write. With `merge` the given top-level fields replace
    /// the stored ones and everything else is kept; without it the document
    /// is replaced wholesale. Creates the document when missing.
    async fn set(&self, collection: &str, key: &str, fields: Document, merge: bool) -> StoreResult<()>;

    /// Creates the document only if no document exists under `key`.
    /// Returns `false` when one already does; nothing is written then.
    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool>;

    /// Writes only when the stored version still equals `expected_version`.
    /// Returns `false` on a version mismatch or when the document is gone.
    async fn set_if_version(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
        expected_version: u64,
    ) -> StoreResult<bool>;
}

/// Applies a write to an existing body: merge overlays top-level fields,
/// otherwise the body is replaced.
pub fn apply_write(existing: &mut Document, fields: Document, merge: bool) {
    if merge {
        for (name, value) in fields {
            existing.insert(name, value);
        }
    } else {
        *existing = fields;
    }
}
