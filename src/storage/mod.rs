//! Document storage: store trait, in-memory and SQLite backends

pub mod document;
pub mod memory;
pub mod sqlite;

// Re-exports for convenience
pub use document::{Document, DocumentStore, StoreError, StoreResult, VersionedDocument};
pub use memory::MemoryStore;
pub use sqlite::{create_pool, get_connection, DbConnection, DbPool, SqliteStore};
