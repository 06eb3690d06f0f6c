//! SQLite-backed document store
//!
//! Documents live in a single table as JSON text with an integer version.
//! Read-modify-write paths run inside `BEGIN IMMEDIATE` so concurrent
//! writers from the pool serialize on the database lock.

use std::time::Duration;

use async_trait::async_trait;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};

use super::document::{apply_write, Document, DocumentStore, StoreError, StoreResult, VersionedDocument};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS documents (
    collection TEXT NOT NULL,
    key        TEXT NOT NULL,
    body       TEXT NOT NULL,
    version    INTEGER NOT NULL,
    updated_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    PRIMARY KEY (collection, key)
);";

/// Create a new database connection pool
///
/// Initializes a connection pool with up to 10 connections and creates the
/// documents table if needed.
///
/// # Arguments
///
/// * `database_path` - Path to SQLite database file
pub fn create_pool(database_path: &str) -> StoreResult<DbPool> {
    let manager = SqliteConnectionManager::file(database_path).with_init(|c| c.busy_timeout(BUSY_TIMEOUT));
    let pool = Pool::builder()
        .max_size(10) // Maximum 10 connections in the pool
        .build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch(SCHEMA)?;

    Ok(pool)
}

/// Get a connection from the pool
pub fn get_connection(pool: &DbPool) -> StoreResult<DbConnection> {
    Ok(pool.get()?)
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Opens (or creates) the database file and returns a ready store
    pub fn open(database_path: &str) -> StoreResult<Self> {
        Ok(Self::new(create_pool(database_path)?))
    }

    /// Runs a blocking closure against a pooled connection off the async runtime
    async fn with_conn<T, F>(&self, op: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = get_connection(&pool)?;
            op(&*conn)
        })
        .await
        .map_err(|e| StoreError::TaskJoin(e.to_string()))?
    }
}

fn read_document(conn: &Connection, collection: &str, key: &str) -> StoreResult<Option<VersionedDocument>> {
    let row: Option<(String, i64)> = conn
        .query_row(
            "SELECT body, version FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    match row {
        Some((body, version)) => Ok(Some(VersionedDocument {
            version: u64::try_from(version).unwrap_or(0),
            fields: serde_json::from_str(&body)?,
        })),
        None => Ok(None),
    }
}

/// Runs `op` inside an immediate transaction, rolling back on error
fn in_write_txn<T>(conn: &Connection, op: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
    conn.execute_batch("BEGIN IMMEDIATE")?;
    match op(conn) {
        Ok(value) => {
            conn.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(err) => {
            let _ = conn.execute_batch("ROLLBACK");
            Err(err)
        }
    }
}

fn write_document(conn: &Connection, collection: &str, key: &str, body: &Document, version: u64) -> StoreResult<()> {
    let body = serde_json::to_string(body)?;
    let version = i64::try_from(version).unwrap_or(i64::MAX);
    conn.execute(
        "INSERT INTO documents (collection, key, body, version) VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(collection, key) DO UPDATE SET
             body = excluded.body,
             version = excluded.version,
             updated_at = CURRENT_TIMESTAMP",
        params![collection, key, body, version],
    )?;
    Ok(())
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<VersionedDocument>> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.with_conn(move |conn| read_document(conn, &collection, &key)).await
    }

    async fn set(&self, collection: &str, key: &str, fields: Document, merge: bool) -> StoreResult<()> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.with_conn(move |conn| {
            in_write_txn(conn, |conn| {
                let (mut body, version) = match read_document(conn, &collection, &key)? {
                    Some(existing) => (existing.fields, existing.version),
                    None => (Document::new(), 0),
                };
                apply_write(&mut body, fields, merge);
                write_document(conn, &collection, &key, &body, version + 1)
            })
        })
        .await
    }

    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.with_conn(move |conn| {
            let body = serde_json::to_string(&fields)?;
            let inserted = conn.execute(
                "INSERT INTO documents (collection, key, body, version) VALUES (?1, ?2, ?3, 1)
                 ON CONFLICT(collection, key) DO NOTHING",
                params![collection, key, body],
            )?;
            Ok(inserted == 1)
        })
        .await
    }

    async fn set_if_version(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
        expected_version: u64,
    ) -> StoreResult<bool> {
        let (collection, key) = (collection.to_string(), key.to_string());
        self.with_conn(move |conn| {
            in_write_txn(conn, |conn| match read_document(conn, &collection, &key)? {
                Some(existing) if existing.version == expected_version => {
                    let mut body = existing.fields;
                    apply_write(&mut body, fields, merge);
                    write_document(conn, &collection, &key, &body, expected_version + 1)?;
                    Ok(true)
                }
                _ => Ok(false),
            })
        })
        .await
    }
}
