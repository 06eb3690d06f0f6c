use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::document::{apply_write, Document, DocumentStore, StoreError, StoreResult, VersionedDocument};

type DocKey = (String, String);

/// In-process document store
///
/// Used for tests and for running the bot without a database file. All
/// conditional operations are checked and applied under a single lock, so
/// they are atomic with respect to each other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<HashMap<DocKey, VersionedDocument>>>,
    offline: Arc<AtomicBool>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulates an outage: every call fails with `StoreError::Unavailable`
    /// until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of documents in a collection
    pub async fn count(&self, collection: &str) -> usize {
        let documents = self.documents.lock().await;
        documents.keys().filter(|(c, _)| c == collection).count()
    }

    fn ensure_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }
}

fn doc_key(collection: &str, key: &str) -> DocKey {
    (collection.to_string(), key.to_string())
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<VersionedDocument>> {
        self.ensure_online()?;
        let documents = self.documents.lock().await;
        Ok(documents.get(&doc_key(collection, key)).cloned())
    }

    async fn set(&self, collection: &str, key: &str, fields: Document, merge: bool) -> StoreResult<()> {
        self.ensure_online()?;
        let mut documents = self.documents.lock().await;
        match documents.get_mut(&doc_key(collection, key)) {
            Some(existing) => {
                apply_write(&mut existing.fields, fields, merge);
                existing.version += 1;
            }
            None => {
                documents.insert(doc_key(collection, key), VersionedDocument { version: 1, fields });
            }
        }
        Ok(())
    }

    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.ensure_online()?;
        let mut documents = self.documents.lock().await;
        let id = doc_key(collection, key);
        if documents.contains_key(&id) {
            return Ok(false);
        }
        documents.insert(id, VersionedDocument { version: 1, fields });
        Ok(true)
    }

    async fn set_if_version(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
        expected_version: u64,
    ) -> StoreResult<bool> {
        self.ensure_online()?;
        let mut documents = self.documents.lock().await;
        match documents.get_mut(&doc_key(collection, key)) {
            Some(existing) if existing.version == expected_version => {
                apply_write(&mut existing.fields, fields, merge);
                existing.version += 1;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap_or_default()
    }

    #[tokio::test]
    async fn test_create_only_once() {
        let store = MemoryStore::new();

        assert!(store.create("Users", "1", fields(json!({"balance": 5000}))).await.unwrap());
        assert!(!store.create("Users", "1", fields(json!({"balance": 0}))).await.unwrap());

        let doc = store.get("Users", "1").await.unwrap().unwrap();
        assert_eq!(doc.version, 1);
        assert_eq!(doc.fields["balance"], json!(5000));
    }

    #[tokio::test]
    async fn test_set_if_version_rejects_stale_writer() {
        let store = MemoryStore::new();
        store.set("Users", "1", fields(json!({"balance": 5000})), false).await.unwrap();

        let snapshot = store.get("Users", "1").await.unwrap().unwrap();
        assert!(store
            .set_if_version("Users", "1", fields(json!({"balance": 6000})), true, snapshot.version)
            .await
            .unwrap());
        assert!(!store
            .set_if_version("Users", "1", fields(json!({"balance": 6000})), true, snapshot.version)
            .await
            .unwrap());

        let doc = store.get("Users", "1").await.unwrap().unwrap();
        assert_eq!(doc.version, 2);
        assert_eq!(doc.fields["balance"], json!(6000));
    }

    #[tokio::test]
    async fn test_set_if_version_on_missing_document() {
        let store = MemoryStore::new();
        let written = store
            .set_if_version("Users", "ghost", fields(json!({"balance": 1})), true, 1)
            .await
            .unwrap();

        assert!(!written);
        assert_eq!(store.count("Users").await, 0);
    }

    #[tokio::test]
    async fn test_offline_store_fails_every_call() {
        let store = MemoryStore::new();
        store.set_offline(true);

        assert!(matches!(store.get("Users", "1").await, Err(StoreError::Unavailable(_))));
        assert!(store.create("Users", "1", Document::new()).await.is_err());

        store.set_offline(false);
        assert!(store.get("Users", "1").await.unwrap().is_none());
    }
}
