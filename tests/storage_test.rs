//! Document store behaviour shared by the in-memory and SQLite backends
//!
//! Run with: cargo test --test storage_test

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;

use common::doc;
use dripcoin::storage::DocumentStore;
use dripcoin::{MemoryStore, SqliteStore};

async fn check_store(store: &dyn DocumentStore) {
    assert!(store.get("Users", "1").await.unwrap().is_none());

    // create-if-absent
    assert!(store.create("Users", "1", doc(json!({"balance": 5000}))).await.unwrap());
    assert!(!store.create("Users", "1", doc(json!({"balance": 0}))).await.unwrap());
    let first = store.get("Users", "1").await.unwrap().unwrap();
    assert_eq!(first.fields, doc(json!({"balance": 5000})));

    // merge keeps untouched fields and bumps the version
    store
        .set("Users", "1", doc(json!({"referrals": ["2"]})), true)
        .await
        .unwrap();
    let merged = store.get("Users", "1").await.unwrap().unwrap();
    assert_eq!(merged.fields, doc(json!({"balance": 5000, "referrals": ["2"]})));
    assert!(merged.version > first.version);

    // stale conditional write is refused and leaves the document alone
    assert!(!store
        .set_if_version("Users", "1", doc(json!({"balance": 1})), true, first.version)
        .await
        .unwrap());
    assert_eq!(store.get("Users", "1").await.unwrap().unwrap(), merged);

    // current conditional write succeeds
    assert!(store
        .set_if_version("Users", "1", doc(json!({"balance": 6000})), true, merged.version)
        .await
        .unwrap());
    let after = store.get("Users", "1").await.unwrap().unwrap();
    assert_eq!(after.fields, doc(json!({"balance": 6000, "referrals": ["2"]})));

    // conditional write on a missing document
    assert!(!store
        .set_if_version("Users", "missing", doc(json!({"balance": 1})), true, 0)
        .await
        .unwrap());
    assert!(store.get("Users", "missing").await.unwrap().is_none());

    // overwrite replaces the body
    store.set("Users", "1", doc(json!({"first_name": "Bob"})), false).await.unwrap();
    assert_eq!(
        store.get("Users", "1").await.unwrap().unwrap().fields,
        doc(json!({"first_name": "Bob"}))
    );

    // collections are separate namespaces
    assert!(store.get("Other", "1").await.unwrap().is_none());
}

#[tokio::test]
async fn test_memory_store_contract() {
    check_store(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("contract.sqlite");
    let store = SqliteStore::open(path.to_str().unwrap()).unwrap();

    check_store(&store).await;
}

#[tokio::test]
async fn test_sqlite_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("reopen.sqlite");
    let path = path.to_str().unwrap();

    {
        let store = SqliteStore::open(path).unwrap();
        store.create("Users", "7", doc(json!({"balance": 5000}))).await.unwrap();
    }

    let store = SqliteStore::open(path).unwrap();
    let stored = store.get("Users", "7").await.unwrap().unwrap();
    assert_eq!(stored.fields, doc(json!({"balance": 5000})));
}
