//! Shared helpers for the ledger integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use dripcoin::core::config::USERS_COLLECTION;
use dripcoin::ledger::AvatarLookup;
use dripcoin::storage::{Document, DocumentStore, MemoryStore, StoreResult, VersionedDocument};
use dripcoin::{LedgerConfig, ReferralLedger, UserStart};

pub fn doc(value: Value) -> Document {
    value.as_object().cloned().unwrap_or_default()
}

/// `/start` event for a user with a generated first name
pub fn start(user_id: &str, referral_code: Option<&str>) -> UserStart {
    UserStart {
        user_id: user_id.to_string(),
        user_name: Some(format!("user_{}", user_id)),
        display_name: format!("User {}", user_id),
        referral_code: referral_code.map(str::to_string),
    }
}

pub fn memory_ledger() -> (Arc<MemoryStore>, ReferralLedger) {
    let store = Arc::new(MemoryStore::new());
    let ledger = ReferralLedger::new(store.clone(), LedgerConfig::default());
    (store, ledger)
}

/// Seeds a raw user document, bypassing the ledger
pub async fn seed_user(store: &dyn DocumentStore, user_id: &str, fields: Value) {
    store
        .set(USERS_COLLECTION, user_id, doc(fields), false)
        .await
        .expect("seed user");
}

/// Avatar lookup that records how often it was asked
#[derive(Default)]
pub struct CountingAvatars {
    pub calls: AtomicU32,
}

#[async_trait]
impl AvatarLookup for CountingAvatars {
    async fn avatar_url(&self, user_id: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(format!("https://cdn.test/{}.jpg", user_id))
    }
}

/// Wraps a store and slips one competing write in right before the first
/// conditional write, so that write is guaranteed to hit a version conflict.
pub struct RacingStore {
    pub inner: MemoryStore,
    pub competing_key: String,
    pub competing_fields: Document,
    fired: AtomicBool,
    pub conditional_writes: AtomicU32,
}

impl RacingStore {
    pub fn new(inner: MemoryStore, competing_key: &str, competing_fields: Value) -> Self {
        Self {
            inner,
            competing_key: competing_key.to_string(),
            competing_fields: doc(competing_fields),
            fired: AtomicBool::new(false),
            conditional_writes: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl DocumentStore for RacingStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<VersionedDocument>> {
        self.inner.get(collection, key).await
    }

    async fn set(&self, collection: &str, key: &str, fields: Document, merge: bool) -> StoreResult<()> {
        self.inner.set(collection, key, fields, merge).await
    }

    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.inner.create(collection, key, fields).await
    }

    async fn set_if_version(
        &self,
        collection: &str,
        key: &str,
        fields: Document,
        merge: bool,
        expected_version: u64,
    ) -> StoreResult<bool> {
        self.conditional_writes.fetch_add(1, Ordering::SeqCst);
        if key == self.competing_key && !self.fired.swap(true, Ordering::SeqCst) {
            self.inner
                .set(collection, key, self.competing_fields.clone(), true)
                .await?;
        }
        self.inner
            .set_if_version(collection, key, fields, merge, expected_version)
            .await
    }
}

/// Store whose conditional writes always lose
pub struct AlwaysStaleStore {
    pub inner: MemoryStore,
}

#[async_trait]
impl DocumentStore for AlwaysStaleStore {
    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<VersionedDocument>> {
        self.inner.get(collection, key).await
    }

    async fn set(&self, collection: &str, key: &str, fields: Document, merge: bool) -> StoreResult<()> {
        self.inner.set(collection, key, fields, merge).await
    }

    async fn create(&self, collection: &str, key: &str, fields: Document) -> StoreResult<bool> {
        self.inner.create(collection, key, fields).await
    }

    async fn set_if_version(
        &self,
        _collection: &str,
        _key: &str,
        _fields: Document,
        _merge: bool,
        _expected_version: u64,
    ) -> StoreResult<bool> {
        Ok(false)
    }
}

pub fn referral_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("{}", 1000 + i)).collect()
}
