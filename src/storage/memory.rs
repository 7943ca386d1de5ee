//! In-memory object store.

use super::{ObjectStore, Result, StoreError, StoredObject};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock};

/// Process-local object store keyed by `(bucket, key)`.
///
/// Only buckets registered with [`MemoryStore::with_bucket`] accept writes, which keeps
/// a misconfigured bucket name visible in tests instead of silently succeeding.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: RwLock<HashSet<String>>,
    objects: RwLock<HashMap<(String, String), StoredObject>>,
}

// Inspection helpers are used by tests.
#[cfg_attr(not(test), allow(dead_code))]
impl MemoryStore {
    pub fn with_bucket(bucket: &str) -> Self {
        let store = Self::default();
        store.create_bucket(bucket);
        store
    }

    pub fn create_bucket(&self, bucket: &str) {
        self.buckets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bucket.to_string());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        self.objects
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    /// All keys in a bucket, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        let objects = self.objects.read().unwrap_or_else(PoisonError::into_inner);
        let mut keys: Vec<String> = objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()> {
        let known = self
            .buckets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(bucket);
        if !known {
            return Err(StoreError::NoSuchBucket(bucket.to_string()));
        }

        let object = StoredObject {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
            content_type: content_type.to_string(),
        };
        self.objects
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((bucket.to_string(), key.to_string()), object);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }

    fn object_count(&self) -> Option<usize> {
        Some(self.len())
    }
}
