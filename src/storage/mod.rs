//! # Object Storage
//!
//! The separation service only ever needs one capability from storage: put a blob
//! under a key. That capability is the [`ObjectStore`] trait, so the service can run
//! against a real S3-compatible bucket in production and an in-memory map in tests.
//!
//! ## Backends:
//! - [`S3Store`]: S3-compatible bucket via `aws-sdk-s3`
//! - [`MemoryStore`]: process-local map, used by tests and the `memory` backend

use crate::config::{StorageBackend, StorageConfig};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

pub mod memory;
pub mod s3;

pub use memory::MemoryStore;
pub use s3::S3Store;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur while writing objects.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to upload {key}: {message}")]
    Upload { key: String, message: String },

    #[error("bucket {0} does not exist")]
    NoSuchBucket(String),
}

/// An object as it was handed to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub bucket: String,
    pub key: String,
    pub body: Bytes,
    pub content_type: String,
}

/// Minimal write capability the separation service depends on.
///
/// Writes are unconditional: putting an existing key replaces it, like S3 does.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, bucket: &str, key: &str, body: Bytes, content_type: &str) -> Result<()>;

    /// Short name for logs and the health endpoint.
    fn name(&self) -> &'static str;

    /// Number of stored objects, for backends that can tell cheaply.
    fn object_count(&self) -> Option<usize> {
        None
    }
}

/// Create an object store from configuration.
///
/// This is the single point where the configured backend becomes an instance.
pub async fn create_store(config: &StorageConfig) -> Arc<dyn ObjectStore> {
    match config.backend {
        StorageBackend::S3 => Arc::new(S3Store::from_config(config).await),
        StorageBackend::Memory => Arc::new(MemoryStore::with_bucket(&config.bucket)),
    }
}
