// src/storage/content_store.rs
//! Content-addressed store abstraction.
//!
//! Retrieval keys are derived from the content itself, so fetches are
//! idempotent and tamper-evident: the same bytes always come back under the
//! same reference, and equal content always yields an equal reference.

use crate::errors::StorageError;
use crate::utils::crypto::digest_hex;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Put/get blob store keyed by content hash.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Stores `data` and returns its content reference.
    async fn put(&self, data: Vec<u8>) -> Result<String, StorageError>;

    /// Fetches the bytes stored under `content_ref`.
    ///
    /// # Errors
    /// `StorageError::NotFound` if nothing is stored under that reference.
    async fn get(&self, content_ref: &str) -> Result<Vec<u8>, StorageError>;
}

/// In-memory content store keyed by the Keccak-256 digest of the content.
///
/// Useful for tests, simulations and deployments without an IPFS node.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reference under which `data` is (or would be) stored.
    pub fn content_ref(data: &[u8]) -> String {
        digest_hex(data)
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Vec<u8>) -> Result<String, StorageError> {
        let content_ref = Self::content_ref(&data);
        self.blobs.write().entry(content_ref.clone()).or_insert(data);
        Ok(content_ref)
    }

    async fn get(&self, content_ref: &str) -> Result<Vec<u8>, StorageError> {
        self.blobs
            .read()
            .get(content_ref)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(content_ref.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_is_idempotent() {
        let store = MemoryContentStore::new();
        let a = store.put(b"{\"hello\":1}".to_vec()).await.unwrap();
        let b = store.put(b"{\"hello\":1}".to_vec()).await.unwrap();

        assert_eq!(a, b);
        assert_eq!(store.len(), 1);
        assert_eq!(a, MemoryContentStore::content_ref(b"{\"hello\":1}"));
    }

    #[tokio::test]
    async fn test_get_returns_identical_bytes() {
        let store = MemoryContentStore::new();
        let content_ref = store.put(vec![1, 2, 3]).await.unwrap();

        assert_eq!(store.get(&content_ref).await.unwrap(), vec![1, 2, 3]);
        assert_eq!(store.get(&content_ref).await.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_distinct_content_distinct_refs() {
        let store = MemoryContentStore::new();
        let a = store.put(vec![1]).await.unwrap();
        let b = store.put(vec![2]).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_missing_ref() {
        let store = MemoryContentStore::new();
        assert_eq!(
            store.get("0xdead").await,
            Err(StorageError::NotFound("0xdead".into()))
        );
    }
}
