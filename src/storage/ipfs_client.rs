// src/storage/ipfs_client.rs
//! IPFS-backed content store.
//!
//! Presentation metadata is pinned to an IPFS node; the returned CID is the
//! `contentRef` carried in the compact presentation.
//!
//! # Security Considerations
//! - All stored data is public by default (IPFS is a public network)
//! - CIDs are content-addressable and permanent

use crate::errors::StorageError;
use crate::storage::content_store::ContentStore;
use async_trait::async_trait;
use bytes::BytesMut;
use futures::TryStreamExt;
use ipfs_api_backend_hyper::{IpfsApi, IpfsClient, TryFromUri};
use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;

/// Default upper bound on a single IPFS request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Thread-safe IPFS client wrapper.
///
/// The hyper backend's futures are not `Send`, so every request runs on a
/// blocking thread with its own single-threaded runtime. Request timeouts
/// are enforced on that runtime, so an abandoned request never keeps its
/// blocking thread busy past the timeout.
#[derive(Clone)]
pub struct IpfsStorage {
    /// Shared IPFS client instance (thread-safe via Arc)
    client: Arc<IpfsClient>,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl IpfsStorage {
    /// Creates a client for the IPFS HTTP API at `api_url`.
    ///
    /// # Arguments
    /// * `api_url` - e.g. `http://localhost:5001`
    ///
    /// # Errors
    /// Returns `StorageError::Backend` if the URL cannot be parsed.
    pub fn new(api_url: &str) -> Result<Self, StorageError> {
        let client = IpfsClient::from_str(api_url)
            .map_err(|e| StorageError::Backend(format!("invalid IPFS API url: {}", e)))?;
        Ok(IpfsStorage {
            client: Arc::new(client),
            read_timeout: DEFAULT_REQUEST_TIMEOUT,
            write_timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Bounds `cat` requests. Unknown CIDs make IPFS search indefinitely.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Bounds `add` requests.
    pub fn with_write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Stores raw binary data in IPFS and returns its CID.
    pub async fn store_data(&self, data: Vec<u8>) -> Result<String, StorageError> {
        let client = self.client.clone();
        let timeout = self.write_timeout;

        task::spawn_blocking(move || -> Result<String, StorageError> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            rt.block_on(async {
                let response = tokio::time::timeout(timeout, client.add(Cursor::new(data)))
                    .await
                    .map_err(|_| StorageError::Timeout)?
                    .map_err(|e| StorageError::Backend(e.to_string()))?;
                Ok(response.hash)
            })
        })
        .await
        .map_err(|join_err| StorageError::Backend(join_err.to_string()))?
    }

    /// Retrieves binary data from IPFS by its CID.
    pub async fn retrieve_data(&self, hash: &str) -> Result<Vec<u8>, StorageError> {
        let client = self.client.clone();
        let hash = hash.to_string();
        let timeout = self.read_timeout;

        task::spawn_blocking(move || -> Result<Vec<u8>, StorageError> {
            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .map_err(|e| StorageError::Backend(e.to_string()))?;
            rt.block_on(async {
                let fetch = client.cat(&hash).try_fold(BytesMut::new(), |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                });
                let data = tokio::time::timeout(timeout, fetch)
                    .await
                    .map_err(|_| StorageError::Timeout)?
                    .map_err(|e| classify(&hash, e))?;
                Ok(data.to_vec())
            })
        })
        .await
        .map_err(|join_err| StorageError::Backend(join_err.to_string()))?
    }
}

/// IPFS reports unknown or unparseable CIDs as API errors; surface them as
/// `NotFound` so callers can degrade the same way as with other stores.
fn classify(hash: &str, error: ipfs_api_backend_hyper::Error) -> StorageError {
    let message = error.to_string();
    if message.contains("not found") || message.contains("invalid path") {
        StorageError::NotFound(hash.to_string())
    } else {
        StorageError::Backend(message)
    }
}

#[async_trait]
impl ContentStore for IpfsStorage {
    async fn put(&self, data: Vec<u8>) -> Result<String, StorageError> {
        self.store_data(data).await
    }

    async fn get(&self, content_ref: &str) -> Result<Vec<u8>, StorageError> {
        self.retrieve_data(content_ref).await
    }
}
