//! Blob storage for uploaded images and derived results.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use photobooth_core::JobKey;

/// Blob path of the uploaded source image for `key`.
pub fn source_path(key: JobKey) -> String {
    key.to_string()
}

/// Blob path where a derived result for `key` may live.
pub fn result_path(key: JobKey) -> String {
    format!("{key}/output")
}

/// Durable byte storage addressed by key-derived paths.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Persist bytes under `path`. Overwrites are idempotent.
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BlobStoreError>;

    /// Remove `path`. Deleting a missing blob is a no-op.
    async fn delete(&self, path: &str) -> Result<(), BlobStoreError>;
}

/// Blob store error.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    #[error("blob request failed: {0}")]
    Transport(String),
    #[error("blob store returned status {status} for {path}")]
    UnexpectedStatus { status: u16, path: String },
    #[error("storage error: {0}")]
    Storage(String),
}

/// In-memory blob store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.blobs
            .read()
            .map(|blobs| blobs.contains_key(path))
            .unwrap_or(false)
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.blobs
            .read()
            .ok()
            .and_then(|blobs| blobs.get(path).cloned())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|blobs| blobs.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobStoreError::Storage("lock poisoned".to_string()))?;
        blobs.insert(path.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BlobStoreError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| BlobStoreError::Storage("lock poisoned".to_string()))?;
        blobs.remove(path);
        Ok(())
    }
}

/// Header carrying the shared secret to the worker store.
const WORKER_SECRET_HEADER: &str = "x-worker-secret";

/// Edge-worker object store: `PUT`/`DELETE {base}/{path}` authenticated
/// with a shared-secret header.
#[derive(Debug, Clone)]
pub struct WorkerBlobStore {
    base_url: String,
    secret: String,
    http: reqwest::Client,
}

impl WorkerBlobStore {
    pub fn new(base_url: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret: secret.into(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl BlobStore for WorkerBlobStore {
    async fn put(&self, path: &str, bytes: &[u8]) -> Result<(), BlobStoreError> {
        let response = self
            .http
            .put(self.url(path))
            .header(WORKER_SECRET_HEADER, self.secret.as_str())
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| BlobStoreError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BlobStoreError::UnexpectedStatus {
                status: response.status().as_u16(),
                path: path.to_string(),
            });
        }
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), BlobStoreError> {
        let response = self
            .http
            .delete(self.url(path))
            .header(WORKER_SECRET_HEADER, self.secret.as_str())
            .send()
            .await
            .map_err(|e| BlobStoreError::Transport(e.to_string()))?;

        let status = response.status();
        // Missing blob on delete keeps the idempotence contract.
        if !status.is_success() && status != reqwest::StatusCode::NOT_FOUND {
            return Err(BlobStoreError::UnexpectedStatus {
                status: status.as_u16(),
                path: path.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryBlobStore::new();
        store.put("k1", b"bytes").await.unwrap();
        assert_eq!(store.get("k1").as_deref(), Some(b"bytes".as_slice()));
    }

    #[tokio::test]
    async fn overwrite_is_idempotent() {
        let store = InMemoryBlobStore::new();
        store.put("k1", b"first").await.unwrap();
        store.put("k1", b"second").await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("k1").as_deref(), Some(b"second".as_slice()));
    }

    #[tokio::test]
    async fn delete_missing_is_a_noop() {
        let store = InMemoryBlobStore::new();
        store.delete("nope").await.unwrap();

        store.put("k1", b"bytes").await.unwrap();
        store.delete("k1").await.unwrap();
        store.delete("k1").await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn paths_are_derived_from_the_key() {
        let key = JobKey::new();
        assert_eq!(source_path(key), key.to_string());
        assert_eq!(result_path(key), format!("{key}/output"));
    }
}
