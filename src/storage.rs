//! Object storage for photo blobs.
//!
//! Only the returned reference is ever persisted, never raw bytes.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Storage as StorageConfig;
use crate::error::{Result, ServerError};

/// Photo blob store.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store `bytes` under `key`, returning the reference to persist.
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String>;

    /// Remove the object behind `reference`.
    /// Removing an absent object is not an error.
    async fn delete(&self, reference: &str) -> Result<()>;
}

fn storage_error(
    source: impl std::error::Error + Send + Sync + 'static,
) -> ServerError {
    ServerError::ExternalService {
        service: "storage",
        source: Box::new(source),
    }
}

/// S3-style HTTP gateway client.
pub struct HttpObjectStorage {
    http: Client,
    endpoint: String,
    bucket: String,
    api_key: String,
}

impl HttpObjectStorage {
    /// Create a new [`HttpObjectStorage`].
    ///
    /// The API key comes from the configuration or, failing that, the
    /// `STORAGE_API_KEY` environment variable.
    pub fn new(config: &StorageConfig) -> Self {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("STORAGE_API_KEY").ok())
            .unwrap_or_default();

        Self {
            http: Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_owned(),
            bucket: config.bucket.clone(),
            api_key,
        }
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }
}

#[async_trait]
impl ObjectStorage for HttpObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        let url = self.object_url(key);

        self.http
            .put(&url)
            .bearer_auth(&self.api_key)
            .body(bytes)
            .send()
            .await
            .map_err(storage_error)?
            .error_for_status()
            .map_err(storage_error)?;

        Ok(url)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        let response = self
            .http
            .delete(reference)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(storage_error)?;

        // An already-gone object is fine.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(());
        }
        response.error_for_status().map_err(storage_error)?;

        Ok(())
    }
}

/// In-process store used when no `storage` entry is configured, and by
/// tests.
#[derive(Default)]
pub struct InMemoryStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemoryStorage {
    /// Create a new [`InMemoryStorage`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an object is held under `reference`.
    pub fn contains(&self, reference: &str) -> bool {
        self.objects.lock().unwrap().contains_key(reference)
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStorage for InMemoryStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        let reference = format!("memory://{key}");
        self.objects
            .lock()
            .unwrap()
            .insert(reference.clone(), bytes);

        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(reference);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_put_then_delete() {
        let storage = InMemoryStorage::new();

        let reference = storage.put("users/1/profile", vec![1, 2, 3]).await.unwrap();
        assert_eq!(reference, "memory://users/1/profile");
        assert!(storage.contains(&reference));

        storage.delete(&reference).await.unwrap();
        assert!(storage.is_empty());

        // Deleting again stays silent.
        storage.delete(&reference).await.unwrap();
    }

    #[test]
    fn test_object_url() {
        let storage = HttpObjectStorage::new(&StorageConfig {
            endpoint: "https://blob.example.org/".into(),
            bucket: "photos".into(),
            api_key: Some("k".into()),
        });

        assert_eq!(
            storage.object_url("pins/7/1717240000000"),
            "https://blob.example.org/photos/pins/7/1717240000000"
        );
    }
}
