//! Payload storage backend abstraction (S3/MinIO/local filesystem/memory).

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GraphError, Result};

/// Configuration for where content payloads live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadStoreConfig {
    /// In-memory storage (for testing)
    #[default]
    Memory,

    /// Local filesystem storage
    Local {
        /// Path to the storage directory
        path: PathBuf,
    },

    /// S3-compatible storage (AWS S3, MinIO, etc.)
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        /// Access key ID
        access_key: String,
        /// Secret access key
        secret_key: String,
        /// Bucket name
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

/// Object storage holding the bytes behind content values.
#[derive(Debug, Clone)]
pub struct PayloadStorage {
    inner: Arc<dyn ObjectStore>,
}

impl PayloadStorage {
    /// Create a new storage backend from configuration.
    pub async fn new(config: PayloadStoreConfig) -> Result<Self> {
        let inner: Arc<dyn ObjectStore> = match &config {
            PayloadStoreConfig::Memory => Arc::new(InMemory::new()),

            PayloadStoreConfig::Local { path } => {
                tokio::fs::create_dir_all(path).await?;
                Arc::new(
                    LocalFileSystem::new_with_prefix(path)
                        .map_err(|e| GraphError::InvalidConfig(e.to_string()))?,
                )
            }

            PayloadStoreConfig::S3 {
                endpoint,
                access_key,
                secret_key,
                bucket,
                region,
            } => {
                let builder = AmazonS3Builder::new()
                    .with_endpoint(endpoint)
                    .with_access_key_id(access_key)
                    .with_secret_access_key(secret_key)
                    .with_bucket_name(bucket)
                    .with_region(region.as_deref().unwrap_or("us-east-1"))
                    .with_allow_http(endpoint.starts_with("http://"));

                let store: Arc<dyn ObjectStore> = Arc::new(
                    builder
                        .build()
                        .map_err(|e| GraphError::InvalidConfig(e.to_string()))?,
                );

                // Fail fast if the bucket is missing
                {
                    use futures::TryStreamExt;
                    let prefix = ObjectPath::from("");
                    let mut stream = store.list(Some(&prefix));
                    match stream.try_next().await {
                        Ok(_) => {}
                        Err(object_store::Error::NotFound { .. }) => {
                            return Err(GraphError::BucketNotFound(bucket.clone()));
                        }
                        Err(e) => {
                            let msg = e.to_string();
                            if msg.contains("NoSuchBucket")
                                || msg.contains("bucket") && msg.contains("not")
                            {
                                return Err(GraphError::BucketNotFound(bucket.clone()));
                            }
                            return Err(e.into());
                        }
                    }
                }

                store
            }
        };

        Ok(Self { inner })
    }

    /// In-memory backend.
    pub fn memory() -> Self {
        Self {
            inner: Arc::new(InMemory::new()),
        }
    }

    /// Fresh key for a value of `content_id`.
    ///
    /// Every write gets its own key, so replacing a value never clobbers the
    /// object the old metadata still points at.
    pub fn payload_key(content_id: Uuid) -> String {
        format!("values/{}/{}", content_id, Uuid::new_v4())
    }

    fn path(key: &str) -> ObjectPath {
        ObjectPath::from(key)
    }

    pub async fn put_payload(&self, key: &str, data: Bytes) -> Result<()> {
        self.inner.put(&Self::path(key), data.into()).await?;
        Ok(())
    }

    pub async fn get_payload(&self, key: &str) -> Result<Option<Bytes>> {
        match self.inner.get(&Self::path(key)).await {
            Ok(result) => {
                let bytes = result.bytes().await?;
                Ok(Some(bytes))
            }
            Err(object_store::Error::NotFound { .. }) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a payload. Deleting a missing payload succeeds.
    pub async fn delete_payload(&self, key: &str) -> Result<()> {
        match self.inner.delete(&Self::path(key)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub async fn has_payload(&self, key: &str) -> Result<bool> {
        match self.inner.head(&Self::path(key)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// List every stored payload key.
    pub async fn list_payload_keys(&self) -> Result<Vec<String>> {
        use futures::TryStreamExt;

        let prefix = ObjectPath::from("values/");
        let items: Vec<_> = self.inner.list(Some(&prefix)).try_collect().await?;

        Ok(items
            .into_iter()
            .map(|meta| meta.location.as_ref().to_string())
            .collect())
    }
}
