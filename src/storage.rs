use crate::error::{ExtractorError, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// Object storage sink for encoded batch artifacts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes the whole blob under `key` in a single put.
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()>;
}

/// Production sink backed by an S3 bucket.
pub struct S3ObjectStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: &str) -> Self {
        Self {
            client,
            bucket: bucket.to_string(),
        }
    }

    /// Builds the client from the ambient AWS environment. Construct once per
    /// process and reuse.
    pub async fn from_env(bucket: &str) -> Self {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        Self::new(aws_sdk_s3::Client::new(&config), bucket)
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(|e| ExtractorError::Storage {
                message: format!(
                    "put s3://{}/{} failed: {}",
                    self.bucket,
                    key,
                    DisplayErrorContext(&e)
                ),
            })?;

        debug!(key, bucket = %self.bucket, "Wrote object to s3");
        Ok(())
    }
}

/// Filesystem sink for local runs; keys become relative paths under the root.
pub struct FsObjectStore {
    root: PathBuf,
}

impl FsObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, _content_type: &str) -> Result<()> {
        let path = self.root.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &bytes).await?;

        debug!(path = %path.display(), "Wrote object to local root");
        Ok(())
    }
}

/// In-memory sink for tests; remembers bytes and content type per key.
#[derive(Default, Clone)]
pub struct InMemoryObjectStore {
    objects: Arc<Mutex<HashMap<String, (Vec<u8>, String)>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<()> {
        let mut objects = self.objects.lock().unwrap();
        objects.insert(key.to_string(), (bytes, content_type.to_string()));

        debug!(key, "Stored object in memory");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryObjectStore::new();
        store
            .put("raw/users_1.ndjson", b"{}\n".to_vec(), "application/x-ndjson; charset=utf-8")
            .await
            .unwrap();

        let (bytes, content_type) = store.get("raw/users_1.ndjson").unwrap();
        assert_eq!(bytes, b"{}\n");
        assert_eq!(content_type, "application/x-ndjson; charset=utf-8");
        assert_eq!(store.keys(), vec!["raw/users_1.ndjson".to_string()]);
    }

    #[tokio::test]
    async fn fs_store_creates_prefix_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsObjectStore::new(dir.path());

        store
            .put("raw/users_2.ndjson", b"{}\n".to_vec(), "application/x-ndjson; charset=utf-8")
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("raw/users_2.ndjson")).unwrap();
        assert_eq!(written, b"{}\n");
    }
}
