//! In-process storage backend.
//!
//! Holds every bucket in memory. Used for tests and dry runs; contents are
//! lost when the backend is dropped.

use crate::error::{StorageError, StorageResult};
use crate::traits::{Acl, ObjectStore, PutOptions, validate_bucket_name};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

/// A stored object together with the options it was written with.
#[derive(Clone, Debug)]
pub struct StoredObject {
    pub data: Bytes,
    pub options: PutOptions,
}

#[derive(Debug, Default)]
struct Bucket {
    acl: Acl,
    objects: BTreeMap<String, StoredObject>,
}

/// In-memory object store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch an object along with its write options.
    pub async fn object(&self, bucket: &str, key: &str) -> Option<StoredObject> {
        let buckets = self.buckets.read().await;
        buckets.get(bucket)?.objects.get(key).cloned()
    }

    /// ACL last applied to `bucket`, if the bucket exists.
    pub async fn bucket_acl(&self, bucket: &str) -> Option<Acl> {
        self.buckets.read().await.get(bucket).map(|b| b.acl)
    }
}

#[async_trait]
impl ObjectStore for MemoryBackend {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .is_some_and(|b| b.objects.contains_key(key)))
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.object(bucket, key)
            .await
            .map(|o| o.data)
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        validate_bucket_name(bucket)?;
        if key.is_empty() {
            return Err(StorageError::InvalidKey("empty key".to_string()));
        }
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .objects
            .insert(key.to_string(), StoredObject { data, options });
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let mut buckets = self.buckets.write().await;
        buckets
            .get_mut(bucket)
            .and_then(|b| b.objects.remove(key))
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("{bucket}/{key}")))
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|b| {
                b.objects
                    .range(prefix.to_string()..)
                    .map(|(k, _)| k)
                    .take_while(|k| k.starts_with(prefix))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        validate_bucket_name(bucket)?;
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket.to_string()).or_default().acl = acl;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
