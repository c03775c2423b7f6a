//! Per-call deadline wrapper for any object store.

use crate::error::{StorageError, StorageResult};
use crate::traits::{Acl, ObjectStore, PutOptions};
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Bounds every call on the inner store by a fixed timeout.
///
/// An expired call surfaces as [`StorageError::Timeout`]; the inner future is
/// dropped, so a write that had already reached the backend may still land.
pub struct TimeoutStore {
    inner: Arc<dyn ObjectStore>,
    timeout: Duration,
}

impl TimeoutStore {
    pub fn new(inner: Arc<dyn ObjectStore>, timeout: Duration) -> Self {
        Self { inner, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn bounded<T>(
        &self,
        op: &str,
        target: String,
        fut: impl Future<Output = StorageResult<T>> + Send,
    ) -> StorageResult<T> {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    backend = self.inner.backend_name(),
                    op = op,
                    target = %target,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Store call timed out"
                );
                Err(StorageError::Timeout(format!(
                    "{op} {target} exceeded {:?}",
                    self.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl ObjectStore for TimeoutStore {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.bounded("exists", format!("{bucket}/{key}"), self.inner.exists(bucket, key))
            .await
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.bounded("get", format!("{bucket}/{key}"), self.inner.get(bucket, key))
            .await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        self.bounded(
            "put",
            format!("{bucket}/{key}"),
            self.inner.put(bucket, key, data, options),
        )
        .await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.bounded("delete", format!("{bucket}/{key}"), self.inner.delete(bucket, key))
            .await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.bounded("list", format!("{bucket}/{prefix}"), self.inner.list(bucket, prefix))
            .await
    }

    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        self.bounded(
            "ensure_bucket",
            bucket.to_string(),
            self.inner.ensure_bucket(bucket, acl),
        )
        .await
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }

    async fn health_check(&self) -> StorageResult<()> {
        self.bounded("health_check", String::new(), self.inner.health_check())
            .await
    }
}
