use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vignette_storage::{Acl, ObjectStore, PutOptions, StorageResult};

/// Wraps a backend and counts calls per operation.
#[allow(dead_code)]
pub struct CountingBackend {
    inner: Arc<dyn ObjectStore>,
    pub exists_calls: AtomicUsize,
    pub put_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

#[allow(dead_code)]
impl CountingBackend {
    pub fn new(inner: Arc<dyn ObjectStore>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            exists_calls: AtomicUsize::new(0),
            put_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        })
    }

    pub fn puts(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStore for CountingBackend {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.exists_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.exists(bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.inner.get(bucket, key).await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.put(bucket, key, data, options).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(bucket, key).await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(bucket, prefix).await
    }

    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        self.inner.ensure_bucket(bucket, acl).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}
