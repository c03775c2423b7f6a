use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use vignette_storage::{Acl, MemoryBackend, ObjectStore, PutOptions, StorageError, StorageResult};

/// Memory-backed store that records every call.
#[allow(dead_code)]
pub struct CountingStore {
    pub inner: Arc<MemoryBackend>,
    probes: Mutex<Vec<String>>,
    pub gets: AtomicUsize,
    pub puts: AtomicUsize,
    pub deletes: AtomicUsize,
    pub ensure_buckets: AtomicUsize,
}

#[allow(dead_code)]
impl CountingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Arc::new(MemoryBackend::new()),
            probes: Mutex::new(Vec::new()),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            deletes: AtomicUsize::new(0),
            ensure_buckets: AtomicUsize::new(0),
        })
    }

    /// Keys passed to `exists`, in call order.
    pub fn probes(&self) -> Vec<String> {
        self.probes.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    /// Calls that change store state.
    pub fn mutations(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
            + self.ensure_buckets.load(Ordering::SeqCst)
    }

    /// Every call of any kind.
    pub fn total_calls(&self) -> usize {
        self.probes.lock().unwrap().len() + self.gets.load(Ordering::SeqCst) + self.mutations()
    }

    pub fn reset(&self) {
        self.probes.lock().unwrap().clear();
        self.gets.store(0, Ordering::SeqCst);
        self.puts.store(0, Ordering::SeqCst);
        self.deletes.store(0, Ordering::SeqCst);
        self.ensure_buckets.store(0, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStore for CountingStore {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.probes.lock().unwrap().push(key.to_string());
        self.inner.exists(bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(bucket, key).await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.inner.put(bucket, key, data, options).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.inner.delete(bucket, key).await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        self.inner.list(bucket, prefix).await
    }

    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        self.ensure_buckets.fetch_add(1, Ordering::SeqCst);
        self.inner.ensure_bucket(bucket, acl).await
    }

    fn backend_name(&self) -> &'static str {
        "counting"
    }
}

/// Store whose every call fails as if the network were down.
#[allow(dead_code)]
pub struct FailingStore;

fn unavailable() -> StorageError {
    StorageError::Io(std::io::Error::new(
        std::io::ErrorKind::ConnectionRefused,
        "store unavailable",
    ))
}

#[async_trait]
impl ObjectStore for FailingStore {
    async fn exists(&self, _bucket: &str, _key: &str) -> StorageResult<bool> {
        Err(unavailable())
    }

    async fn get(&self, _bucket: &str, _key: &str) -> StorageResult<Bytes> {
        Err(unavailable())
    }

    async fn put(
        &self,
        _bucket: &str,
        _key: &str,
        _data: Bytes,
        _options: PutOptions,
    ) -> StorageResult<()> {
        Err(unavailable())
    }

    async fn delete(&self, _bucket: &str, _key: &str) -> StorageResult<()> {
        Err(unavailable())
    }

    async fn list(&self, _bucket: &str, _prefix: &str) -> StorageResult<Vec<String>> {
        Err(unavailable())
    }

    async fn ensure_bucket(&self, _bucket: &str, _acl: Acl) -> StorageResult<()> {
        Err(unavailable())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}

/// Delays every call on the inner store.
#[allow(dead_code)]
pub struct SlowStore {
    pub inner: Arc<dyn ObjectStore>,
    pub delay: Duration,
}

#[async_trait]
impl ObjectStore for SlowStore {
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        tokio::time::sleep(self.delay).await;
        self.inner.exists(bucket, key).await
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(bucket, key).await
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.put(bucket, key, data, options).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.delete(bucket, key).await
    }

    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        tokio::time::sleep(self.delay).await;
        self.inner.list(bucket, prefix).await
    }

    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        tokio::time::sleep(self.delay).await;
        self.inner.ensure_bucket(bucket, acl).await
    }

    fn backend_name(&self) -> &'static str {
        "slow"
    }
}
