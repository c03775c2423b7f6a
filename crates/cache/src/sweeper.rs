//! Bulk invalidation of a source's derivatives.

use crate::error::CacheResult;
use crate::hooks::BeforeDeleteHook;
use crate::registry::TransformRegistry;
use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt, stream};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::instrument;
use vignette_core::{RESAMPLED_DIR, SourceImage};
use vignette_storage::{ObjectStore, StorageError};

/// Deletes issued concurrently during a sweep.
const SWEEP_CONCURRENCY: usize = 8;

/// Finds and deletes every derivative of a source.
pub struct InvalidationSweeper {
    store: Arc<dyn ObjectStore>,
    registry: Arc<TransformRegistry>,
}

impl InvalidationSweeper {
    pub fn new(store: Arc<dyn ObjectStore>, registry: Arc<TransformRegistry>) -> Self {
        Self { store, registry }
    }

    /// Whether `name` is a derivative of `filename` under some registered format.
    ///
    /// A name matches `<format><anything but '-'>-<filename>`, ignoring ASCII
    /// case in both the format and the filename.
    pub fn is_derivative_name(&self, name: &str, filename: &str) -> bool {
        self.registry
            .names()
            .any(|format| matches_format(name, format, filename))
    }

    /// Bucket-relative keys of every derivative of `source` currently listed.
    pub async fn derivative_keys(&self, source: &SourceImage) -> CacheResult<Vec<String>> {
        if !source.has_filename() {
            return Ok(Vec::new());
        }

        let prefix = format!(
            "{}{RESAMPLED_DIR}",
            source.folder().as_deref().unwrap_or("")
        );
        let listed = self.store.list(&source.bucket, &prefix).await?;

        // A set, so an object matched by two formats is only considered once.
        let keys: BTreeSet<String> = listed
            .into_iter()
            .filter(|key| {
                let Some(name) = key.strip_prefix(&prefix) else {
                    return false;
                };
                !name.starts_with('.')
                    && !name.contains('/')
                    && self.is_derivative_name(name, &source.filename)
            })
            .collect();

        Ok(keys.into_iter().collect())
    }

    /// Delete every derivative of `source` and return how many were removed.
    ///
    /// Objects that vanish between listing and deletion are skipped and not
    /// counted.
    #[instrument(skip(self, source), fields(bucket = %source.bucket, filename = %source.filename))]
    pub async fn delete_all(&self, source: &SourceImage) -> CacheResult<usize> {
        if !source.has_filename() {
            return Ok(0);
        }

        let keys = self.derivative_keys(source).await?;
        let bucket = source.bucket.as_str();

        let deleted = stream::iter(keys)
            .map(|key| async move { self.delete_one(bucket, &key).await.map(usize::from) })
            .buffer_unordered(SWEEP_CONCURRENCY)
            .try_fold(0usize, |total, n| async move { Ok(total + n) })
            .await?;

        tracing::info!(deleted = deleted, "Swept derivatives");
        Ok(deleted)
    }

    /// Delete `key` if the store still reports it. Returns whether it was removed.
    async fn delete_one(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        if !self.store.exists(bucket, key).await? {
            return Ok(false);
        }
        match self.store.delete(bucket, key).await {
            Ok(()) => {
                tracing::debug!(key = %key, "Deleted derivative");
                Ok(true)
            }
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl BeforeDeleteHook for InvalidationSweeper {
    async fn before_delete(&self, source: &SourceImage) -> CacheResult<()> {
        self.delete_all(source).await.map(|_| ())
    }
}

fn matches_format(name: &str, format: &str, filename: &str) -> bool {
    let Some(head) = name.get(..format.len()) else {
        return false;
    };
    if !head.eq_ignore_ascii_case(format) {
        return false;
    }
    let rest = &name[format.len()..];
    match rest.find('-') {
        Some(idx) => rest[idx + 1..].eq_ignore_ascii_case(filename),
        None => false,
    }
}
