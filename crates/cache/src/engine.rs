//! Derivative generation: fetch, transform, encode, upload.

use crate::codec;
use crate::error::{CacheError, CacheResult};
use crate::key::{CacheKey, CacheKeyBuilder};
use crate::registry::TransformRegistry;
use bytes::Bytes;
use dashmap::DashSet;
use std::sync::Arc;
use tracing::instrument;
use vignette_core::{SourceImage, TransformRequest};
use vignette_storage::{Acl, ObjectStore, PutOptions, StorageError};

/// A freshly generated and uploaded derivative.
#[derive(Clone, Debug)]
pub struct Derivative {
    pub key: CacheKey,
    pub bytes: Bytes,
    pub content_type: &'static str,
    pub width: u32,
    pub height: u32,
}

/// Produces derivatives and writes them to the store.
pub struct DerivationEngine {
    store: Arc<dyn ObjectStore>,
    registry: Arc<TransformRegistry>,
    keys: CacheKeyBuilder,
    /// Buckets already set to public-read by this engine.
    public_buckets: DashSet<String>,
}

impl DerivationEngine {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<TransformRegistry>,
        keys: CacheKeyBuilder,
    ) -> Self {
        Self {
            store,
            registry,
            keys,
            public_buckets: DashSet::new(),
        }
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.keys
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Generate the derivative for `request` and upload it under its cache key.
    ///
    /// Overwrites any existing object at that key.
    pub async fn generate(
        &self,
        source: &SourceImage,
        request: &TransformRequest,
    ) -> CacheResult<Derivative> {
        let key = self.keys.build(source, request);
        self.generate_at(source, request, key).await
    }

    #[instrument(skip(self, source, key), fields(bucket = %source.bucket, key = %key.object_key))]
    pub(crate) async fn generate_at(
        &self,
        source: &SourceImage,
        request: &TransformRequest,
        key: CacheKey,
    ) -> CacheResult<Derivative> {
        let transform = match self.registry.lookup(&request.format) {
            Ok(transform) => transform.clone(),
            Err(e) => {
                tracing::warn!(format = %request.format, "Unknown image format requested");
                return Err(e);
            }
        };
        let output_format = codec::output_format(&key.name)?;

        let source_key = source.object_key();
        let source_bytes = match self.store.get(&source.bucket, &source_key).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => {
                return Err(CacheError::SourceUnavailable {
                    bucket: source.bucket.clone(),
                    key: source_key,
                });
            }
            Err(e) => return Err(e.into()),
        };

        let args = self.registry.args_for(request);
        let format_name = request.format.clone();
        let (encoded, width, height) = tokio::task::spawn_blocking(move || {
            let img = codec::decode(&source_bytes)?;
            let out = transform
                .apply(&img, &args)
                .ok_or_else(|| CacheError::TransformDeclined {
                    format: format_name,
                    reason: format!("no result for arguments {args:?}"),
                })?;
            let encoded = codec::encode(&out, output_format)?;
            Ok::<_, CacheError>((encoded, out.width(), out.height()))
        })
        .await
        .map_err(|e| CacheError::Task(e.to_string()))??;

        self.ensure_public_bucket(&key.bucket).await?;

        let bytes = Bytes::from(encoded);
        let content_type = output_format.to_mime_type();
        self.store
            .put(
                &key.bucket,
                &key.object_key,
                bytes.clone(),
                PutOptions::public_read().with_content_type(content_type),
            )
            .await?;

        tracing::info!(
            format = %request.format,
            width = width,
            height = height,
            size = bytes.len(),
            "Generated derivative"
        );

        Ok(Derivative {
            key,
            bytes,
            content_type,
            width,
            height,
        })
    }

    async fn ensure_public_bucket(&self, bucket: &str) -> CacheResult<()> {
        if self.public_buckets.contains(bucket) {
            return Ok(());
        }
        self.store.ensure_bucket(bucket, Acl::PublicRead).await?;
        self.public_buckets.insert(bucket.to_string());
        Ok(())
    }
}
