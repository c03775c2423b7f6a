//! Hit/miss orchestration for derivatives.

use crate::engine::DerivationEngine;
use crate::error::{CacheError, CacheResult};
use crate::facade::FormattedImages;
use crate::key::{CacheKey, CacheKeyBuilder};
use crate::registry::TransformRegistry;
use crate::sweeper::InvalidationSweeper;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::instrument;
use vignette_core::{
    AppConfig, CacheConfig, CacheOutcome, CachedArtifact, SourceImage, TransformRequest,
};
use vignette_storage::{ObjectStore, StorageError};

/// Per-call options for [`DerivedImageCache::get`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Regenerate even when a cached derivative exists.
    pub force_refresh: bool,
    /// Upper bound for the whole call, store probes and generation included.
    pub timeout: Option<Duration>,
}

impl GetOptions {
    pub fn force_refresh(mut self, force: bool) -> Self {
        self.force_refresh = force;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

type InFlight = DashMap<String, Arc<Mutex<()>>>;

/// Holds the per-key generation lock and drops the map entry once unused.
struct FlightSlot<'a> {
    map: &'a InFlight,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightSlot<'_> {
    fn drop(&mut self) {
        self.guard.take();
        self.map
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}

/// Resolves derivatives, generating and uploading them on a miss.
///
/// Nothing is memoised between calls: every `get` probes the store.
pub struct DerivedImageCache {
    engine: DerivationEngine,
    collapse_concurrent_misses: bool,
    in_flight: InFlight,
}

impl DerivedImageCache {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        registry: Arc<TransformRegistry>,
        config: &CacheConfig,
    ) -> Self {
        let engine = DerivationEngine::new(store, registry, CacheKeyBuilder::new(config));
        Self {
            engine,
            collapse_concurrent_misses: config.collapse_concurrent_misses,
            in_flight: DashMap::new(),
        }
    }

    /// Cache with the built-in transforms sized from `config.derivatives`.
    pub fn from_config(store: Arc<dyn ObjectStore>, config: &AppConfig) -> Self {
        let registry = TransformRegistry::with_builtins(&config.derivatives);
        Self::new(store, Arc::new(registry), &config.cache)
    }

    pub fn engine(&self) -> &DerivationEngine {
        &self.engine
    }

    pub fn registry(&self) -> &TransformRegistry {
        self.engine.registry()
    }

    /// Cache key for `request` without touching the store.
    pub fn key_for(&self, source: &SourceImage, request: &TransformRequest) -> CacheKey {
        self.engine.keys().build(source, request)
    }

    /// Per-source convenience surface.
    pub fn source<'a>(&'a self, source: &'a SourceImage) -> FormattedImages<'a> {
        FormattedImages::new(self, source)
    }

    /// Sweeper sharing this cache's store and registry.
    pub fn sweeper(&self) -> InvalidationSweeper {
        InvalidationSweeper::new(
            self.engine.store().clone(),
            Arc::new(self.engine.registry().clone()),
        )
    }

    /// Resolve the derivative for `request`, generating it if needed.
    ///
    /// Returns `Ok(None)` when there is nothing to show: the source has no id
    /// or filename, the format is unknown, the source object is missing, or
    /// generation failed and no earlier derivative exists. Store failures and
    /// timeouts are returned as errors.
    pub async fn get(
        &self,
        source: &SourceImage,
        request: &TransformRequest,
        options: GetOptions,
    ) -> CacheResult<Option<CachedArtifact>> {
        match options.timeout {
            Some(limit) => tokio::time::timeout(limit, self.resolve(source, request, options))
                .await
                .map_err(|_| {
                    CacheError::Store(StorageError::Timeout(format!(
                        "resolving {request} for {} exceeded {limit:?}",
                        source.filename
                    )))
                })?,
            None => self.resolve(source, request, options).await,
        }
    }

    #[instrument(
        skip(self, source, options),
        fields(bucket = %source.bucket, filename = %source.filename, force = options.force_refresh)
    )]
    async fn resolve(
        &self,
        source: &SourceImage,
        request: &TransformRequest,
        options: GetOptions,
    ) -> CacheResult<Option<CachedArtifact>> {
        if source.id.is_none() || !source.has_filename() {
            tracing::debug!("Source has no id or filename, nothing to resolve");
            return Ok(None);
        }
        if !self.registry().contains(&request.format) {
            tracing::warn!(format = %request.format, "Unknown image format requested");
            return Ok(None);
        }

        let store = self.engine.store();
        if !store.exists(&source.bucket, &source.object_key()).await? {
            tracing::debug!("Source object is missing");
            return Ok(None);
        }

        let key = self.key_for(source, request);
        let mut cached = store.exists(&key.bucket, &key.object_key).await?;
        if cached && !options.force_refresh {
            return Ok(Some(artifact(source, &key, CacheOutcome::Hit)));
        }

        let _slot = if self.collapse_concurrent_misses {
            let lock = self
                .in_flight
                .entry(key.object_key.clone())
                .or_default()
                .clone();
            let (guard, waited) = match Arc::clone(&lock).try_lock_owned() {
                Ok(guard) => (guard, false),
                Err(_) => {
                    tracing::debug!(key = %key.object_key, "Waiting for in-flight generation");
                    (Arc::clone(&lock).lock_owned().await, true)
                }
            };
            drop(lock);
            let slot = FlightSlot {
                map: &self.in_flight,
                key: key.object_key.clone(),
                guard: Some(guard),
            };

            // The previous holder may have just uploaded this key.
            if waited {
                cached = store.exists(&key.bucket, &key.object_key).await?;
                if cached && !options.force_refresh {
                    return Ok(Some(artifact(source, &key, CacheOutcome::Hit)));
                }
            }
            Some(slot)
        } else {
            None
        };

        match self.engine.generate_at(source, request, key.clone()).await {
            Ok(_) => {
                let outcome = if cached {
                    CacheOutcome::Regenerated
                } else {
                    CacheOutcome::Generated
                };
                Ok(Some(artifact(source, &key, outcome)))
            }
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    key = %key.object_key,
                    error = %e,
                    stale = cached,
                    "Could not generate derivative"
                );
                Ok(cached.then(|| artifact(source, &key, CacheOutcome::Stale)))
            }
            Err(e) => Err(e),
        }
    }

    /// Delete every derivative of `source`. Returns how many were removed.
    pub async fn delete_all(&self, source: &SourceImage) -> CacheResult<usize> {
        self.sweeper().delete_all(source).await
    }
}

fn artifact(source: &SourceImage, key: &CacheKey, outcome: CacheOutcome) -> CachedArtifact {
    CachedArtifact {
        location: key.location(),
        url: key.url.clone(),
        bucket: key.bucket.clone(),
        object_key: key.object_key.clone(),
        title: source.title.clone(),
        outcome,
    }
}
