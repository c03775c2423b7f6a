//! Object store gateway and backends for vignette.
//!
//! This crate provides:
//! - A bucket-aware [`ObjectStore`] trait with canned ACL support
//! - Backends: local filesystem, S3-compatible and in-memory
//! - [`TimeoutStore`], which bounds every call with a deadline

pub mod backends;
pub mod error;
pub mod timeout;
pub mod traits;

pub use backends::{filesystem::FilesystemBackend, memory::MemoryBackend, s3::S3Backend};
pub use error::{StorageError, StorageResult};
pub use timeout::TimeoutStore;
pub use traits::{Acl, ObjectStore, PutOptions, validate_bucket_name};

use std::sync::Arc;
use std::time::Duration;
use vignette_core::config::StorageConfig;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;

    match config {
        StorageConfig::Filesystem { path } => {
            let backend = FilesystemBackend::new(path).await?;
            Ok(Arc::new(backend))
        }
        StorageConfig::S3 {
            endpoint,
            region,
            prefix,
            access_key_id,
            secret_access_key,
            force_path_style,
        } => {
            let backend = S3Backend::new(
                endpoint.clone(),
                region.clone(),
                prefix.clone(),
                access_key_id.clone(),
                secret_access_key.clone(),
                *force_path_style,
            )
            .await?;
            Ok(Arc::new(backend))
        }
    }
}

/// Wrap `store` so each call fails with [`StorageError::Timeout`] after `timeout`.
pub fn with_timeout(store: Arc<dyn ObjectStore>, timeout: Duration) -> Arc<dyn ObjectStore> {
    Arc::new(TimeoutStore::new(store, timeout))
}
