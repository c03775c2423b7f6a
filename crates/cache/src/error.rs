//! Cache error types.

use thiserror::Error;
use vignette_storage::StorageError;

/// Errors raised while resolving or generating a derivative.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The source object is missing from the store at generation time.
    #[error("source image unavailable: {bucket}/{key}")]
    SourceUnavailable { bucket: String, key: String },

    #[error("no transform registered for format {0:?}")]
    TransformNotFound(String),

    /// The transform ran but produced no image.
    #[error("transform {format} declined: {reason}")]
    TransformDeclined { format: String, reason: String },

    #[error("failed to decode source image: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode derivative: {0}")]
    Encode(#[source] image::ImageError),

    #[error("unsupported output format for {0}")]
    UnsupportedFormat(String),

    #[error("transform task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Store(#[from] StorageError),
}

impl CacheError {
    /// Whether the failure only affects this derivative and can be answered
    /// with "no image". Store failures and task panics are not recoverable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Task(_))
    }
}

/// Result type for cache operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_are_not_recoverable() {
        let err = CacheError::from(StorageError::Timeout("exists".to_string()));
        assert!(!err.is_recoverable());
        assert!(!CacheError::Task("panicked".to_string()).is_recoverable());

        let err = CacheError::SourceUnavailable {
            bucket: "assets".to_string(),
            key: "photo.jpg".to_string(),
        };
        assert!(err.is_recoverable());
        assert!(CacheError::TransformNotFound("Nope".to_string()).is_recoverable());
    }
}
