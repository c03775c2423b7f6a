//! Storage trait definitions.

use crate::error::{StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;

/// Canned access control applied to buckets and objects.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Acl {
    #[default]
    Private,
    PublicRead,
}

impl fmt::Display for Acl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Private => f.write_str("private"),
            Self::PublicRead => f.write_str("public-read"),
        }
    }
}

/// Options for a single object write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PutOptions {
    pub content_type: Option<String>,
    pub acl: Acl,
}

impl PutOptions {
    /// Options for an object anyone may read.
    pub fn public_read() -> Self {
        Self {
            content_type: None,
            acl: Acl::PublicRead,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Narrow object store gateway used by the derivative cache.
///
/// Every call names its bucket; a single backend serves all buckets.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Check if an object exists.
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool>;

    /// Get an object's content.
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes>;

    /// Put an object, replacing any existing content.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()>;

    /// Delete an object. Returns `NotFound` if it does not exist.
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()>;

    /// List object keys that start with `prefix`.
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>>;

    /// Create the bucket if needed and apply `acl` to it. Idempotent.
    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()>;

    /// Get the name of this storage backend.
    ///
    /// Returns a static string identifier for the backend type (e.g., "s3", "filesystem").
    /// Used for logging.
    fn backend_name(&self) -> &'static str;

    /// Verify storage backend connectivity.
    ///
    /// The default implementation returns Ok(()), suitable for backends that
    /// don't require connectivity verification.
    async fn health_check(&self) -> StorageResult<()> {
        Ok(())
    }
}

/// Validate a bucket name against the S3 naming rules that matter for keys
/// and host names: 3-63 characters of lowercase letters, digits, `.` and `-`,
/// starting and ending with a letter or digit.
pub fn validate_bucket_name(bucket: &str) -> StorageResult<()> {
    let len_ok = (3..=63).contains(&bucket.len());
    let chars_ok = bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '.' || c == '-');
    let edges_ok = bucket
        .chars()
        .next()
        .zip(bucket.chars().last())
        .is_some_and(|(first, last)| first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric());

    if len_ok && chars_ok && edges_ok && !bucket.contains("..") {
        Ok(())
    } else {
        Err(StorageError::InvalidBucket(bucket.to_string()))
    }
}
