//! S3-compatible storage backend using AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{Acl, ObjectStore, PutOptions, validate_bucket_name};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, ObjectCannedAcl,
};
use bytes::Bytes;
use std::time::Duration;
use tracing::instrument;

/// Region in which buckets are created without a location constraint.
const DEFAULT_REGION: &str = "us-east-1";

fn map_s3_operation_error<E>(err: SdkError<E>) -> StorageError
where
    E: std::error::Error + Send + Sync + 'static,
{
    if let SdkError::DispatchFailure(ref failure) = err
        && failure.is_timeout()
    {
        return StorageError::Timeout(err.to_string());
    }
    StorageError::S3(Box::new(err))
}

fn status_of<E>(err: &SdkError<E>) -> Option<u16> {
    match err {
        SdkError::ServiceError(service_err) => Some(service_err.raw().status().as_u16()),
        _ => None,
    }
}

fn object_acl(acl: Acl) -> ObjectCannedAcl {
    match acl {
        Acl::Private => ObjectCannedAcl::Private,
        Acl::PublicRead => ObjectCannedAcl::PublicRead,
    }
}

fn bucket_acl(acl: Acl) -> BucketCannedAcl {
    match acl {
        Acl::Private => BucketCannedAcl::Private,
        Acl::PublicRead => BucketCannedAcl::PublicRead,
    }
}

/// S3-compatible object store using AWS SDK.
///
/// The client is not bound to a bucket; every operation names one.
pub struct S3Backend {
    client: Client,
    prefix: Option<String>,
    /// Stored endpoint (normalized) for diagnostics.
    endpoint: String,
    region: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("prefix", &self.prefix)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend.
    ///
    /// # Arguments
    /// * `force_path_style` - Use path-style URLs (`endpoint/bucket/key`) instead of
    ///   virtual-hosted style (`bucket.endpoint/key`). Required for MinIO and some
    ///   S3-compatible services.
    pub async fn new(
        endpoint: Option<String>,
        region: Option<String>,
        prefix: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        force_path_style: bool,
    ) -> StorageResult<Self> {
        let resolved_region = region.unwrap_or_else(|| DEFAULT_REGION.to_string());
        let sdk_region = aws_config::Region::new(resolved_region.clone());

        let mut s3_config_builder = match (access_key_id, secret_access_key) {
            (Some(key_id), Some(secret)) => {
                let credentials =
                    aws_sdk_s3::config::Credentials::new(key_id, secret, None, None, "vignette-config");
                aws_sdk_s3::config::Builder::new()
                    .behavior_version(BehaviorVersion::latest())
                    .region(sdk_region)
                    .credentials_provider(credentials)
            }
            (None, None) => {
                // Ambient credential chain: environment, profile, instance metadata.
                let sdk_config = aws_config::defaults(BehaviorVersion::latest())
                    .region(sdk_region)
                    .load()
                    .await;
                aws_sdk_s3::config::Builder::from(&sdk_config)
            }
            _ => {
                return Err(StorageError::Config(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ));
            }
        };

        let normalized_endpoint = endpoint.as_deref().map(normalize_endpoint);
        if let Some(endpoint_url) = &normalized_endpoint {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint_url);
        }
        if force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        let client = Client::from_conf(s3_config_builder.build());

        let stored_endpoint = normalized_endpoint
            .unwrap_or_else(|| format!("s3.{}.amazonaws.com", resolved_region));

        // Strip trailing slashes to avoid double-slash keys like "prefix//key".
        let normalized_prefix = prefix
            .map(|p| p.trim_end_matches('/').to_string())
            .filter(|p| !p.is_empty());

        Ok(Self {
            client,
            prefix: normalized_prefix,
            endpoint: stored_endpoint,
            region: resolved_region,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Get the full object key for a key (applies prefix if configured).
    fn full_key(&self, key: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key.to_string(),
        }
    }

    /// Strip the configured prefix from a full object key.
    fn strip_prefix(&self, full_key: &str) -> String {
        match &self.prefix {
            Some(prefix) => {
                let prefix_with_slash = format!("{}/", prefix);
                full_key
                    .strip_prefix(&prefix_with_slash)
                    .unwrap_or(full_key)
                    .to_string()
            }
            None => full_key.to_string(),
        }
    }

    /// Convert an AWS SDK error to StorageError, mapping 404 to NotFound.
    fn map_sdk_error<E>(err: SdkError<E>, bucket: &str, key: &str) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if status_of(&err) == Some(404) {
            return StorageError::NotFound(format!("{bucket}/{key}"));
        }
        map_s3_operation_error(err)
    }

    async fn create_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        let mut request = self
            .client
            .create_bucket()
            .bucket(bucket)
            .acl(bucket_acl(acl));

        if self.region != DEFAULT_REGION {
            let configuration = CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                .build();
            request = request.create_bucket_configuration(configuration);
        }

        match request.send().await {
            Ok(_) => {
                tracing::info!(bucket = %bucket, acl = %acl, "Created bucket");
                Ok(())
            }
            // Lost a creation race against another writer; apply the ACL instead.
            Err(err) if status_of(&err) == Some(409) => self.put_bucket_acl(bucket, acl).await,
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    async fn put_bucket_acl(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        self.client
            .put_bucket_acl()
            .bucket(bucket)
            .acl(bucket_acl(acl))
            .send()
            .await
            .map_err(map_s3_operation_error)?;
        Ok(())
    }
}

/// Handle bare host:port endpoints (e.g., "minio:9000") by prepending http://.
fn normalize_endpoint(endpoint_url: &str) -> String {
    let endpoint_lower = endpoint_url.to_ascii_lowercase();
    if endpoint_lower.starts_with("http://") || endpoint_lower.starts_with("https://") {
        endpoint_url.to_string()
    } else {
        format!("http://{}", endpoint_url)
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let full_key = self.full_key(key);
        match self
            .client
            .head_object()
            .bucket(bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if status_of(&err) == Some(404) => Ok(false),
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .get_object()
            .bucket(bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, bucket, key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?
            .into_bytes();

        Ok(bytes)
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        let full_key = self.full_key(key);
        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(&full_key)
            .acl(object_acl(options.acl))
            .body(data.into());

        if let Some(content_type) = options.content_type {
            request = request.content_type(content_type);
        }

        request.send().await.map_err(map_s3_operation_error)?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let full_key = self.full_key(key);

        // delete_object succeeds on missing keys, so probe first to report NotFound.
        if !self.exists(bucket, key).await? {
            return Err(StorageError::NotFound(format!("{bucket}/{key}")));
        }

        self.client
            .delete_object()
            .bucket(bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(map_s3_operation_error)?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        let full_prefix = self.full_key(prefix);
        let mut results = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(bucket)
                .prefix(&full_prefix);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let output = request
                .send()
                .await
                .map_err(|e| Self::map_sdk_error(e, bucket, prefix))?;

            for obj in output.contents() {
                if let Some(obj_key) = obj.key() {
                    results.push(self.strip_prefix(obj_key));
                }
            }

            if output.is_truncated() == Some(true) {
                continuation_token = output.next_continuation_token().map(|s| s.to_string());
            } else {
                break;
            }
        }

        Ok(results)
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        validate_bucket_name(bucket)?;

        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => self.put_bucket_acl(bucket, acl).await,
            Err(err) if status_of(&err) == Some(404) => self.create_bucket(bucket, acl).await,
            Err(err) => Err(map_s3_operation_error(err)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn health_check(&self) -> StorageResult<()> {
        const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

        let probe = async {
            self.client
                .list_buckets()
                .send()
                .await
                .map_err(map_s3_operation_error)?;
            Ok(())
        };

        tokio::time::timeout(HEALTH_CHECK_TIMEOUT, probe)
            .await
            .map_err(|_| {
                StorageError::Timeout("S3 health check timed out after 10 seconds".to_string())
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn make_backend(prefix: Option<String>) -> S3Backend {
        S3Backend::new(
            Some("s3.test".to_string()),
            Some("us-east-1".to_string()),
            prefix,
            Some("access".to_string()),
            Some("secret".to_string()),
            true,
        )
        .await
        .expect("backend should construct for unit tests")
    }

    #[tokio::test]
    async fn test_full_key_and_strip_prefix() {
        let backend = make_backend(Some("prefix/".to_string())).await;
        assert_eq!(
            backend.full_key("_resampled/SetWidth100-a.jpg"),
            "prefix/_resampled/SetWidth100-a.jpg"
        );
        assert_eq!(backend.strip_prefix("prefix/path/file"), "path/file");
        assert_eq!(backend.strip_prefix("other/path"), "other/path");

        let backend = make_backend(None).await;
        assert_eq!(backend.full_key("path/file"), "path/file");
        assert_eq!(backend.strip_prefix("path/file"), "path/file");
    }

    #[tokio::test]
    async fn test_s3_new_requires_complete_credentials() {
        let err = S3Backend::new(
            None,
            Some("us-east-1".to_string()),
            None,
            Some("access".to_string()),
            None,
            false,
        )
        .await
        .unwrap_err();

        assert!(matches!(err, StorageError::Config(_)));
    }

    #[tokio::test]
    async fn test_s3_new_normalizes_endpoint() {
        let backend = make_backend(None).await;
        assert_eq!(backend.endpoint(), "http://s3.test");
        assert_eq!(backend.region(), "us-east-1");

        assert_eq!(normalize_endpoint("https://minio:9000"), "https://minio:9000");
        assert_eq!(normalize_endpoint("minio:9000"), "http://minio:9000");
    }

    #[test]
    fn test_acl_mapping() {
        assert_eq!(object_acl(Acl::PublicRead), ObjectCannedAcl::PublicRead);
        assert_eq!(bucket_acl(Acl::Private), BucketCannedAcl::Private);
    }
}
