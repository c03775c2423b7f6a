//! Local filesystem storage backend.
//!
//! Buckets are directories directly under the root; object keys are paths
//! inside them. ACLs have no filesystem equivalent and are accepted as-is.

use crate::error::{StorageError, StorageResult};
use crate::traits::{Acl, ObjectStore, PutOptions, validate_bucket_name};
use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::instrument;
use uuid::Uuid;

/// Suffix of in-flight writes; such files are never listed.
const TEMP_SUFFIX: &str = ".tmp";

/// Local filesystem object store.
pub struct FilesystemBackend {
    root: PathBuf,
}

impl FilesystemBackend {
    /// Create a new filesystem backend.
    pub async fn new(root: impl AsRef<Path>) -> StorageResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Get the full path for a key, with path traversal protection.
    ///
    /// Runs the validation on the blocking pool because it canonicalizes
    /// and stats paths.
    async fn key_path(&self, bucket: &str, key: &str) -> StorageResult<PathBuf> {
        validate_bucket_name(bucket)?;
        if key.starts_with('/') || key.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "absolute keys are not allowed: {key}"
            )));
        }
        let root = self.root.clone();
        let relative = format!("{bucket}/{key}");
        tokio::task::spawn_blocking(move || Self::key_path_sync(&root, &relative))
            .await
            .map_err(|e| {
                StorageError::Io(std::io::Error::other(format!("spawn_blocking failed: {e}")))
            })?
    }

    /// Synchronous path validation.
    ///
    /// Returns an error if `relative` would escape the storage root, including
    /// through symlinks at the path itself or at any existing ancestor.
    fn key_path_sync(root: &Path, relative: &str) -> StorageResult<PathBuf> {
        if relative.starts_with('/') || relative.starts_with('\\') {
            return Err(StorageError::InvalidKey(format!(
                "path traversal not allowed: {relative}"
            )));
        }

        // `..` inside a name is fine; only a whole `..` component escapes.
        for component in Path::new(relative).components() {
            if !matches!(component, Component::Normal(_)) {
                return Err(StorageError::InvalidKey(format!(
                    "contains unsafe path component: {relative}"
                )));
            }
        }

        let path = root.join(relative);

        let root_canonical = root.canonicalize().map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("failed to canonicalize root: {e}"),
            ))
        })?;

        match std::fs::symlink_metadata(&path) {
            Ok(meta) => {
                let canonical = path.canonicalize().map_err(|e| {
                    if meta.file_type().is_symlink() {
                        StorageError::InvalidKey(format!(
                            "symlink target missing or invalid: {relative}"
                        ))
                    } else {
                        StorageError::Io(std::io::Error::new(
                            e.kind(),
                            format!("failed to canonicalize path: {e}"),
                        ))
                    }
                })?;

                if !canonical.starts_with(&root_canonical) {
                    return Err(StorageError::InvalidKey(format!(
                        "resolved path escapes storage root: {relative}"
                    )));
                }
                return Ok(path);
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(StorageError::Io(std::io::Error::new(
                    err.kind(),
                    format!("failed to stat path: {err}"),
                )));
            }
        }

        // New path: the nearest existing ancestor must resolve inside the root.
        let mut ancestor = path.as_path();
        while let Some(parent) = ancestor.parent() {
            match std::fs::symlink_metadata(parent) {
                Ok(meta) => {
                    let parent_canonical = parent.canonicalize().map_err(|e| {
                        if meta.file_type().is_symlink() {
                            StorageError::InvalidKey(format!(
                                "ancestor symlink target missing or invalid: {relative}"
                            ))
                        } else {
                            StorageError::Io(std::io::Error::new(
                                e.kind(),
                                format!("failed to canonicalize ancestor: {e}"),
                            ))
                        }
                    })?;

                    if !parent_canonical.starts_with(&root_canonical) {
                        return Err(StorageError::InvalidKey(format!(
                            "ancestor path escapes storage root: {relative}"
                        )));
                    }
                    break;
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
                Err(err) => {
                    return Err(StorageError::Io(std::io::Error::new(
                        err.kind(),
                        format!("failed to stat ancestor: {err}"),
                    )));
                }
            }
            ancestor = parent;
        }

        Ok(path)
    }

    /// Ensure parent directory exists.
    async fn ensure_parent(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    fn not_found_or_io(e: std::io::Error, bucket: &str, key: &str) -> StorageError {
        if e.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(format!("{bucket}/{key}"))
        } else {
            StorageError::Io(e)
        }
    }

    fn is_temp_file(name: &str) -> bool {
        name.starts_with('.') && name.ends_with(TEMP_SUFFIX)
    }
}

#[async_trait]
impl ObjectStore for FilesystemBackend {
    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let path = self.key_path(bucket, key).await?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Bytes> {
        let path = self.key_path(bucket, key).await?;
        let data = fs::read(&path)
            .await
            .map_err(|e| Self::not_found_or_io(e, bucket, key))?;
        Ok(Bytes::from(data))
    }

    #[instrument(skip(self, data), fields(backend = "filesystem", size = data.len()))]
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        options: PutOptions,
    ) -> StorageResult<()> {
        let path = self.key_path(bucket, key).await?;
        self.ensure_parent(&path).await?;

        // Unique hidden temp file, fsync, then rename: readers never observe a partial object.
        let temp_path = path.with_file_name(format!(".{}{TEMP_SUFFIX}", Uuid::new_v4()));
        {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
        }
        if let Err(e) = fs::rename(&temp_path, &path).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(StorageError::Io(e));
        }

        tracing::trace!(
            bucket = %bucket,
            key = %key,
            acl = %options.acl,
            content_type = ?options.content_type,
            "Stored object"
        );
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        let path = self.key_path(bucket, key).await?;
        fs::remove_file(&path)
            .await
            .map_err(|e| Self::not_found_or_io(e, bucket, key))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn list(&self, bucket: &str, prefix: &str) -> StorageResult<Vec<String>> {
        // Walk the directory part of the prefix, then filter on the full prefix
        // so that non-directory prefixes behave like S3 prefixes.
        let dir_part = match prefix.rfind('/') {
            Some(idx) => &prefix[..=idx],
            None => "",
        };
        let bucket_root = self.key_path(bucket, "").await?;
        let base_path = self.key_path(bucket, dir_part).await?;
        let mut results = Vec::new();

        match fs::try_exists(&base_path).await {
            Ok(false) => return Ok(results),
            Ok(true) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(results),
            Err(e) => return Err(StorageError::Io(e)),
        }

        let mut stack = vec![base_path];
        while let Some(dir) = stack.pop() {
            let mut entries = fs::read_dir(&dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                // file_type() does not follow symlinks, so links are never traversed.
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file()
                    && !Self::is_temp_file(&entry.file_name().to_string_lossy())
                    && let Ok(rel) = path.strip_prefix(&bucket_root)
                {
                    let key = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    if key.starts_with(prefix) {
                        results.push(key);
                    }
                }
            }
        }

        results.sort();
        Ok(results)
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn ensure_bucket(&self, bucket: &str, acl: Acl) -> StorageResult<()> {
        let path = self.key_path(bucket, "").await?;
        fs::create_dir_all(&path).await?;
        tracing::debug!(bucket = %bucket, acl = %acl, "Ensured bucket directory");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "filesystem"
    }

    #[instrument(skip(self), fields(backend = "filesystem"))]
    async fn health_check(&self) -> StorageResult<()> {
        let metadata = fs::metadata(&self.root).await.map_err(|e| {
            StorageError::Io(std::io::Error::new(
                e.kind(),
                format!("storage root not accessible: {}", e),
            ))
        })?;

        if !metadata.is_dir() {
            return Err(StorageError::Io(std::io::Error::new(
                std::io::ErrorKind::NotADirectory,
                format!("storage root is not a directory: {:?}", self.root),
            )));
        }

        Ok(())
    }
}
