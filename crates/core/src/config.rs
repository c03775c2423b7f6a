//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub derivatives: DerivativeConfig,
    #[serde(default)]
    pub cache: CacheConfig,
}

impl AppConfig {
    /// Validate all sections.
    pub fn validate(&self) -> crate::Result<()> {
        self.storage.validate().map_err(crate::Error::Config)?;
        self.derivatives.validate().map_err(crate::Error::Config)?;
        self.cache.validate().map_err(crate::Error::Config)?;
        Ok(())
    }
}

/// Storage backend configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Local filesystem storage. Each bucket is a directory under `path`.
    Filesystem {
        /// Root directory for storage.
        path: PathBuf,
    },
    /// S3-compatible storage.
    S3 {
        /// Optional endpoint URL (for MinIO, etc.).
        endpoint: Option<String>,
        /// AWS region.
        region: Option<String>,
        /// Optional key prefix applied inside every bucket.
        prefix: Option<String>,
        /// AWS access key ID. Falls back to the ambient credential chain if not set.
        access_key_id: Option<String>,
        /// AWS secret access key. Falls back to the ambient credential chain if not set.
        secret_access_key: Option<String>,
        /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
        #[serde(default)]
        force_path_style: bool,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Filesystem {
            path: PathBuf::from("./data/buckets"),
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            StorageConfig::S3 {
                access_key_id,
                secret_access_key,
                ..
            } => match (access_key_id.as_ref(), secret_access_key.as_ref()) {
                (Some(_), Some(_)) | (None, None) => Ok(()),
                _ => Err(
                    "s3 config requires both access_key_id and secret_access_key when either is set"
                        .to_string(),
                ),
            },
            StorageConfig::Filesystem { path } => {
                if path.as_os_str().is_empty() {
                    Err("filesystem storage path must not be empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Resampling filter used by the resize transforms.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResampleFilter {
    Nearest,
    Triangle,
    CatmullRom,
    Gaussian,
    #[default]
    Lanczos3,
}

/// Fixed dimensions and rendering options for the built-in transforms.
///
/// Loaded once at startup; transforms capture a copy at registration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DerivativeConfig {
    #[serde(default = "default_strip_thumbnail_size")]
    pub strip_thumbnail_width: u32,
    #[serde(default = "default_strip_thumbnail_size")]
    pub strip_thumbnail_height: u32,
    #[serde(default = "default_thumbnail_size")]
    pub cms_thumbnail_width: u32,
    #[serde(default = "default_thumbnail_size")]
    pub cms_thumbnail_height: u32,
    #[serde(default = "default_thumbnail_size")]
    pub asset_thumbnail_width: u32,
    #[serde(default = "default_thumbnail_size")]
    pub asset_thumbnail_height: u32,
    #[serde(default = "default_asset_preview_width")]
    pub asset_preview_width: u32,
    #[serde(default = "default_asset_preview_height")]
    pub asset_preview_height: u32,
    /// RGBA fill for the area around a padded resize.
    #[serde(default = "default_padding_color")]
    pub padding_color: [u8; 4],
    #[serde(default)]
    pub filter: ResampleFilter,
    /// Largest width or height a transform may produce. Requests above it are declined.
    #[serde(default = "default_max_dimension")]
    pub max_dimension: u32,
}

/// Default upper bound for derivative widths and heights, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 8192;

fn default_max_dimension() -> u32 {
    DEFAULT_MAX_DIMENSION
}

fn default_strip_thumbnail_size() -> u32 {
    50
}

fn default_thumbnail_size() -> u32 {
    100
}

fn default_asset_preview_width() -> u32 {
    400
}

fn default_asset_preview_height() -> u32 {
    200
}

fn default_padding_color() -> [u8; 4] {
    [255, 255, 255, 255]
}

impl Default for DerivativeConfig {
    fn default() -> Self {
        Self {
            strip_thumbnail_width: default_strip_thumbnail_size(),
            strip_thumbnail_height: default_strip_thumbnail_size(),
            cms_thumbnail_width: default_thumbnail_size(),
            cms_thumbnail_height: default_thumbnail_size(),
            asset_thumbnail_width: default_thumbnail_size(),
            asset_thumbnail_height: default_thumbnail_size(),
            asset_preview_width: default_asset_preview_width(),
            asset_preview_height: default_asset_preview_height(),
            padding_color: default_padding_color(),
            filter: ResampleFilter::default(),
            max_dimension: default_max_dimension(),
        }
    }
}

impl DerivativeConfig {
    /// Validate that every fixed dimension is usable.
    pub fn validate(&self) -> Result<(), String> {
        let dims = [
            ("strip_thumbnail_width", self.strip_thumbnail_width),
            ("strip_thumbnail_height", self.strip_thumbnail_height),
            ("cms_thumbnail_width", self.cms_thumbnail_width),
            ("cms_thumbnail_height", self.cms_thumbnail_height),
            ("asset_thumbnail_width", self.asset_thumbnail_width),
            ("asset_thumbnail_height", self.asset_thumbnail_height),
            ("asset_preview_width", self.asset_preview_width),
            ("asset_preview_height", self.asset_preview_height),
        ];
        if self.max_dimension == 0 {
            return Err("derivatives.max_dimension must be greater than zero".to_string());
        }
        if let Some((name, _)) = dims.iter().find(|(_, v)| *v == 0) {
            return Err(format!("derivatives.{name} must be greater than zero"));
        }
        match dims.iter().find(|(_, v)| *v > self.max_dimension) {
            Some((name, v)) => Err(format!(
                "derivatives.{name} ({v}) exceeds derivatives.max_dimension ({})",
                self.max_dimension
            )),
            None => Ok(()),
        }
    }
}

/// How transform arguments are folded into a cache key.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyScheme {
    /// `format ++ arg1 ++ arg2`. Matches keys written by existing deployments,
    /// but `(1, 23)` and `(12, 3)` collide.
    #[default]
    Concatenated,
    /// `format ++ "_" ++ sha256(args)[..16]`. Collision-free for distinct arguments.
    Hashed,
}

/// Cache key construction and request handling options.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Host appended to the bucket name to form the root URL prefix.
    #[serde(default = "default_public_host")]
    pub public_host: String,
    /// Scheme used when turning a root-prefixed key into a URL.
    #[serde(default = "default_url_scheme")]
    pub url_scheme: String,
    #[serde(default)]
    pub key_scheme: KeyScheme,
    /// Upper bound for each individual store call, in milliseconds.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Serialize concurrent misses on the same key so only one uploads.
    #[serde(default = "default_collapse_concurrent_misses")]
    pub collapse_concurrent_misses: bool,
}

fn default_public_host() -> String {
    "s3.amazonaws.com".to_string()
}

fn default_url_scheme() -> String {
    "http".to_string()
}

fn default_store_timeout_ms() -> u64 {
    30_000
}

fn default_collapse_concurrent_misses() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            public_host: default_public_host(),
            url_scheme: default_url_scheme(),
            key_scheme: KeyScheme::default(),
            store_timeout_ms: default_store_timeout_ms(),
            collapse_concurrent_misses: default_collapse_concurrent_misses(),
        }
    }
}

impl CacheConfig {
    /// Per-call store timeout.
    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    /// Validate cache configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.public_host.is_empty() || self.public_host.contains('/') {
            return Err(format!(
                "cache.public_host must be a bare host name, got {:?}",
                self.public_host
            ));
        }
        if self.url_scheme.is_empty() || !self.url_scheme.chars().all(|c| c.is_ascii_alphabetic())
        {
            return Err(format!("cache.url_scheme is invalid: {:?}", self.url_scheme));
        }
        if self.store_timeout_ms == 0 {
            return Err("cache.store_timeout_ms must be greater than zero".to_string());
        }
        Ok(())
    }
}
