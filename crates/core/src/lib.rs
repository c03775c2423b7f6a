//! Core domain types for the vignette derived-image cache.
//!
//! This crate defines the data model shared by the other crates:
//! - Source image identity as read from the owning record system
//! - Transform requests and their opaque scalar arguments
//! - Handles to cached derivatives
//! - Configuration for storage, transform defaults and cache behaviour

pub mod artifact;
pub mod config;
pub mod error;
pub mod source;
pub mod transform;

pub use artifact::{CacheOutcome, CachedArtifact};
pub use config::{
    AppConfig, CacheConfig, DEFAULT_MAX_DIMENSION, DerivativeConfig, KeyScheme, ResampleFilter,
    StorageConfig,
};
pub use error::{Error, Result};
pub use source::{SourceId, SourceImage};
pub use transform::{TransformArg, TransformRequest};

/// Directory segment under which derivatives of a folder are stored.
pub const RESAMPLED_DIR: &str = "_resampled/";
