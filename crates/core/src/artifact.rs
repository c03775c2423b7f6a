//! Handles to cached derivatives.

use serde::{Deserialize, Serialize};

/// How a derivative request was resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheOutcome {
    /// The derivative already existed and was reused.
    Hit,
    /// The derivative was missing and has been generated.
    Generated,
    /// A forced refresh regenerated an existing derivative.
    Regenerated,
    /// Regeneration failed; the previously cached object is still served.
    Stale,
}

impl CacheOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Generated => "generated",
            Self::Regenerated => "regenerated",
            Self::Stale => "stale",
        }
    }
}

/// A lightweight handle to a derivative stored in the object store.
///
/// This is deliberately not a source record: it only knows where the
/// derivative lives and what to call it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedArtifact {
    /// Folder-qualified cache key, e.g. `assets.s3.amazonaws.com/_resampled/SetWidth200-photo.jpg`.
    pub location: String,
    /// Public URL of the derivative.
    pub url: String,
    pub bucket: String,
    /// Bucket-relative object key.
    pub object_key: String,
    /// Title propagated from the source.
    pub title: Option<String>,
    pub outcome: CacheOutcome,
}

impl CachedArtifact {
    /// Whether this request produced a new upload.
    pub fn was_generated(&self) -> bool {
        matches!(
            self.outcome,
            CacheOutcome::Generated | CacheOutcome::Regenerated
        )
    }
}
