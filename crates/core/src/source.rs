//! Source image identity.

use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::fmt;

/// Opaque record identifier assigned by the owning record system.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(u64);

impl SourceId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SourceId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// The uploaded asset that derivatives are computed from.
///
/// A snapshot of the record system's view of the image. The cache never
/// persists it; callers hand one in per operation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImage {
    /// Record identifier. Absent for synthetic instances, which never resolve.
    pub id: Option<SourceId>,
    /// Base name of the object, without any folder.
    pub filename: String,
    /// Folder path prefix inside the bucket, always ending in `/` when set.
    #[serde(default, deserialize_with = "deserialize_folder")]
    pub parent_folder: Option<String>,
    /// Display label propagated to derivatives.
    pub title: Option<String>,
    /// Bucket holding the source and its derivatives.
    pub bucket: String,
}

impl SourceImage {
    /// Create a source at the bucket root.
    pub fn new(bucket: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            id: None,
            filename: filename.into(),
            parent_folder: None,
            title: None,
            bucket: bucket.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<SourceId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Place the source inside a folder. Leading slashes are dropped and a
    /// trailing slash is added; an empty folder means the bucket root.
    pub fn with_parent_folder(mut self, folder: impl AsRef<str>) -> Self {
        self.parent_folder = normalize_folder(folder.as_ref());
        self
    }

    /// Whether any cache operation can be attempted at all.
    pub fn has_filename(&self) -> bool {
        !self.filename.is_empty()
    }

    /// Normalised parent folder, ending in `/`, or `None` at the bucket root.
    ///
    /// Tolerates a `parent_folder` assigned directly without normalisation.
    pub fn folder(&self) -> Option<Cow<'_, str>> {
        let raw = self.parent_folder.as_deref()?;
        if !raw.starts_with('/') && raw.ends_with('/') {
            return Some(Cow::Borrowed(raw));
        }
        normalize_folder(raw).map(Cow::Owned)
    }

    /// Bucket-relative key of the source object.
    pub fn object_key(&self) -> String {
        match self.folder() {
            Some(folder) => format!("{folder}{}", self.filename),
            None => self.filename.clone(),
        }
    }
}

fn deserialize_folder<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(normalize_folder))
}

fn normalize_folder(folder: &str) -> Option<String> {
    let trimmed = folder.trim_start_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.ends_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("{trimmed}/"))
    }
}
