//! Deterministic cache keys for derivatives.

use sha2::{Digest, Sha256};
use vignette_core::{CacheConfig, KeyScheme, RESAMPLED_DIR, SourceImage, TransformRequest};

/// Number of hex characters of the argument digest kept by [`KeyScheme::Hashed`].
const HASHED_ARGS_LEN: usize = 16;

/// Where a derivative lives.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Source folder, or `"<bucket>.<host>/"` at the bucket root.
    pub folder: String,
    /// `<format><args>-<filename>`.
    pub name: String,
    pub bucket: String,
    /// Bucket-relative key used for store calls.
    pub object_key: String,
    pub url: String,
}

impl CacheKey {
    /// Folder-qualified key, e.g. `assets.s3.amazonaws.com/_resampled/SetWidth200-photo.jpg`.
    pub fn location(&self) -> String {
        format!("{}{}{}", self.folder, RESAMPLED_DIR, self.name)
    }
}

/// Builds [`CacheKey`]s from a source and a transform request.
#[derive(Clone, Debug)]
pub struct CacheKeyBuilder {
    public_host: String,
    url_scheme: String,
    scheme: KeyScheme,
}

impl CacheKeyBuilder {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            public_host: config.public_host.clone(),
            url_scheme: config.url_scheme.clone(),
            scheme: config.key_scheme,
        }
    }

    pub fn scheme(&self) -> KeyScheme {
        self.scheme
    }

    pub fn build(&self, source: &SourceImage, request: &TransformRequest) -> CacheKey {
        let name = format!(
            "{}-{}",
            self.name_stem(request),
            source.filename
        );
        let source_folder = source.folder();
        let parent = source_folder.as_deref().unwrap_or("");
        let object_key = format!("{parent}{RESAMPLED_DIR}{name}");

        let (folder, url) = match source_folder.as_deref() {
            Some(folder) => (
                folder.to_string(),
                format!("{folder}{RESAMPLED_DIR}{name}"),
            ),
            None => {
                let folder = self.root_folder(&source.bucket);
                let url = format!("{}://{folder}{RESAMPLED_DIR}{name}", self.url_scheme);
                (folder, url)
            }
        };

        CacheKey {
            folder,
            name,
            bucket: source.bucket.clone(),
            object_key,
            url,
        }
    }

    /// Folder used for sources at the bucket root.
    pub fn root_folder(&self, bucket: &str) -> String {
        format!("{bucket}.{}/", self.public_host)
    }

    /// The part of the name before `-<filename>`.
    fn name_stem(&self, request: &TransformRequest) -> String {
        match self.scheme {
            KeyScheme::Concatenated => {
                let mut stem = request.format.clone();
                for arg in request.args().into_iter().flatten() {
                    stem.push_str(&arg.to_string());
                }
                stem
            }
            KeyScheme::Hashed => {
                if request.arg_count() == 0 {
                    return request.format.clone();
                }
                let mut hasher = Sha256::new();
                for arg in request.args() {
                    let text = arg.map(ToString::to_string).unwrap_or_default();
                    hasher.update((text.len() as u64).to_be_bytes());
                    hasher.update(text.as_bytes());
                }
                let digest = hex::encode(hasher.finalize());
                format!("{}_{}", request.format, &digest[..HASHED_ARGS_LEN])
            }
        }
    }
}
