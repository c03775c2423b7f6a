//! Per-source convenience surface over [`DerivedImageCache`].

use crate::cache::{DerivedImageCache, GetOptions};
use crate::error::CacheResult;
use vignette_core::{CachedArtifact, SourceImage, TransformArg, TransformRequest};

/// Named derivative accessors bound to one source image.
///
/// ```ignore
/// let thumb = cache.source(&image).with_force_refresh(flush).cms_thumbnail().await?;
/// ```
pub struct FormattedImages<'a> {
    cache: &'a DerivedImageCache,
    source: &'a SourceImage,
    options: GetOptions,
}

impl<'a> FormattedImages<'a> {
    pub(crate) fn new(cache: &'a DerivedImageCache, source: &'a SourceImage) -> Self {
        Self {
            cache,
            source,
            options: GetOptions::default(),
        }
    }

    /// Regenerate instead of reusing cached derivatives.
    pub fn with_force_refresh(mut self, force: bool) -> Self {
        self.options.force_refresh = force;
        self
    }

    pub fn with_options(mut self, options: GetOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve an arbitrary format with up to two arguments.
    pub async fn formatted_image(
        &self,
        format: &str,
        arg1: Option<TransformArg>,
        arg2: Option<TransformArg>,
    ) -> CacheResult<Option<CachedArtifact>> {
        let request = TransformRequest {
            format: format.to_string(),
            arg1,
            arg2,
        };
        self.cache.get(self.source, &request, self.options).await
    }

    /// Delete every derivative of this source.
    pub async fn delete_formatted_images(&self) -> CacheResult<usize> {
        self.cache.delete_all(self.source).await
    }

    async fn sized(
        &self,
        format: &str,
        width: u32,
        height: Option<u32>,
    ) -> CacheResult<Option<CachedArtifact>> {
        self.formatted_image(format, Some(width.into()), height.map(Into::into))
            .await
    }

    pub async fn set_width(&self, width: u32) -> CacheResult<Option<CachedArtifact>> {
        self.sized("SetWidth", width, None).await
    }

    pub async fn set_height(&self, height: u32) -> CacheResult<Option<CachedArtifact>> {
        self.sized("SetHeight", height, None).await
    }

    pub async fn set_size(&self, width: u32, height: u32) -> CacheResult<Option<CachedArtifact>> {
        self.sized("SetSize", width, Some(height)).await
    }

    pub async fn set_ratio_size(
        &self,
        width: u32,
        height: u32,
    ) -> CacheResult<Option<CachedArtifact>> {
        self.sized("SetRatioSize", width, Some(height)).await
    }

    pub async fn resized_image(
        &self,
        width: u32,
        height: u32,
    ) -> CacheResult<Option<CachedArtifact>> {
        self.sized("ResizedImage", width, Some(height)).await
    }

    pub async fn cropped_image(
        &self,
        width: u32,
        height: u32,
    ) -> CacheResult<Option<CachedArtifact>> {
        self.sized("CroppedImage", width, Some(height)).await
    }

    pub async fn padded_image(
        &self,
        width: u32,
        height: u32,
    ) -> CacheResult<Option<CachedArtifact>> {
        self.sized("PaddedImage", width, Some(height)).await
    }

    pub async fn cms_thumbnail(&self) -> CacheResult<Option<CachedArtifact>> {
        self.formatted_image("CMSThumbnail", None, None).await
    }

    pub async fn asset_library_preview(&self) -> CacheResult<Option<CachedArtifact>> {
        self.formatted_image("AssetLibraryPreview", None, None).await
    }

    pub async fn asset_library_thumbnail(&self) -> CacheResult<Option<CachedArtifact>> {
        self.formatted_image("AssetLibraryThumbnail", None, None).await
    }

    pub async fn strip_thumbnail(&self) -> CacheResult<Option<CachedArtifact>> {
        self.formatted_image("StripThumbnail", None, None).await
    }
}
