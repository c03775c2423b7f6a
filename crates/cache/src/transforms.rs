//! Built-in image transforms.

use crate::codec::filter_type;
use crate::registry::{TransformArgs, TransformRegistry};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use vignette_core::DerivativeConfig;

/// Resize to `width`, keeping the aspect ratio.
pub fn resize_by_width(img: &DynamicImage, width: u32, filter: FilterType) -> DynamicImage {
    let height = scaled(img.height(), width, img.width());
    img.resize_exact(width, height, filter)
}

/// Resize to `height`, keeping the aspect ratio.
pub fn resize_by_height(img: &DynamicImage, height: u32, filter: FilterType) -> DynamicImage {
    let width = scaled(img.width(), height, img.height());
    img.resize_exact(width, height, filter)
}

/// Largest aspect-preserving resize that fits inside `width` x `height`.
pub fn resize_ratio(img: &DynamicImage, width: u32, height: u32, filter: FilterType) -> DynamicImage {
    img.resize(width, height, filter)
}

/// Fit inside `width` x `height`, then centre on a canvas of exactly that size
/// filled with `background`.
pub fn padded_resize(
    img: &DynamicImage,
    width: u32,
    height: u32,
    background: [u8; 4],
    filter: FilterType,
) -> DynamicImage {
    let fitted = img.resize(width, height, filter);
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba(background));
    let x = (width - fitted.width()) / 2;
    let y = (height - fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted.to_rgba8(), i64::from(x), i64::from(y));
    DynamicImage::ImageRgba8(canvas)
}

/// Fill `width` x `height` and crop the overflow around the centre.
pub fn cropped_resize(img: &DynamicImage, width: u32, height: u32, filter: FilterType) -> DynamicImage {
    img.resize_to_fill(width, height, filter)
}

fn scaled(side: u32, target: u32, reference: u32) -> u32 {
    let value = (u64::from(side) * u64::from(target) + u64::from(reference) / 2) / u64::from(reference.max(1));
    u32::try_from(value).unwrap_or(u32::MAX).max(1)
}

pub(crate) fn register_builtins(registry: &mut TransformRegistry, config: &DerivativeConfig) {
    let filter = filter_type(config.filter);
    let background = config.padding_color;

    // The derived side of an aspect-preserving resize is bounded like the requested one.
    registry.register("SetWidth", 1, move |img, args| {
        let width = args.dimension(0)?;
        (scaled(img.height(), width, img.width()) <= args.max_dimension())
            .then(|| resize_by_width(img, width, filter))
    });
    registry.register("SetHeight", 1, move |img, args| {
        let height = args.dimension(0)?;
        (scaled(img.width(), height, img.height()) <= args.max_dimension())
            .then(|| resize_by_height(img, height, filter))
    });
    registry.register("SetSize", 2, move |img, args| {
        let (w, h) = args.dimensions()?;
        Some(padded_resize(img, w, h, background, filter))
    });
    registry.register("SetRatioSize", 2, move |img, args| {
        let (w, h) = args.dimensions()?;
        Some(resize_ratio(img, w, h, filter))
    });
    registry.register("PaddedImage", 2, move |img, args| {
        let (w, h) = args.dimensions()?;
        Some(padded_resize(img, w, h, background, filter))
    });
    registry.register("CroppedImage", 2, move |img, args| {
        let (w, h) = args.dimensions()?;
        Some(cropped_resize(img, w, h, filter))
    });
    registry.register("ResizedImage", 2, move |img, args: &TransformArgs| {
        match args.dimensions() {
            Some((w, h)) => Some(img.resize_exact(w, h, filter)),
            None => {
                tracing::warn!(
                    args = ?args,
                    "ResizedImage called without a width and height, likely from legacy code"
                );
                None
            }
        }
    });

    let (w, h) = (config.cms_thumbnail_width, config.cms_thumbnail_height);
    registry.register("CMSThumbnail", 0, move |img, _| {
        Some(padded_resize(img, w, h, background, filter))
    });
    let (w, h) = (config.asset_preview_width, config.asset_preview_height);
    registry.register("AssetLibraryPreview", 0, move |img, _| {
        Some(padded_resize(img, w, h, background, filter))
    });
    let (w, h) = (config.asset_thumbnail_width, config.asset_thumbnail_height);
    registry.register("AssetLibraryThumbnail", 0, move |img, _| {
        Some(padded_resize(img, w, h, background, filter))
    });
    let (w, h) = (config.strip_thumbnail_width, config.strip_thumbnail_height);
    registry.register("StripThumbnail", 0, move |img, _| {
        Some(cropped_resize(img, w, h, filter))
    });
}
