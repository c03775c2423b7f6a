//! Decoding sources and encoding derivatives.

use crate::error::{CacheError, CacheResult};
use image::{DynamicImage, ImageFormat};
use std::io::Cursor;
use vignette_core::ResampleFilter;

/// Output format implied by the extension of `name`.
pub fn output_format(name: &str) -> CacheResult<ImageFormat> {
    let format = ImageFormat::from_path(name)
        .map_err(|_| CacheError::UnsupportedFormat(name.to_string()))?;
    if format.writing_enabled() {
        Ok(format)
    } else {
        Err(CacheError::UnsupportedFormat(name.to_string()))
    }
}

pub fn decode(bytes: &[u8]) -> CacheResult<DynamicImage> {
    image::load_from_memory(bytes).map_err(CacheError::Decode)
}

/// Encode `img` as `format`. JPEG has no alpha channel, so it is flattened to RGB first.
pub fn encode(img: &DynamicImage, format: ImageFormat) -> CacheResult<Vec<u8>> {
    let mut out = Cursor::new(Vec::new());
    let result = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(img.to_rgb8()).write_to(&mut out, format),
        _ => img.write_to(&mut out, format),
    };
    result.map_err(CacheError::Encode)?;
    Ok(out.into_inner())
}

pub(crate) fn filter_type(filter: ResampleFilter) -> image::imageops::FilterType {
    use image::imageops::FilterType;
    match filter {
        ResampleFilter::Nearest => FilterType::Nearest,
        ResampleFilter::Triangle => FilterType::Triangle,
        ResampleFilter::CatmullRom => FilterType::CatmullRom,
        ResampleFilter::Gaussian => FilterType::Gaussian,
        ResampleFilter::Lanczos3 => FilterType::Lanczos3,
    }
}
