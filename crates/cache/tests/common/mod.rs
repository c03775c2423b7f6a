pub mod mocks;

#[allow(unused_imports)]
pub use mocks::{CountingStore, FailingStore, SlowStore};

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use vignette_cache::{TransformRegistry, transforms};
use vignette_core::{DerivativeConfig, SourceImage};
use vignette_storage::{ObjectStore, PutOptions};

/// Encoded test image with a horizontal gradient so resizes are not trivial.
#[allow(dead_code)]
pub fn image_bytes(width: u32, height: u32, format: ImageFormat) -> Bytes {
    let img = RgbaImage::from_fn(width, height, |x, _| {
        Rgba([(x * 255 / width.max(1)) as u8, 80, 160, 255])
    });
    let mut out = Cursor::new(Vec::new());
    let img = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(img).to_rgb8()),
        _ => DynamicImage::ImageRgba8(img),
    };
    img.write_to(&mut out, format).unwrap();
    Bytes::from(out.into_inner())
}

/// A record-backed source with an id, as the owning system would hand it over.
#[allow(dead_code)]
pub fn source(bucket: &str, filename: &str) -> SourceImage {
    SourceImage::new(bucket, filename)
        .with_id(7u64)
        .with_title("Test photo")
}

/// Upload the source object itself.
#[allow(dead_code)]
pub async fn seed_source(store: &dyn ObjectStore, source: &SourceImage, width: u32, height: u32) {
    let format = ImageFormat::from_path(&source.filename).unwrap_or(ImageFormat::Png);
    store
        .put(
            &source.bucket,
            &source.object_key(),
            image_bytes(width, height, format),
            PutOptions::default(),
        )
        .await
        .unwrap();
}

/// Built-in registry whose `SetWidth` counts invocations.
#[allow(dead_code)]
pub fn counting_registry() -> (TransformRegistry, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut registry = TransformRegistry::with_builtins(&DerivativeConfig::default());
    let counter = calls.clone();
    registry.register("SetWidth", 1, move |img, args| {
        counter.fetch_add(1, Ordering::SeqCst);
        Some(transforms::resize_by_width(
            img,
            args.dimension(0)?,
            image::imageops::FilterType::Triangle,
        ))
    });
    (registry, calls)
}
