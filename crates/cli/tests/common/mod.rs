use image::{ImageFormat, Rgb, RgbImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A config file pointing the filesystem backend at a fresh directory.
pub struct Workspace {
    pub dir: TempDir,
    pub config: PathBuf,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("vignette.toml");
        let buckets = dir.path().join("buckets");
        fs::write(
            &config,
            format!(
                "[storage]\ntype = \"filesystem\"\npath = {:?}\n\n[cache]\nstore_timeout_ms = 5000\n",
                buckets.display().to_string()
            ),
        )
        .unwrap();
        Self { dir, config }
    }

    pub fn buckets(&self) -> PathBuf {
        self.dir.path().join("buckets")
    }

    /// Write a JPEG source image at `bucket/key`.
    #[allow(dead_code)]
    pub fn seed(&self, bucket: &str, key: &str, width: u32, height: u32) -> PathBuf {
        let path = self.buckets().join(bucket).join(key);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let img = RgbImage::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 90]));
        img.save_with_format(&path, ImageFormat::Jpeg).unwrap();
        path
    }
}

#[allow(dead_code)]
pub fn image_size(path: &Path) -> (u32, u32) {
    image::image_dimensions(path).unwrap()
}
