//! Shared test utilities for the thumbcache test suite.
//!
//! Provides synthetic image writers and a throwaway site layout that the
//! executor, resolver and sync tests all start from.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let site = setup_site();
//! let source = site.images().join("dawn.jpg");
//! assert!(source.exists());
//! assert!(site.thumbs().is_dir());
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

// =========================================================================
// Synthetic images
// =========================================================================

/// Create a small valid JPEG file with the given dimensions.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Create a small valid PNG file (with alpha) with the given dimensions.
pub fn create_test_png(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 64, 200])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Write a non-image file.
pub fn touch(path: &Path) {
    std::fs::write(path, b"not an image").unwrap();
}

// =========================================================================
// Site layout
// =========================================================================

/// A temporary document root:
///
/// ```text
/// <tmp>/www/images/dawn.jpg        (800x600)
/// <tmp>/www/images/dusk.jpg        (600x800)
/// <tmp>/www/images/no-image.png    (16x16)
/// <tmp>/www/images/wait.png        (16x16)
/// <tmp>/www/thumbnail/             (empty)
/// ```
pub struct TestSite {
    pub tmp: TempDir,
}

impl TestSite {
    pub fn root(&self) -> PathBuf {
        self.tmp.path().join("www")
    }

    pub fn images(&self) -> PathBuf {
        self.root().join("images")
    }

    pub fn thumbs(&self) -> PathBuf {
        self.root().join("thumbnail")
    }

    /// Basenames currently in the thumbnail directory, sorted.
    pub fn thumb_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.thumbs())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }
}

pub fn setup_site() -> TestSite {
    let tmp = TempDir::new().unwrap();
    let site = TestSite { tmp };
    std::fs::create_dir_all(site.images()).unwrap();
    std::fs::create_dir_all(site.thumbs()).unwrap();
    create_test_jpeg(&site.images().join("dawn.jpg"), 800, 600);
    create_test_jpeg(&site.images().join("dusk.jpg"), 600, 800);
    create_test_png(&site.images().join("no-image.png"), 16, 16);
    create_test_png(&site.images().join("wait.png"), 16, 16);
    site
}
