//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the two operations the executor needs:
//! identify (read dimensions, which doubles as the decodability check) and
//! render (decode, resize, crop, encode in one pass).
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use `MockBackend`, which records operations instead of
//! touching pixels.

use super::params::RenderParams;
use image::ImageFormat;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

/// Extensions with a compiled-in decoder and encoder.
///
/// Output format always follows the source extension, so anything missing
/// here degrades to the no-image placeholder.
const FORMAT_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("webp", ImageFormat::WebP),
];

/// Returns the image format for a file path based on its extension.
pub fn format_for_path(path: &Path) -> Option<ImageFormat> {
    let ext = path.extension()?.to_str()?;
    FORMAT_CANDIDATES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(ext))
        .map(|(_, format)| *format)
        .filter(|format| format.reading_enabled() && format.writing_enabled())
}

/// Trait for image processing backends.
///
/// Implementations must be `Sync`: one backend is shared by every thread
/// generating thumbnails.
pub trait ImageBackend: Sync {
    /// Get image dimensions. Fails for missing, unsupported or corrupt files.
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError>;

    /// Execute a render: decode `source`, resize/crop, encode to `output`.
    fn render(&self, params: &RenderParams) -> Result<(), BackendError>;
}
