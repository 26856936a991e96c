//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Identify | `image::image_dimensions` |
//! | Decode (JPEG, PNG, GIF, TIFF, WebP) | `image` crate (pure Rust decoders) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Exact crop | `DynamicImage::crop_imm`, centered |
//! | Encode → JPEG | `JpegEncoder::new_with_quality` |
//! | Encode → other | `DynamicImage::write_to` (lossless, quality ignored) |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::calculate_crop;
use super::params::RenderParams;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, ImageReader};
use std::io::BufWriter;
use std::path::Path;

/// JPEG quality used when a request carries none.
pub const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to decode {}: {}", path.display(), e))
        })
}

/// Encode and save `img` in `format`.
fn save_image(
    img: &DynamicImage,
    path: &Path,
    format: ImageFormat,
    quality: Option<u8>,
) -> Result<(), BackendError> {
    let file = std::fs::File::create(path).map_err(BackendError::Io)?;
    let mut writer = BufWriter::new(file);

    match format {
        ImageFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
            let encoder = JpegEncoder::new_with_quality(
                &mut writer,
                quality.unwrap_or(DEFAULT_JPEG_QUALITY),
            );
            rgb.write_with_encoder(encoder)
                .map_err(|e| BackendError::ProcessingFailed(format!("JPEG encode failed: {}", e)))
        }
        ImageFormat::Gif | ImageFormat::WebP => {
            // Both encoders only take 8-bit RGBA
            DynamicImage::ImageRgba8(img.to_rgba8())
                .write_to(&mut writer, format)
                .map_err(|e| {
                    BackendError::ProcessingFailed(format!("{:?} encode failed: {}", format, e))
                })
        }
        ImageFormat::Png | ImageFormat::Tiff => {
            img.write_to(&mut writer, format).map_err(|e| {
                BackendError::ProcessingFailed(format!("{:?} encode failed: {}", format, e))
            })
        }
        other => Err(BackendError::UnsupportedFormat(format!("{:?}", other))),
    }
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn render(&self, params: &RenderParams) -> Result<(), BackendError> {
        let mut img = load_image(&params.source)?;

        if let Some((width, height)) = params.resize {
            if (width, height) != (img.width(), img.height()) {
                img = img.resize_exact(width, height, FilterType::Lanczos3);
            }
        }

        if let Some(target) = params.crop {
            let (x, y, w, h) = calculate_crop((img.width(), img.height()), target);
            img = img.crop_imm(x, y, w, h);
        }

        let quality = params.quality.map(|q| q.value() as u8);
        save_image(&img, &params.output, params.format, quality)
    }
}
