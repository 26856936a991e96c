//! Parameter types for image operations.
//!
//! These types describe *what* to do, not *how* to do it. They are the
//! interface between the [`executor`](crate::executor) (which decides whether
//! a thumbnail must be produced) and the [`backend`](super::backend) (which
//! does the pixel work).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100). Clamped on construction.
//! - [`ResizeFlags`]: Resize mode bit set. Bit values are part of the cache
//!   filename format and must never change.
//! - [`ResizeParams`]: Target box and mode for a single resize.
//! - [`RenderParams`]: One concrete decode → resize → encode job, with the
//!   final pixel sizes already computed.

use bitflags::bitflags;
use image::ImageFormat;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl From<u32> for Quality {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u32 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

bitflags! {
    /// How aspect ratio and bounds are applied when resizing.
    ///
    /// An empty set is `FIT`: scale proportionally so the image fits inside
    /// the requested box.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ResizeFlags: u32 {
        /// Never enlarge the source.
        const SHRINK_ONLY = 0b0000_0001;
        /// Ignore the aspect ratio; both dimensions are required.
        const STRETCH = 0b0000_0010;
        /// Cover the box instead of fitting inside it.
        const FILL = 0b0000_0100;
        /// Cover the box, then center-crop to exactly the box.
        const EXACT = 0b0000_1000;
        /// Scale by width only, whatever the requested height.
        const FIT_WIDTH = 0b0001_0000;
        /// Scale by height only, whatever the requested width.
        const FIT_HEIGHT = 0b0010_0000;
    }
}

/// A resize flag name that is not part of the known vocabulary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown resize flag '{0}'")]
pub struct UnknownResizeFlag(pub String);

impl ResizeFlags {
    /// Look up a single flag by its configuration name, case-insensitively.
    ///
    /// `FIT` and `NONE` both name the empty set.
    pub fn parse_name(name: &str) -> Result<Self, UnknownResizeFlag> {
        match name.trim().to_ascii_uppercase().as_str() {
            "FIT" | "NONE" => Ok(Self::empty()),
            "SHRINK_ONLY" => Ok(Self::SHRINK_ONLY),
            "STRETCH" => Ok(Self::STRETCH),
            "FILL" => Ok(Self::FILL),
            "EXACT" => Ok(Self::EXACT),
            "FIT_WIDTH" => Ok(Self::FIT_WIDTH),
            "FIT_HEIGHT" => Ok(Self::FIT_HEIGHT),
            _ => Err(UnknownResizeFlag(name.to_string())),
        }
    }

    /// OR together every named flag. Fails on the first unknown name.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self, UnknownResizeFlag> {
        names.iter().try_fold(Self::empty(), |acc, name| {
            Ok(acc | Self::parse_name(name.as_ref())?)
        })
    }
}

/// Target box and mode for a resize. `None` means "unconstrained".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeParams {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub flags: ResizeFlags,
}

impl ResizeParams {
    /// Zero is treated like an unset dimension.
    pub fn new(width: Option<u32>, height: Option<u32>, flags: ResizeFlags) -> Self {
        Self {
            width: width.filter(|w| *w > 0),
            height: height.filter(|h| *h > 0),
            flags,
        }
    }

    pub fn has_dimensions(&self) -> bool {
        self.width.is_some() || self.height.is_some()
    }
}

/// Parameters for a single render: read `source`, resize, crop, write `output`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    pub format: ImageFormat,
    /// Exact pixel size to resize to. `None` keeps the source size.
    pub resize: Option<(u32, u32)>,
    /// Centered crop box applied after the resize (`EXACT` mode).
    pub crop: Option<(u32, u32)>,
    /// Encoder quality. `None` uses the codec default.
    pub quality: Option<Quality>,
}
