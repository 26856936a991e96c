//! Image processing, pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Resize** | Lanczos3 `resize_exact` to a size computed here |
//! | **Exact crop** | centered `crop_imm` |
//! | **Encode** | same format as the source (JPEG with quality) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for resize-mode math (unit testable)
//! - **Parameters**: Quality, resize flags and render jobs
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]

pub mod backend;
mod calculations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend, format_for_path};
pub use calculations::{
    DEFAULT_MAX_SIDE, DimensionError, calculate_crop, calculate_size, check_bounds,
    validate as validate_resize,
};
pub use params::{Quality, RenderParams, ResizeFlags, ResizeParams, UnknownResizeFlag};
pub use rust_backend::RustBackend;
