//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images.

use super::params::{ResizeFlags, ResizeParams};
use thiserror::Error;

/// A resize request whose mode cannot be satisfied by the given box.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DimensionError {
    #[error("at least a width or a height must be given")]
    Unconstrained,
    #[error("{0} resizing needs both a width and a height")]
    NeedsBoth(&'static str),
    #[error("output of {width}x{height} exceeds the {max}px side limit")]
    TooLarge { width: u32, height: u32, max: u32 },
}

/// Longest output side accepted when none is configured.
pub const DEFAULT_MAX_SIDE: u32 = 10_000;

/// Reject an output size with either side above `max_side`.
///
/// Checked on the computed size rather than the request, so a huge box is
/// fine as long as `SHRINK_ONLY` or the source keeps the output small.
pub fn check_bounds(size: (u32, u32), max_side: u32) -> Result<(), DimensionError> {
    if size.0 > max_side || size.1 > max_side {
        return Err(DimensionError::TooLarge {
            width: size.0,
            height: size.1,
            max: max_side,
        });
    }
    Ok(())
}

/// Check that the flags can be applied to the requested box.
///
/// Called before any pixel work so a misconfigured template fails fast
/// instead of degrading to a placeholder.
pub fn validate(params: &ResizeParams) -> Result<(), DimensionError> {
    let both = params.width.is_some() && params.height.is_some();
    if params.flags.contains(ResizeFlags::STRETCH) && !both {
        return Err(DimensionError::NeedsBoth("stretch"));
    }
    if params.flags.contains(ResizeFlags::EXACT) && !both {
        return Err(DimensionError::NeedsBoth("exact"));
    }
    if !params.has_dimensions() {
        return Err(DimensionError::Unconstrained);
    }
    Ok(())
}

/// Calculate output dimensions for a source image and a resize request.
///
/// # Arguments
/// * `source` - Original image dimensions (width, height)
/// * `params` - Requested box and resize mode
///
/// # Returns
/// * `(width, height)` - Output dimensions, never smaller than 1x1
///
/// `EXACT` is resolved here as `FILL`; the center crop is a separate step
/// (see [`calculate_crop`]).
pub fn calculate_size(
    source: (u32, u32),
    params: &ResizeParams,
) -> Result<(u32, u32), DimensionError> {
    validate(params)?;
    let (src_w, src_h) = source;
    let (src_wf, src_hf) = (src_w.max(1) as f64, src_h.max(1) as f64);
    let flags = params.flags;

    let (w, h) = if flags.contains(ResizeFlags::STRETCH) {
        // Non-proportional; validate() guarantees both dimensions
        let (mut w, mut h) = (
            params.width.unwrap_or(src_w) as f64,
            params.height.unwrap_or(src_h) as f64,
        );
        if flags.contains(ResizeFlags::SHRINK_ONLY) {
            w = src_wf * (w / src_wf).min(1.0);
            h = src_hf * (h / src_hf).min(1.0);
        }
        (w.round(), h.round())
    } else {
        let by_width = params
            .width
            .filter(|_| !flags.contains(ResizeFlags::FIT_HEIGHT))
            .map(|w| w as f64 / src_wf);
        let by_height = params
            .height
            .filter(|_| !flags.contains(ResizeFlags::FIT_WIDTH))
            .map(|h| h as f64 / src_hf);

        let mut scales: Vec<f64> = by_width.into_iter().chain(by_height).collect();
        if scales.is_empty() {
            // FIT_WIDTH with only a height (or the reverse): nothing to scale by
            scales.push(1.0);
        }
        if flags.intersects(ResizeFlags::FILL | ResizeFlags::EXACT) {
            let max = scales.iter().copied().fold(f64::MIN, f64::max);
            scales = vec![max];
        }
        if flags.contains(ResizeFlags::SHRINK_ONLY) {
            scales.push(1.0);
        }
        let scale = scales.iter().copied().fold(f64::MAX, f64::min);
        ((src_wf * scale).round(), (src_hf * scale).round())
    };

    Ok(((w as u32).max(1), (h as u32).max(1)))
}

/// Center-crop rectangle for `EXACT` resizing.
///
/// Returns `(x, y, width, height)` inside an image of `resized` dimensions.
/// The crop box is clamped to the image, so a `SHRINK_ONLY` source that is
/// smaller than the box is returned whole.
pub fn calculate_crop(resized: (u32, u32), target: (u32, u32)) -> (u32, u32, u32, u32) {
    let (img_w, img_h) = resized;
    let crop_w = target.0.min(img_w);
    let crop_h = target.1.min(img_h);
    let x = (img_w - crop_w) / 2;
    let y = (img_h - crop_h) / 2;
    (x, y, crop_w, crop_h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(w: Option<u32>, h: Option<u32>, flags: ResizeFlags) -> ResizeParams {
        ResizeParams::new(w, h, flags)
    }

    // =========================================================================
    // calculate_size: proportional modes
    // =========================================================================

    #[test]
    fn fit_landscape_into_box() {
        // 800x600 into 200x200 → limited by width: 200x150
        let p = params(Some(200), Some(200), ResizeFlags::empty());
        assert_eq!(calculate_size((800, 600), &p), Ok((200, 150)));
    }

    #[test]
    fn fit_width_only() {
        let p = params(Some(400), None, ResizeFlags::empty());
        assert_eq!(calculate_size((800, 600), &p), Ok((400, 300)));
    }

    #[test]
    fn fit_height_only() {
        let p = params(None, Some(300), ResizeFlags::empty());
        assert_eq!(calculate_size((600, 800), &p), Ok((225, 300)));
    }

    #[test]
    fn fit_enlarges_without_shrink_only() {
        let p = params(Some(200), None, ResizeFlags::empty());
        assert_eq!(calculate_size((100, 50), &p), Ok((200, 100)));
    }

    #[test]
    fn shrink_only_never_enlarges() {
        let p = params(Some(200), None, ResizeFlags::SHRINK_ONLY);
        assert_eq!(calculate_size((100, 50), &p), Ok((100, 50)));
    }

    #[test]
    fn fill_covers_box() {
        // 800x600 covering 200x200 → limited by height: 267x200
        let p = params(Some(200), Some(200), ResizeFlags::FILL);
        assert_eq!(calculate_size((800, 600), &p), Ok((267, 200)));
    }

    #[test]
    fn exact_sizes_like_fill() {
        let p = params(Some(200), Some(200), ResizeFlags::EXACT);
        assert_eq!(calculate_size((800, 600), &p), Ok((267, 200)));
    }

    #[test]
    fn fit_width_ignores_height() {
        let p = params(Some(400), Some(10), ResizeFlags::FIT_WIDTH);
        assert_eq!(calculate_size((800, 600), &p), Ok((400, 300)));
    }

    #[test]
    fn fit_height_ignores_width() {
        let p = params(Some(10), Some(300), ResizeFlags::FIT_HEIGHT);
        assert_eq!(calculate_size((800, 600), &p), Ok((400, 300)));
    }

    #[test]
    fn never_collapses_to_zero() {
        let p = params(Some(1), None, ResizeFlags::empty());
        assert_eq!(calculate_size((1000, 10), &p), Ok((1, 1)));
    }

    // =========================================================================
    // calculate_size: stretch
    // =========================================================================

    #[test]
    fn stretch_ignores_aspect() {
        let p = params(Some(100), Some(400), ResizeFlags::STRETCH);
        assert_eq!(calculate_size((800, 600), &p), Ok((100, 400)));
    }

    #[test]
    fn stretch_shrink_only_clamps_each_axis() {
        let p = params(
            Some(100),
            Some(900),
            ResizeFlags::STRETCH | ResizeFlags::SHRINK_ONLY,
        );
        assert_eq!(calculate_size((800, 600), &p), Ok((100, 600)));
    }

    // =========================================================================
    // validate
    // =========================================================================

    #[test]
    fn bounds_apply_to_each_side() {
        assert_eq!(check_bounds((10_000, 7_500), DEFAULT_MAX_SIDE), Ok(()));
        assert_eq!(
            check_bounds((100_000, 75_000), DEFAULT_MAX_SIDE),
            Err(DimensionError::TooLarge {
                width: 100_000,
                height: 75_000,
                max: DEFAULT_MAX_SIDE
            })
        );
        assert!(check_bounds((1, 501), 500).is_err());
    }

    #[test]
    fn fill_on_thin_source_is_caught_by_bounds() {
        // A modest box still explodes the long side of a 1px-wide source
        let p = params(Some(100), Some(100), ResizeFlags::FILL);
        let size = calculate_size((1, 10_000), &p).unwrap();
        assert_eq!(size, (100, 1_000_000));
        assert!(check_bounds(size, DEFAULT_MAX_SIDE).is_err());
    }

    #[test]
    fn shrink_only_keeps_huge_box_in_bounds() {
        let p = params(Some(100_000), None, ResizeFlags::SHRINK_ONLY);
        let size = calculate_size((800, 600), &p).unwrap();
        assert_eq!(check_bounds(size, DEFAULT_MAX_SIDE), Ok(()));
    }

    #[test]
    fn stretch_needs_both_dimensions() {
        let p = params(Some(100), None, ResizeFlags::STRETCH);
        assert_eq!(validate(&p), Err(DimensionError::NeedsBoth("stretch")));
    }

    #[test]
    fn exact_needs_both_dimensions() {
        let p = params(None, Some(100), ResizeFlags::EXACT);
        assert_eq!(validate(&p), Err(DimensionError::NeedsBoth("exact")));
    }

    #[test]
    fn unconstrained_is_rejected() {
        let p = params(None, None, ResizeFlags::empty());
        assert_eq!(validate(&p), Err(DimensionError::Unconstrained));
    }

    // =========================================================================
    // calculate_crop
    // =========================================================================

    #[test]
    fn crop_is_centered() {
        assert_eq!(calculate_crop((267, 200), (200, 200)), (33, 0, 200, 200));
    }

    #[test]
    fn crop_clamped_to_image() {
        assert_eq!(calculate_crop((100, 50), (200, 200)), (0, 0, 100, 50));
    }
}
