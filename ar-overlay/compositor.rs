//! Masking, perspective warp and additive compositing.
//!
//! The located quadrilateral is filled in a copy of the frame, the AR image is
//! warped into a black frame-sized buffer, and the two are summed per channel
//! with saturation. Any panic inside the imaging backend is caught here and
//! reported as [`TransformError::Panicked`].

use std::panic::{catch_unwind, AssertUnwindSafe};

use ar_core::{Homography, PerspectiveWarper, Quad, TransformError};
use image::{Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use imageproc::point::Point as PixelPoint;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Resampling used when warping the AR image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WarpInterpolation {
    Nearest,
    #[default]
    Bilinear,
    Bicubic,
}

impl From<WarpInterpolation> for Interpolation {
    fn from(value: WarpInterpolation) -> Self {
        match value {
            WarpInterpolation::Nearest => Interpolation::Nearest,
            WarpInterpolation::Bilinear => Interpolation::Bilinear,
            WarpInterpolation::Bicubic => Interpolation::Bicubic,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CompositeConfig {
    pub interpolation: WarpInterpolation,
    /// Channel value written inside the located quad before compositing
    pub fill_value: u8,
    /// Located corners farther than this many frame sizes away are rejected
    pub max_extent_ratio: f64,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            interpolation: WarpInterpolation::Bilinear,
            fill_value: 0,
            max_extent_ratio: 16.0,
        }
    }
}

impl CompositeConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_extent_ratio.is_finite() || self.max_extent_ratio < 1.0 {
            return Err(ConfigError::InvalidExtentRatio(self.max_extent_ratio));
        }
        Ok(())
    }
}

/// [`PerspectiveWarper`] backed by `imageproc::geometric_transformations`
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageprocWarper {
    interpolation: WarpInterpolation,
}

impl ImageprocWarper {
    pub fn new(interpolation: WarpInterpolation) -> Self {
        Self { interpolation }
    }
}

impl PerspectiveWarper for ImageprocWarper {
    fn warp_into(&self, source: &RgbImage, homography: &Homography, out: &mut RgbImage) -> Result<(), TransformError> {
        if !homography.is_finite() {
            return Err(TransformError::NonFinite);
        }
        if homography.inverse().is_none() {
            return Err(TransformError::NonInvertible);
        }
        let m = homography.to_row_major_f32();
        // The backend rescales by the bottom-right entry
        if m[8].abs() < f32::EPSILON {
            return Err(TransformError::PointAtInfinity);
        }
        let projection =
            Projection::from_matrix(m).ok_or(TransformError::NonInvertible)?;
        warp_into(source, &projection, self.interpolation.into(), Rgb([0, 0, 0]), out);
        Ok(())
    }
}

/// Check that a located quad can be rasterised in a `width` x `height` frame
pub fn validate_quad(quad: &Quad, width: u32, height: u32, max_extent_ratio: f64) -> Result<(), TransformError> {
    if !quad.is_finite() {
        return Err(TransformError::NonFinite);
    }
    if !quad.is_simple() {
        return Err(TransformError::DegenerateQuad);
    }
    let limit = max_extent_ratio * width.max(height) as f64;
    let (x0, y0, x1, y1) = quad.bounds();
    let extent = x0.abs().max(y0.abs()).max(x1.abs()).max(y1.abs());
    if extent > limit {
        return Err(TransformError::OutOfRange { extent, limit });
    }
    Ok(())
}

/// Fill the quad with `value` on every channel.
///
/// The boundary is rasterised with 8-connected lines between the rounded
/// corners and the interior with a scanline fill, so every pixel the
/// outline touches is filled. No anti-aliasing.
pub fn fill_quad(img: &mut RgbImage, quad: &Quad, value: u8) {
    let mut poly: Vec<PixelPoint<i32>> = Vec::with_capacity(4);
    for c in &quad.corners {
        let p = PixelPoint::new(c.x.round() as i32, c.y.round() as i32);
        if poly.last() != Some(&p) {
            poly.push(p);
        }
    }
    // The polygon must not be explicitly closed
    while poly.len() > 1 && poly.first() == poly.last() {
        poly.pop();
    }

    let color = Rgb([value, value, value]);
    match poly.as_slice() {
        [] => {}
        [p] => {
            if p.x >= 0 && p.y >= 0 && (p.x as u32) < img.width() && (p.y as u32) < img.height() {
                img.put_pixel(p.x as u32, p.y as u32, color);
            }
        }
        _ => draw_polygon_mut(img, &poly, color),
    }
}

/// Per-channel saturating sum of `overlay` into `base`
pub fn composite_add(base: &mut RgbImage, overlay: &RgbImage) {
    for (b, o) in base.iter_mut().zip(overlay.iter()) {
        *b = b.saturating_add(*o);
    }
}

/// Mask, warp and composite `ar` onto a copy of `frame`.
///
/// `h_ar` maps AR pixel coordinates into the frame and `located` is the quad
/// that gets masked. `frame` itself is never modified.
pub fn overlay(
    frame: &RgbImage,
    located: &Quad,
    ar: &RgbImage,
    h_ar: &Homography,
    warper: &dyn PerspectiveWarper,
    cfg: &CompositeConfig,
) -> Result<RgbImage, TransformError> {
    let (width, height) = frame.dimensions();
    validate_quad(located, width, height, cfg.max_extent_ratio)?;

    let result = catch_unwind(AssertUnwindSafe(|| -> Result<RgbImage, TransformError> {
        let mut masked = frame.clone();
        fill_quad(&mut masked, located, cfg.fill_value);

        let mut warped = RgbImage::new(width, height);
        warper.warp_into(ar, h_ar, &mut warped)?;

        composite_add(&mut masked, &warped);
        Ok(masked)
    }));

    match result {
        Ok(out) => out,
        Err(payload) => {
            let msg = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(TransformError::Panicked(msg))
        }
    }
}
