//! Narrow interfaces for the vision capabilities the overlay pipeline consumes.
//!
//! Orchestration only talks to these traits, so an extractor, matcher,
//! estimator or warper can be swapped (e.g. a cheaper extractor for live
//! video) without touching the per-frame contract.

use image::{GrayImage, RgbImage};

use crate::geometry::{Homography, Point};
use crate::{Correspondence, Descriptor, Features};

/// Detect-and-describe on a grayscale image.
///
/// A blank or low-texture image yields empty `Features`, never an error.
pub trait FeatureExtractor: Send + Sync {
    fn detect_and_describe(&self, image: &GrayImage) -> Features;
}

/// k-nearest-neighbour search of `query` descriptors against `target`.
///
/// Each inner vector holds at most `k` correspondences sorted by ascending
/// distance; it is shorter when `target` has fewer than `k` descriptors.
pub trait DescriptorMatcher: Send + Sync {
    fn knn_match(
        &self,
        query: &[Descriptor],
        target: &[Descriptor],
        k: usize,
    ) -> Vec<Vec<Correspondence>>;
}

/// Result of a robust homography fit
#[derive(Debug, Clone)]
pub struct HomographyFit {
    pub homography: Homography,
    /// One flag per input pair
    pub inlier_mask: Vec<bool>,
}

impl HomographyFit {
    pub fn n_inliers(&self) -> usize {
        self.inlier_mask.iter().filter(|&&b| b).count()
    }
}

/// Robust `src -> dst` projective fit; `None` when no consensus exists
pub trait HomographyEstimator: Send + Sync {
    fn find_homography(&self, src: &[Point], dst: &[Point]) -> Option<HomographyFit>;
}

/// Perspective warp of `source` into the pixel grid of `out`.
///
/// Every pixel of `out` is written; pixels whose pre-image falls outside
/// `source` become black.
pub trait PerspectiveWarper: Send + Sync {
    fn warp_into(
        &self,
        source: &RgbImage,
        homography: &Homography,
        out: &mut RgbImage,
    ) -> Result<(), TransformError>;
}

/// Numerical failures while applying an estimated transform
#[derive(Debug, Clone, PartialEq)]
pub enum TransformError {
    NonInvertible,
    NonFinite,
    FitFailed,
    PointAtInfinity,
    DegenerateQuad,
    OutOfRange { extent: f64, limit: f64 },
    Panicked(String),
}

impl std::fmt::Display for TransformError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformError::NonInvertible => write!(f, "Transform is not invertible"),
            TransformError::NonFinite => write!(f, "Transform contains non-finite entries"),
            TransformError::FitFailed => write!(f, "Could not fit the compositing transform"),
            TransformError::PointAtInfinity => write!(f, "Transform maps a corner to infinity"),
            TransformError::DegenerateQuad => {
                write!(f, "Located quadrilateral is degenerate or self-intersecting")
            }
            TransformError::OutOfRange { extent, limit } => {
                write!(f, "Located quadrilateral extent {:.1} exceeds limit {:.1}", extent, limit)
            }
            TransformError::Panicked(msg) => write!(f, "Imaging backend panicked: {}", msg),
        }
    }
}

impl std::error::Error for TransformError {}
