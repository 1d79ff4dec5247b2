pub mod capability;
pub mod geometry;

pub use capability::{
    DescriptorMatcher, FeatureExtractor, HomographyEstimator, HomographyFit, PerspectiveWarper,
    TransformError,
};
pub use geometry::{image_corners, Homography, Point, Quad};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Length of a gradient-histogram descriptor (4x4 cells x 8 orientation bins)
pub const DESCRIPTOR_LEN: usize = 128;

/// Float descriptor compared with Euclidean distance
pub type Descriptor = [f32; DESCRIPTOR_LEN];

/// Key-point ≙ corner location in base-image pixels + opaque scale metadata
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,   // Support diameter in base-image pixels
    pub angle: f32,  // Radians
    pub response: f32,
    pub octave: usize,
}

impl Keypoint {
    /// Location as a double-precision point for geometry
    pub fn point(&self) -> Point {
        Point::new(self.x as f64, self.y as f64)
    }
}

/// Keypoints and their descriptors, aligned by index
#[derive(Debug, Clone, Default)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn new(keypoints: Vec<Keypoint>, descriptors: Vec<Descriptor>) -> Self {
        debug_assert_eq!(keypoints.len(), descriptors.len());
        Self { keypoints, descriptors }
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }
}

/// Query descriptor index ↔ target descriptor index with their distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correspondence {
    pub query_idx: usize,
    pub target_idx: usize,
    pub distance: f32,
}

/// One level of a Gaussian pyramid.
///
/// `scale_x`/`scale_y` are the exact base-to-level size ratios. Pixel centres
/// line up, so level pixel `x` covers base `(x + 0.5) * scale_x - 0.5`.
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub level: usize,
    pub scale_x: f32,
    pub scale_y: f32,
    pub image: image::GrayImage,
}

impl PyramidLevel {
    /// Full-resolution level with the identity mapping
    pub fn base(image: image::GrayImage) -> Self {
        Self { level: 0, scale_x: 1.0, scale_y: 1.0, image }
    }

    /// Mean of the two axis ratios
    pub fn scale(&self) -> f32 {
        0.5 * (self.scale_x + self.scale_y)
    }

    /// Level coordinates to base-image coordinates
    pub fn to_base(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) * self.scale_x - 0.5, (y + 0.5) * self.scale_y - 0.5)
    }

    /// Base-image coordinates to level coordinates
    pub fn to_level(&self, x: f32, y: f32) -> (f32, f32) {
        ((x + 0.5) / self.scale_x - 0.5, (y + 0.5) / self.scale_y - 0.5)
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CoreConfig {
    /// Good matches must strictly exceed this count before locating
    pub min_match_count: usize,
    /// Lowe ratio: keep nearest iff d1 < ratio * d2
    pub ratio: f32,
    pub n_threads: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            min_match_count: 10,
            ratio: 0.7,
            n_threads: num_cpus::get().max(1),
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}
