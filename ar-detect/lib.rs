//! Multi-scale corner detection.
//!
//! A Gaussian pyramid is built from the grayscale input, a minimum-eigenvalue
//! corner response is evaluated on every level, and strict 3x3 local maxima
//! become keypoints with an intensity-centroid orientation. Keypoints are
//! reported in base-image coordinates, strongest first.

pub mod config;
pub mod detector;
pub mod error;
pub mod pyramid;
pub mod refinement;
pub mod response;
pub mod types;

pub use config::DetectorConfig;
pub use detector::{CornerDetector, Detection};
pub use error::{DetectError, DetectResult};
pub use pyramid::ImagePyramid;
pub use refinement::KeypointRefinement;
pub use response::{min_eigenvalue_response, ResponseMap};
pub use types::{ScaleLevel, ScoredCorner};
