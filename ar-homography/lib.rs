//! Homography estimation between corresponding point sets.
//!
//! [`fit_dlt`] is the normalized Direct Linear Transform over all pairs;
//! [`RansacHomography`] wraps it in a seeded RANSAC loop and implements
//! [`ar_core::HomographyEstimator`].

pub mod config;
pub mod dlt;
pub mod error;
pub mod ransac;
pub mod transform;

pub use config::RansacConfig;
pub use dlt::{fit_dlt, normalize_points};
pub use error::{HomographyError, HomographyResult};
pub use ransac::RansacHomography;
pub use transform::{perspective_transform, reprojection_error};
