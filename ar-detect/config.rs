use crate::error::{DetectError, DetectResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Corner detector settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectorConfig {
    /// Number of pyramid levels, level 0 included
    pub n_levels: usize,
    /// Size ratio between consecutive levels
    pub scale_factor: f32,
    /// Gaussian sigma applied at every level
    pub blur_sigma: f32,
    /// Structure tensor window is (2r+1)x(2r+1)
    pub window_radius: usize,
    /// Minimum eigenvalue threshold on intensities normalised to [0, 1]
    pub min_response: f32,
    /// Cap on keypoints kept across all levels, strongest first
    pub max_features: usize,
    /// Pixels excluded at each level border
    pub border: usize,
    /// Square patch for the intensity-centroid orientation
    pub patch_size: usize,
    pub subpixel_refinement: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            n_levels: 8,
            scale_factor: 1.2,
            blur_sigma: 1.0,
            window_radius: 2,
            min_response: 1e-4,
            max_features: 2000,
            border: 4,
            patch_size: 15,
            subpixel_refinement: true,
        }
    }
}

impl DetectorConfig {
    /// Fewer levels and features for per-frame video use
    pub fn fast_preset() -> Self {
        Self {
            n_levels: 6,
            max_features: 800,
            min_response: 2e-4,
            subpixel_refinement: false,
            ..Self::default()
        }
    }

    /// More levels and a lower threshold for still images
    pub fn quality_preset() -> Self {
        Self {
            n_levels: 10,
            max_features: 4000,
            min_response: 5e-5,
            ..Self::default()
        }
    }

    /// Smallest image side the detector accepts
    pub fn min_image_size(&self) -> u32 {
        (2 * self.border + 1) as u32
    }

    pub fn validate(&self) -> DetectResult<()> {
        if self.n_levels == 0 || self.n_levels > 16 {
            return Err(DetectError::InvalidLevels(self.n_levels));
        }
        if !self.scale_factor.is_finite() || self.scale_factor <= 1.0 || self.scale_factor > 2.0 {
            return Err(DetectError::InvalidScaleFactor(self.scale_factor));
        }
        if !self.blur_sigma.is_finite() || self.blur_sigma <= 0.0 {
            return Err(DetectError::InvalidSigma(self.blur_sigma));
        }
        if self.window_radius == 0 || self.window_radius > 4 {
            return Err(DetectError::InvalidWindowRadius(self.window_radius));
        }
        if self.patch_size < 3 || self.patch_size % 2 == 0 {
            return Err(DetectError::InvalidPatchSize(self.patch_size));
        }
        // Gradient (1) + window (r) + NMS neighbour (1)
        let min_border = self.window_radius + 2;
        if self.border < min_border {
            return Err(DetectError::InvalidBorder { border: self.border, min_border });
        }
        if self.max_features == 0 {
            return Err(DetectError::InvalidMaxFeatures);
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "DetectorConfig: levels={}x{:.2}, sigma={:.2}, window={}, min_response={:.1e}, max_features={}, patch={}, subpixel={}",
            self.n_levels, self.scale_factor, self.blur_sigma, 2 * self.window_radius + 1, self.min_response,
            self.max_features, self.patch_size, self.subpixel_refinement
        )
    }
}
