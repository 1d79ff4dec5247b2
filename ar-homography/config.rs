use crate::error::{HomographyError, HomographyResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RansacConfig {
    /// Upper bound on sampled hypotheses
    pub max_iters: usize,
    /// Maximum reprojection error of an inlier, in pixels
    pub reproj_threshold: f64,
    /// Probability of drawing at least one all-inlier sample; drives early exit
    pub confidence: f64,
    /// Fewer inliers than this means no consensus (never below 4)
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            reproj_threshold: 5.0,
            confidence: 0.995,
            min_inliers: 4,
            seed: 0,
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> HomographyResult<()> {
        if self.max_iters == 0 {
            return Err(HomographyError::InvalidIterations);
        }
        if !self.reproj_threshold.is_finite() || self.reproj_threshold <= 0.0 {
            return Err(HomographyError::InvalidThreshold(self.reproj_threshold));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(HomographyError::InvalidConfidence(self.confidence));
        }
        Ok(())
    }

    pub fn summary(&self) -> String {
        format!(
            "RansacConfig: max_iters={}, threshold={:.1}px, confidence={:.3}, min_inliers={}, seed={}",
            self.max_iters, self.reproj_threshold, self.confidence, self.min_inliers, self.seed
        )
    }
}
