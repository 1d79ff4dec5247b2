use std::sync::Arc;

use ar_core::{DescriptorMatcher, FeatureExtractor, HomographyEstimator, PerspectiveWarper};
use image::{imageops, RgbImage};

use crate::compositor::WarpInterpolation;
use crate::config::SessionConfig;
use crate::error::{ConfigError, OverlayResult};
use crate::session::{ArSession, Capabilities, QueryModel};

/// Builder for creating an `ArSession`
#[derive(Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
    extractor: Option<Arc<dyn FeatureExtractor>>,
    matcher: Option<Arc<dyn DescriptorMatcher>>,
    estimator: Option<Arc<dyn HomographyEstimator>>,
    warper: Option<Arc<dyn PerspectiveWarper>>,
}

impl SessionBuilder {
    /// Create a new builder with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a builder from an existing `SessionConfig`
    pub fn from_config(config: SessionConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Good matches must strictly exceed this count
    pub fn min_match_count(mut self, count: usize) -> Self {
        self.config.core.min_match_count = count;
        self
    }

    /// Set the Lowe ratio-test threshold
    pub fn ratio(mut self, ratio: f32) -> Self {
        self.config.core.ratio = ratio;
        self
    }

    /// Set the number of threads for parallel processing
    pub fn threads(mut self, n_threads: usize) -> Self {
        self.config.core.n_threads = n_threads;
        self
    }

    pub fn levels(mut self, n_levels: usize) -> Self {
        self.config.detector.n_levels = n_levels;
        self
    }

    /// Size ratio between consecutive pyramid levels
    pub fn scale_factor(mut self, scale_factor: f32) -> Self {
        self.config.detector.scale_factor = scale_factor;
        self
    }

    pub fn max_features(mut self, max_features: usize) -> Self {
        self.config.detector.max_features = max_features;
        self
    }

    pub fn min_response(mut self, min_response: f32) -> Self {
        self.config.detector.min_response = min_response;
        self
    }

    /// Number of randomized kd-trees in the matcher forest
    pub fn trees(mut self, trees: usize) -> Self {
        self.config.matcher.trees = trees;
        self
    }

    /// Leaves visited per query descriptor
    pub fn checks(mut self, checks: usize) -> Self {
        self.config.matcher.checks = checks;
        self
    }

    /// Set the RANSAC reprojection threshold in pixels
    pub fn reproj_threshold(mut self, threshold: f64) -> Self {
        self.config.ransac.reproj_threshold = threshold;
        self
    }

    pub fn ransac_seed(mut self, seed: u64) -> Self {
        self.config.ransac.seed = seed;
        self
    }

    pub fn interpolation(mut self, interpolation: WarpInterpolation) -> Self {
        self.config.composite.interpolation = interpolation;
        self
    }

    pub fn fill_value(mut self, value: u8) -> Self {
        self.config.composite.fill_value = value;
        self
    }

    /// Replace the feature extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn FeatureExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Replace the descriptor matcher
    pub fn with_matcher(mut self, matcher: Arc<dyn DescriptorMatcher>) -> Self {
        self.matcher = Some(matcher);
        self
    }

    /// Replace the homography estimator
    pub fn with_estimator(mut self, estimator: Arc<dyn HomographyEstimator>) -> Self {
        self.estimator = Some(estimator);
        self
    }

    /// Replace the perspective warper
    pub fn with_warper(mut self, warper: Arc<dyn PerspectiveWarper>) -> Self {
        self.warper = Some(warper);
        self
    }

    /// Apply the still-image preset
    pub fn preset_still_image(mut self) -> Self {
        self.config = SessionConfig::still_image();
        self
    }

    /// Apply the live-video preset
    pub fn preset_live_video(mut self) -> Self {
        self.config = SessionConfig::live_video();
        self
    }

    /// Apply the strict preset
    pub fn preset_strict(mut self) -> Self {
        self.config = SessionConfig::strict();
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Generate a summary of the builder's configuration
    pub fn summary(&self) -> String {
        self.config.summary()
    }

    /// Extract query features and build the `ArSession`
    pub fn build(self, query: &RgbImage, ar_image: RgbImage) -> OverlayResult<ArSession> {
        self.config.validate()?;
        let stages = self.stages()?;
        let model = QueryModel::new(&imageops::grayscale(query), stages.extractor.as_ref())?;
        ArSession::from_parts(Arc::new(model), ar_image, stages, &self.config)
    }

    /// Build a session that reuses an existing query model
    pub fn build_with_model(self, query: Arc<QueryModel>, ar_image: RgbImage) -> OverlayResult<ArSession> {
        self.config.validate()?;
        let stages = self.stages()?;
        ArSession::from_parts(query, ar_image, stages, &self.config)
    }

    /// Overrides as given; a default stage is only built where none was set
    fn stages(&self) -> Result<Capabilities, ConfigError> {
        let config = &self.config;
        Ok(Capabilities {
            extractor: match &self.extractor {
                Some(extractor) => Arc::clone(extractor),
                None => Capabilities::default_extractor(config)?,
            },
            matcher: match &self.matcher {
                Some(matcher) => Arc::clone(matcher),
                None => Capabilities::default_matcher(config)?,
            },
            estimator: match &self.estimator {
                Some(estimator) => Arc::clone(estimator),
                None => Capabilities::default_estimator(config)?,
            },
            warper: self.warper.clone().unwrap_or_else(|| Capabilities::default_warper(config)),
        })
    }
}
