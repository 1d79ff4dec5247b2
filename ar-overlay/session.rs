//! Per-frame orchestration: extract, match, locate, composite.
//!
//! An [`ArSession`] owns the precomputed query model and the AR image. Every
//! frame either comes back overlaid or comes back as an unchanged copy with a
//! [`NotFoundReason`]; nothing on the per-frame path returns an error.

use std::sync::Arc;

use ar_core::{
    image_corners, CoreConfig, DescriptorMatcher, FeatureExtractor, Features, Homography,
    HomographyEstimator, PerspectiveWarper, Point, Quad, TransformError,
};
use ar_homography::RansacHomography;
use ar_match::{ratio_test, KdForestMatcher};
use image::{imageops, DynamicImage, GrayImage, RgbImage, RgbaImage};
use log::{debug, info, warn};

use crate::compositor::{self, CompositeConfig, ImageprocWarper};
use crate::config::SessionConfig;
use crate::error::{ConfigError, OverlayError, OverlayResult};
use crate::extractor::GradientFeatures;

/// Features and outline of the reference image, computed once per session
#[derive(Debug, Clone)]
pub struct QueryModel {
    pub width: u32,
    pub height: u32,
    pub features: Features,
    /// (0,0), (0,h-1), (w-1,h-1), (w-1,0)
    pub corners: Quad,
}

impl QueryModel {
    pub fn new(query: &GrayImage, extractor: &dyn FeatureExtractor) -> OverlayResult<Self> {
        let (width, height) = query.dimensions();
        if width == 0 || height == 0 {
            return Err(OverlayError::EmptyImage { role: "query" });
        }
        let features = extractor.detect_and_describe(query);
        debug!("Query model: {}x{}, {} features", width, height, features.len());
        Ok(Self { width, height, features, corners: image_corners(width, height) })
    }
}

/// The four swappable stages of the pipeline
#[derive(Clone)]
pub struct Capabilities {
    pub extractor: Arc<dyn FeatureExtractor>,
    pub matcher: Arc<dyn DescriptorMatcher>,
    pub estimator: Arc<dyn HomographyEstimator>,
    pub warper: Arc<dyn PerspectiveWarper>,
}

impl Capabilities {
    /// Default implementations configured from `config`
    pub fn from_config(config: &SessionConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            extractor: Self::default_extractor(config)?,
            matcher: Self::default_matcher(config)?,
            estimator: Self::default_estimator(config)?,
            warper: Self::default_warper(config),
        })
    }

    pub fn default_extractor(config: &SessionConfig) -> Result<Arc<dyn FeatureExtractor>, ConfigError> {
        Ok(Arc::new(GradientFeatures::new(config.detector.clone(), config.descriptor.clone())?))
    }

    pub fn default_matcher(config: &SessionConfig) -> Result<Arc<dyn DescriptorMatcher>, ConfigError> {
        Ok(Arc::new(KdForestMatcher::new(config.matcher.clone())?))
    }

    pub fn default_estimator(config: &SessionConfig) -> Result<Arc<dyn HomographyEstimator>, ConfigError> {
        Ok(Arc::new(RansacHomography::new(config.ransac.clone())?))
    }

    pub fn default_warper(config: &SessionConfig) -> Arc<dyn PerspectiveWarper> {
        Arc::new(ImageprocWarper::new(config.composite.interpolation))
    }
}

/// Where the query sits in a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub quad: Quad,
    /// Query pixels to frame pixels
    pub homography: Homography,
    pub good_matches: usize,
    pub inliers: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NotFoundReason {
    /// The frame has zero width or height
    DegenerateInput,
    /// Good matches did not exceed the configured minimum
    InsufficientMatches { found: usize, required: usize },
    /// No homography could be fitted to the good matches
    HomographyFailed,
    TransformFailure(TransformError),
}

impl std::fmt::Display for NotFoundReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotFoundReason::DegenerateInput => write!(f, "Frame has zero width or height"),
            NotFoundReason::InsufficientMatches { found, required } => {
                write!(f, "Not enough matches are found - {}/{}", found, required)
            }
            NotFoundReason::HomographyFailed => write!(f, "Homography estimation failed"),
            NotFoundReason::TransformFailure(e) => write!(f, "Transform failure: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    Overlaid { good_matches: usize, inliers: usize, quad: Quad },
    NotFound(NotFoundReason),
}

impl FrameOutcome {
    pub fn is_overlaid(&self) -> bool {
        matches!(self, FrameOutcome::Overlaid { .. })
    }
}

/// Output frame plus what happened to it
#[derive(Debug, Clone)]
pub struct FrameResult {
    pub frame: RgbImage,
    pub outcome: FrameOutcome,
}

/// A query image paired with the AR image to draw wherever it is found.
///
/// Cloning is cheap: the query model, AR image and stages are shared.
#[derive(Clone)]
pub struct ArSession {
    query: Arc<QueryModel>,
    ar_image: Arc<RgbImage>,
    ar_corners: Quad,
    stages: Capabilities,
    core: CoreConfig,
    composite: CompositeConfig,
}

impl ArSession {
    pub fn new(query: &RgbImage, ar_image: RgbImage, config: SessionConfig) -> OverlayResult<Self> {
        config.validate()?;
        let stages = Capabilities::from_config(&config)?;
        let model = QueryModel::new(&imageops::grayscale(query), stages.extractor.as_ref())?;
        Self::from_parts(Arc::new(model), ar_image, stages, &config)
    }

    /// Assemble a session from an already computed query model
    pub fn from_parts(
        query: Arc<QueryModel>,
        ar_image: RgbImage,
        stages: Capabilities,
        config: &SessionConfig,
    ) -> OverlayResult<Self> {
        config.validate()?;
        let (w, h) = ar_image.dimensions();
        if w == 0 || h == 0 {
            return Err(OverlayError::EmptyImage { role: "AR" });
        }
        Ok(Self {
            query,
            ar_image: Arc::new(ar_image),
            ar_corners: image_corners(w, h),
            stages,
            core: config.core.clone(),
            composite: config.composite.clone(),
        })
    }

    /// Same query, different AR image
    pub fn with_ar_image(&self, ar_image: RgbImage) -> OverlayResult<Self> {
        let (w, h) = ar_image.dimensions();
        if w == 0 || h == 0 {
            return Err(OverlayError::EmptyImage { role: "AR" });
        }
        Ok(Self { ar_image: Arc::new(ar_image), ar_corners: image_corners(w, h), ..self.clone() })
    }

    pub fn query_model(&self) -> &Arc<QueryModel> {
        &self.query
    }

    pub fn ar_image(&self) -> &RgbImage {
        &self.ar_image
    }

    pub fn core_config(&self) -> &CoreConfig {
        &self.core
    }

    pub fn stages(&self) -> &Capabilities {
        &self.stages
    }

    /// Find the query in `frame` without compositing
    pub fn locate(&self, frame: &RgbImage) -> Result<Located, NotFoundReason> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(NotFoundReason::DegenerateInput);
        }

        let target = self.stages.extractor.detect_and_describe(&imageops::grayscale(frame));
        let query = &self.query.features;
        let knn = if query.is_empty() || target.is_empty() {
            Vec::new()
        } else {
            self.stages.matcher.knn_match(&query.descriptors, &target.descriptors, 2)
        };
        let good = ratio_test(&knn, self.core.ratio);
        debug!(
            "{} query / {} frame features, {} good matches",
            query.len(),
            target.len(),
            good.len()
        );

        if good.len() <= self.core.min_match_count {
            let reason = NotFoundReason::InsufficientMatches {
                found: good.len(),
                required: self.core.min_match_count,
            };
            info!("{}", reason);
            return Err(reason);
        }

        let (src, dst): (Vec<Point>, Vec<Point>) = good
            .iter()
            .map(|m| (query.keypoints[m.query_idx].point(), target.keypoints[m.target_idx].point()))
            .unzip();
        let fit = self
            .stages
            .estimator
            .find_homography(&src, &dst)
            .ok_or(NotFoundReason::HomographyFailed)?;
        let quad = fit
            .homography
            .transform_quad(&self.query.corners)
            .ok_or(NotFoundReason::TransformFailure(TransformError::PointAtInfinity))?;

        Ok(Located { quad, homography: fit.homography, good_matches: good.len(), inliers: fit.n_inliers() })
    }

    /// Locate the query and composite the AR image over it
    pub fn process(&self, frame: &RgbImage) -> FrameResult {
        let located = match self.locate(frame) {
            Ok(located) => located,
            Err(reason) => return not_found(frame, reason),
        };

        // AR corners are fitted onto the located quad separately from the query fit
        let Some(ar_fit) = self.stages.estimator.find_homography(&self.ar_corners.corners, &located.quad.corners)
        else {
            warn!("Could not map the AR image onto {:?}", located.quad);
            return not_found(frame, NotFoundReason::TransformFailure(TransformError::FitFailed));
        };

        match compositor::overlay(
            frame,
            &located.quad,
            &self.ar_image,
            &ar_fit.homography,
            self.stages.warper.as_ref(),
            &self.composite,
        ) {
            Ok(out) => FrameResult {
                frame: out,
                outcome: FrameOutcome::Overlaid {
                    good_matches: located.good_matches,
                    inliers: located.inliers,
                    quad: located.quad,
                },
            },
            Err(e) => {
                warn!("Overlay skipped: {}", e);
                not_found(frame, NotFoundReason::TransformFailure(e))
            }
        }
    }

    /// The overlaid frame, or an unchanged copy when the query is not found
    pub fn locate_and_overlay(&self, frame: &RgbImage) -> RgbImage {
        self.process(frame).frame
    }

    /// [`Self::locate_and_overlay`] for any decoded image.
    ///
    /// Grayscale and RGBA frames keep their layout; alpha is carried over
    /// unchanged. Other layouts come back as RGB8 when overlaid.
    pub fn overlay_dynamic(&self, frame: &DynamicImage) -> DynamicImage {
        let result = self.process(&frame.to_rgb8());
        if !result.outcome.is_overlaid() {
            return frame.clone();
        }
        match frame {
            DynamicImage::ImageLuma8(_) => DynamicImage::ImageLuma8(imageops::grayscale(&result.frame)),
            DynamicImage::ImageRgba8(original) => {
                let rgba = RgbaImage::from_fn(original.width(), original.height(), |x, y| {
                    let [r, g, b] = result.frame.get_pixel(x, y).0;
                    image::Rgba([r, g, b, original.get_pixel(x, y)[3]])
                });
                DynamicImage::ImageRgba8(rgba)
            }
            _ => DynamicImage::ImageRgb8(result.frame),
        }
    }
}

fn not_found(frame: &RgbImage, reason: NotFoundReason) -> FrameResult {
    FrameResult { frame: frame.clone(), outcome: FrameOutcome::NotFound(reason) }
}
