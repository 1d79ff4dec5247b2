use ar_core::{FeatureExtractor, Features};
use ar_describe::{DescriptorConfig, DescriptorGenerator};
use ar_detect::{CornerDetector, DetectResult, DetectorConfig};
use image::GrayImage;
use log::debug;

use crate::error::ConfigError;

/// Shi-Tomasi corners with rotated gradient-histogram descriptors
pub struct GradientFeatures {
    detector: CornerDetector,
    generator: DescriptorGenerator,
}

impl GradientFeatures {
    pub fn new(detector: DetectorConfig, descriptor: DescriptorConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            detector: CornerDetector::new(detector)?,
            generator: DescriptorGenerator::new(descriptor)?,
        })
    }

    /// Like [`FeatureExtractor::detect_and_describe`] but reports unusable images
    pub fn try_detect_and_describe(&self, image: &GrayImage) -> DetectResult<Features> {
        let detection = self.detector.detect(image)?;
        let descriptors = self.generator.generate_descriptors(&detection.pyramid, &detection.keypoints);
        Ok(Features::new(detection.keypoints, descriptors))
    }

    pub fn detector_config(&self) -> &DetectorConfig {
        self.detector.config()
    }

    pub fn descriptor_config(&self) -> &DescriptorConfig {
        self.generator.config()
    }
}

impl FeatureExtractor for GradientFeatures {
    fn detect_and_describe(&self, image: &GrayImage) -> Features {
        match self.try_detect_and_describe(image) {
            Ok(features) => features,
            Err(e) => {
                debug!("No features extracted: {}", e);
                Features::default()
            }
        }
    }
}
