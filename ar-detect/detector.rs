use ar_core::{Keypoint, PyramidLevel};
use image::GrayImage;
use log::debug;
use rayon::prelude::*;

use crate::config::DetectorConfig;
use crate::error::{DetectError, DetectResult};
use crate::pyramid::ImagePyramid;
use crate::refinement::KeypointRefinement;
use crate::response::min_eigenvalue_response;

/// Keypoints together with the pyramid they were detected on
#[derive(Debug, Clone)]
pub struct Detection {
    pub keypoints: Vec<Keypoint>,
    pub pyramid: Vec<PyramidLevel>,
}

/// Multi-scale Shi-Tomasi corner detector
#[derive(Debug, Clone)]
pub struct CornerDetector {
    cfg: DetectorConfig,
}

impl CornerDetector {
    /// Creates a new detector with validation
    pub fn new(cfg: DetectorConfig) -> DetectResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.cfg
    }

    fn validate_image(&self, img: &GrayImage) -> DetectResult<()> {
        let (width, height) = img.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidImageSize { width, height });
        }
        let min_size = self.cfg.min_image_size();
        if width < min_size || height < min_size {
            return Err(DetectError::ImageTooSmall { width, height, min_size });
        }
        Ok(())
    }

    /// Validate the image and build its Gaussian pyramid
    pub fn build_pyramid(&self, img: &GrayImage) -> DetectResult<Vec<PyramidLevel>> {
        self.validate_image(img)?;
        let levels = ImagePyramid::generate_scale_levels(img.width(), img.height(), self.cfg.n_levels, self.cfg.scale_factor);
        Ok(ImagePyramid::build_image_pyramid(img, &levels, self.cfg.blur_sigma))
    }

    /// Detect keypoints and return them with the pyramid for description
    pub fn detect(&self, img: &GrayImage) -> DetectResult<Detection> {
        let pyramid = self.build_pyramid(img)?;
        let keypoints = self.detect_in_pyramid(&pyramid);
        Ok(Detection { keypoints, pyramid })
    }

    /// Detect keypoints in base-image coordinates
    pub fn detect_keypoints(&self, img: &GrayImage) -> DetectResult<Vec<Keypoint>> {
        Ok(self.detect(img)?.keypoints)
    }

    /// Detect across all levels, keep the strongest `max_features`
    pub fn detect_in_pyramid(&self, pyramid: &[PyramidLevel]) -> Vec<Keypoint> {
        let per_level: Vec<Vec<Keypoint>> = pyramid
            .par_iter()
            .map(|level| self.detect_at_level(level))
            .collect();

        let mut keypoints: Vec<Keypoint> = per_level.into_iter().flatten().collect();
        let found = keypoints.len();

        // Stable: equal responses keep level-then-raster order
        keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
        keypoints.truncate(self.cfg.max_features);

        debug!(
            "Detected {} corners over {} levels, kept {}",
            found,
            pyramid.len(),
            keypoints.len()
        );
        keypoints
    }

    /// Detect keypoints on a single pyramid level
    pub fn detect_at_level(&self, level: &PyramidLevel) -> Vec<Keypoint> {
        let map = min_eigenvalue_response(&level.image, self.cfg.window_radius);
        let corners = KeypointRefinement::non_maximum_suppression(&map, self.cfg.border, self.cfg.min_response);

        corners
            .iter()
            .map(|corner| {
                let (x, y) = if self.cfg.subpixel_refinement {
                    KeypointRefinement::refine_subpixel(&map, corner)
                } else {
                    (corner.x as f32, corner.y as f32)
                };
                let angle = KeypointRefinement::compute_orientation(&level.image, corner.x, corner.y, self.cfg.patch_size);
                let (x, y) = level.to_base(x, y);
                Keypoint {
                    x,
                    y,
                    size: self.cfg.patch_size as f32 * level.scale(),
                    angle,
                    response: corner.response,
                    octave: level.level,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn bright_square(size: u32, x0: u32, y0: u32, side: u32) -> GrayImage {
        GrayImage::from_fn(size, size, |x, y| {
            if x >= x0 && x < x0 + side && y >= y0 && y < y0 + side {
                Luma([230])
            } else {
                Luma([20])
            }
        })
    }

    #[test]
    fn test_uniform_image_has_no_keypoints() {
        let det = CornerDetector::new(DetectorConfig::default()).unwrap();
        let img = GrayImage::from_pixel(64, 64, Luma([255]));
        assert!(det.detect_keypoints(&img).unwrap().is_empty());
    }

    #[test]
    fn test_square_corner_is_found() {
        let det = CornerDetector::new(DetectorConfig::default()).unwrap();
        let img = bright_square(64, 20, 20, 24);
        let kps = det.detect_keypoints(&img).unwrap();
        assert!(!kps.is_empty());
        let near = kps.iter().any(|k| (k.x - 20.0).abs() <= 3.0 && (k.y - 20.0).abs() <= 3.0);
        assert!(near, "no keypoint near (20, 20)");
    }

    #[test]
    fn test_base_level_is_translation_equivariant() {
        let cfg = DetectorConfig { n_levels: 1, ..DetectorConfig::default() };
        let det = CornerDetector::new(cfg).unwrap();

        let small = bright_square(64, 20, 20, 24);
        let large = GrayImage::from_fn(96, 96, |x, y| {
            if x >= 16 && y >= 16 && x < 80 && y < 80 {
                *small.get_pixel(x - 16, y - 16)
            } else {
                Luma([20])
            }
        });

        let a = det.detect_keypoints(&small).unwrap();
        let b = det.detect_keypoints(&large).unwrap();
        assert_eq!(a.len(), b.len());
        for kp in &a {
            let twin = b.iter().any(|q| (q.x - kp.x - 16.0).abs() < 1e-3 && (q.y - kp.y - 16.0).abs() < 1e-3);
            assert!(twin, "missing translated keypoint for ({}, {})", kp.x, kp.y);
        }
    }

    #[test]
    fn test_coarse_levels_map_back_to_base_corners() {
        let cfg = DetectorConfig { n_levels: 4, ..DetectorConfig::default() };
        let det = CornerDetector::new(cfg).unwrap();
        let kps = det.detect_keypoints(&bright_square(96, 30, 30, 36)).unwrap();

        let corners = [(30.0f32, 30.0f32), (65.0, 30.0), (30.0, 65.0), (65.0, 65.0)];
        let coarse: Vec<_> = kps.iter().filter(|k| k.octave > 0).collect();
        assert!(!coarse.is_empty());
        for kp in coarse {
            let nearest = corners
                .iter()
                .map(|(cx, cy)| ((kp.x - cx).powi(2) + (kp.y - cy).powi(2)).sqrt())
                .fold(f32::INFINITY, f32::min);
            assert!(nearest < 4.0, "level {} keypoint at ({}, {})", kp.octave, kp.x, kp.y);
        }
    }

    #[test]
    fn test_max_features_keeps_strongest() {
        let cfg = DetectorConfig { max_features: 2, ..DetectorConfig::default() };
        let det = CornerDetector::new(cfg).unwrap();
        let kps = det.detect_keypoints(&bright_square(64, 20, 20, 24)).unwrap();
        assert!(kps.len() <= 2);
        if kps.len() == 2 {
            assert!(kps[0].response >= kps[1].response);
        }
    }

    #[test]
    fn test_repeated_runs_are_identical() {
        let det = CornerDetector::new(DetectorConfig::default()).unwrap();
        let img = GrayImage::from_fn(80, 60, |x, y| Luma([((x * 7 + y * 13) % 97 * 2) as u8]));
        assert_eq!(det.detect_keypoints(&img).unwrap(), det.detect_keypoints(&img).unwrap());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(CornerDetector::new(DetectorConfig { n_levels: 0, ..DetectorConfig::default() }).is_err());

        let det = CornerDetector::new(DetectorConfig::default()).unwrap();
        let empty = GrayImage::new(0, 10);
        assert!(matches!(det.detect(&empty), Err(DetectError::InvalidImageSize { .. })));
        let tiny = GrayImage::new(5, 5);
        assert!(matches!(det.detect(&tiny), Err(DetectError::ImageTooSmall { .. })));
    }
}
