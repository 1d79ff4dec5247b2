use ar_core::PyramidLevel;
use image::imageops::{self, FilterType};
use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;

use crate::types::ScaleLevel;

/// Levels below this side length carry too little structure to describe
pub const MIN_LEVEL_SIZE: u32 = 16;

/// Gaussian pyramid with a fixed size ratio between levels
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate scale levels; level 0 is always present
    pub fn generate_scale_levels(width: u32, height: u32, n_levels: usize, scale_factor: f32) -> Vec<ScaleLevel> {
        let mut levels = Vec::with_capacity(n_levels);
        let mut current_scale = 1.0f32;

        for level in 0..n_levels {
            let w = ((width as f32 / current_scale).round() as u32).max(1);
            let h = ((height as f32 / current_scale).round() as u32).max(1);
            if level > 0 && (w < MIN_LEVEL_SIZE || h < MIN_LEVEL_SIZE) {
                break;
            }
            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: w,
                height: h,
            });
            current_scale *= scale_factor;
        }

        levels
    }

    /// Resample the base image to every level, then blur each level
    pub fn build_image_pyramid(img: &GrayImage, scale_levels: &[ScaleLevel], sigma: f32) -> Vec<PyramidLevel> {
        let (width, height) = img.dimensions();

        scale_levels
            .iter()
            .map(|scale_level| {
                let image = if (scale_level.width, scale_level.height) == (width, height) {
                    gaussian_blur_f32(img, sigma)
                } else {
                    // Triangle widens with the ratio when shrinking, so this also antialiases
                    let resized = imageops::resize(img, scale_level.width, scale_level.height, FilterType::Triangle);
                    gaussian_blur_f32(&resized, sigma)
                };
                PyramidLevel {
                    level: scale_level.level,
                    scale_x: width as f32 / scale_level.width as f32,
                    scale_y: height as f32 / scale_level.height as f32,
                    image,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_levels_follow_factor() {
        let levels = ImagePyramid::generate_scale_levels(100, 100, 8, 1.2);
        let widths: Vec<u32> = levels.iter().map(|l| l.width).collect();
        assert_eq!(widths, vec![100, 83, 69, 58, 48, 40, 33, 28]);
        assert!((levels[2].scale - 1.44).abs() < 1e-5);
    }

    #[test]
    fn test_scale_levels_stop_at_min_size() {
        let levels = ImagePyramid::generate_scale_levels(40, 40, 16, 1.5);
        let widths: Vec<u32> = levels.iter().map(|l| l.width).collect();
        assert_eq!(widths, vec![40, 27, 18]);
    }

    #[test]
    fn test_level_cap() {
        let levels = ImagePyramid::generate_scale_levels(1024, 768, 3, 2.0);
        assert_eq!(levels.len(), 3);
        assert_eq!((levels[2].width, levels[2].height), (256, 192));
    }

    #[test]
    fn test_tiny_image_keeps_base_level() {
        let levels = ImagePyramid::generate_scale_levels(9, 9, 4, 1.2);
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_pyramid_dimensions() {
        let img = GrayImage::from_fn(64, 48, |x, y| image::Luma([((x * 3 + y * 5) % 256) as u8]));
        let levels = ImagePyramid::generate_scale_levels(64, 48, 4, 1.2);
        let pyramid = ImagePyramid::build_image_pyramid(&img, &levels, 1.0);
        assert_eq!(pyramid.len(), levels.len());
        for (p, l) in pyramid.iter().zip(levels.iter()) {
            assert_eq!(p.image.dimensions(), (l.width, l.height));
            assert_eq!(p.scale_x, 64.0 / l.width as f32);
            assert_eq!(p.scale_y, 48.0 / l.height as f32);
        }
        assert_eq!((pyramid[0].scale_x, pyramid[0].scale_y), (1.0, 1.0));
    }

    #[test]
    fn test_uniform_image_stays_uniform() {
        let img = GrayImage::from_pixel(40, 40, image::Luma([77]));
        let levels = ImagePyramid::generate_scale_levels(40, 40, 3, 1.2);
        let pyramid = ImagePyramid::build_image_pyramid(&img, &levels, 1.6);
        // Resampling and blurring may round by one, but never unevenly within a level
        for level in &pyramid {
            let v = level.image.get_pixel(0, 0)[0];
            assert!((76..=78).contains(&v));
            assert!(level.image.pixels().all(|p| p[0] == v));
        }
    }
}
