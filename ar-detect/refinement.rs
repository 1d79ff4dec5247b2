use image::GrayImage;

use crate::response::ResponseMap;
use crate::types::ScoredCorner;

/// Non-maximum suppression, subpixel refinement and orientation
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// Strict 3x3 local maxima above `threshold`, ignoring `border` pixels.
    ///
    /// On a plateau only the first pixel in raster order survives: a candidate
    /// must beat earlier neighbours strictly and later neighbours or tie them.
    pub fn non_maximum_suppression(map: &ResponseMap, border: usize, threshold: f32) -> Vec<ScoredCorner> {
        let (w, h) = (map.width, map.height);
        let mut corners = Vec::new();
        if w <= 2 * border || h <= 2 * border {
            return corners;
        }

        for y in border..h - border {
            for x in border..w - border {
                let v = map.get(x, y);
                if v <= threshold {
                    continue;
                }
                let is_max = NEIGHBOURS.iter().all(|&(dx, dy, earlier)| {
                    let n = map.get((x as isize + dx) as usize, (y as isize + dy) as usize);
                    if earlier { v > n } else { v >= n }
                });
                if is_max {
                    corners.push(ScoredCorner { x, y, response: v });
                }
            }
        }

        corners
    }

    /// Fit a quadratic to the 3x3 response around the corner and move to its peak.
    /// Offsets are clamped to half a pixel.
    pub fn refine_subpixel(map: &ResponseMap, corner: &ScoredCorner) -> (f32, f32) {
        let (x, y) = (corner.x, corner.y);
        if x < 1 || y < 1 || x + 1 >= map.width || y + 1 >= map.height {
            return (x as f32, y as f32);
        }

        let s = |dx: isize, dy: isize| map.get((x as isize + dx) as usize, (y as isize + dy) as usize);

        let dx = (s(1, 0) - s(-1, 0)) / 2.0;
        let dy = (s(0, 1) - s(0, -1)) / 2.0;
        let dxx = s(1, 0) - 2.0 * s(0, 0) + s(-1, 0);
        let dyy = s(0, 1) - 2.0 * s(0, 0) + s(0, -1);
        let dxy = (s(1, 1) - s(-1, 1) - s(1, -1) + s(-1, -1)) / 4.0;

        let det = dxx * dyy - dxy * dxy;
        // Response values are small, so the cutoff is relative to the peak
        if det.abs() <= 1e-12 * (s(0, 0) * s(0, 0)).max(f32::MIN_POSITIVE) || !det.is_finite() {
            return (x as f32, y as f32);
        }

        let offset_x = (-(dyy * dx - dxy * dy) / det).clamp(-0.5, 0.5);
        let offset_y = (-(dxx * dy - dxy * dx) / det).clamp(-0.5, 0.5);

        (x as f32 + offset_x, y as f32 + offset_y)
    }

    /// Intensity-centroid orientation over a square patch, in radians.
    /// Samples outside the image are clamped to the nearest edge pixel.
    pub fn compute_orientation(img: &GrayImage, x: usize, y: usize, patch_size: usize) -> f32 {
        let half = (patch_size / 2) as i64;
        let (w, h) = (img.width() as i64, img.height() as i64);
        let raw = img.as_raw();
        let (cx, cy) = (x as i64, y as i64);

        let mut m10 = 0i64;
        let mut m01 = 0i64;
        for dy in -half..=half {
            let py = (cy + dy).clamp(0, h - 1);
            for dx in -half..=half {
                let px = (cx + dx).clamp(0, w - 1);
                let v = raw[(py * w + px) as usize] as i64;
                m10 += dx * v;
                m01 += dy * v;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }
}

/// (dx, dy, precedes the centre in raster order)
const NEIGHBOURS: [(isize, isize, bool); 8] = [
    (-1, -1, true),
    (0, -1, true),
    (1, -1, true),
    (-1, 0, true),
    (1, 0, false),
    (-1, 1, false),
    (0, 1, false),
    (1, 1, false),
];

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn map_from(width: usize, height: usize, data: Vec<f32>) -> ResponseMap {
        ResponseMap { width, height, data }
    }

    #[test]
    fn test_single_peak() {
        let mut data = vec![0.0; 49];
        data[3 * 7 + 3] = 1.0;
        data[3 * 7 + 4] = 0.5;
        let corners = KeypointRefinement::non_maximum_suppression(&map_from(7, 7, data), 1, 0.1);
        assert_eq!(corners, vec![ScoredCorner { x: 3, y: 3, response: 1.0 }]);
    }

    #[test]
    fn test_plateau_keeps_first_in_raster_order() {
        let mut data = vec![0.0; 49];
        for (x, y) in [(3, 2), (2, 3), (3, 3), (4, 3)] {
            data[y * 7 + x] = 1.0;
        }
        let corners = KeypointRefinement::non_maximum_suppression(&map_from(7, 7, data), 1, 0.1);
        assert_eq!(corners.len(), 1);
        assert_eq!((corners[0].x, corners[0].y), (3, 2));
    }

    #[test]
    fn test_border_is_ignored() {
        let mut data = vec![0.0; 49];
        data[7 + 1] = 1.0;
        let corners = KeypointRefinement::non_maximum_suppression(&map_from(7, 7, data), 2, 0.1);
        assert!(corners.is_empty());
    }

    #[test]
    fn test_subpixel_moves_towards_heavier_side() {
        let mut data = vec![0.0; 25];
        data[2 * 5 + 2] = 1.0;
        data[2 * 5 + 3] = 0.8;
        data[2 * 5 + 1] = 0.2;
        data[5 + 2] = 0.3;
        data[3 * 5 + 2] = 0.3;
        let map = map_from(5, 5, data);
        let (x, y) = KeypointRefinement::refine_subpixel(&map, &ScoredCorner { x: 2, y: 2, response: 1.0 });
        assert!(x > 2.0 && x <= 2.5);
        assert!((y - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_orientation_points_to_bright_side() {
        let right = GrayImage::from_fn(21, 21, |x, _| if x > 10 { Luma([255]) } else { Luma([0]) });
        let angle = KeypointRefinement::compute_orientation(&right, 10, 10, 15);
        assert!(angle.abs() < 1e-6);

        let below = GrayImage::from_fn(21, 21, |_, y| if y > 10 { Luma([255]) } else { Luma([0]) });
        let angle = KeypointRefinement::compute_orientation(&below, 10, 10, 15);
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn test_uniform_patch_has_zero_orientation() {
        let img = GrayImage::from_pixel(9, 9, Luma([90]));
        assert_eq!(KeypointRefinement::compute_orientation(&img, 0, 0, 15), 0.0);
    }
}
