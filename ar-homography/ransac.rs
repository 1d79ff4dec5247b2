use ar_core::{Homography, HomographyEstimator, HomographyFit, Point};
use log::debug;
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;

use crate::config::RansacConfig;
use crate::dlt::fit_dlt;
use crate::error::{HomographyError, HomographyResult};
use crate::transform::reprojection_error;

const SAMPLE_SIZE: usize = 4;
/// |sin| of the angle below which three sample points count as collinear
const COLLINEAR_EPS: f64 = 1e-6;

/// RANSAC over minimal 4-point samples with a least-squares refit on the inliers
#[derive(Debug, Clone)]
pub struct RansacHomography {
    cfg: RansacConfig,
}

impl Default for RansacHomography {
    fn default() -> Self {
        Self { cfg: RansacConfig::default() }
    }
}

impl RansacHomography {
    pub fn new(cfg: RansacConfig) -> HomographyResult<Self> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &RansacConfig {
        &self.cfg
    }

    /// Robust `dst ~ H src` fit with a per-pair inlier mask
    pub fn fit(&self, src: &[Point], dst: &[Point]) -> HomographyResult<HomographyFit> {
        let n = src.len();
        if n != dst.len() {
            return Err(HomographyError::LengthMismatch { src: n, dst: dst.len() });
        }
        if n < SAMPLE_SIZE {
            return Err(HomographyError::TooFewPoints { needed: SAMPLE_SIZE, got: n });
        }

        let needed = self.cfg.min_inliers.max(SAMPLE_SIZE);
        let mut rng = ChaCha8Rng::seed_from_u64(self.cfg.seed);
        let mut best: Option<(Homography, Vec<bool>, usize)> = None;
        let mut max_iters = self.cfg.max_iters;
        let mut iter = 0;
        let mut degenerate = 0;

        while iter < max_iters {
            iter += 1;
            let sample: Vec<usize> = index::sample(&mut rng, n, SAMPLE_SIZE).into_vec();
            let s_src: Vec<Point> = sample.iter().map(|&i| src[i]).collect();
            let s_dst: Vec<Point> = sample.iter().map(|&i| dst[i]).collect();

            if has_collinear_triple(&s_src) || has_collinear_triple(&s_dst) {
                degenerate += 1;
                continue;
            }
            let Ok(h) = fit_dlt(&s_src, &s_dst) else {
                degenerate += 1;
                continue;
            };

            let (mask, count) = self.inlier_mask(&h, src, dst);
            if best.as_ref().is_none_or(|(_, _, c)| count > *c) {
                max_iters = max_iters.min(adaptive_iterations(count as f64 / n as f64, self.cfg.confidence, iter));
                best = Some((h, mask, count));
                if count == n {
                    break;
                }
            }
        }

        let Some((h, mask, count)) = best else {
            debug!("RANSAC: all {} samples degenerate", iter);
            return Err(HomographyError::DegenerateConfiguration);
        };
        if count < needed {
            return Err(HomographyError::NoConsensus { best_inliers: count, needed });
        }

        // Least-squares refit over the consensus set; keep it unless it loses support
        let (in_src, in_dst): (Vec<Point>, Vec<Point>) = mask
            .iter()
            .zip(src.iter().zip(dst.iter()))
            .filter(|(m, _)| **m)
            .map(|(_, (s, d))| (*s, *d))
            .unzip();

        let (homography, inlier_mask, n_inliers) = match fit_dlt(&in_src, &in_dst) {
            Ok(refit) => {
                let (refit_mask, refit_count) = self.inlier_mask(&refit, src, dst);
                if refit_count >= count {
                    (refit, refit_mask, refit_count)
                } else {
                    (h, mask, count)
                }
            }
            Err(_) => (h, mask, count),
        };

        debug!(
            "RANSAC: {} iterations ({} degenerate), {}/{} inliers",
            iter, degenerate, n_inliers, n
        );
        Ok(HomographyFit { homography, inlier_mask })
    }

    fn inlier_mask(&self, h: &Homography, src: &[Point], dst: &[Point]) -> (Vec<bool>, usize) {
        let mask: Vec<bool> = src
            .iter()
            .zip(dst.iter())
            .map(|(s, d)| reprojection_error(h, s, d) <= self.cfg.reproj_threshold)
            .collect();
        let count = mask.iter().filter(|&&m| m).count();
        (mask, count)
    }
}

impl HomographyEstimator for RansacHomography {
    fn find_homography(&self, src: &[Point], dst: &[Point]) -> Option<HomographyFit> {
        match self.fit(src, dst) {
            Ok(fit) => Some(fit),
            Err(e) => {
                debug!("Homography estimation failed: {}", e);
                None
            }
        }
    }
}

/// Iterations needed to draw one all-inlier sample with probability `confidence`
fn adaptive_iterations(inlier_ratio: f64, confidence: f64, done: usize) -> usize {
    let p_good = inlier_ratio.powi(SAMPLE_SIZE as i32);
    if p_good <= f64::EPSILON {
        return usize::MAX;
    }
    if p_good >= 1.0 {
        return done;
    }
    let k = (1.0 - confidence).ln() / (1.0 - p_good).ln();
    if k.is_finite() { (k.ceil() as usize).max(done) } else { usize::MAX }
}

fn has_collinear_triple(p: &[Point]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (p[i], p[j], p[k]);
        let cross = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
        cross.abs() <= COLLINEAR_EPS * a.distance(&b) * a.distance(&c)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;
    use proptest::prelude::*;
    use rand::Rng;

    fn similarity(scale: f64, angle: f64, tx: f64, ty: f64) -> Homography {
        let (s, c) = angle.sin_cos();
        Homography::from_matrix(Matrix3::new(
            scale * c, -scale * s, tx,
            scale * s, scale * c, ty,
            0.0, 0.0, 1.0,
        ))
    }

    fn grid_points(n: usize, seed: u64) -> Vec<Point> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        (0..n)
            .map(|_| Point::new(rng.random_range(0.0..200.0), rng.random_range(0.0..200.0)))
            .collect()
    }

    #[test]
    fn test_recovers_similarity_with_outliers() {
        let truth = similarity(1.3, 0.4, 25.0, -10.0);
        let src = grid_points(60, 7);
        let mut dst: Vec<Point> = src.iter().map(|p| truth.transform_point(p).unwrap()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        for d in dst.iter_mut().take(20) {
            *d = Point::new(rng.random_range(-300.0..300.0), rng.random_range(-300.0..300.0));
        }

        let fit = RansacHomography::default().fit(&src, &dst).unwrap();
        assert!(fit.homography.approx_eq(&truth, 1e-6));
        assert!(fit.inlier_mask[20..].iter().all(|&m| m));
        assert!(fit.n_inliers() >= 40);
    }

    #[test]
    fn test_exact_four_points() {
        let src = vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 49.0),
            Point::new(49.0, 49.0),
            Point::new(49.0, 0.0),
        ];
        let dst = vec![
            Point::new(10.0, 10.0),
            Point::new(12.0, 80.0),
            Point::new(90.0, 75.0),
            Point::new(85.0, 8.0),
        ];
        let fit = RansacHomography::default().find_homography(&src, &dst).unwrap();
        assert_eq!(fit.n_inliers(), 4);
        for (s, d) in src.iter().zip(dst.iter()) {
            assert!(fit.homography.transform_point(s).unwrap().distance(d) < 1e-6);
        }
    }

    #[test]
    fn test_too_few_points_is_none() {
        let pts = grid_points(3, 1);
        assert!(RansacHomography::default().find_homography(&pts, &pts).is_none());
    }

    #[test]
    fn test_collinear_points_are_none() {
        let src: Vec<Point> = (0..10).map(|i| Point::new(i as f64, 2.0 * i as f64)).collect();
        let dst: Vec<Point> = src.iter().map(|p| Point::new(p.x + 5.0, p.y)).collect();
        assert!(RansacHomography::default().find_homography(&src, &dst).is_none());
    }

    #[test]
    fn test_same_seed_same_fit() {
        let src = grid_points(30, 3);
        let dst: Vec<Point> = grid_points(30, 4);
        let est = RansacHomography::default();
        let a = est.fit(&src, &dst).map(|f| f.inlier_mask);
        let b = est.fit(&src, &dst).map(|f| f.inlier_mask);
        assert_eq!(a, b);
    }

    #[test]
    fn test_adaptive_iterations() {
        assert_eq!(adaptive_iterations(1.0, 0.995, 3), 3);
        assert_eq!(adaptive_iterations(0.0, 0.995, 3), usize::MAX);
        let k = adaptive_iterations(0.5, 0.995, 1);
        // ln(0.005) / ln(1 - 1/16)
        assert_eq!(k, 83);
    }

    #[test]
    fn test_invalid_config() {
        let cfg = RansacConfig { reproj_threshold: 0.0, ..RansacConfig::default() };
        assert_eq!(RansacHomography::new(cfg).unwrap_err(), HomographyError::InvalidThreshold(0.0));
        let cfg = RansacConfig { confidence: 1.0, ..RansacConfig::default() };
        assert!(RansacHomography::new(cfg).is_err());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_recovered_transform_round_trips_corners(
            scale in 0.5f64..2.0,
            angle in -3.0f64..3.0,
            tx in -100.0f64..100.0,
            ty in -100.0f64..100.0,
        ) {
            let truth = similarity(scale, angle, tx, ty);
            let src = grid_points(25, 11);
            let dst: Vec<Point> = src.iter().map(|p| truth.transform_point(p).unwrap()).collect();
            let fit = RansacHomography::default().fit(&src, &dst).unwrap();

            let corners = ar_core::image_corners(200, 200);
            let there = fit.homography.transform_quad(&corners).unwrap();
            let back = fit.homography.inverse().unwrap().transform_quad(&there).unwrap();
            prop_assert!(back.max_corner_distance(&corners) < 1e-6);
            prop_assert!(there.max_corner_distance(&truth.transform_quad(&corners).unwrap()) < 1e-4);
        }
    }
}
