use ar_core::{Homography, Point};
use nalgebra::{DMatrix, Matrix3};

use crate::error::{HomographyError, HomographyResult};

/// Hartley normalization: move the centroid to the origin and scale so the
/// mean distance from it is sqrt(2). Returns the normalized points and the
/// transform that produced them, or `None` when all points coincide.
pub fn normalize_points(points: &[Point]) -> Option<(Vec<Point>, Matrix3<f64>)> {
    if points.is_empty() {
        return None;
    }
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p.x).sum::<f64>() / n;
    let cy = points.iter().map(|p| p.y).sum::<f64>() / n;
    let mean_dist = points.iter().map(|p| (p.x - cx).hypot(p.y - cy)).sum::<f64>() / n;
    if !mean_dist.is_finite() || mean_dist < 1e-12 {
        return None;
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = Matrix3::new(
        s, 0.0, -s * cx,
        0.0, s, -s * cy,
        0.0, 0.0, 1.0,
    );
    let normalized = points
        .iter()
        .map(|p| Point::new(s * (p.x - cx), s * (p.y - cy)))
        .collect();
    Some((normalized, t))
}

/// Least-squares homography `dst ~ H src` over all pairs (normalized DLT).
///
/// With exactly four pairs the fit is exact. The design matrix is padded to
/// 9x9 so the SVD always exposes the null-space direction.
pub fn fit_dlt(src: &[Point], dst: &[Point]) -> HomographyResult<Homography> {
    let n = src.len();
    if n != dst.len() {
        return Err(HomographyError::LengthMismatch { src: n, dst: dst.len() });
    }
    if n < 4 {
        return Err(HomographyError::TooFewPoints { needed: 4, got: n });
    }

    let (src_n, t_src) = normalize_points(src).ok_or(HomographyError::DegenerateConfiguration)?;
    let (dst_n, t_dst) = normalize_points(dst).ok_or(HomographyError::DegenerateConfiguration)?;

    let rows = (2 * n).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (i, (p, q)) in src_n.iter().zip(dst_n.iter()).enumerate() {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let (r0, r1) = (2 * i, 2 * i + 1);

        a[(r0, 0)] = -x;
        a[(r0, 1)] = -y;
        a[(r0, 2)] = -1.0;
        a[(r0, 6)] = u * x;
        a[(r0, 7)] = u * y;
        a[(r0, 8)] = u;

        a[(r1, 3)] = -x;
        a[(r1, 4)] = -y;
        a[(r1, 5)] = -1.0;
        a[(r1, 6)] = v * x;
        a[(r1, 7)] = v * y;
        a[(r1, 8)] = v;
    }

    let svd = a.svd(false, true);
    let v_t = svd.v_t.ok_or(HomographyError::SingularFit)?;
    let h_vec = v_t.row(svd.singular_values.imin());

    let mut h = Matrix3::zeros();
    for r in 0..3 {
        for c in 0..3 {
            h[(r, c)] = h_vec[3 * r + c];
        }
    }

    let t_dst_inv = t_dst.try_inverse().ok_or(HomographyError::SingularFit)?;
    let h = Homography::from_matrix(t_dst_inv * h * t_src);

    if !h.is_finite() || h.matrix().determinant().abs() < 1e-12 {
        return Err(HomographyError::SingularFit);
    }
    Ok(h)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(0.0, 99.0),
            Point::new(99.0, 99.0),
            Point::new(99.0, 0.0),
        ]
    }

    #[test]
    fn test_normalized_points_have_unit_scale() {
        let (pts, _) = normalize_points(&square()).unwrap();
        let mean: f64 = pts.iter().map(|p| p.x.hypot(p.y)).sum::<f64>() / 4.0;
        assert!((mean - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(pts.iter().map(|p| p.x).sum::<f64>().abs() < 1e-12);
    }

    #[test]
    fn test_coincident_points_are_degenerate() {
        assert!(normalize_points(&[Point::new(3.0, 3.0); 4]).is_none());
        let err = fit_dlt(&[Point::new(3.0, 3.0); 4], &square()).unwrap_err();
        assert_eq!(err, HomographyError::DegenerateConfiguration);
    }

    #[test]
    fn test_four_point_fit_is_exact() {
        let dst = vec![
            Point::new(50.0, 52.0),
            Point::new(40.0, 160.0),
            Point::new(170.0, 140.0),
            Point::new(150.0, 45.0),
        ];
        let h = fit_dlt(&square(), &dst).unwrap();
        for (s, d) in square().iter().zip(dst.iter()) {
            let p = h.transform_point(s).unwrap();
            assert!(p.distance(d) < 1e-6, "{:?} vs {:?}", p, d);
        }
    }

    #[test]
    fn test_too_few_and_mismatched() {
        assert_eq!(
            fit_dlt(&square()[..3], &square()[..3]).unwrap_err(),
            HomographyError::TooFewPoints { needed: 4, got: 3 }
        );
        assert!(matches!(fit_dlt(&square(), &square()[..3]), Err(HomographyError::LengthMismatch { .. })));
    }

    #[test]
    fn test_collapsed_destination_is_singular() {
        // All sources map onto a line: no invertible homography explains them
        let dst: Vec<Point> = (0..4).map(|i| Point::new(i as f64 * 10.0, 5.0)).collect();
        assert!(fit_dlt(&square(), &dst).is_err());
    }
}
