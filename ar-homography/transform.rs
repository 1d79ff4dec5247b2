use ar_core::{Homography, Point};

/// Apply `h` to every point; `None` if any point is sent to infinity
pub fn perspective_transform(points: &[Point], h: &Homography) -> Option<Vec<Point>> {
    points.iter().map(|p| h.transform_point(p)).collect()
}

/// Euclidean distance between `h(src)` and `dst`; infinite when `src` maps to infinity
pub fn reprojection_error(h: &Homography, src: &Point, dst: &Point) -> f64 {
    h.transform_point(src).map_or(f64::INFINITY, |p| p.distance(dst))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Matrix3;

    #[test]
    fn test_translation() {
        let h = Homography::from_matrix(Matrix3::new(1.0, 0.0, 5.0, 0.0, 1.0, -2.0, 0.0, 0.0, 1.0));
        let out = perspective_transform(&[Point::new(1.0, 1.0), Point::new(0.0, 0.0)], &h).unwrap();
        assert_eq!(out, vec![Point::new(6.0, -1.0), Point::new(5.0, -2.0)]);
        assert_eq!(reprojection_error(&h, &Point::new(0.0, 0.0), &Point::new(5.0, 1.0)), 3.0);
    }

    #[test]
    fn test_infinity_fails_whole_batch() {
        let h = Homography::from_matrix(Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0));
        assert!(perspective_transform(&[Point::new(2.0, 2.0), Point::new(0.0, 1.0)], &h).is_none());
        assert!(reprojection_error(&h, &Point::new(0.0, 1.0), &Point::new(0.0, 0.0)).is_infinite());
    }
}
