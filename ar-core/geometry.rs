use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 2D point in pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Ordered corners: top-left, bottom-left, bottom-right, top-right
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Quad {
    pub corners: [Point; 4],
}

/// Corner quadrilateral of a `width` x `height` image.
///
/// Corners sit on pixel centres, so the quad spans `[0, w-1] x [0, h-1]`.
pub fn image_corners(width: u32, height: u32) -> Quad {
    let (w, h) = (width as f64, height as f64);
    Quad {
        corners: [
            Point::new(0.0, 0.0),
            Point::new(0.0, h - 1.0),
            Point::new(w - 1.0, h - 1.0),
            Point::new(w - 1.0, 0.0),
        ],
    }
}

impl Quad {
    pub fn new(corners: [Point; 4]) -> Self {
        Self { corners }
    }

    pub fn is_finite(&self) -> bool {
        self.corners.iter().all(Point::is_finite)
    }

    /// Shoelace area (absolute)
    pub fn area(&self) -> f64 {
        let c = &self.corners;
        let mut twice = 0.0;
        for i in 0..4 {
            let (a, b) = (c[i], c[(i + 1) % 4]);
            twice += a.x * b.y - b.x * a.y;
        }
        twice.abs() * 0.5
    }

    /// True when no two non-adjacent edges touch
    pub fn is_simple(&self) -> bool {
        let c = &self.corners;
        !segments_intersect(c[0], c[1], c[2], c[3]) && !segments_intersect(c[1], c[2], c[3], c[0])
    }

    /// Inclusive point-in-polygon test (boundary counts as inside)
    pub fn contains(&self, p: Point) -> bool {
        let c = &self.corners;
        for i in 0..4 {
            if on_segment(c[i], c[(i + 1) % 4], p) {
                return true;
            }
        }

        let mut inside = false;
        for i in 0..4 {
            let (a, b) = (c[i], c[(i + 1) % 4]);
            if (a.y > p.y) != (b.y > p.y) {
                let x_cross = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }

    /// Axis-aligned bounds as (min_x, min_y, max_x, max_y)
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        self.corners.iter().fold(
            (f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        )
    }

    /// Largest corner-to-corner displacement against `other`
    pub fn max_corner_distance(&self, other: &Quad) -> f64 {
        self.corners
            .iter()
            .zip(other.corners.iter())
            .map(|(a, b)| a.distance(b))
            .fold(0.0, f64::max)
    }
}

fn cross(o: Point, a: Point, b: Point) -> f64 {
    (a.x - o.x) * (b.y - o.y) - (a.y - o.y) * (b.x - o.x)
}

fn on_segment(a: Point, b: Point, p: Point) -> bool {
    cross(a, b, p).abs() <= 1e-9 * (1.0 + a.distance(&b))
        && p.x >= a.x.min(b.x) - 1e-9
        && p.x <= a.x.max(b.x) + 1e-9
        && p.y >= a.y.min(b.y) - 1e-9
        && p.y <= a.y.max(b.y) + 1e-9
}

fn segments_intersect(p1: Point, p2: Point, q1: Point, q2: Point) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    on_segment(q1, q2, p1) || on_segment(q1, q2, p2) || on_segment(p1, p2, q1) || on_segment(p1, p2, q2)
}

/// 3x3 projective transform `x' ~ H x`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Matrix3<f64>);

impl Homography {
    /// Wrap a matrix, scaling so that `H[2,2] == 1` when possible
    pub fn from_matrix(m: Matrix3<f64>) -> Self {
        let scale = m[(2, 2)];
        if scale.abs() > f64::EPSILON {
            Self(m / scale)
        } else {
            Self(m)
        }
    }

    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    pub fn matrix(&self) -> &Matrix3<f64> {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }

    pub fn inverse(&self) -> Option<Homography> {
        self.0
            .try_inverse()
            .map(Homography::from_matrix)
            .filter(Homography::is_finite)
    }

    /// Projective point transform; `None` for points sent to infinity
    pub fn transform_point(&self, p: &Point) -> Option<Point> {
        let v = self.0 * Vector3::new(p.x, p.y, 1.0);
        if !v[2].is_finite() || v[2].abs() < 1e-12 {
            return None;
        }
        let out = Point::new(v[0] / v[2], v[1] / v[2]);
        out.is_finite().then_some(out)
    }

    /// Transform all four corners; `None` if any corner fails or lands behind the
    /// projection plane relative to the others
    pub fn transform_quad(&self, quad: &Quad) -> Option<Quad> {
        let mut sign = 0.0f64;
        let mut corners = [Point::default(); 4];
        for (dst, src) in corners.iter_mut().zip(quad.corners.iter()) {
            let w = (self.0 * Vector3::new(src.x, src.y, 1.0))[2];
            if sign == 0.0 {
                sign = w.signum();
            } else if w.signum() != sign {
                return None;
            }
            *dst = self.transform_point(src)?;
        }
        Some(Quad::new(corners))
    }

    /// Row-major single-precision copy
    pub fn to_row_major_f32(&self) -> [f32; 9] {
        let m = &self.0;
        [
            m[(0, 0)] as f32, m[(0, 1)] as f32, m[(0, 2)] as f32,
            m[(1, 0)] as f32, m[(1, 1)] as f32, m[(1, 2)] as f32,
            m[(2, 0)] as f32, m[(2, 1)] as f32, m[(2, 2)] as f32,
        ]
    }

    /// Entry-wise comparison after both matrices are scaled to `H[2,2] == 1`
    pub fn approx_eq(&self, other: &Homography, tol: f64) -> bool {
        let a = Homography::from_matrix(self.0);
        let b = Homography::from_matrix(other.0);
        a.0.iter().zip(b.0.iter()).all(|(x, y)| (x - y).abs() <= tol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_corner_order() {
        let q = image_corners(640, 480);
        assert_eq!(q.corners[0], Point::new(0.0, 0.0));
        assert_eq!(q.corners[1], Point::new(0.0, 479.0));
        assert_eq!(q.corners[2], Point::new(639.0, 479.0));
        assert_eq!(q.corners[3], Point::new(639.0, 0.0));
    }

    #[test]
    fn test_single_pixel_image() {
        let q = image_corners(1, 1);
        assert!(q.corners.iter().all(|p| *p == Point::new(0.0, 0.0)));
        assert_eq!(q.area(), 0.0);
    }

    #[test]
    fn test_bow_tie_is_not_simple() {
        let q = Quad::new([
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        ]);
        assert!(!q.is_simple());
    }

    #[test]
    fn test_contains_boundary_and_outside() {
        let q = image_corners(10, 10);
        assert!(q.contains(Point::new(0.0, 5.0)));
        assert!(q.contains(Point::new(9.0, 9.0)));
        assert!(q.contains(Point::new(4.5, 4.5)));
        assert!(!q.contains(Point::new(9.5, 4.0)));
        assert!(!q.contains(Point::new(-0.1, 0.0)));
    }

    #[test]
    fn test_homography_inverse_round_trip() {
        let h = Homography::from_matrix(Matrix3::new(
            1.2, 0.1, 30.0,
            -0.05, 0.9, 12.0,
            1e-4, 2e-4, 1.0,
        ));
        let inv = h.inverse().unwrap();
        let q = image_corners(200, 100);
        let there = h.transform_quad(&q).unwrap();
        let back = inv.transform_quad(&there).unwrap();
        assert!(back.max_corner_distance(&q) < 1e-9);
    }

    #[test]
    fn test_point_at_infinity() {
        let h = Homography::from_matrix(Matrix3::new(
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            1.0, 0.0, 0.0,
        ));
        assert!(h.transform_point(&Point::new(0.0, 3.0)).is_none());
    }

    #[test]
    fn test_singular_has_no_inverse() {
        let h = Homography::from_matrix(Matrix3::new(
            1.0, 2.0, 3.0,
            2.0, 4.0, 6.0,
            0.0, 0.0, 1.0,
        ));
        assert!(h.inverse().is_none());
    }

    proptest! {
        #[test]
        fn corners_enclose_exact_rectangle(w in 1u32..5000, h in 1u32..5000) {
            let q = image_corners(w, h);
            prop_assert_eq!(q.corners.len(), 4);
            let (x0, y0, x1, y1) = q.bounds();
            prop_assert_eq!((x0, y0), (0.0, 0.0));
            prop_assert_eq!((x1, y1), ((w - 1) as f64, (h - 1) as f64));
            prop_assert_eq!(q.area(), ((w - 1) as f64) * ((h - 1) as f64));
        }

        #[test]
        fn corners_form_simple_polygon(w in 2u32..5000, h in 2u32..5000) {
            prop_assert!(image_corners(w, h).is_simple());
        }
    }
}
