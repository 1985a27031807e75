//! 3D point/vector operations used by the anatomical estimator.
//!
//! All functions are pure. The only degenerate case handled is normalizing a
//! near-zero vector, which returns the input unchanged.

use std::ops::{Add, Mul, Sub};

/// Vectors shorter than this are left as-is by [`normalize`].
pub const NORMALIZE_EPSILON: f32 = 0.001;

/// Forward axis pointing out of the camera plane.
pub const FORWARD: Vec3 = Vec3::new(0.0, 0.0, 1.0);

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn magnitude(&self) -> f32 {
        magnitude(*self)
    }

    /// Length of the vector projected onto the x/z plane.
    pub fn horizontal_magnitude(&self) -> f32 {
        (self.x * self.x + self.z * self.z).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        subtract(self, rhs)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, s: f32) -> Vec3 {
        Vec3::new(self.x * s, self.y * s, self.z * s)
    }
}

/// `a - b`.
pub fn subtract(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(a.x - b.x, a.y - b.y, a.z - b.z)
}

pub fn midpoint(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new((a.x + b.x) / 2.0, (a.y + b.y) / 2.0, (a.z + b.z) / 2.0)
}

pub fn magnitude(v: Vec3) -> f32 {
    (v.x * v.x + v.y * v.y + v.z * v.z).sqrt()
}

pub fn cross_product(a: Vec3, b: Vec3) -> Vec3 {
    Vec3::new(
        a.y * b.z - a.z * b.y,
        a.z * b.x - a.x * b.z,
        a.x * b.y - a.y * b.x,
    )
}

/// Scale `v` to unit length.
///
/// Vectors with magnitude at or below [`NORMALIZE_EPSILON`] are returned
/// unchanged instead of being divided by ~0.
pub fn normalize(v: Vec3) -> Vec3 {
    let m = magnitude(v);
    if m > NORMALIZE_EPSILON {
        v * (1.0 / m)
    } else {
        v
    }
}

/// Distance between two points in the x/z plane, ignoring vertical offset.
pub fn horizontal_distance(a: Vec3, b: Vec3) -> f32 {
    subtract(a, b).horizontal_magnitude()
}

/// Unit direction across the body, perpendicular to `axis` and [`FORWARD`].
pub fn lateral_direction(axis: Vec3) -> Vec3 {
    normalize(cross_product(axis, FORWARD))
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-6;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
    }

    #[test]
    fn test_subtract_and_midpoint() {
        let a = Vec3::new(1.0, 2.0, 3.0);
        let b = Vec3::new(0.5, 1.0, -1.0);
        assert!(approx(subtract(a, b), Vec3::new(0.5, 1.0, 4.0)));
        assert!(approx(midpoint(a, b), Vec3::new(0.75, 1.5, 1.0)));
    }

    #[test]
    fn test_magnitude() {
        assert!((magnitude(Vec3::new(3.0, 4.0, 0.0)) - 5.0).abs() < EPS);
        assert_eq!(magnitude(Vec3::default()), 0.0);
    }

    #[test]
    fn test_cross_product_right_handed() {
        let x = Vec3::new(1.0, 0.0, 0.0);
        let y = Vec3::new(0.0, 1.0, 0.0);
        assert!(approx(cross_product(x, y), Vec3::new(0.0, 0.0, 1.0)));
        assert!(approx(cross_product(y, x), Vec3::new(0.0, 0.0, -1.0)));
    }

    #[test]
    fn test_normalize_unit_length() {
        let n = normalize(Vec3::new(0.0, 3.0, 4.0));
        assert!((n.magnitude() - 1.0).abs() < EPS);
        assert!(approx(n, Vec3::new(0.0, 0.6, 0.8)));
    }

    #[test]
    fn test_normalize_near_zero_unchanged() {
        let tiny = Vec3::new(0.0005, 0.0, 0.0);
        assert_eq!(normalize(tiny), tiny);
        assert_eq!(normalize(Vec3::default()), Vec3::default());
    }

    #[test]
    fn test_horizontal_distance_ignores_y() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 100.0, 4.0);
        assert!((horizontal_distance(a, b) - 5.0).abs() < EPS);
    }

    #[test]
    fn test_lateral_direction_for_vertical_torso() {
        // Torso pointing down the image (+y) gives a lateral axis along +x.
        let lateral = lateral_direction(Vec3::new(0.0, 0.4, 0.0));
        assert!(approx(lateral, Vec3::new(1.0, 0.0, 0.0)));
    }
}
