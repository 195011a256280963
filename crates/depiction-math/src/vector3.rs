//! Three-component double-precision vector.

use crate::{EPSILON, EPSILON_NORMAL_SQRT, RAD_TO_DEG, clamp01};
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Index, IndexMut, Mul, Neg, Sub, SubAssign};

/// A position or direction stored as three `f64`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3Double {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3Double {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);
    pub const UP: Self = Self::new(0.0, 1.0, 0.0);
    pub const DOWN: Self = Self::new(0.0, -1.0, 0.0);
    pub const RIGHT: Self = Self::new(1.0, 0.0, 0.0);
    pub const LEFT: Self = Self::new(-1.0, 0.0, 0.0);
    pub const FORWARD: Self = Self::new(0.0, 0.0, 1.0);
    pub const BACK: Self = Self::new(0.0, 0.0, -1.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Widen a single-precision vector.
    pub fn from_f32(v: glam::Vec3) -> Self {
        Self::new(v.x as f64, v.y as f64, v.z as f64)
    }

    /// Narrow to single precision. Lossy.
    pub fn as_f32(self) -> glam::Vec3 {
        glam::Vec3::new(self.x as f32, self.y as f32, self.z as f32)
    }

    pub fn sqr_magnitude(self) -> f64 {
        self.x * self.x + self.y * self.y + self.z * self.z
    }

    pub fn magnitude(self) -> f64 {
        self.sqr_magnitude().sqrt()
    }

    /// Unit vector in the same direction, or zero when the magnitude is
    /// at or below [`EPSILON`].
    pub fn normalized(self) -> Self {
        let magnitude = self.magnitude();
        if magnitude > EPSILON {
            self / magnitude
        } else {
            Self::ZERO
        }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn cross(self, other: Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    /// Interpolate with `t` clamped to `[0, 1]`.
    pub fn lerp(self, to: Self, t: f64) -> Self {
        self.lerp_unclamped(to, clamp01(t))
    }

    pub fn lerp_unclamped(self, to: Self, t: f64) -> Self {
        Self::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.z + (to.z - self.z) * t,
        )
    }

    /// Move towards `target` by at most `max_distance_delta`.
    pub fn move_towards(self, target: Self, max_distance_delta: f64) -> Self {
        let to = target - self;
        let sqr_distance = to.sqr_magnitude();
        if sqr_distance == 0.0
            || (max_distance_delta >= 0.0
                && sqr_distance <= max_distance_delta * max_distance_delta)
        {
            return target;
        }
        let distance = sqr_distance.sqrt();
        self + to / distance * max_distance_delta
    }

    /// Component-wise product.
    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(
            self.x.min(other.x),
            self.y.min(other.y),
            self.z.min(other.z),
        )
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(
            self.x.max(other.x),
            self.y.max(other.y),
            self.z.max(other.z),
        )
    }

    pub fn clamp_magnitude(self, max_length: f64) -> Self {
        if self.sqr_magnitude() > max_length * max_length {
            self.normalized() * max_length
        } else {
            self
        }
    }

    /// Projection onto `normal`; zero when `normal` is degenerate.
    pub fn project(self, normal: Self) -> Self {
        let sqr_magnitude = normal.dot(normal);
        if sqr_magnitude < f64::EPSILON {
            return Self::ZERO;
        }
        normal * (self.dot(normal) / sqr_magnitude)
    }

    pub fn project_on_plane(self, plane_normal: Self) -> Self {
        self - self.project(plane_normal)
    }

    pub fn reflect(self, normal: Self) -> Self {
        let factor = -2.0 * normal.dot(self);
        normal * factor + self
    }

    /// Unsigned angle in degrees, zero when either vector is degenerate.
    pub fn angle(self, to: Self) -> f64 {
        let denominator = (self.sqr_magnitude() * to.sqr_magnitude()).sqrt();
        if denominator < EPSILON_NORMAL_SQRT {
            return 0.0;
        }
        let dot = (self.dot(to) / denominator).clamp(-1.0, 1.0);
        dot.acos() * RAD_TO_DEG
    }

    /// Angle in degrees, negative when the rotation around `axis` is
    /// clockwise.
    pub fn signed_angle(self, to: Self, axis: Self) -> f64 {
        let unsigned = self.angle(to);
        let sign = if axis.dot(self.cross(to)) >= 0.0 {
            1.0
        } else {
            -1.0
        };
        unsigned * sign
    }

    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        (self - other).sqr_magnitude() <= tolerance * tolerance
    }
}

impl Add for Vector3Double {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vector3Double {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl Sub for Vector3Double {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl SubAssign for Vector3Double {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

impl Mul<f64> for Vector3Double {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Mul<Vector3Double> for f64 {
    type Output = Vector3Double;

    fn mul(self, rhs: Vector3Double) -> Vector3Double {
        rhs * self
    }
}

impl Div<f64> for Vector3Double {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs)
    }
}

impl Neg for Vector3Double {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z)
    }
}

impl Index<usize> for Vector3Double {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            _ => panic!("Vector3Double index out of range: {index}"),
        }
    }
}

impl IndexMut<usize> for Vector3Double {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            2 => &mut self.z,
            _ => panic!("Vector3Double index out of range: {index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tiny_vectors_normalize_to_zero() {
        for v in [
            Vector3Double::ZERO,
            Vector3Double::new(1e-6, 0.0, 0.0),
            Vector3Double::new(5e-6, -5e-6, 5e-6),
            Vector3Double::new(0.0, 0.0, 1e-300),
        ] {
            let n = v.normalized();
            assert_eq!(n, Vector3Double::ZERO);
            assert!(n.x.is_finite() && n.y.is_finite() && n.z.is_finite());
        }
    }

    #[test]
    fn normalization_keeps_planetary_precision() {
        let v = Vector3Double::new(6_378_137.0, 0.25, 0.0);
        let n = v.normalized();
        assert!((n.magnitude() - 1.0).abs() < 1e-12);
        assert!(n.y > 0.0);
    }

    #[test]
    fn cross_follows_axis_order() {
        assert_eq!(
            Vector3Double::RIGHT.cross(Vector3Double::UP),
            Vector3Double::FORWARD
        );
    }

    #[test]
    fn angle_and_signed_angle() {
        let a = Vector3Double::RIGHT;
        let b = Vector3Double::FORWARD;
        assert!((a.angle(b) - 90.0).abs() < 1e-12);
        assert!((a.signed_angle(b, Vector3Double::UP) + 90.0).abs() < 1e-12);
        assert_eq!(Vector3Double::ZERO.angle(b), 0.0);
    }

    #[test]
    fn move_towards_stops_at_target() {
        let a = Vector3Double::ZERO;
        let b = Vector3Double::new(3.0, 4.0, 0.0);
        assert_eq!(a.move_towards(b, 10.0), b);
        let step = a.move_towards(b, 1.0);
        assert!((step.magnitude() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn project_on_degenerate_normal_is_zero() {
        let v = Vector3Double::new(1.0, 2.0, 3.0);
        assert_eq!(v.project(Vector3Double::ZERO), Vector3Double::ZERO);
        assert_eq!(
            v.project_on_plane(Vector3Double::UP),
            Vector3Double::new(1.0, 0.0, 3.0)
        );
    }

    #[test]
    fn single_precision_round_trip_is_lossy() {
        let v = Vector3Double::new(6_378_137.123_456, 0.0, 0.0);
        let narrowed = Vector3Double::from_f32(v.as_f32());
        assert_ne!(narrowed, v);
        assert!((narrowed.x - v.x).abs() < 1.0);
    }
}
