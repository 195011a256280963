//! Four-component double-precision vector.

use crate::{EPSILON, clamp01};
use crate::vector3::Vector3Double;
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Index, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector4Double {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Vector4Double {
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// Homogeneous point (`w = 1`).
    pub fn from_point(point: Vector3Double) -> Self {
        Self::new(point.x, point.y, point.z, 1.0)
    }

    pub fn from_f32(v: glam::Vec4) -> Self {
        Self::new(v.x as f64, v.y as f64, v.z as f64, v.w as f64)
    }

    /// Narrow to single precision. Lossy.
    pub fn as_f32(self) -> glam::Vec4 {
        glam::Vec4::new(self.x as f32, self.y as f32, self.z as f32, self.w as f32)
    }

    pub fn xyz(self) -> Vector3Double {
        Vector3Double::new(self.x, self.y, self.z)
    }

    pub fn sqr_magnitude(self) -> f64 {
        self.dot(self)
    }

    pub fn magnitude(self) -> f64 {
        self.sqr_magnitude().sqrt()
    }

    pub fn normalized(self) -> Self {
        let magnitude = self.magnitude();
        if magnitude > EPSILON {
            self / magnitude
        } else {
            Self::ZERO
        }
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    pub fn lerp(self, to: Self, t: f64) -> Self {
        self.lerp_unclamped(to, clamp01(t))
    }

    pub fn lerp_unclamped(self, to: Self, t: f64) -> Self {
        self + (to - self) * t
    }

    pub fn scale(self, other: Self) -> Self {
        Self::new(
            self.x * other.x,
            self.y * other.y,
            self.z * other.z,
            self.w * other.w,
        )
    }

    pub fn project(self, normal: Self) -> Self {
        let sqr_magnitude = normal.dot(normal);
        if sqr_magnitude < f64::EPSILON {
            return Self::ZERO;
        }
        normal * (self.dot(normal) / sqr_magnitude)
    }
}

impl Add for Vector4Double {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(
            self.x + rhs.x,
            self.y + rhs.y,
            self.z + rhs.z,
            self.w + rhs.w,
        )
    }
}

impl Sub for Vector4Double {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(
            self.x - rhs.x,
            self.y - rhs.y,
            self.z - rhs.z,
            self.w - rhs.w,
        )
    }
}

impl Mul<f64> for Vector4Double {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs)
    }
}

impl Div<f64> for Vector4Double {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs, self.z / rhs, self.w / rhs)
    }
}

impl Neg for Vector4Double {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, -self.w)
    }
}

impl Index<usize> for Vector4Double {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        match index {
            0 => &self.x,
            1 => &self.y,
            2 => &self.z,
            3 => &self.w,
            _ => panic!("Vector4Double index out of range: {index}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degenerate_normalization_is_zero() {
        let n = Vector4Double::new(1e-7, 0.0, 0.0, 1e-7).normalized();
        assert_eq!(n, Vector4Double::ZERO);
    }

    #[test]
    fn homogeneous_point_drops_w() {
        let p = Vector3Double::new(1.0, 2.0, 3.0);
        assert_eq!(Vector4Double::from_point(p).xyz(), p);
        assert_eq!(Vector4Double::from_point(p).w, 1.0);
    }
}
