//! Two-component double-precision vector.

use crate::{EPSILON, EPSILON_NORMAL_SQRT, RAD_TO_DEG, clamp01};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector2Double {
    pub x: f64,
    pub y: f64,
}

impl Vector2Double {
    pub const ZERO: Self = Self::new(0.0, 0.0);
    pub const ONE: Self = Self::new(1.0, 1.0);
    pub const UP: Self = Self::new(0.0, 1.0);
    pub const RIGHT: Self = Self::new(1.0, 0.0);

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn from_f32(v: glam::Vec2) -> Self {
        Self::new(v.x as f64, v.y as f64)
    }

    /// Narrow to single precision. Lossy.
    pub fn as_f32(self) -> glam::Vec2 {
        glam::Vec2::new(self.x as f32, self.y as f32)
    }

    pub fn sqr_magnitude(self) -> f64 {
        self.x * self.x + self.y * self.y
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
        self.x * other.x + self.y * other.y
    }

    pub fn distance(self, other: Self) -> f64 {
        (self - other).magnitude()
    }

    pub fn lerp(self, to: Self, t: f64) -> Self {
        self.lerp_unclamped(to, clamp01(t))
    }

    pub fn lerp_unclamped(self, to: Self, t: f64) -> Self {
        Self::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
    }

    pub fn move_towards(self, target: Self, max_distance_delta: f64) -> Self {
        let to = target - self;
        let sqr_distance = to.sqr_magnitude();
        if sqr_distance == 0.0
            || (max_distance_delta >= 0.0
                && sqr_distance <= max_distance_delta * max_distance_delta)
        {
            return target;
        }
        self + to / sqr_distance.sqrt() * max_distance_delta
    }

    pub fn scale(self, other: Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y)
    }

    pub fn min(self, other: Self) -> Self {
        Self::new(self.x.min(other.x), self.y.min(other.y))
    }

    pub fn max(self, other: Self) -> Self {
        Self::new(self.x.max(other.x), self.y.max(other.y))
    }

    pub fn clamp_magnitude(self, max_length: f64) -> Self {
        if self.sqr_magnitude() > max_length * max_length {
            self.normalized() * max_length
        } else {
            self
        }
    }

    pub fn reflect(self, normal: Self) -> Self {
        let factor = -2.0 * normal.dot(self);
        normal * factor + self
    }

    /// Counter-clockwise perpendicular.
    pub fn perpendicular(self) -> Self {
        Self::new(-self.y, self.x)
    }

    pub fn angle(self, to: Self) -> f64 {
        let denominator = (self.sqr_magnitude() * to.sqr_magnitude()).sqrt();
        if denominator < EPSILON_NORMAL_SQRT {
            return 0.0;
        }
        let dot = (self.dot(to) / denominator).clamp(-1.0, 1.0);
        dot.acos() * RAD_TO_DEG
    }

    pub fn signed_angle(self, to: Self) -> f64 {
        let unsigned = self.angle(to);
        let sign = if self.x * to.y - self.y * to.x >= 0.0 {
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

impl Add for Vector2Double {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vector2Double {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vector2Double {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Div<f64> for Vector2Double {
    type Output = Self;

    fn div(self, rhs: f64) -> Self {
        Self::new(self.x / rhs, self.y / rhs)
    }
}

impl Neg for Vector2Double {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}
