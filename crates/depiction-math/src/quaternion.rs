//! Double-precision rotation quaternion.
//!
//! Convention: `a * b` is the rotation that applies `b` first and then `a`,
//! and `q * v` rotates the vector `v`. Euler angles are applied Z first,
//! then X, then Y, all in degrees.

use crate::error::MathError;
use crate::matrix4x4::Matrix4x4Double;
use crate::vector3::Vector3Double;
use crate::{DEG_TO_RAD, RAD_TO_DEG, clamp01};
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// Dot products above `1 - QUATERNION_EPSILON` are treated as equal rotations.
pub const QUATERNION_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuaternionDouble {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Default for QuaternionDouble {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl QuaternionDouble {
    pub const IDENTITY: Self = Self::new(0.0, 0.0, 0.0, 1.0);

    pub const fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    pub fn from_f32(q: glam::Quat) -> Self {
        Self::new(q.x as f64, q.y as f64, q.z as f64, q.w as f64)
    }

    /// Narrow to single precision. Lossy.
    pub fn as_f32(self) -> glam::Quat {
        glam::Quat::from_xyzw(self.x as f32, self.y as f32, self.z as f32, self.w as f32)
    }

    /// Rotation of `angle` degrees around `axis`. A degenerate axis yields
    /// the identity.
    pub fn angle_axis(angle: f64, axis: Vector3Double) -> Self {
        let axis = axis.normalized();
        if axis == Vector3Double::ZERO {
            return Self::IDENTITY;
        }
        let half = angle * DEG_TO_RAD * 0.5;
        let s = half.sin();
        Self::new(axis.x * s, axis.y * s, axis.z * s, half.cos())
    }

    /// Rotation from Euler angles in degrees, applied Z, then X, then Y.
    pub fn euler(x: f64, y: f64, z: f64) -> Self {
        let qx = Self::angle_axis(x, Vector3Double::RIGHT);
        let qy = Self::angle_axis(y, Vector3Double::UP);
        let qz = Self::angle_axis(z, Vector3Double::FORWARD);
        qy * qx * qz
    }

    /// Rotation whose forward axis points along `forward` with `up` as the
    /// vertical hint. Identity when `forward` is degenerate.
    pub fn look_rotation(forward: Vector3Double, up: Vector3Double) -> Self {
        let forward = forward.normalized();
        if forward == Vector3Double::ZERO {
            return Self::IDENTITY;
        }
        let mut right = up.cross(forward).normalized();
        if right == Vector3Double::ZERO {
            // up is parallel to forward: pick any perpendicular axis
            let hint = if forward.x.abs() < 0.9 {
                Vector3Double::RIGHT
            } else {
                Vector3Double::UP
            };
            right = hint.cross(forward).normalized();
        }
        let up = forward.cross(right);

        let mut m = Matrix4x4Double::IDENTITY;
        m.m00 = right.x;
        m.m10 = right.y;
        m.m20 = right.z;
        m.m01 = up.x;
        m.m11 = up.y;
        m.m21 = up.z;
        m.m02 = forward.x;
        m.m12 = forward.y;
        m.m22 = forward.z;
        Self::from_rotation_matrix(&m)
    }

    /// Extract the rotation of the upper 3x3 block of `m`.
    ///
    /// Branches on the trace and then on the largest diagonal element so the
    /// divisor never approaches zero, including near 180 degree rotations.
    pub fn from_rotation_matrix(m: &Matrix4x4Double) -> Self {
        let trace = m.m00 + m.m11 + m.m22;
        let q = if trace > 0.0 {
            let s = (trace + 1.0).sqrt() * 2.0;
            Self::new(
                (m.m21 - m.m12) / s,
                (m.m02 - m.m20) / s,
                (m.m10 - m.m01) / s,
                0.25 * s,
            )
        } else if m.m00 > m.m11 && m.m00 > m.m22 {
            let s = (1.0 + m.m00 - m.m11 - m.m22).sqrt() * 2.0;
            Self::new(
                0.25 * s,
                (m.m01 + m.m10) / s,
                (m.m02 + m.m20) / s,
                (m.m21 - m.m12) / s,
            )
        } else if m.m11 > m.m22 {
            let s = (1.0 + m.m11 - m.m00 - m.m22).sqrt() * 2.0;
            Self::new(
                (m.m01 + m.m10) / s,
                0.25 * s,
                (m.m12 + m.m21) / s,
                (m.m02 - m.m20) / s,
            )
        } else {
            let s = (1.0 + m.m22 - m.m00 - m.m11).sqrt() * 2.0;
            Self::new(
                (m.m02 + m.m20) / s,
                (m.m12 + m.m21) / s,
                0.25 * s,
                (m.m10 - m.m01) / s,
            )
        };
        q.normalized()
    }

    /// Not implemented in double precision.
    pub fn from_to_rotation(
        _from: Vector3Double,
        _to: Vector3Double,
    ) -> Result<Self, MathError> {
        Err(MathError::unsupported("QuaternionDouble::from_to_rotation"))
    }

    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z + self.w * other.w
    }

    pub fn magnitude(self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Unit quaternion, or the identity when the magnitude is degenerate.
    pub fn normalized(self) -> Self {
        let magnitude = self.magnitude();
        if magnitude < QUATERNION_EPSILON {
            return Self::IDENTITY;
        }
        Self::new(
            self.x / magnitude,
            self.y / magnitude,
            self.z / magnitude,
            self.w / magnitude,
        )
    }

    pub fn conjugate(self) -> Self {
        Self::new(-self.x, -self.y, -self.z, self.w)
    }

    pub fn inverse(self) -> Self {
        let sqr_magnitude = self.dot(self);
        if sqr_magnitude < QUATERNION_EPSILON * QUATERNION_EPSILON {
            return Self::IDENTITY;
        }
        let c = self.conjugate();
        Self::new(
            c.x / sqr_magnitude,
            c.y / sqr_magnitude,
            c.z / sqr_magnitude,
            c.w / sqr_magnitude,
        )
    }

    /// Angle in degrees between two rotations.
    pub fn angle(self, other: Self) -> f64 {
        let dot = self.dot(other).abs().min(1.0);
        if dot > 1.0 - QUATERNION_EPSILON {
            0.0
        } else {
            dot.acos() * 2.0 * RAD_TO_DEG
        }
    }

    /// Normalized linear interpolation along the shortest path.
    pub fn lerp(self, to: Self, t: f64) -> Self {
        let t = clamp01(t);
        let to = if self.dot(to) < 0.0 { to * -1.0 } else { to };
        Self::new(
            self.x + (to.x - self.x) * t,
            self.y + (to.y - self.y) * t,
            self.z + (to.z - self.z) * t,
            self.w + (to.w - self.w) * t,
        )
        .normalized()
    }

    pub fn slerp(self, to: Self, t: f64) -> Self {
        self.slerp_unclamped(to, clamp01(t))
    }

    pub fn slerp_unclamped(self, to: Self, t: f64) -> Self {
        let mut cos_theta = self.dot(to);
        let mut to = to;
        if cos_theta < 0.0 {
            to = to * -1.0;
            cos_theta = -cos_theta;
        }
        if cos_theta > 1.0 - QUATERNION_EPSILON {
            return Self::new(
                self.x + (to.x - self.x) * t,
                self.y + (to.y - self.y) * t,
                self.z + (to.z - self.z) * t,
                self.w + (to.w - self.w) * t,
            )
            .normalized();
        }
        let theta = cos_theta.acos();
        let sin_theta = theta.sin();
        let a = ((1.0 - t) * theta).sin() / sin_theta;
        let b = (t * theta).sin() / sin_theta;
        Self::new(
            self.x * a + to.x * b,
            self.y * a + to.y * b,
            self.z * a + to.z * b,
            self.w * a + to.w * b,
        )
    }

    /// Rotate towards `to` by at most `max_degrees_delta`.
    pub fn rotate_towards(self, to: Self, max_degrees_delta: f64) -> Self {
        let angle = self.angle(to);
        if angle == 0.0 {
            return to;
        }
        self.slerp_unclamped(to, (max_degrees_delta / angle).min(1.0))
    }

    /// Euler angles in degrees, each in `[0, 360)`, matching [`Self::euler`].
    pub fn euler_angles(self) -> Vector3Double {
        let m = Matrix4x4Double::rotate(self);
        let sin_x = (-m.m12).clamp(-1.0, 1.0);
        let x = sin_x.asin();
        let (y, z) = if x.cos() > QUATERNION_EPSILON {
            (m.m02.atan2(m.m22), m.m10.atan2(m.m11))
        } else {
            ((-m.m20).atan2(m.m00), 0.0)
        };
        Vector3Double::new(
            wrap_degrees(x * RAD_TO_DEG),
            wrap_degrees(y * RAD_TO_DEG),
            wrap_degrees(z * RAD_TO_DEG),
        )
    }

    pub fn approx_eq(self, other: Self, tolerance: f64) -> bool {
        // q and -q encode the same rotation
        self.dot(other).abs() >= 1.0 - tolerance
    }
}

fn wrap_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

impl Mul for QuaternionDouble {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.w * rhs.x + self.x * rhs.w + self.y * rhs.z - self.z * rhs.y,
            self.w * rhs.y + self.y * rhs.w + self.z * rhs.x - self.x * rhs.z,
            self.w * rhs.z + self.z * rhs.w + self.x * rhs.y - self.y * rhs.x,
            self.w * rhs.w - self.x * rhs.x - self.y * rhs.y - self.z * rhs.z,
        )
    }
}

impl Mul<f64> for QuaternionDouble {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs, self.z * rhs, self.w * rhs)
    }
}

impl Mul<Vector3Double> for QuaternionDouble {
    type Output = Vector3Double;

    fn mul(self, point: Vector3Double) -> Vector3Double {
        let x = self.x * 2.0;
        let y = self.y * 2.0;
        let z = self.z * 2.0;
        let xx = self.x * x;
        let yy = self.y * y;
        let zz = self.z * z;
        let xy = self.x * y;
        let xz = self.x * z;
        let yz = self.y * z;
        let wx = self.w * x;
        let wy = self.w * y;
        let wz = self.w * z;

        Vector3Double::new(
            (1.0 - (yy + zz)) * point.x + (xy - wz) * point.y + (xz + wy) * point.z,
            (xy + wz) * point.x + (1.0 - (xx + zz)) * point.y + (yz - wx) * point.z,
            (xz - wy) * point.x + (yz + wx) * point.y + (1.0 - (xx + yy)) * point.z,
        )
    }
}
