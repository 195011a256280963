//! Double-precision 4x4 transform matrix.
//!
//! Fields are named `m{row}{column}`. The linear index used by
//! [`Index`] is column-major: `row + column * 4`, which is also the layout
//! of `glam::Mat4::to_cols_array`.

use crate::quaternion::QuaternionDouble;
use crate::vector3::Vector3Double;
use crate::vector4::Vector4Double;
use serde::{Deserialize, Serialize};
use std::ops::{Index, IndexMut, Mul};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Matrix4x4Double {
    pub m00: f64,
    pub m10: f64,
    pub m20: f64,
    pub m30: f64,
    pub m01: f64,
    pub m11: f64,
    pub m21: f64,
    pub m31: f64,
    pub m02: f64,
    pub m12: f64,
    pub m22: f64,
    pub m32: f64,
    pub m03: f64,
    pub m13: f64,
    pub m23: f64,
    pub m33: f64,
}

impl Default for Matrix4x4Double {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Matrix4x4Double {
    pub const ZERO: Self = Self::from_cols_array([0.0; 16]);

    pub const IDENTITY: Self = Self::from_cols_array([
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]);

    /// Build from 16 values in column-major order.
    pub const fn from_cols_array(m: [f64; 16]) -> Self {
        Self {
            m00: m[0],
            m10: m[1],
            m20: m[2],
            m30: m[3],
            m01: m[4],
            m11: m[5],
            m21: m[6],
            m31: m[7],
            m02: m[8],
            m12: m[9],
            m22: m[10],
            m32: m[11],
            m03: m[12],
            m13: m[13],
            m23: m[14],
            m33: m[15],
        }
    }

    pub fn to_cols_array(&self) -> [f64; 16] {
        [
            self.m00, self.m10, self.m20, self.m30, //
            self.m01, self.m11, self.m21, self.m31, //
            self.m02, self.m12, self.m22, self.m32, //
            self.m03, self.m13, self.m23, self.m33,
        ]
    }

    pub fn from_f32(m: glam::Mat4) -> Self {
        Self::from_cols_array(m.to_cols_array().map(|v| v as f64))
    }

    /// Narrow to single precision. Lossy.
    pub fn as_f32(&self) -> glam::Mat4 {
        glam::Mat4::from_cols_array(&self.to_cols_array().map(|v| v as f32))
    }

    pub fn get(&self, row: usize, column: usize) -> f64 {
        self[row + column * 4]
    }

    pub fn set(&mut self, row: usize, column: usize, value: f64) {
        self[row + column * 4] = value;
    }

    pub fn column(&self, index: usize) -> Vector4Double {
        Vector4Double::new(
            self.get(0, index),
            self.get(1, index),
            self.get(2, index),
            self.get(3, index),
        )
    }

    pub fn row(&self, index: usize) -> Vector4Double {
        Vector4Double::new(
            self.get(index, 0),
            self.get(index, 1),
            self.get(index, 2),
            self.get(index, 3),
        )
    }

    pub fn set_column(&mut self, index: usize, column: Vector4Double) {
        for row in 0..4 {
            self.set(row, index, column[row]);
        }
    }

    pub fn translate(translation: Vector3Double) -> Self {
        let mut m = Self::IDENTITY;
        m.m03 = translation.x;
        m.m13 = translation.y;
        m.m23 = translation.z;
        m
    }

    pub fn scale(scale: Vector3Double) -> Self {
        let mut m = Self::IDENTITY;
        m.m00 = scale.x;
        m.m11 = scale.y;
        m.m22 = scale.z;
        m
    }

    /// Rotation matrix of a (unit) quaternion.
    pub fn rotate(q: QuaternionDouble) -> Self {
        let x = q.x * 2.0;
        let y = q.y * 2.0;
        let z = q.z * 2.0;
        let xx = q.x * x;
        let yy = q.y * y;
        let zz = q.z * z;
        let xy = q.x * y;
        let xz = q.x * z;
        let yz = q.y * z;
        let wx = q.w * x;
        let wy = q.w * y;
        let wz = q.w * z;

        let mut m = Self::IDENTITY;
        m.m00 = 1.0 - (yy + zz);
        m.m10 = xy + wz;
        m.m20 = xz - wy;
        m.m01 = xy - wz;
        m.m11 = 1.0 - (xx + zz);
        m.m21 = yz + wx;
        m.m02 = xz + wy;
        m.m12 = yz - wx;
        m.m22 = 1.0 - (xx + yy);
        m
    }

    /// Translation * rotation * scale.
    pub fn trs(translation: Vector3Double, rotation: QuaternionDouble, scale: Vector3Double) -> Self {
        let mut m = Self::rotate(rotation);
        m.m00 *= scale.x;
        m.m10 *= scale.x;
        m.m20 *= scale.x;
        m.m01 *= scale.y;
        m.m11 *= scale.y;
        m.m21 *= scale.y;
        m.m02 *= scale.z;
        m.m12 *= scale.z;
        m.m22 *= scale.z;
        m.m03 = translation.x;
        m.m13 = translation.y;
        m.m23 = translation.z;
        m
    }

    pub fn transpose(&self) -> Self {
        let mut t = Self::ZERO;
        for row in 0..4 {
            for column in 0..4 {
                t.set(column, row, self.get(row, column));
            }
        }
        t
    }

    /// Inverse of a rigid transform.
    ///
    /// Only valid when the upper 3x3 block is orthonormal (rotation without
    /// scale or shear) and the bottom row is `(0, 0, 0, 1)`.
    pub fn fast_inverse(&self) -> Self {
        let mut inverse = Self::IDENTITY;
        for row in 0..3 {
            for column in 0..3 {
                inverse.set(row, column, self.get(column, row));
            }
        }
        let t = self.position();
        let inverted_t = -inverse.multiply_vector(t);
        inverse.m03 = inverted_t.x;
        inverse.m13 = inverted_t.y;
        inverse.m23 = inverted_t.z;
        inverse
    }

    /// Transform a point, including the perspective divide.
    ///
    /// A point that lands on the plane at infinity (`w == 0`) maps to
    /// [`Vector3Double::ZERO`].
    pub fn multiply_point(&self, p: Vector3Double) -> Vector3Double {
        let x = self.m00 * p.x + self.m01 * p.y + self.m02 * p.z + self.m03;
        let y = self.m10 * p.x + self.m11 * p.y + self.m12 * p.z + self.m13;
        let z = self.m20 * p.x + self.m21 * p.y + self.m22 * p.z + self.m23;
        let w = self.m30 * p.x + self.m31 * p.y + self.m32 * p.z + self.m33;
        if w == 0.0 {
            return Vector3Double::ZERO;
        }
        let w = 1.0 / w;
        Vector3Double::new(x * w, y * w, z * w)
    }

    /// Transform a point by the affine part only.
    pub fn multiply_point3x4(&self, p: Vector3Double) -> Vector3Double {
        Vector3Double::new(
            self.m00 * p.x + self.m01 * p.y + self.m02 * p.z + self.m03,
            self.m10 * p.x + self.m11 * p.y + self.m12 * p.z + self.m13,
            self.m20 * p.x + self.m21 * p.y + self.m22 * p.z + self.m23,
        )
    }

    /// Transform a direction (ignores translation).
    pub fn multiply_vector(&self, v: Vector3Double) -> Vector3Double {
        Vector3Double::new(
            self.m00 * v.x + self.m01 * v.y + self.m02 * v.z,
            self.m10 * v.x + self.m11 * v.y + self.m12 * v.z,
            self.m20 * v.x + self.m21 * v.y + self.m22 * v.z,
        )
    }

    pub fn position(&self) -> Vector3Double {
        Vector3Double::new(self.m03, self.m13, self.m23)
    }

    /// Length of each basis column.
    pub fn lossy_scale(&self) -> Vector3Double {
        Vector3Double::new(
            self.column(0).xyz().magnitude(),
            self.column(1).xyz().magnitude(),
            self.column(2).xyz().magnitude(),
        )
    }

    /// Rotation part with scale divided out.
    pub fn rotation(&self) -> QuaternionDouble {
        let scale = self.lossy_scale();
        let mut m = *self;
        for (column, s) in [scale.x, scale.y, scale.z].into_iter().enumerate() {
            if s > 0.0 {
                for row in 0..3 {
                    m.set(row, column, self.get(row, column) / s);
                }
            }
        }
        QuaternionDouble::from_rotation_matrix(&m)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

impl Index<usize> for Matrix4x4Double {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        match index {
            0 => &self.m00,
            1 => &self.m10,
            2 => &self.m20,
            3 => &self.m30,
            4 => &self.m01,
            5 => &self.m11,
            6 => &self.m21,
            7 => &self.m31,
            8 => &self.m02,
            9 => &self.m12,
            10 => &self.m22,
            11 => &self.m32,
            12 => &self.m03,
            13 => &self.m13,
            14 => &self.m23,
            15 => &self.m33,
            _ => panic!("Matrix4x4Double index out of range: {index}"),
        }
    }
}

impl IndexMut<usize> for Matrix4x4Double {
    fn index_mut(&mut self, index: usize) -> &mut f64 {
        match index {
            0 => &mut self.m00,
            1 => &mut self.m10,
            2 => &mut self.m20,
            3 => &mut self.m30,
            4 => &mut self.m01,
            5 => &mut self.m11,
            6 => &mut self.m21,
            7 => &mut self.m31,
            8 => &mut self.m02,
            9 => &mut self.m12,
            10 => &mut self.m22,
            11 => &mut self.m32,
            12 => &mut self.m03,
            13 => &mut self.m13,
            14 => &mut self.m23,
            15 => &mut self.m33,
            _ => panic!("Matrix4x4Double index out of range: {index}"),
        }
    }
}

impl Mul for Matrix4x4Double {
    type Output = Self;

    fn mul(self, rhs: Self) -> Self {
        let mut out = Self::ZERO;
        for row in 0..4 {
            for column in 0..4 {
                let mut sum = 0.0;
                for k in 0..4 {
                    sum += self.get(row, k) * rhs.get(k, column);
                }
                out.set(row, column, sum);
            }
        }
        out
    }
}

impl Mul<Vector4Double> for Matrix4x4Double {
    type Output = Vector4Double;

    fn mul(self, v: Vector4Double) -> Vector4Double {
        Vector4Double::new(
            self.row(0).dot(v),
            self.row(1).dot(v),
            self.row(2).dot(v),
            self.row(3).dot(v),
        )
    }
}
