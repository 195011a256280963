//! # Depiction Math
//!
//! Double-precision value types for planetary-scale scenes, where 32-bit
//! floats jitter visibly a few kilometres away from the origin.
//!
//! Every type mirrors its single-precision counterpart algorithm for
//! algorithm and only widens the storage. Narrowing back to `glam`'s `f32`
//! types is always an explicit, named call (`as_f32`).
//!
//! ## Architecture
//!
//! ```text
//! Vector2/3/4Double      ← plain arithmetic, zero-on-degenerate normalization
//!     │
//! QuaternionDouble       ← rotations (a * b applies b first)
//!     │
//! Matrix4x4Double        ← column-major TRS, fast orthonormal inverse
//!     │
//! GeoCoordinate2/3Double ← lat/lon(/alt) on a sphere
//!     │
//! TileIndex, OriginShift ← grid addressing and camera-relative precision
//! ```

pub mod error;
pub mod geo;
pub mod matrix4x4;
pub mod origin;
pub mod plane;
pub mod quaternion;
pub mod tile;
pub mod vector2;
pub mod vector3;
pub mod vector4;

pub use error::MathError;
pub use geo::{GeoCoordinate2Double, GeoCoordinate3Double};
pub use matrix4x4::Matrix4x4Double;
pub use origin::OriginShift;
pub use plane::{PlaneDouble, RayDouble};
pub use quaternion::QuaternionDouble;
pub use tile::TileIndex;
pub use vector2::Vector2Double;
pub use vector3::Vector3Double;
pub use vector4::Vector4Double;

/// Magnitude below which vectors normalize to zero.
pub const EPSILON: f64 = 1e-5;

/// Squared-magnitude floor used by angle computations.
pub const EPSILON_NORMAL_SQRT: f64 = 1e-15;

/// Degrees to radians.
pub const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Radians to degrees.
pub const RAD_TO_DEG: f64 = 180.0 / std::f64::consts::PI;

pub(crate) fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
