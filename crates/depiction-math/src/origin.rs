//! Floating origin.
//!
//! World positions stay in `f64`; what goes to a single-precision consumer
//! is always relative to an origin kept close to the camera. When the
//! camera drifts further than `threshold` from the origin, the origin jumps
//! to the camera and every local position must be shifted by the returned
//! delta.

use crate::vector3::Vector3Double;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OriginShift {
    origin: Vector3Double,
    threshold: f64,
}

impl Default for OriginShift {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}

impl OriginShift {
    pub fn new(threshold: f64) -> Self {
        Self {
            origin: Vector3Double::ZERO,
            threshold,
        }
    }

    pub fn origin(&self) -> Vector3Double {
        self.origin
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Camera-relative single-precision position.
    pub fn to_local(&self, world: Vector3Double) -> glam::Vec3 {
        (world - self.origin).as_f32()
    }

    pub fn to_world(&self, local: glam::Vec3) -> Vector3Double {
        self.origin + Vector3Double::from_f32(local)
    }

    /// Re-centre on `camera` if it moved past the threshold.
    ///
    /// Returns how far the origin moved, which callers subtract from every
    /// local position they hold.
    pub fn update(&mut self, camera: Vector3Double) -> Option<Vector3Double> {
        if camera.distance(self.origin) <= self.threshold {
            return None;
        }
        let delta = camera - self.origin;
        self.origin = camera;
        Some(delta)
    }
}
