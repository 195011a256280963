//! Planes and rays.

use crate::vector3::Vector3Double;
use serde::{Deserialize, Serialize};

/// Half-line from `origin` along a unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayDouble {
    pub origin: Vector3Double,
    pub direction: Vector3Double,
}

impl RayDouble {
    pub fn new(origin: Vector3Double, direction: Vector3Double) -> Self {
        Self {
            origin,
            direction: direction.normalized(),
        }
    }

    pub fn get_point(&self, distance: f64) -> Vector3Double {
        self.origin + self.direction * distance
    }
}

/// Plane `dot(normal, p) + distance = 0` with a unit normal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneDouble {
    pub normal: Vector3Double,
    pub distance: f64,
}

impl PlaneDouble {
    /// Plane through `point` facing `normal`.
    pub fn new(normal: Vector3Double, point: Vector3Double) -> Self {
        let normal = normal.normalized();
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Plane through three points, normal following the `a, b, c` winding.
    pub fn from_points(a: Vector3Double, b: Vector3Double, c: Vector3Double) -> Self {
        let normal = (b - a).cross(c - a).normalized();
        Self {
            normal,
            distance: -normal.dot(a),
        }
    }

    /// Signed distance; positive on the side the normal faces.
    pub fn distance_to_point(&self, point: Vector3Double) -> f64 {
        self.normal.dot(point) + self.distance
    }

    pub fn side(&self, point: Vector3Double) -> bool {
        self.distance_to_point(point) > 0.0
    }

    pub fn same_side(&self, a: Vector3Double, b: Vector3Double) -> bool {
        let da = self.distance_to_point(a);
        let db = self.distance_to_point(b);
        (da > 0.0 && db > 0.0) || (da <= 0.0 && db <= 0.0)
    }

    pub fn closest_point(&self, point: Vector3Double) -> Vector3Double {
        point - self.normal * self.distance_to_point(point)
    }

    /// Distance along `ray` to the plane.
    ///
    /// `None` when the ray is parallel to the plane or points away from it.
    pub fn raycast(&self, ray: &RayDouble) -> Option<f64> {
        let v_dot = ray.direction.dot(self.normal);
        let n_dot = -ray.origin.dot(self.normal) - self.distance;
        if v_dot.abs() < f64::EPSILON {
            return None;
        }
        let enter = n_dot / v_dot;
        (enter > 0.0).then_some(enter)
    }

    pub fn flipped(&self) -> Self {
        Self {
            normal: -self.normal,
            distance: -self.distance,
        }
    }

    /// The same plane moved by `translation`.
    pub fn translate(&self, translation: Vector3Double) -> Self {
        Self {
            normal: self.normal,
            distance: self.distance - self.normal.dot(translation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ground() -> PlaneDouble {
        PlaneDouble::new(Vector3Double::UP, Vector3Double::ZERO)
    }

    #[test]
    fn raycast_hits_from_above() {
        let ray = RayDouble::new(Vector3Double::new(1.0, 10.0, 2.0), Vector3Double::DOWN);
        let enter = ground().raycast(&ray).unwrap();
        assert_eq!(enter, 10.0);
        assert_eq!(ray.get_point(enter), Vector3Double::new(1.0, 0.0, 2.0));
    }

    #[test]
    fn parallel_ray_misses() {
        let ray = RayDouble::new(Vector3Double::new(0.0, 1.0, 0.0), Vector3Double::RIGHT);
        assert_eq!(ground().raycast(&ray), None);
    }

    #[test]
    fn ray_pointing_away_misses() {
        let ray = RayDouble::new(Vector3Double::new(0.0, 1.0, 0.0), Vector3Double::UP);
        assert_eq!(ground().raycast(&ray), None);
    }

    #[test]
    fn sides_and_closest_point() {
        let plane = PlaneDouble::from_points(
            Vector3Double::ZERO,
            Vector3Double::FORWARD,
            Vector3Double::RIGHT,
        );
        assert!(plane.normal.approx_eq(Vector3Double::UP, 1e-12));
        assert!(plane.side(Vector3Double::new(0.0, 3.0, 0.0)));
        assert!(!plane.flipped().side(Vector3Double::new(0.0, 3.0, 0.0)));
        assert!(plane.same_side(Vector3Double::new(5.0, 1.0, 0.0), Vector3Double::UP));
        assert_eq!(
            plane.closest_point(Vector3Double::new(4.0, 7.0, -1.0)),
            Vector3Double::new(4.0, 0.0, -1.0)
        );
    }

    #[test]
    fn translated_plane_contains_moved_point() {
        let moved = ground().translate(Vector3Double::new(0.0, 5.0, 0.0));
        assert_eq!(moved.distance_to_point(Vector3Double::new(3.0, 5.0, 3.0)), 0.0);
    }
}
