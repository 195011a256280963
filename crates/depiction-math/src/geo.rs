//! Geographic coordinates on a sphere.
//!
//! Latitude is clamped to `[-90, 90]` and longitude wrapped to
//! `(-180, 180]` on construction, so every value in circulation is
//! normalized. Axis mapping: latitude 0 / longitude 0 points along +Z,
//! the north pole along +Y, longitude +90 along +X.

use crate::quaternion::QuaternionDouble;
use crate::vector2::Vector2Double;
use crate::vector3::Vector3Double;
use crate::{DEG_TO_RAD, RAD_TO_DEG};
use serde::{Deserialize, Serialize};

/// Clamp a latitude into `[-90, 90]` degrees.
pub fn clamp_latitude(latitude: f64) -> f64 {
    latitude.clamp(-90.0, 90.0)
}

/// Wrap a longitude into `(-180, 180]` degrees.
pub fn wrap_longitude(longitude: f64) -> f64 {
    let wrapped = (longitude + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped <= -180.0 { 180.0 } else { wrapped }
}

/// Latitude / longitude in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGeoCoordinate2")]
pub struct GeoCoordinate2Double {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawGeoCoordinate2 {
    latitude: f64,
    longitude: f64,
}

impl From<RawGeoCoordinate2> for GeoCoordinate2Double {
    fn from(raw: RawGeoCoordinate2) -> Self {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl GeoCoordinate2Double {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: clamp_latitude(latitude),
            longitude: wrap_longitude(longitude),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Unit direction from the sphere centre through this coordinate.
    pub fn up_vector(&self) -> Vector3Double {
        let lat = self.latitude * DEG_TO_RAD;
        let lon = self.longitude * DEG_TO_RAD;
        Vector3Double::new(lat.cos() * lon.sin(), lat.sin(), lat.cos() * lon.cos())
    }

    /// Rotation taking +Y onto [`Self::up_vector`].
    pub fn surface_rotation(&self) -> QuaternionDouble {
        QuaternionDouble::angle_axis(self.longitude, Vector3Double::UP)
            * QuaternionDouble::angle_axis(90.0 - self.latitude, Vector3Double::RIGHT)
    }

    /// Haversine distance along a sphere of `radius`.
    pub fn great_circle_distance(&self, other: &Self, radius: f64) -> f64 {
        let lat1 = self.latitude * DEG_TO_RAD;
        let lat2 = other.latitude * DEG_TO_RAD;
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude) * DEG_TO_RAD;
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * radius * a.sqrt().min(1.0).asin()
    }

    /// `(longitude, latitude)` as a plain vector, x east.
    pub fn as_vector(&self) -> Vector2Double {
        Vector2Double::new(self.longitude, self.latitude)
    }

    pub fn with_altitude(&self, altitude: f64) -> GeoCoordinate3Double {
        GeoCoordinate3Double::new(self.latitude, self.longitude, altitude)
    }
}

/// Latitude / longitude in degrees plus altitude in metres above the sphere.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawGeoCoordinate3")]
pub struct GeoCoordinate3Double {
    latitude: f64,
    longitude: f64,
    altitude: f64,
}

#[derive(Deserialize)]
struct RawGeoCoordinate3 {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    altitude: f64,
}

impl From<RawGeoCoordinate3> for GeoCoordinate3Double {
    fn from(raw: RawGeoCoordinate3) -> Self {
        Self::new(raw.latitude, raw.longitude, raw.altitude)
    }
}

impl GeoCoordinate3Double {
    pub fn new(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude: clamp_latitude(latitude),
            longitude: wrap_longitude(longitude),
            altitude,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn altitude(&self) -> f64 {
        self.altitude
    }

    pub fn coordinate2(&self) -> GeoCoordinate2Double {
        GeoCoordinate2Double::new(self.latitude, self.longitude)
    }

    pub fn up_vector(&self) -> Vector3Double {
        self.coordinate2().up_vector()
    }

    /// Position relative to the centre of a sphere of `radius`.
    pub fn to_cartesian(&self, radius: f64) -> Vector3Double {
        self.up_vector() * (radius + self.altitude)
    }

    /// Inverse of [`Self::to_cartesian`]. The sphere centre maps to the
    /// origin coordinate at depth `-radius`.
    pub fn from_cartesian(position: Vector3Double, radius: f64) -> Self {
        let distance = position.magnitude();
        if distance == 0.0 {
            return Self::new(0.0, 0.0, -radius);
        }
        let latitude = (position.y / distance).clamp(-1.0, 1.0).asin() * RAD_TO_DEG;
        let longitude = position.x.atan2(position.z) * RAD_TO_DEG;
        Self::new(latitude, longitude, distance - radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latitude_clamps_and_longitude_wraps() {
        let geo = GeoCoordinate3Double::new(95.0, 190.0, 0.0);
        assert_eq!(geo.latitude(), 90.0);
        assert!((geo.longitude() - -170.0).abs() < 1e-12);

        assert_eq!(GeoCoordinate2Double::new(-120.0, 0.0).latitude(), -90.0);
    }

    #[test]
    fn longitude_range_is_half_open() {
        assert_eq!(wrap_longitude(180.0), 180.0);
        assert_eq!(wrap_longitude(-180.0), 180.0);
        assert_eq!(wrap_longitude(540.0), 180.0);
        assert!((wrap_longitude(-190.0) - 170.0).abs() < 1e-12);
        assert_eq!(wrap_longitude(0.0), 0.0);
    }

    #[test]
    fn deserialization_normalizes() {
        let geo: GeoCoordinate3Double =
            serde_json::from_str(r#"{"latitude": 95.0, "longitude": 190.0}"#).unwrap();
        assert_eq!(geo.latitude(), 90.0);
        assert_eq!(geo.altitude(), 0.0);
    }

    #[test]
    fn up_vector_axes() {
        let origin = GeoCoordinate2Double::new(0.0, 0.0).up_vector();
        assert!(origin.approx_eq(Vector3Double::FORWARD, 1e-12));
        let pole = GeoCoordinate2Double::new(90.0, 45.0).up_vector();
        assert!(pole.approx_eq(Vector3Double::UP, 1e-12));
        let east = GeoCoordinate2Double::new(0.0, 90.0).up_vector();
        assert!(east.approx_eq(Vector3Double::RIGHT, 1e-12));
    }

    #[test]
    fn surface_rotation_points_up_vector() {
        let geo = GeoCoordinate2Double::new(45.5, -73.6);
        let rotated = geo.surface_rotation() * Vector3Double::UP;
        assert!(rotated.approx_eq(geo.up_vector(), 1e-12));
    }

    #[test]
    fn cartesian_round_trip() {
        let radius = 6_378_137.0;
        let geo = GeoCoordinate3Double::new(45.5017, -73.5673, 120.0);
        let back = GeoCoordinate3Double::from_cartesian(geo.to_cartesian(radius), radius);
        assert!((back.latitude() - geo.latitude()).abs() < 1e-9);
        assert!((back.longitude() - geo.longitude()).abs() < 1e-9);
        assert!((back.altitude() - geo.altitude()).abs() < 1e-6);
    }

    #[test]
    fn quarter_meridian_distance() {
        let radius = 1.0;
        let d = GeoCoordinate2Double::new(0.0, 0.0)
            .great_circle_distance(&GeoCoordinate2Double::new(90.0, 0.0), radius);
        assert!((d - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }
}
