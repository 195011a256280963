//! Web-Mercator tile addressing.

use crate::geo::GeoCoordinate2Double;
use crate::RAD_TO_DEG;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Latitude limit of the square Mercator projection.
pub const MAX_MERCATOR_LATITUDE: f64 = 85.051_128_779_806_59;

/// Highest zoom level whose tile count fits in an `i32`.
pub const MAX_ZOOM: u8 = 30;

/// Largest neighbourhood radius, in tiles, that [`TileIndex::neighbours`]
/// will walk.
pub const MAX_NEIGHBOUR_RADIUS: u32 = 64;

/// `(x, y)` tile at `zoom`; `y = 0` is the northernmost row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub zoom: u8,
    pub x: i32,
    pub y: i32,
}

impl TileIndex {
    pub fn new(x: i32, y: i32, zoom: u8) -> Self {
        Self { zoom, x, y }
    }

    /// Tiles per axis at `zoom`.
    pub fn tile_count(zoom: u8) -> i32 {
        1 << zoom.min(MAX_ZOOM)
    }

    /// Tile containing `geo`. Latitudes beyond the Mercator limit land in
    /// the first or last row.
    pub fn from_geo(geo: &GeoCoordinate2Double, zoom: u8) -> Self {
        let zoom = zoom.min(MAX_ZOOM);
        let n = Self::tile_count(zoom) as f64;
        let lat = geo
            .latitude()
            .clamp(-MAX_MERCATOR_LATITUDE, MAX_MERCATOR_LATITUDE)
            .to_radians();
        let x = ((geo.longitude() + 180.0) / 360.0 * n).floor();
        let y = ((1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * n).floor();
        let max = n - 1.0;
        Self::new(x.clamp(0.0, max) as i32, y.clamp(0.0, max) as i32, zoom)
    }

    fn longitude_at(x: f64, n: f64) -> f64 {
        x / n * 360.0 - 180.0
    }

    fn latitude_at(y: f64, n: f64) -> f64 {
        (PI * (1.0 - 2.0 * y / n)).sinh().atan() * RAD_TO_DEG
    }

    /// South-west and north-east corners.
    pub fn bounds(&self) -> (GeoCoordinate2Double, GeoCoordinate2Double) {
        let n = Self::tile_count(self.zoom) as f64;
        let west = Self::longitude_at(self.x as f64, n);
        let east = Self::longitude_at(self.x as f64 + 1.0, n);
        let north = Self::latitude_at(self.y as f64, n);
        let south = Self::latitude_at(self.y as f64 + 1.0, n);
        (
            GeoCoordinate2Double::new(south, west),
            GeoCoordinate2Double::new(north, east),
        )
    }

    pub fn center(&self) -> GeoCoordinate2Double {
        let n = Self::tile_count(self.zoom) as f64;
        GeoCoordinate2Double::new(
            Self::latitude_at(self.y as f64 + 0.5, n),
            Self::longitude_at(self.x as f64 + 0.5, n),
        )
    }

    /// Tile one zoom level up, or `None` at zoom 0.
    pub fn parent(&self) -> Option<Self> {
        (self.zoom > 0).then(|| Self::new(self.x >> 1, self.y >> 1, self.zoom - 1))
    }

    /// Square of tiles within `radius` of this one, including itself.
    ///
    /// Columns wrap around the antimeridian; rows beyond the poles are
    /// dropped. `radius` is capped at [`MAX_NEIGHBOUR_RADIUS`]. Sorted and
    /// free of duplicates.
    pub fn neighbours(&self, radius: u32) -> Vec<Self> {
        let n = Self::tile_count(self.zoom);
        let r = radius.min(MAX_NEIGHBOUR_RADIUS) as i32;
        let rows = (self.y - r).max(0)..=(self.y + r).min(n - 1);
        let mut columns: Vec<i32> = if 2 * r + 1 >= n {
            (0..n).collect()
        } else {
            (self.x - r..=self.x + r).map(|x| x.rem_euclid(n)).collect()
        };
        columns.sort_unstable();

        let mut tiles = Vec::with_capacity(columns.len() * rows.clone().count());
        for x in columns {
            for y in rows.clone() {
                tiles.push(Self::new(x, y, self.zoom));
            }
        }
        tiles
    }
}

impl std::fmt::Display for TileIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}
