//! Tile-grid loader.

use crate::config::Index2DConfig;
use crate::loader::{Loader, ScopeKey};
use depiction_math::{GeoCoordinate2Double, TileIndex};
use serde_json::{Value, json};

/// Wants every tile within `radius` of the tile under `center` at `zoom`.
///
/// Moving the centre changes the desired set; the next
/// `Datasource::refresh_loaders` loads new tiles and releases old ones.
#[derive(Debug, Clone)]
pub struct Index2DLoader {
    id: String,
    center: GeoCoordinate2Double,
    zoom: u8,
    radius: u32,
}

impl Index2DLoader {
    pub fn new(id: impl Into<String>, center: GeoCoordinate2Double, zoom: u8, radius: u32) -> Self {
        Self {
            id: id.into(),
            center,
            zoom,
            radius,
        }
    }

    pub fn from_config(id: impl Into<String>, config: &Index2DConfig) -> Self {
        Self::new(
            id,
            GeoCoordinate2Double::new(config.latitude, config.longitude),
            config.zoom,
            config.radius,
        )
    }

    pub fn center(&self) -> GeoCoordinate2Double {
        self.center
    }

    pub fn set_center(&mut self, center: GeoCoordinate2Double) {
        self.center = center;
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    pub fn center_tile(&self) -> TileIndex {
        TileIndex::from_geo(&self.center, self.zoom)
    }
}

impl Loader for Index2DLoader {
    fn id(&self) -> &str {
        &self.id
    }

    fn desired_scopes(&self) -> Vec<ScopeKey> {
        self.center_tile()
            .neighbours(self.radius)
            .into_iter()
            .map(ScopeKey::Tile)
            .collect()
    }

    fn load_parameters(&self, scope: &ScopeKey) -> Value {
        match scope {
            ScopeKey::Tile(tile) => json!({
                "tile": { "x": tile.x, "y": tile.y, "zoom": tile.zoom }
            }),
            _ => json!({}),
        }
    }
}
