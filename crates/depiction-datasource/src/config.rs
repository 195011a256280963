//! Datasource configuration.
//!
//! ```toml
//! name = "terrain"
//! supports_delete = false
//! auto_dispose = true
//!
//! [index2d]
//! zoom = 12
//! radius = 2
//! latitude = 45.5
//! longitude = -73.6
//! ```

use crate::error::DatasourceError;
use crate::persistence::OperationCapabilities;
use depiction_math::tile::{MAX_NEIGHBOUR_RADIUS, MAX_ZOOM};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasourceConfig {
    pub name: String,
    pub supports_save: bool,
    pub supports_synchronize: bool,
    pub supports_delete: bool,
    /// Evict unclaimed, in-sync entities after operations and reloads.
    pub auto_dispose: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index2d: Option<Index2DConfig>,
}

impl Default for DatasourceConfig {
    fn default() -> Self {
        Self {
            name: "datasource".to_string(),
            supports_save: true,
            supports_synchronize: true,
            supports_delete: true,
            auto_dispose: true,
            index2d: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Index2DConfig {
    pub zoom: u8,
    pub radius: u32,
    pub latitude: f64,
    pub longitude: f64,
}

impl Default for Index2DConfig {
    fn default() -> Self {
        Self {
            zoom: 10,
            radius: 1,
            latitude: 0.0,
            longitude: 0.0,
        }
    }
}

impl DatasourceConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, DatasourceError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DatasourceError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            DatasourceError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&text)
    }

    pub fn capabilities(&self) -> OperationCapabilities {
        OperationCapabilities {
            save: self.supports_save,
            synchronize: self.supports_synchronize,
            delete: self.supports_delete,
        }
    }

    fn validate(&self) -> Result<(), DatasourceError> {
        if self.name.trim().is_empty() {
            return Err(DatasourceError::Config("name must not be empty".to_string()));
        }
        let Some(index2d) = &self.index2d else {
            return Ok(());
        };
        if index2d.zoom > MAX_ZOOM {
            return Err(DatasourceError::Config(format!(
                "index2d.zoom must be at most {MAX_ZOOM}, got {}",
                index2d.zoom
            )));
        }
        if index2d.radius > MAX_NEIGHBOUR_RADIUS {
            return Err(DatasourceError::Config(format!(
                "index2d.radius must be at most {MAX_NEIGHBOUR_RADIUS}, got {}",
                index2d.radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = DatasourceConfig::from_toml_str("").unwrap();
        assert_eq!(config, DatasourceConfig::default());
        assert_eq!(config.capabilities(), OperationCapabilities::ALL);
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config = DatasourceConfig::from_toml_str(
            r#"
name = "terrain"
supports_delete = false

[index2d]
zoom = 12
"#,
        )
        .unwrap();
        assert_eq!(config.name, "terrain");
        assert!(config.supports_save);
        assert!(!config.capabilities().delete);
        let index2d = config.index2d.unwrap();
        assert_eq!(index2d.zoom, 12);
        assert_eq!(index2d.radius, 1);
    }

    #[test]
    fn rejects_bad_values() {
        assert!(matches!(
            DatasourceConfig::from_toml_str("name = \"\""),
            Err(DatasourceError::Config(_))
        ));
        assert!(matches!(
            DatasourceConfig::from_toml_str("[index2d]\nzoom = 31"),
            Err(DatasourceError::Config(_))
        ));
        let error = DatasourceConfig::from_toml_str("[index2d]\nzoom = 16\nradius = 16000")
            .unwrap_err()
            .to_string();
        assert!(error.contains("index2d.radius must be at most 64"), "{error}");
        assert!(DatasourceConfig::from_toml_str("[index2d]\nradius = 64").is_ok());
        assert!(matches!(
            DatasourceConfig::from_toml_str("unknown = 1"),
            Err(DatasourceError::Toml(_))
        ));
    }
}
