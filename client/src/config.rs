use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

/// Coordinates are grouped after rounding to this many decimal places (~0.11 m).
pub const COORD_PRECISION: i32 = 6;

pub const DEFAULT_LISTINGS_ENDPOINT: &str = "/api/listings";
pub const DEFAULT_MAP_GLOBAL: &str = "listingMap";
pub const MAX_LISTINGS_PER_FETCH: usize = 250;

pub const POPUP_STAGGER_PX: f64 = 15.0;
pub const POPUP_BASE_BOTTOM_PX: f64 = 24.0;

// Marker stacking bands. Active markers stack above hover by open-popup index.
pub const MARKER_Z_BASE: i32 = 0;
pub const MARKER_Z_HOVER: i32 = 500;
pub const MARKER_Z_ACTIVE: i32 = 1_000;
pub const POPUP_Z_BASE: i32 = 10_000;

/// Environment variable naming a JSON config file for the native replay binary.
pub const CONFIG_PATH_ENV: &str = "LISTING_MAP_CONFIG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Mapbox,
    Google,
}

/// Runtime settings supplied by the host page. Every field has a default.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub provider: ProviderKind,
    /// Name of the `window` property holding the already-constructed provider map.
    pub map_global: String,
    pub listings_endpoint: String,
    pub max_results: usize,
    pub popup_stagger_px: f64,
    pub popup_base_bottom_px: f64,
    pub sidebar_element_id: String,
    pub popup_container_id: String,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            map_global: DEFAULT_MAP_GLOBAL.to_string(),
            listings_endpoint: DEFAULT_LISTINGS_ENDPOINT.to_string(),
            max_results: MAX_LISTINGS_PER_FETCH,
            popup_stagger_px: POPUP_STAGGER_PX,
            popup_base_bottom_px: POPUP_BASE_BOTTOM_PX,
            sidebar_element_id: "listing-sidebar".to_string(),
            popup_container_id: "listing-popups".to_string(),
        }
    }
}

impl MapConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    /// Load the file named by `LISTING_MAP_CONFIG`, or the defaults when it is unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_path(path),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.max_results == 0 {
            return Err(ConfigError::Invalid("max_results must be positive"));
        }
        if !self.popup_stagger_px.is_finite() || self.popup_stagger_px < 0.0 {
            return Err(ConfigError::Invalid("popup_stagger_px must be non-negative"));
        }
        if !self.popup_base_bottom_px.is_finite() {
            return Err(ConfigError::Invalid("popup_base_bottom_px must be finite"));
        }
        if self.listings_endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("listings_endpoint must not be empty"));
        }
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = MapConfig::from_json("{}").expect("defaults should validate");
        assert_eq!(config, MapConfig::default());
        assert_eq!(config.popup_stagger_px, 15.0);
        assert_eq!(config.max_results, 250);
    }

    #[test]
    fn provider_is_selected_by_name() {
        let config = MapConfig::from_json(r#"{"provider":"google","max_results":100}"#)
            .expect("config should parse");
        assert_eq!(config.provider, ProviderKind::Google);
        assert_eq!(config.max_results, 100);
        assert_eq!(config.listings_endpoint, DEFAULT_LISTINGS_ENDPOINT);
    }

    #[test]
    fn rejects_zero_limit_and_bad_json() {
        assert!(matches!(
            MapConfig::from_json(r#"{"max_results":0}"#),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            MapConfig::from_json("{not json"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn reads_config_file_from_disk() {
        let path = std::env::temp_dir().join(format!("listing-map-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"provider":"google","popup_stagger_px":20.0}"#)
            .expect("temp config should be writable");
        let loaded = MapConfig::from_path(&path);
        let _ = std::fs::remove_file(&path);

        let config = loaded.expect("config file should load");
        assert_eq!(config.provider, ProviderKind::Google);
        assert_eq!(config.popup_stagger_px, 20.0);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let path = std::env::temp_dir().join("listing-map-config-does-not-exist.json");
        assert!(matches!(MapConfig::from_path(path), Err(ConfigError::Io(_))));
    }
}
