use crate::controller::{ControllerSettings, DEFAULT_LOCATION_NAME, DEFAULT_SPAN_METERS};
use crate::location::Coordinate;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// Configuration data saved to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigData {
    #[serde(default = "default_span_meters")]
    pub span_meters: f64,
    #[serde(default = "default_location_name")]
    pub default_name: String,
    #[serde(default = "default_simulated_position")]
    pub simulated_position: Coordinate,
    #[serde(default = "default_update_interval_ms")]
    pub update_interval_ms: u64,
    #[serde(default)]
    pub permission: PermissionSetting,
    #[serde(default)] // None means the platform data directory
    pub store_path: Option<PathBuf>,
    #[serde(default)] // Tried before the usual system font locations
    pub cjk_font_path: Option<PathBuf>,
}

fn default_span_meters() -> f64 {
    DEFAULT_SPAN_METERS
}

fn default_location_name() -> String {
    DEFAULT_LOCATION_NAME.to_string()
}

fn default_simulated_position() -> Coordinate {
    Coordinate::new(39.9042, 116.4074)
}

fn default_update_interval_ms() -> u64 {
    1000
}

// Default values for a new configuration
impl Default for ConfigData {
    fn default() -> Self {
        Self {
            span_meters: default_span_meters(),
            default_name: default_location_name(),
            simulated_position: default_simulated_position(),
            update_interval_ms: default_update_interval_ms(),
            permission: PermissionSetting::default(),
            store_path: None,
            cjk_font_path: None,
        }
    }
}

impl ConfigData {
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            span_meters: self.span_meters,
            default_name: self.default_name.clone(),
        }
    }
}

// What the simulated location service answers when asked for permission
#[derive(Debug, Copy, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PermissionSetting {
    #[default]
    Granted,
    Denied,
    Ask, // Not determined on first query, granted once requested
}

impl std::fmt::Display for PermissionSetting {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PermissionSetting::Granted => write!(f, "granted"),
            PermissionSetting::Denied => write!(f, "denied"),
            PermissionSetting::Ask => write!(f, "ask"),
        }
    }
}
