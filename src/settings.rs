use crate::error::{HopGlobeError, Result};
use crate::heatmap::DEFAULT_GRID_STEP;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const CABLE_API_URL: &str = "https://www.submarinecablemap.com/api/v3/cable/cable-geo.json";

/// Contents of `config.toml`; every section is optional
#[derive(Debug, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub flight: FlightSettings,
    #[serde(default)]
    pub heatmap: HeatmapSettings,
    #[serde(default)]
    pub cables: CableSettings,
    #[serde(default)]
    pub geo: GeoSettings,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct FlightSettings {
    pub speed: f64,
    pub frame_time: f32,    // Seconds between frames in the interactive view
}

impl Default for FlightSettings {
    fn default() -> Self {
        Self {
            speed: 1.0,
            frame_time: 0.016,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct HeatmapSettings {
    pub enabled: bool,
    pub grid_step: f64,
}

impl Default for HeatmapSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_step: DEFAULT_GRID_STEP,
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct CableSettings {
    pub enabled: bool,
    pub url: String,
    pub file: Option<PathBuf>,   // Local GeoJSON; skips the network entirely
    pub cache_ttl_hours: u64,
    pub timeout_secs: u64,
}

impl Default for CableSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            url: CABLE_API_URL.to_string(),
            file: None,
            cache_ttl_hours: 24,
            timeout_secs: 30,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct GeoSettings {
    pub geoip_db: Option<PathBuf>,   // Path to GeoLite2-City.mmdb database
}

impl Settings {
    /// Load from `path`, or the default location when `None`.
    /// A missing or broken file falls back to defaults.
    pub fn load(path: Option<&Path>) -> Self {
        let path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!(error = %e, "using default settings");
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| HopGlobeError::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("hopglobe")
            .join("config.toml")
    }
}
