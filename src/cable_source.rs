//! Submarine cable dataset: TeleGeography GeoJSON, fetched over HTTP and
//! cached on disk.

use crate::cables::SubmarineCable;
use crate::error::Result;
use crate::geo::GeoPoint;
use crate::settings::CableSettings;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_CABLE_COLOR: &str = "rgba(0, 100, 180, 0.3)";

// ============================================================================
// GeoJSON
// ============================================================================

#[derive(Deserialize)]
struct FeatureCollection {
    #[serde(default)]
    features: Vec<Feature>,
}

#[derive(Deserialize)]
struct Feature {
    #[serde(default)]
    properties: Properties,
    geometry: Option<Geometry>,
}

#[derive(Default, Deserialize)]
struct Properties {
    id: Option<String>,
    name: Option<String>,
    color: Option<String>,
}

#[derive(Deserialize)]
struct Geometry {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    coordinates: serde_json::Value,
}

type Line = Vec<Vec<f64>>;

impl Geometry {
    /// Lines of `[lng, lat]` positions; unknown geometry types yield nothing
    fn lines(self) -> Vec<Line> {
        match self.kind.as_str() {
            "LineString" => serde_json::from_value::<Line>(self.coordinates)
                .map(|line| vec![line])
                .unwrap_or_default(),
            "MultiLineString" => serde_json::from_value::<Vec<Line>>(self.coordinates)
                .unwrap_or_default(),
            _ => Vec::new(),
        }
    }
}

/// Parse a cable FeatureCollection, one cable per line string.
pub fn parse_cable_geojson(json: &str) -> Result<Vec<SubmarineCable>> {
    let collection: FeatureCollection = serde_json::from_str(json)?;
    let mut cables = Vec::new();

    for feature in collection.features {
        let Some(name) = feature.properties.name.filter(|n| !n.is_empty()) else {
            continue;
        };
        let Some(geometry) = feature.geometry else {
            continue;
        };

        let base_id = feature
            .properties
            .id
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| name.clone());
        let color = feature
            .properties
            .color
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| DEFAULT_CABLE_COLOR.to_string());

        for (index, line) in geometry.lines().into_iter().enumerate() {
            let coordinates: Vec<GeoPoint> = line
                .iter()
                .filter(|pos| pos.len() >= 2)
                .map(|pos| GeoPoint::new(pos[1], pos[0]))
                .collect();
            if coordinates.len() < 2 {
                continue;
            }
            cables.push(SubmarineCable {
                id: format!("{}-{}", base_id, index),
                name: name.clone(),
                color: color.clone(),
                coordinates,
                is_highlighted: false,
            });
        }
    }

    Ok(cables)
}

// ============================================================================
// Source
// ============================================================================

pub fn default_cache_path() -> Option<PathBuf> {
    dirs::cache_dir().map(|p| p.join("hopglobe").join("cable-geo.json"))
}

pub struct CableSource {
    url: String,
    local_file: Option<PathBuf>,
    cache_path: Option<PathBuf>,
    ttl: Duration,
    timeout: Duration,
}

impl CableSource {
    pub fn new(settings: &CableSettings) -> Self {
        Self {
            url: settings.url.clone(),
            local_file: settings.file.clone(),
            cache_path: default_cache_path(),
            ttl: Duration::from_secs(settings.cache_ttl_hours * 3600),
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    pub fn with_cache_path(mut self, path: Option<PathBuf>) -> Self {
        self.cache_path = path;
        self
    }

    pub fn with_local_file(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.local_file = path;
        }
        self
    }

    /// Load the cable set: local file, then fresh disk cache, then the network.
    pub fn load(&self) -> Result<Vec<SubmarineCable>> {
        if let Some(path) = &self.local_file {
            debug!(path = %path.display(), "loading cables from file");
            return parse_cable_geojson(&fs::read_to_string(path)?);
        }

        if let Some(cables) = self.read_cache() {
            return Ok(cables);
        }

        info!(url = %self.url, "fetching submarine cables");
        let body = ureq::get(&self.url)
            .timeout(self.timeout)
            .call()?
            .into_string()?;
        let cables = parse_cable_geojson(&body)?;
        self.write_cache(&body);
        Ok(cables)
    }

    /// Same as `load`, but any failure degrades to an empty set.
    pub fn cables_or_empty(&self) -> Vec<SubmarineCable> {
        match self.load() {
            Ok(cables) => {
                debug!(count = cables.len(), "submarine cables loaded");
                cables
            }
            Err(e) => {
                warn!(error = %e, "submarine cable data unavailable");
                Vec::new()
            }
        }
    }

    fn read_cache(&self) -> Option<Vec<SubmarineCable>> {
        let path = self.cache_path.as_deref()?;
        if !is_fresh(path, self.ttl) {
            return None;
        }
        let body = fs::read_to_string(path).ok()?;
        match parse_cable_geojson(&body) {
            Ok(cables) => {
                debug!(path = %path.display(), "using cached cables");
                Some(cables)
            }
            Err(e) => {
                warn!(error = %e, "ignoring corrupt cable cache");
                None
            }
        }
    }

    fn write_cache(&self, body: &str) {
        let Some(path) = self.cache_path.as_deref() else {
            return;
        };
        let written = path
            .parent()
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::write(path, body));
        if let Err(e) = written {
            warn!(error = %e, path = %path.display(), "could not write cable cache");
        }
    }
}

fn is_fresh(path: &Path, ttl: Duration) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|modified| modified.elapsed().ok())
        .is_some_and(|age| age < ttl)
}
