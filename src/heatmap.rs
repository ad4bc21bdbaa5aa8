//! Latency heatmap grid around the trace origin
//!
//! Each grid point gets an estimated one-way latency from the origin, scaled to
//! a 0..1 weight (0 = next door, 1 = slowest bucket).

use crate::geo::{haversine_km, GeoPoint};
use serde::Serialize;

pub const DEFAULT_GRID_STEP: f64 = 8.0;

/// Finer grids than this are refused
pub const MIN_GRID_STEP: f64 = 0.1;

/// Latitude band covered; the poles are left out
const MAX_LAT: f64 = 80.0;

/// Fixed switching/queueing cost
const BASE_LATENCY_MS: f64 = 10.0;
/// Propagation in fiber plus routing overhead
const MS_PER_KM: f64 = 0.06;
/// Roughly half-way around the world; weights saturate here
const SATURATION_MS: f64 = 300.0;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HeatmapPoint {
    pub lat: f64,
    pub lng: f64,
    pub weight: f64,
}

pub fn estimate_latency_ms(distance_km: f64) -> f64 {
    BASE_LATENCY_MS + distance_km * MS_PER_KM
}

pub fn latency_weight(latency_ms: f64) -> f64 {
    (latency_ms / SATURATION_MS).min(1.0)
}

/// Generate the full grid for `origin`. A step below `MIN_GRID_STEP` yields no
/// points.
pub fn generate(origin: GeoPoint, grid_step: f64) -> Vec<HeatmapPoint> {
    if !(grid_step.is_finite() && grid_step >= MIN_GRID_STEP) {
        return Vec::new();
    }

    let lat_steps = (2.0 * MAX_LAT / grid_step).floor() as usize;
    let lng_steps = (360.0 / grid_step).floor() as usize;
    let capacity = (lat_steps + 1).saturating_mul(lng_steps + 1);
    let mut points = Vec::with_capacity(capacity);

    for i in 0..=lat_steps {
        let lat = -MAX_LAT + i as f64 * grid_step;
        for j in 0..=lng_steps {
            let lng = -180.0 + j as f64 * grid_step;
            let distance = haversine_km(origin, GeoPoint::new(lat, lng));
            points.push(HeatmapPoint {
                lat,
                lng,
                weight: latency_weight(estimate_latency_ms(distance)),
            });
        }
    }

    points
}
