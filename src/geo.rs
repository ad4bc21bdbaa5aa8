//! Spherical geometry for the packet flight
//!
//! Positions are plain latitude/longitude pairs in degrees. Interpolation runs
//! along the great circle between two points; the chase camera uses a cheap
//! planar offset in lat/lng space.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean Earth radius used for surface distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Below this angular separation (radians) two points are treated as the same
const COINCIDENT_RADIANS: f64 = 1e-4;

/// Heading vectors shorter than this (degrees) collapse the camera onto the packet
const MIN_HEADING_DEGREES: f64 = 1e-3;

/// How far behind the packet the chase camera sits, in degrees
pub const CAMERA_TRAIL_DEGREES: f64 = 15.0;

// ============================================================================
// Value types
// ============================================================================

/// A point on the globe in degrees
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    fn to_unit_vector(self) -> (f64, f64, f64) {
        let (lat, lng) = (self.lat.to_radians(), self.lng.to_radians());
        (lat.cos() * lng.cos(), lat.cos() * lng.sin(), lat.sin())
    }
}

/// Where the renderer should put its camera
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraPose {
    pub lat: f64,
    pub lng: f64,
    pub altitude: f64,
}

impl CameraPose {
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.lat, self.lng)
    }
}

/// Geolocation record as delivered by the probing process
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub isp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
}

impl GeoLocation {
    pub fn at(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            ..Default::default()
        }
    }

    pub fn with_city(mut self, city: &str, country_code: &str) -> Self {
        self.city = Some(city.to_string());
        self.country_code = Some(country_code.to_string());
        self
    }

    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.latitude, self.longitude)
    }

    /// Short human label, e.g. "Tokyo, JP"
    pub fn label(&self) -> String {
        match (&self.city, &self.country_code) {
            (Some(city), Some(cc)) => format!("{}, {}", city, cc),
            (Some(city), None) => city.clone(),
            (None, Some(cc)) => cc.clone(),
            (None, None) => format!("{:.2}, {:.2}", self.latitude, self.longitude),
        }
    }
}

// ============================================================================
// Great circle
// ============================================================================

/// Angular separation in radians (spherical law of cosines)
pub fn angular_distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlng = (b.lng - a.lng).to_radians();
    let cos_d = lat1.sin() * lat2.sin() + lat1.cos() * lat2.cos() * dlng.cos();
    // Rounding can push the cosine just outside [-1, 1]
    cos_d.clamp(-1.0, 1.0).acos()
}

/// Position at fraction `t` of the way along the great circle from `start` to `end`.
///
/// Near-identical endpoints return `start`. Exactly antipodal endpoints have no
/// unique great circle; those fall back to a lat/lng blend along the shorter
/// longitude direction so the result stays finite.
pub fn interpolate(start: GeoPoint, end: GeoPoint, t: f64) -> GeoPoint {
    let t = t.clamp(0.0, 1.0);
    let d = angular_distance(start, end);

    if d < COINCIDENT_RADIANS {
        return start;
    }
    if PI - d < COINCIDENT_RADIANS {
        return blend(start, end, t);
    }

    let sin_d = d.sin();
    let a = ((1.0 - t) * d).sin() / sin_d;
    let b = (t * d).sin() / sin_d;

    let (x1, y1, z1) = start.to_unit_vector();
    let (x2, y2, z2) = end.to_unit_vector();
    let x = a * x1 + b * x2;
    let y = a * y1 + b * y2;
    let z = a * z1 + b * z2;

    GeoPoint {
        lat: z.atan2((x * x + y * y).sqrt()).to_degrees(),
        lng: y.atan2(x).to_degrees(),
    }
}

fn blend(start: GeoPoint, end: GeoPoint, t: f64) -> GeoPoint {
    let mut dlng = end.lng - start.lng;
    if dlng > 180.0 {
        dlng -= 360.0;
    } else if dlng < -180.0 {
        dlng += 360.0;
    }
    GeoPoint {
        lat: start.lat + (end.lat - start.lat) * t,
        lng: normalize_lng(start.lng + dlng * t),
    }
}

/// Wrap a longitude into [-180, 180]
pub fn normalize_lng(lng: f64) -> f64 {
    let wrapped = (lng + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lng > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Chase-camera pose trailing `packet`, looking toward `heading`.
///
/// This is a planar offset in degree space, not a geodesic one. When the packet
/// sits on its heading the camera collapses onto the packet.
pub fn camera_behind(packet: GeoPoint, heading: GeoPoint, altitude: f64) -> CameraPose {
    let dlat = heading.lat - packet.lat;
    let dlng = heading.lng - packet.lng;
    let norm = (dlat * dlat + dlng * dlng).sqrt();

    if norm < MIN_HEADING_DEGREES {
        return CameraPose {
            lat: packet.lat,
            lng: packet.lng,
            altitude,
        };
    }

    CameraPose {
        lat: packet.lat - dlat / norm * CAMERA_TRAIL_DEGREES,
        lng: packet.lng - dlng / norm * CAMERA_TRAIL_DEGREES,
        altitude,
    }
}

/// Surface distance in kilometres (haversine)
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}
