//! Orthographic terminal globe
//!
//! Draws the engine's output: graticule, coastlines, latency heatmap,
//! submarine cables, the hop route and the flying packet, all onto a braille
//! canvas in layers.

use crate::cables::SubmarineCable;
use crate::colors;
use crate::datacenter;
use crate::flight::FlightState;
use crate::geo::{angular_distance, interpolate, CameraPose, GeoPoint};
use crate::heatmap::HeatmapPoint;
use crate::path::FlightSegment;
use crate::terminal::{BrailleCanvas, Terminal};
use crate::trace::{Hop, TraceSession};
use crossterm::style::Color;

/// Camera when nothing better is known: over the North Pacific
pub const DEFAULT_CAMERA: CameraPose = CameraPose {
    lat: 30.0,
    lng: -150.0,
    altitude: 2.5,
};

const MIN_ZOOM: f64 = 1.0;
const MAX_ZOOM: f64 = 3.0;

// Draw order, low to high
const LAYER_GRATICULE: u8 = 1;
const LAYER_HEATMAP: u8 = 2;
const LAYER_LAND: u8 = 3;
const LAYER_CABLE: u8 = 4;
const LAYER_CABLE_HIGHLIGHT: u8 = 5;
const LAYER_ROUTE: u8 = 6;
const LAYER_HOP: u8 = 7;
const LAYER_ENDPOINT: u8 = 8;
const LAYER_PACKET: u8 = 9;

/// Coastline outlines as (lat, lng) degrees
const COASTLINES: &[&[(f64, f64)]] = &[
    // North America
    &[
        (69.5, -90.5), (67.1, -81.4), (58.9, -94.7), (51.2, -79.9), (62.6, -77.4), (58.2, -67.6),
        (60.3, -64.6), (53.3, -55.8), (46.8, -71.1), (49.2, -65.1), (45.9, -59.8), (39.2, -76.3),
        (31.4, -81.3), (25.2, -80.4), (30.1, -84.1), (27.8, -97.1), (18.8, -95.9), (21.5, -87.1),
        (15.9, -88.9), (15.3, -83.4), (9.0, -82.2), (11.1, -74.9), (7.2, -80.9), (19.3, -105.0),
        (31.2, -113.1), (23.4, -109.4), (24.7, -112.2), (40.3, -124.4), (49.0, -122.8), (58.1, -134.1),
        (61.3, -150.6), (54.4, -164.8), (58.9, -157.0), (61.5, -166.1), (64.8, -160.8), (65.7, -168.1),
        (71.4, -156.6), (67.4, -108.9), (67.3, -96.1), (71.9, -95.2), (69.5, -90.5),
    ],
    // South America
    &[
        (11.1, -74.9), (10.7, -61.9), (4.2, -51.3), (-0.1, -50.4), (-7.3, -34.7), (-21.9, -40.9),
        (-24.9, -47.6), (-34.4, -53.8), (-33.9, -58.4), (-36.9, -56.8), (-41.1, -65.1), (-48.1, -66.0),
        (-53.8, -71.0), (-52.3, -74.9), (-46.6, -75.6), (-42.4, -72.7), (-18.3, -70.4), (-14.6, -76.0),
        (-4.7, -81.4), (3.8, -77.1), (9.0, -79.1), (11.1, -74.9),
    ],
    // Europe
    &[
        (31.2, 29.7), (31.2, 34.3), (36.7, 36.2), (36.7, 27.6), (39.5, 26.2), (41.5, 41.6),
        (45.2, 36.7), (47.3, 39.1), (44.4, 33.9), (46.6, 30.7), (41.1, 28.8), (40.3, 22.6),
        (36.4, 23.2), (45.6, 13.9), (40.2, 18.5), (37.9, 15.7), (44.4, 8.9), (36.0, -5.9),
        (36.9, -8.9), (43.0, -9.4), (43.4, -1.9), (48.7, -4.6), (53.5, 8.1), (57.1, 8.5),
        (54.0, 10.9), (54.4, 19.7), (59.2, 23.3), (60.0, 29.1), (60.7, 21.3), (65.1, 25.4),
        (65.7, 22.2), (55.4, 12.9), (59.5, 10.4), (58.6, 5.7), (62.6, 5.9), (69.8, 19.2),
        (70.5, 31.3), (69.3, 33.8), (31.2, 29.7),
    ],
    // Africa
    &[
        (29.9, 32.4), (11.7, 42.7), (10.6, 51.0), (-4.7, 39.2), (-14.7, 40.8), (-19.8, 34.8),
        (-24.1, 35.5), (-32.8, 28.2), (-34.8, 19.6), (-18.1, 11.8), (-10.7, 13.7), (3.7, 9.4),
        (6.3, 4.3), (4.4, -8.0), (14.7, -17.6), (29.9, 32.4),
    ],
    // Asia
    &[
        (77.0, 107.0), (70.8, 131.3), (69.4, 178.6), (62.3, 179.2), (59.9, 163.5), (51.0, 156.8),
        (56.8, 155.9), (62.6, 164.5), (54.7, 135.1), (52.2, 141.4), (39.8, 127.5), (35.1, 129.1),
        (40.9, 121.6), (39.2, 118.0), (37.5, 122.4), (34.9, 119.2), (28.2, 121.7), (19.8, 105.9),
        (13.4, 109.3), (8.6, 105.2), (13.4, 100.1), (1.3, 104.2), (22.8, 91.4), (15.9, 80.3),
        (8.0, 77.5), (21.4, 72.6), (30.3, 48.9), (24.0, 51.8), (26.4, 56.4), (22.3, 59.8),
        (12.6, 43.5), (21.3, 39.1), (69.3, 33.8), (67.5, 41.1), (66.6, 33.2), (63.8, 37.0),
        (68.6, 43.5), (68.1, 68.5), (71.0, 66.7), (73.0, 69.9), (66.2, 72.4), (72.8, 74.7),
        (77.0, 107.0),
    ],
    // Australia
    &[
        (-13.8, 143.6), (-26.1, 153.1), (-37.4, 150.0), (-38.0, 140.6), (-34.4, 138.2), (-35.3, 136.8),
        (-32.9, 137.8), (-34.9, 136.0), (-31.5, 131.3), (-34.2, 115.0), (-21.8, 114.1), (-19.7, 120.9),
        (-14.2, 125.7), (-15.0, 129.6), (-11.1, 132.4), (-11.9, 136.5), (-15.0, 135.5), (-17.7, 140.2),
        (-11.0, 142.1), (-13.8, 143.6),
    ],
    // Greenland
    &[
        (83.5, -27.1), (82.7, -20.8), (82.0, -31.4), (81.3, -12.2), (80.2, -20.0), (80.1, -17.7),
        (76.6, -21.7), (74.3, -19.4), (70.2, -26.4), (70.1, -22.3), (65.5, -39.8), (60.1, -43.4),
        (63.6, -51.6), (67.2, -54.0), (69.9, -50.9), (69.6, -54.7), (70.6, -51.4), (75.5, -58.6),
        (78.0, -73.3), (81.8, -62.7), (83.5, -27.1),
    ],
    // Japan
    &[
        (37.1, 141.0), (33.5, 135.8), (33.9, 131.0), (31.4, 130.2), (33.3, 129.4), (38.2, 139.4),
        (41.2, 140.3), (37.1, 141.0),
    ],
    // UK/Ireland
    &[
        (58.6, -3.0), (51.3, 1.4), (50.0, -5.2), (54.0, -2.9), (56.8, -6.1), (58.6, -3.0),
    ],
    // Antarctica
    &[
        (-64.2, -58.6), (-68.0, -65.7), (-73.7, -60.8), (-79.2, -78.0), (-83.2, -58.2), (-80.3, -28.5),
        (-78.1, -35.3), (-70.9, -6.9), (-65.8, 54.5), (-72.3, 69.9), (-66.2, 88.0), (-65.3, 135.1),
        (-71.7, 171.2), (-80.9, 159.8), (-84.7, 180.0), (-90.0, 180.0), (-90.0, -180.0), (-84.1, -179.1),
        (-85.0, -143.1), (-76.9, -158.4), (-73.9, -74.9), (-64.2, -58.6),
    ],
];

// ============================================================================
// Camera and projection
// ============================================================================

/// Where to look: the chase camera while flying, otherwise the last located
/// hop, then the origin, then `DEFAULT_CAMERA`.
pub fn camera_for(session: &TraceSession, flight: &FlightState) -> CameraPose {
    if flight.is_flying {
        if let Some(camera) = flight.camera_position {
            return camera;
        }
    }
    session
        .hops()
        .iter()
        .rev()
        .find_map(Hop::point)
        .or_else(|| session.origin())
        .map_or(DEFAULT_CAMERA, |p| CameraPose {
            lat: p.lat,
            lng: p.lng,
            altitude: DEFAULT_CAMERA.altitude,
        })
}

/// Orthographic projection onto canvas dots, centered under the camera
#[derive(Clone, Copy, Debug)]
pub struct Projection {
    center_lng: f64,
    sin_lat0: f64,
    cos_lat0: f64,
    radius: f64,
    cx: f64,
    cy: f64,
}

impl Projection {
    pub fn new(camera: CameraPose, dots_w: usize, dots_h: usize) -> Self {
        // Lower altitude zooms in
        let zoom = (DEFAULT_CAMERA.altitude / camera.altitude.max(f64::EPSILON))
            .clamp(MIN_ZOOM, MAX_ZOOM);
        let lat0 = camera.lat.clamp(-90.0, 90.0).to_radians();
        Self {
            center_lng: camera.lng,
            sin_lat0: lat0.sin(),
            cos_lat0: lat0.cos(),
            radius: dots_w.min(dots_h) as f64 * 0.45 * zoom,
            cx: dots_w as f64 / 2.0,
            cy: dots_h as f64 / 2.0,
        }
    }

    /// Dot coordinates of `p`, or None on the far side of the globe
    pub fn project(&self, p: GeoPoint) -> Option<(i32, i32)> {
        let lat = p.lat.to_radians();
        let dlng = (p.lng - self.center_lng).to_radians();
        let (sin_lat, cos_lat) = lat.sin_cos();

        let cos_c = self.sin_lat0 * sin_lat + self.cos_lat0 * cos_lat * dlng.cos();
        if cos_c < 0.0 {
            return None;
        }

        let x = cos_lat * dlng.sin();
        let y = self.cos_lat0 * sin_lat - self.sin_lat0 * cos_lat * dlng.cos();
        Some((
            (self.cx + x * self.radius).round() as i32,
            (self.cy - y * self.radius).round() as i32,
        ))
    }
}

// ============================================================================
// Scene
// ============================================================================

/// Everything one frame shows
pub struct Scene<'a> {
    pub session: &'a TraceSession,
    pub flight: &'a FlightState,
    pub segments: &'a [FlightSegment],
    pub heatmap: Option<&'a [HeatmapPoint]>,
    pub cables: Option<&'a [SubmarineCable]>,
}

pub fn render(term: &mut Terminal, canvas: &mut BrailleCanvas, scene: &Scene) {
    let (cols, rows) = term.size();
    if canvas.size() != (cols as usize * 2, rows as usize * 4) {
        *canvas = BrailleCanvas::new(cols, rows);
    }
    canvas.clear();
    term.clear();

    let (dots_w, dots_h) = canvas.size();
    let proj = Projection::new(camera_for(scene.session, scene.flight), dots_w, dots_h);

    draw_graticule(canvas, &proj);
    if let Some(points) = scene.heatmap {
        draw_heatmap(canvas, &proj, points);
    }
    draw_coastlines(canvas, &proj);
    if let Some(cables) = scene.cables {
        draw_cables(canvas, &proj, cables);
    }
    draw_route(canvas, &proj, scene.segments, scene.flight);
    draw_hops(canvas, &proj, scene.session);

    if scene.flight.is_flying {
        if let Some((x, y)) = scene.flight.packet_position.and_then(|p| proj.project(p)) {
            canvas.plot_disc(x, y, 2, LAYER_PACKET, colors::PACKET);
        }
    }

    canvas.blit(term);
    draw_status(term, scene);
}

/// Plot the great circle from `a` to `b`, one sample per half degree
fn draw_arc(canvas: &mut BrailleCanvas, proj: &Projection, a: GeoPoint, b: GeoPoint, layer: u8, color: Color) {
    let steps = (angular_distance(a, b).to_degrees() * 2.0).ceil().clamp(1.0, 720.0) as usize;
    for i in 0..=steps {
        let p = interpolate(a, b, i as f64 / steps as f64);
        if let Some((x, y)) = proj.project(p) {
            canvas.plot(x, y, layer, color);
        }
    }
}

fn draw_graticule(canvas: &mut BrailleCanvas, proj: &Projection) {
    for lat in (-60..=60).step_by(30) {
        for lng in (-180..180).step_by(2) {
            if let Some((x, y)) = proj.project(GeoPoint::new(lat as f64, lng as f64)) {
                canvas.plot(x, y, LAYER_GRATICULE, colors::GRATICULE);
            }
        }
    }
    for lng in (-180..180).step_by(30) {
        for lat in (-90..=90).step_by(2) {
            if let Some((x, y)) = proj.project(GeoPoint::new(lat as f64, lng as f64)) {
                canvas.plot(x, y, LAYER_GRATICULE, colors::GRATICULE);
            }
        }
    }
}

fn draw_coastlines(canvas: &mut BrailleCanvas, proj: &Projection) {
    for outline in COASTLINES {
        for pair in outline.windows(2) {
            let a = GeoPoint::new(pair[0].0, pair[0].1);
            let b = GeoPoint::new(pair[1].0, pair[1].1);
            draw_arc(canvas, proj, a, b, LAYER_LAND, Color::Grey);
        }
    }
}

fn draw_heatmap(canvas: &mut BrailleCanvas, proj: &Projection, points: &[HeatmapPoint]) {
    for point in points {
        if let Some((x, y)) = proj.project(GeoPoint::new(point.lat, point.lng)) {
            let color = colors::dim(colors::heatmap_color(point.weight), 0.7);
            canvas.plot_disc(x, y, 1, LAYER_HEATMAP, color);
        }
    }
}

fn draw_cables(canvas: &mut BrailleCanvas, proj: &Projection, cables: &[SubmarineCable]) {
    for cable in cables {
        let (layer, color) = if cable.is_highlighted {
            (LAYER_CABLE_HIGHLIGHT, colors::HIGHLIGHTED_CABLE)
        } else {
            let base = colors::parse_css_color(&cable.color).unwrap_or(colors::CABLE);
            (LAYER_CABLE, colors::dim(base, 0.6))
        };
        for pair in cable.coordinates.windows(2) {
            draw_arc(canvas, proj, pair[0], pair[1], layer, color);
        }
    }
}

fn draw_route(canvas: &mut BrailleCanvas, proj: &Projection, segments: &[FlightSegment], flight: &FlightState) {
    let faded = colors::dim(colors::ROUTE, 0.5);
    for segment in segments {
        draw_arc(canvas, proj, segment.start, segment.end, LAYER_ROUTE, faded);
    }

    if !flight.is_flying {
        return;
    }
    // Stretch already flown
    for (i, segment) in segments.iter().enumerate().take(flight.current_segment + 1) {
        let end = if i == flight.current_segment {
            interpolate(segment.start, segment.end, flight.segment_progress)
        } else {
            segment.end
        };
        draw_arc(canvas, proj, segment.start, end, LAYER_ROUTE, colors::ROUTE);
    }
}

fn draw_hops(canvas: &mut BrailleCanvas, proj: &Projection, session: &TraceSession) {
    if let Some((x, y)) = session.origin().and_then(|p| proj.project(p)) {
        canvas.plot_disc(x, y, 2, LAYER_ENDPOINT, colors::SOURCE);
    }

    for (i, hop) in session.hops().iter().enumerate() {
        let Some((x, y)) = hop.point().and_then(|p| proj.project(p)) else {
            continue;
        };
        let radius = if session.selected_hop_index == Some(i) { 2 } else { 1 };
        if hop.is_destination {
            canvas.plot_disc(x, y, 2, LAYER_ENDPOINT, colors::DESTINATION);
        } else {
            canvas.plot_disc(x, y, radius, LAYER_HOP, colors::latency_color(hop.avg_rtt));
        }
    }
}

// ============================================================================
// Text
// ============================================================================

fn draw_status(term: &mut Terminal, scene: &Scene) {
    let (cols, rows) = term.size();
    let session = scene.session;
    let flight = scene.flight;

    let target = if session.target.is_empty() { "-" } else { session.target.as_str() };
    let header = format!(" hopglobe  {}  ", target);
    term.set_str(0, 0, &header, Some(Color::White), true);
    term.set_str(
        header.chars().count() as i32,
        0,
        &format!("[{}] {} hops", session.status.as_str(), session.hops().len()),
        Some(colors::status_color(session.status)),
        false,
    );

    if cols >= 80 {
        draw_hop_list(term, session, cols - 30, rows.saturating_sub(3));
    }

    let mut footer = format!(" {}", flight.phase().as_str());
    if !scene.segments.is_empty() {
        footer.push_str(&format!(
            "  segment {}/{}  {:.1}x",
            (flight.current_segment + 1).min(scene.segments.len()),
            scene.segments.len(),
            flight.speed
        ));
    }
    let bottom = rows as i32 - 1;
    term.set_str(0, bottom, &footer, Some(Color::Grey), false);

    if let Some(hop) = flight.current_hop_index.and_then(|i| session.hops().get(i)) {
        let x = footer.chars().count() as i32 + 2;
        let label = format!("hop {} {} {:.1}ms", hop.hop_number, hop.label(), hop.avg_rtt);
        term.set_str(x, bottom, &label, Some(colors::latency_color(hop.avg_rtt)), false);
        if let Some(dc) = datacenter::detect_hop(hop) {
            let color = colors::parse_css_color(dc.color);
            term.set_str(x + label.chars().count() as i32 + 1, bottom, &format!("[{}]", dc.provider), color, false);
        }
    }

    let hint = "? help";
    term.set_str(cols as i32 - hint.len() as i32 - 1, bottom, hint, Some(Color::DarkGrey), false);

    if let Some(error) = &session.error {
        term.set_str(0, 1, &format!(" error: {}", error), Some(Color::Red), false);
    }
}

/// Newest hops along the right edge
fn draw_hop_list(term: &mut Terminal, session: &TraceSession, x: u16, max_rows: u16) {
    let hops = session.hops();
    let visible = (max_rows as usize).saturating_sub(1);
    let skip = hops.len().saturating_sub(visible);

    for (row, (i, hop)) in hops.iter().enumerate().skip(skip).enumerate() {
        let marker = if session.selected_hop_index == Some(i) { '>' } else { ' ' };
        let line = if hop.is_timeout {
            format!("{}{:>2} *", marker, hop.hop_number)
        } else {
            let mut label = hop.label();
            label.truncate(16);
            format!("{}{:>2} {:<16} {:>6.1}ms", marker, hop.hop_number, label, hop.avg_rtt)
        };
        let color = if hop.is_timeout {
            Color::DarkGrey
        } else {
            colors::latency_color(hop.avg_rtt)
        };
        term.set_str(x as i32, row as i32 + 2, &line, Some(color), false);
    }
}

// ============================================================================
// Flat heatmap
// ============================================================================

/// Equirectangular heatmap over lat 80..-80 with coastlines and the origin
pub fn draw_heatmap_map(term: &mut Terminal, points: &[HeatmapPoint], origin: GeoPoint) {
    let (cols, rows) = term.size();
    if cols == 0 || rows == 0 {
        return;
    }
    let to_cell = |p: GeoPoint| -> (i32, i32) {
        let x = (p.lng + 180.0) / 360.0 * cols as f64;
        let y = (80.0 - p.lat) / 160.0 * rows as f64;
        (x.floor() as i32, y.floor() as i32)
    };

    for cy in 0..rows {
        let lat = 80.0 - (cy as f64 + 0.5) / rows as f64 * 160.0;
        for cx in 0..cols {
            let lng = -180.0 + (cx as f64 + 0.5) / cols as f64 * 360.0;
            let nearest = points.iter().min_by(|a, b| {
                let da = (a.lat - lat).powi(2) + (a.lng - lng).powi(2);
                let db = (b.lat - lat).powi(2) + (b.lng - lng).powi(2);
                da.total_cmp(&db)
            });
            if let Some(p) = nearest {
                term.set(cx as i32, cy as i32, '░', Some(colors::heatmap_color(p.weight)), false);
            }
        }
    }

    for outline in COASTLINES {
        for pair in outline.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            // Edges across the antimeridian would smear over the whole map
            if (a.1 - b.1).abs() > 180.0 {
                continue;
            }
            for t in 0..=20 {
                let f = t as f64 / 20.0;
                let p = GeoPoint::new(a.0 + (b.0 - a.0) * f, a.1 + (b.1 - a.1) * f);
                let (x, y) = to_cell(p);
                let color = term.get(x.max(0) as u16, y.max(0) as u16).and_then(|c| c.fg);
                term.set(x, y, '▓', color, false);
            }
        }
    }

    let (ox, oy) = to_cell(origin);
    term.set(ox, oy, '◉', Some(colors::SOURCE), true);
}
