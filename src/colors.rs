use crate::trace::TraceStatus;
use crossterm::style::Color;

pub const SOURCE: Color = rgb(0x22, 0xc5, 0x5e);        // Green
pub const DESTINATION: Color = rgb(0x8b, 0x5c, 0xf6);   // Purple
pub const HIGHLIGHTED_CABLE: Color = rgb(0x00, 0xff, 0xff);
pub const PACKET: Color = Color::White;
pub const ROUTE: Color = rgb(0x38, 0xbd, 0xf8);
pub const GRATICULE: Color = Color::DarkGrey;
pub const CABLE: Color = rgb(0x00, 0x64, 0xb4);

/// Latency buckets, upper bounds in ms
const LATENCY_BUCKETS: [(f64, Color); 4] = [
    (50.0, rgb(0x22, 0xc5, 0x5e)),    // Green
    (100.0, rgb(0x84, 0xcc, 0x16)),   // Lime
    (150.0, rgb(0xea, 0xb3, 0x08)),   // Yellow
    (200.0, rgb(0xf9, 0x73, 0x16)),   // Orange
];
const LATENCY_WORST: Color = rgb(0xef, 0x44, 0x44);   // Red

pub const fn rgb(r: u8, g: u8, b: u8) -> Color {
    Color::Rgb { r, g, b }
}

/// Hop marker color for a round-trip time
pub fn latency_color(rtt_ms: f64) -> Color {
    LATENCY_BUCKETS
        .iter()
        .find(|(limit, _)| rtt_ms < *limit)
        .map_or(LATENCY_WORST, |&(_, color)| color)
}

/// Heatmap weight 0..1 from green (near) to red (far)
pub fn heatmap_color(weight: f64) -> Color {
    let w = weight.clamp(0.0, 1.0);
    rgb(
        (34.0 + 205.0 * w).round() as u8,
        (197.0 - 129.0 * w).round() as u8,
        (94.0 - 26.0 * w).round() as u8,
    )
}

pub fn status_color(status: TraceStatus) -> Color {
    match status {
        TraceStatus::Idle => Color::DarkGrey,
        TraceStatus::Running => Color::Cyan,
        TraceStatus::Completed => Color::Green,
        TraceStatus::Cancelled => Color::Yellow,
        TraceStatus::Error => Color::Red,
    }
}

/// Parse `#rrggbb`, `rgb(r, g, b)` or `rgba(r, g, b, a)`; alpha is dropped.
pub fn parse_css_color(css: &str) -> Option<Color> {
    let css = css.trim();
    if let Some(hex) = css.strip_prefix('#') {
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        return Some(rgb(channel(0)?, channel(2)?, channel(4)?));
    }

    let inner = css
        .strip_prefix("rgba(")
        .or_else(|| css.strip_prefix("rgb("))?
        .strip_suffix(')')?;
    let mut parts = inner.split(',').map(|p| p.trim().parse::<u8>().ok());
    Some(rgb(parts.next()??, parts.next()??, parts.next()??))
}

/// Dim a color toward black by `factor` (0 = black, 1 = unchanged)
pub fn dim(color: Color, factor: f64) -> Color {
    match color {
        Color::Rgb { r, g, b } => {
            let f = factor.clamp(0.0, 1.0);
            let scale = |c: u8| (c as f64 * f).round() as u8;
            rgb(scale(r), scale(g), scale(b))
        }
        other => other,
    }
}
