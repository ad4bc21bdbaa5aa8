//! Flight path construction from the hop list

use crate::geo::GeoPoint;
use crate::trace::Hop;
use serde::Serialize;

/// One leg of the flight.
///
/// `hop_index` indexes the original hop list (timeouts included), not the
/// filtered list of located hops.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct FlightSegment {
    pub start: GeoPoint,
    pub end: GeoPoint,
    pub hop_index: usize,
}

/// Build the ordered flight legs for `hops`, starting at `origin` when known.
///
/// Hops without a location are skipped. Without an origin the flight starts at
/// the first located hop.
pub fn build_flight_path(hops: &[Hop], origin: Option<GeoPoint>) -> Vec<FlightSegment> {
    let located: Vec<(usize, GeoPoint)> = hops
        .iter()
        .enumerate()
        .filter_map(|(idx, hop)| hop.point().map(|p| (idx, p)))
        .collect();

    let Some(&(first_idx, first_point)) = located.first() else {
        return Vec::new();
    };

    let mut segments = Vec::with_capacity(located.len());
    if let Some(origin) = origin {
        segments.push(FlightSegment {
            start: origin,
            end: first_point,
            hop_index: first_idx,
        });
    }

    segments.extend(located.windows(2).map(|pair| FlightSegment {
        start: pair[0].1,
        end: pair[1].1,
        hop_index: pair[1].0,
    }));

    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLocation;

    fn hop(n: u32, loc: Option<(f64, f64)>, dest: bool) -> Hop {
        let mut h = Hop::timeout(n);
        if let Some((lat, lng)) = loc {
            h.ip_address = format!("203.0.113.{}", n);
            h.location = Some(GeoLocation::at(lat, lng));
            h.is_timeout = false;
        }
        h.is_destination = dest;
        h
    }

    const ORIGIN: GeoPoint = GeoPoint::new(37.77, -122.42);

    #[test]
    fn empty_inputs_give_no_segments() {
        assert!(build_flight_path(&[], Some(ORIGIN)).is_empty());
        let timeouts = vec![hop(1, None, false), hop(2, None, false)];
        assert!(build_flight_path(&timeouts, Some(ORIGIN)).is_empty());
    }

    #[test]
    fn skipped_hops_keep_original_indices() {
        let hops = vec![
            hop(1, Some((10.0, 10.0)), false),
            hop(2, None, false),
            hop(3, Some((20.0, 20.0)), true),
        ];
        let segments = build_flight_path(&hops, Some(ORIGIN));
        assert_eq!(segments.len(), 2);

        assert_eq!(segments[0].start, ORIGIN);
        assert_eq!(segments[0].end, GeoPoint::new(10.0, 10.0));
        assert_eq!(segments[0].hop_index, 0);

        assert_eq!(segments[1].start, GeoPoint::new(10.0, 10.0));
        assert_eq!(segments[1].end, GeoPoint::new(20.0, 20.0));
        assert_eq!(segments[1].hop_index, 2);
    }

    #[test]
    fn without_origin_starts_at_first_hop() {
        let hops = vec![
            hop(1, None, false),
            hop(2, Some((1.0, 1.0)), false),
            hop(3, Some((2.0, 2.0)), false),
            hop(4, Some((3.0, 3.0)), true),
        ];
        let segments = build_flight_path(&hops, None);
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].hop_index, 2);
        assert_eq!(segments[1].hop_index, 3);
    }

    #[test]
    fn single_located_hop_without_origin_is_empty() {
        let hops = vec![hop(1, Some((1.0, 1.0)), true)];
        assert!(build_flight_path(&hops, None).is_empty());
        assert_eq!(build_flight_path(&hops, Some(ORIGIN)).len(), 1);
    }
}
