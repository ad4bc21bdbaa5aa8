//! Submarine cable matching for a traced route
//!
//! A coarse rule table: continents and ocean crossings are bounding boxes, and a
//! cable "plausibly carries" a route when it crosses an ocean that joins the
//! route's two continents and touches both of them. Boxes overlap; the first
//! continent in table order wins, so points near seams (far-eastern Russia, for
//! one) can land in a neighbouring continent.

use crate::geo::GeoPoint;
use crate::trace::{TraceSession, TraceStatus};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A cable route as drawn on the globe
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmarineCable {
    pub id: String,
    pub name: String,
    pub color: String,
    pub coordinates: Vec<GeoPoint>,
    #[serde(default)]
    pub is_highlighted: bool,
}

impl SubmarineCable {
    fn touches_box(&self, bbox: &BoundingBox) -> bool {
        self.coordinates.iter().any(|p| bbox.contains(*p))
    }

    fn touches_region(&self, region: Region) -> bool {
        self.coordinates.iter().any(|p| classify_region(*p) == Some(region))
    }
}

// ============================================================================
// Rule tables
// ============================================================================

#[derive(Clone, Copy, Debug)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// `min_lng > max_lng` marks a box that wraps across the antimeridian.
    pub fn contains(&self, p: GeoPoint) -> bool {
        if p.lat < self.min_lat || p.lat > self.max_lat {
            return false;
        }
        if self.min_lng > self.max_lng {
            p.lng >= self.min_lng || p.lng <= self.max_lng
        } else {
            p.lng >= self.min_lng && p.lng <= self.max_lng
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    Americas,
    Europe,
    Asia,
    Africa,
    Oceania,
}

impl Region {
    pub fn name(&self) -> &'static str {
        match self {
            Region::Americas => "americas",
            Region::Europe => "europe",
            Region::Asia => "asia",
            Region::Africa => "africa",
            Region::Oceania => "oceania",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ocean {
    Atlantic,
    Pacific,
    Indian,
}

pub struct OceanCrossing {
    pub ocean: Ocean,
    pub bbox: BoundingBox,
    pub connects: &'static [Region],
}

const fn bbox(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> BoundingBox {
    BoundingBox { min_lat, max_lat, min_lng, max_lng }
}

/// Continent boxes in match order
pub const REGIONS: [(Region, BoundingBox); 5] = [
    (Region::Americas, bbox(-60.0, 85.0, -170.0, -30.0)),
    (Region::Europe, bbox(35.0, 75.0, -10.0, 40.0)),
    (Region::Asia, bbox(0.0, 80.0, 60.0, 180.0)),
    (Region::Africa, bbox(-40.0, 40.0, -20.0, 55.0)),
    (Region::Oceania, bbox(-50.0, 0.0, 100.0, 180.0)),
];

pub const OCEANS: [OceanCrossing; 3] = [
    OceanCrossing {
        ocean: Ocean::Atlantic,
        bbox: bbox(-60.0, 80.0, -80.0, 0.0),
        connects: &[Region::Americas, Region::Europe, Region::Africa],
    },
    OceanCrossing {
        ocean: Ocean::Pacific,
        bbox: bbox(-60.0, 70.0, 100.0, -100.0),
        connects: &[Region::Americas, Region::Asia, Region::Oceania],
    },
    OceanCrossing {
        ocean: Ocean::Indian,
        bbox: bbox(-60.0, 30.0, 30.0, 120.0),
        connects: &[Region::Africa, Region::Asia, Region::Oceania],
    },
];

// ============================================================================
// Matching
// ============================================================================

pub fn classify_region(point: GeoPoint) -> Option<Region> {
    REGIONS
        .iter()
        .find(|(_, bbox)| bbox.contains(point))
        .map(|(region, _)| *region)
}

/// Cables that plausibly carry traffic between `start` and `end`.
///
/// Empty when either endpoint is unclassified or both share a continent.
/// Cables matching through more than one ocean appear once.
pub fn find_cables_between(
    start: GeoPoint,
    end: GeoPoint,
    cables: &[SubmarineCable],
) -> Vec<SubmarineCable> {
    let (Some(from), Some(to)) = (classify_region(start), classify_region(end)) else {
        return Vec::new();
    };
    if from == to {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    let mut matches = Vec::new();

    for crossing in OCEANS
        .iter()
        .filter(|c| c.connects.contains(&from) && c.connects.contains(&to))
    {
        for cable in cables {
            if seen.contains(cable.id.as_str()) {
                continue;
            }
            if cable.touches_box(&crossing.bbox)
                && cable.touches_region(from)
                && cable.touches_region(to)
            {
                seen.insert(cable.id.as_str());
                matches.push(cable.clone());
            }
        }
    }

    matches
}

/// Copy of `cables` with `is_highlighted` set for the cables on the route
/// from the first to the last of `route_points`.
pub fn highlight_cables_for_route(
    cables: &[SubmarineCable],
    route_points: &[GeoPoint],
) -> Vec<SubmarineCable> {
    let highlighted: HashSet<String> = match (route_points.first(), route_points.last()) {
        (Some(&start), Some(&end)) if route_points.len() >= 2 => {
            find_cables_between(start, end, cables)
                .into_iter()
                .map(|c| c.id)
                .collect()
        }
        _ => HashSet::new(),
    };

    cables
        .iter()
        .map(|cable| SubmarineCable {
            is_highlighted: highlighted.contains(&cable.id),
            ..cable.clone()
        })
        .collect()
}

/// Highlight for a session; nothing lights up until the trace has completed.
pub fn highlight_for_session(
    cables: &[SubmarineCable],
    session: &TraceSession,
) -> Vec<SubmarineCable> {
    if session.status != TraceStatus::Completed {
        return highlight_cables_for_route(cables, &[]);
    }
    highlight_cables_for_route(cables, &session.route_points())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoLocation;
    use crate::trace::{Hop, TraceCompleted, TraceEvent, TraceStarted};

    const TOKYO: GeoPoint = GeoPoint::new(35.7, 139.7);
    const SF: GeoPoint = GeoPoint::new(37.7, -122.4);
    const LONDON: GeoPoint = GeoPoint::new(51.5, -0.1);
    const NYC: GeoPoint = GeoPoint::new(40.7, -74.0);

    fn cable(id: &str, coords: &[(f64, f64)]) -> SubmarineCable {
        SubmarineCable {
            id: id.to_string(),
            name: id.to_uppercase(),
            color: "#3366ff".to_string(),
            coordinates: coords.iter().map(|&(lat, lng)| GeoPoint::new(lat, lng)).collect(),
            is_highlighted: false,
        }
    }

    fn transpacific() -> SubmarineCable {
        cable("pacific-1", &[(37.7, -122.4), (30.0, 170.0), (35.7, 139.7)])
    }

    fn transatlantic() -> SubmarineCable {
        cable("atlantic-1", &[(40.7, -74.0), (45.0, -40.0), (51.5, -0.1)])
    }

    fn european() -> SubmarineCable {
        cable("north-sea", &[(51.5, 1.0), (55.0, 5.0)])
    }

    #[test]
    fn classify_known_cities() {
        assert_eq!(classify_region(TOKYO), Some(Region::Asia));
        assert_eq!(classify_region(SF), Some(Region::Americas));
        assert_eq!(classify_region(LONDON), Some(Region::Europe));
        assert_eq!(classify_region(GeoPoint::new(-33.9, 151.2)), Some(Region::Oceania));
        assert_eq!(classify_region(GeoPoint::new(-1.3, 36.8)), Some(Region::Africa));
        assert_eq!(Region::Asia.name(), "asia");
    }

    #[test]
    fn classify_open_ocean_is_none() {
        assert_eq!(classify_region(GeoPoint::new(-70.0, 0.0)), None);
        assert_eq!(classify_region(GeoPoint::new(0.0, -25.0)), None);
    }

    #[test]
    fn first_declared_region_wins() {
        // Inside both the Europe and Africa boxes
        assert_eq!(classify_region(GeoPoint::new(37.0, 10.0)), Some(Region::Europe));
        // Inside both the Asia and Oceania boxes along the equator
        assert_eq!(classify_region(GeoPoint::new(0.0, 120.0)), Some(Region::Asia));
    }

    #[test]
    fn pacific_box_wraps_antimeridian() {
        let pacific = &OCEANS[1].bbox;
        assert!(pacific.contains(GeoPoint::new(0.0, 179.0)));
        assert!(pacific.contains(GeoPoint::new(0.0, -179.0)));
        assert!(pacific.contains(GeoPoint::new(0.0, -120.0)));
        assert!(!pacific.contains(GeoPoint::new(0.0, 0.0)));
        assert!(!pacific.contains(GeoPoint::new(80.0, 179.0)));
    }

    #[test]
    fn finds_transpacific_cable() {
        let cables = vec![transpacific(), transatlantic(), european()];
        let found = find_cables_between(SF, TOKYO, &cables);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, "pacific-1");
    }

    #[test]
    fn finds_transatlantic_cable() {
        let cables = vec![transpacific(), transatlantic(), european()];
        let found = find_cables_between(NYC, LONDON, &cables);
        assert_eq!(found.iter().map(|c| c.id.as_str()).collect::<Vec<_>>(), ["atlantic-1"]);
    }

    #[test]
    fn same_or_unknown_region_has_no_crossing() {
        let cables = vec![transpacific(), transatlantic()];
        assert!(find_cables_between(SF, NYC, &cables).is_empty());
        assert!(find_cables_between(GeoPoint::new(-70.0, 0.0), TOKYO, &cables).is_empty());
        assert!(find_cables_between(SF, TOKYO, &[]).is_empty());
    }

    #[test]
    fn matches_through_several_oceans_are_deduplicated() {
        // Asia to Oceania is joined by both the Pacific and the Indian ocean
        let both = cable("apac", &[(1.3, 103.8), (-10.0, 110.0), (-33.9, 151.2)]);
        let singapore = GeoPoint::new(1.3, 103.8);
        let sydney = GeoPoint::new(-33.9, 151.2);
        let found = find_cables_between(singapore, sydney, &[both]);
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn highlight_marks_only_matches() {
        let cables = vec![transpacific(), transatlantic(), european()];
        let route = [SF, GeoPoint::new(21.3, -157.9), TOKYO];
        let out = highlight_cables_for_route(&cables, &route);
        assert_eq!(out.len(), 3);
        for c in &out {
            assert_eq!(c.is_highlighted, c.id == "pacific-1", "{}", c.id);
        }
        // Input untouched
        assert!(cables.iter().all(|c| !c.is_highlighted));
    }

    #[test]
    fn highlight_needs_two_points() {
        let mut lit = transpacific();
        lit.is_highlighted = true;
        let out = highlight_cables_for_route(&[lit], &[SF]);
        assert!(!out[0].is_highlighted);
    }

    #[test]
    fn session_highlight_waits_for_completion() {
        let mut session = TraceSession::new();
        session.apply(TraceEvent::Started(TraceStarted {
            session_id: "s".into(),
            target: "tokyo.jp".into(),
            source: Some(GeoLocation::at(SF.lat, SF.lng)),
            timestamp: 0,
        }));
        let mut hop = Hop::timeout(1);
        hop.location = Some(GeoLocation::at(TOKYO.lat, TOKYO.lng));
        hop.is_timeout = false;
        session.add_hop(hop);

        let cables = vec![transpacific()];
        assert!(!highlight_for_session(&cables, &session)[0].is_highlighted);

        session.apply(TraceEvent::Completed(TraceCompleted {
            session_id: "s".into(),
            total_hops: 1,
            timestamp: 0,
        }));
        assert!(highlight_for_session(&cables, &session)[0].is_highlighted);
    }
}
