//! Trace session context and the hop-discovery feed
//!
//! The probing process emits `TraceEvent`s; a `TraceSession` folds them into the
//! ordered hop list that the path builder and cable matcher read.

use crate::error::{HopGlobeError, Result};
use crate::geo::{GeoLocation, GeoPoint};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use tracing::debug;

// ============================================================================
// Hop
// ============================================================================

/// One router discovered along the path
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hop {
    pub hop_number: u32,
    pub ip_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub rtt: Vec<f64>,
    #[serde(default)]
    pub avg_rtt: f64,
    #[serde(default)]
    pub location: Option<GeoLocation>,
    #[serde(default)]
    pub is_timeout: bool,
    #[serde(default)]
    pub is_destination: bool,
    #[serde(default)]
    pub timestamp: i64,
}

impl Hop {
    /// A hop that did not answer
    pub fn timeout(hop_number: u32) -> Self {
        Self {
            hop_number,
            ip_address: "*".to_string(),
            hostname: None,
            rtt: Vec::new(),
            avg_rtt: 0.0,
            location: None,
            is_timeout: true,
            is_destination: false,
            timestamp: 0,
        }
    }

    pub fn point(&self) -> Option<GeoPoint> {
        self.location.as_ref().map(GeoLocation::point)
    }

    /// Label for lists: city if known, otherwise hostname or IP
    pub fn label(&self) -> String {
        if let Some(city) = self.location.as_ref().and_then(|l| l.city.clone()) {
            return city;
        }
        self.hostname.clone().unwrap_or_else(|| self.ip_address.clone())
    }
}

// ============================================================================
// Events
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceStarted {
    pub session_id: String,
    pub target: String,
    pub source: Option<GeoLocation>,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceHop {
    pub session_id: String,
    pub hop: Hop,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceCompleted {
    pub session_id: String,
    pub total_hops: u32,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceCancelled {
    pub session_id: String,
    #[serde(default)]
    pub timestamp: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceFailed {
    pub session_id: String,
    pub error: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// One record of the hop-discovery feed
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum TraceEvent {
    Started(TraceStarted),
    Hop(TraceHop),
    Completed(TraceCompleted),
    Cancelled(TraceCancelled),
    Error(TraceFailed),
}

/// Read a JSON-lines hop feed. Blank lines are skipped.
pub fn read_events<R: BufRead>(reader: R) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event = serde_json::from_str(&line).map_err(|source| HopGlobeError::TraceEvent {
            line: idx + 1,
            source,
        })?;
        events.push(event);
    }
    Ok(events)
}

// ============================================================================
// Session
// ============================================================================

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TraceStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
    Error,
}

impl TraceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TraceStatus::Idle => "idle",
            TraceStatus::Running => "running",
            TraceStatus::Completed => "completed",
            TraceStatus::Cancelled => "cancelled",
            TraceStatus::Error => "error",
        }
    }
}

/// Externally owned session state: origin, hop list and selection.
///
/// Hops are only ever appended in arrival order.
#[derive(Clone, Debug, Default)]
pub struct TraceSession {
    pub id: String,
    pub target: String,
    pub status: TraceStatus,
    pub source: Option<GeoLocation>,
    hops: Vec<Hop>,
    pub selected_hop_index: Option<usize>,
    pub total_hops: Option<u32>,
    pub error: Option<String>,
}

impl TraceSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    pub fn origin(&self) -> Option<GeoPoint> {
        self.source.as_ref().map(GeoLocation::point)
    }

    /// Fold one feed event into the session. Returns true if the hop list changed.
    pub fn apply(&mut self, event: TraceEvent) -> bool {
        match event {
            TraceEvent::Started(started) => {
                if self.id == started.session_id {
                    return false;
                }
                debug!(session = %started.session_id, target = %started.target, "trace started");
                *self = TraceSession {
                    id: started.session_id,
                    target: started.target,
                    status: TraceStatus::Running,
                    source: started.source,
                    ..Default::default()
                };
                true
            }
            TraceEvent::Hop(TraceHop { session_id, hop }) => {
                if session_id != self.id {
                    return false;
                }
                self.add_hop(hop)
            }
            TraceEvent::Completed(done) if done.session_id == self.id => {
                self.status = TraceStatus::Completed;
                self.total_hops = Some(done.total_hops);
                false
            }
            TraceEvent::Cancelled(c) if c.session_id == self.id => {
                self.status = TraceStatus::Cancelled;
                false
            }
            TraceEvent::Error(e) if e.session_id == self.id => {
                self.status = TraceStatus::Error;
                self.error = Some(e.error);
                false
            }
            _ => false,
        }
    }

    /// Append a hop unless one with the same number already arrived.
    /// The new hop becomes the selected one.
    pub fn add_hop(&mut self, hop: Hop) -> bool {
        if self.hops.iter().any(|h| h.hop_number == hop.hop_number) {
            return false;
        }
        self.selected_hop_index = Some(self.hops.len());
        self.hops.push(hop);
        true
    }

    pub fn select_hop(&mut self, index: Option<usize>) {
        self.selected_hop_index = index.filter(|&i| i < self.hops.len());
    }

    /// Origin followed by every located hop, in order
    pub fn route_points(&self) -> Vec<GeoPoint> {
        self.origin()
            .into_iter()
            .chain(self.hops.iter().filter_map(Hop::point))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hop(n: u32, loc: Option<(f64, f64)>) -> Hop {
        Hop {
            hop_number: n,
            ip_address: format!("10.0.0.{}", n),
            hostname: None,
            rtt: vec![1.0],
            avg_rtt: 1.0,
            location: loc.map(|(lat, lng)| GeoLocation::at(lat, lng)),
            is_timeout: loc.is_none(),
            is_destination: false,
            timestamp: 0,
        }
    }

    fn started(id: &str) -> TraceEvent {
        TraceEvent::Started(TraceStarted {
            session_id: id.to_string(),
            target: "example.com".to_string(),
            source: Some(GeoLocation::at(37.0, -122.0)),
            timestamp: 0,
        })
    }

    #[test]
    fn apply_builds_session() {
        let mut session = TraceSession::new();
        assert!(session.apply(started("s1")));
        assert_eq!(session.status, TraceStatus::Running);

        assert!(session.apply(TraceEvent::Hop(TraceHop {
            session_id: "s1".into(),
            hop: hop(1, Some((1.0, 2.0))),
        })));
        assert_eq!(session.hops().len(), 1);
        assert_eq!(session.selected_hop_index, Some(0));

        session.apply(TraceEvent::Completed(TraceCompleted {
            session_id: "s1".into(),
            total_hops: 1,
            timestamp: 0,
        }));
        assert_eq!(session.status, TraceStatus::Completed);
        assert_eq!(session.total_hops, Some(1));
    }

    #[test]
    fn duplicate_start_and_hops_are_ignored() {
        let mut session = TraceSession::new();
        session.apply(started("s1"));
        session.add_hop(hop(1, None));
        assert!(!session.apply(started("s1")));
        assert_eq!(session.hops().len(), 1);
        assert!(!session.add_hop(hop(1, Some((0.0, 0.0)))));
        assert_eq!(session.hops().len(), 1);
    }

    #[test]
    fn events_for_other_sessions_are_ignored() {
        let mut session = TraceSession::new();
        session.apply(started("s1"));
        assert!(!session.apply(TraceEvent::Hop(TraceHop {
            session_id: "other".into(),
            hop: hop(1, None),
        })));
        session.apply(TraceEvent::Error(TraceFailed {
            session_id: "other".into(),
            error: "boom".into(),
            timestamp: 0,
        }));
        assert_eq!(session.status, TraceStatus::Running);
    }

    #[test]
    fn route_points_skip_unlocated_hops() {
        let mut session = TraceSession::new();
        session.apply(started("s1"));
        session.add_hop(hop(1, Some((1.0, 1.0))));
        session.add_hop(hop(2, None));
        session.add_hop(hop(3, Some((3.0, 3.0))));
        let points = session.route_points();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0], GeoPoint::new(37.0, -122.0));
        assert_eq!(points[2], GeoPoint::new(3.0, 3.0));
    }

    #[test]
    fn select_hop_rejects_out_of_range() {
        let mut session = TraceSession::new();
        session.add_hop(hop(1, None));
        session.select_hop(Some(5));
        assert_eq!(session.selected_hop_index, None);
        session.select_hop(Some(0));
        assert_eq!(session.selected_hop_index, Some(0));
    }

    #[test]
    fn read_events_parses_feed() {
        let feed = r#"{"type":"started","data":{"sessionId":"a","target":"t","source":{"latitude":1.0,"longitude":2.0},"timestamp":5}}

{"type":"hop","data":{"sessionId":"a","hop":{"hopNumber":1,"ipAddress":"8.8.8.8","rtt":[3.0],"avgRtt":3.0,"location":null,"isTimeout":false,"isDestination":true,"timestamp":6}}}
{"type":"completed","data":{"sessionId":"a","totalHops":1,"timestamp":7}}"#;
        let events = read_events(feed.as_bytes()).unwrap();
        assert_eq!(events.len(), 3);
        match &events[1] {
            TraceEvent::Hop(h) => {
                assert_eq!(h.hop.ip_address, "8.8.8.8");
                assert!(h.hop.is_destination);
                assert!(h.hop.location.is_none());
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    #[test]
    fn read_events_reports_line() {
        let feed = "{\"type\":\"cancelled\",\"data\":{\"sessionId\":\"a\"}}\nnot json\n";
        match read_events(feed.as_bytes()) {
            Err(HopGlobeError::TraceEvent { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected line error, got {:?}", other),
        }
    }
}
