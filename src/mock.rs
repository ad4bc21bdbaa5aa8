//! Simulated traceroutes
//!
//! Two canned routes stand in for the probing process when no hop feed is
//! given. Hops are released on a timer so the globe fills in as a real trace
//! would.

use crate::geo::GeoLocation;
use crate::trace::{Hop, TraceCompleted, TraceEvent, TraceHop, TraceStarted};
use rand::prelude::*;
use std::collections::VecDeque;
use std::time::Duration;

/// Delay between consecutive hops, in milliseconds
const HOP_DELAY_MS: std::ops::Range<u64> = 150..400;
/// RTT jitter as a fraction of the base value
const RTT_JITTER: f64 = 0.15;
const MIN_RTT_JITTER_MS: f64 = 0.5;
const RTT_SAMPLES: usize = 3;

struct Place {
    city: &'static str,
    region: Option<&'static str>,
    country: &'static str,
    country_code: &'static str,
    lat: f64,
    lng: f64,
}

impl Place {
    fn location(&self) -> GeoLocation {
        GeoLocation {
            latitude: self.lat,
            longitude: self.lng,
            city: Some(self.city.to_string()),
            region: self.region.map(str::to_string),
            country: Some(self.country.to_string()),
            country_code: Some(self.country_code.to_string()),
            ..Default::default()
        }
    }
}

struct MockHop {
    ip: &'static str,
    hostname: &'static str,
    place: &'static Place,
    base_rtt: f64,
}

pub struct MockRoute {
    pub name: &'static str,
    source: &'static Place,
    destination: &'static Place,
    hops: &'static [MockHop],
}

const SAN_FRANCISCO: Place = Place {
    city: "San Francisco",
    region: Some("California"),
    country: "United States",
    country_code: "US",
    lat: 37.7749,
    lng: -122.4194,
};
const SAN_JOSE: Place = Place {
    city: "San Jose",
    region: None,
    country: "United States",
    country_code: "US",
    lat: 37.3382,
    lng: -121.8863,
};
const LOS_ANGELES: Place = Place {
    city: "Los Angeles",
    region: None,
    country: "United States",
    country_code: "US",
    lat: 34.0522,
    lng: -118.2437,
};
const HONOLULU: Place = Place {
    city: "Honolulu",
    region: None,
    country: "United States",
    country_code: "US",
    lat: 21.3069,
    lng: -157.8583,
};
const TOKYO: Place = Place {
    city: "Tokyo",
    region: None,
    country: "Japan",
    country_code: "JP",
    lat: 35.6762,
    lng: 139.6503,
};
const NEW_YORK: Place = Place {
    city: "New York",
    region: Some("New York"),
    country: "United States",
    country_code: "US",
    lat: 40.7128,
    lng: -74.0060,
};
const STAMFORD: Place = Place {
    city: "Stamford",
    region: None,
    country: "United States",
    country_code: "US",
    lat: 41.0534,
    lng: -73.5387,
};
const LONDON: Place = Place {
    city: "London",
    region: None,
    country: "United Kingdom",
    country_code: "GB",
    lat: 51.5074,
    lng: -0.1278,
};

pub static SF_TO_TOKYO: MockRoute = MockRoute {
    name: "SF to Tokyo",
    source: &SAN_FRANCISCO,
    destination: &TOKYO,
    hops: &[
        MockHop { ip: "192.168.1.1", hostname: "router.local", place: &SAN_FRANCISCO, base_rtt: 1.0 },
        MockHop { ip: "67.59.231.1", hostname: "gw.sfca.comcast.net", place: &SAN_FRANCISCO, base_rtt: 5.0 },
        MockHop { ip: "4.68.127.73", hostname: "ae-2.r21.snjsca04.us.bb.gin.ntt.net", place: &SAN_JOSE, base_rtt: 8.0 },
        MockHop { ip: "129.250.2.138", hostname: "ae-5.r24.snjsca04.us.bb.gin.ntt.net", place: &SAN_JOSE, base_rtt: 10.0 },
        MockHop { ip: "129.250.3.172", hostname: "ae-1.r25.lsanca07.us.bb.gin.ntt.net", place: &LOS_ANGELES, base_rtt: 20.0 },
        MockHop { ip: "129.250.6.98", hostname: "ae-3.r02.lsanca07.us.bb.gin.ntt.net", place: &LOS_ANGELES, base_rtt: 25.0 },
        MockHop { ip: "129.250.2.129", hostname: "ae-0.r30.osakjp02.jp.bb.gin.ntt.net", place: &HONOLULU, base_rtt: 65.0 },
        MockHop { ip: "129.250.4.14", hostname: "ae-1.r02.tokyjp05.jp.bb.gin.ntt.net", place: &TOKYO, base_rtt: 110.0 },
        MockHop { ip: "61.213.162.85", hostname: "ae-1.a02.tokyjp05.jp.ra.gin.ntt.net", place: &TOKYO, base_rtt: 115.0 },
        MockHop { ip: "210.152.135.178", hostname: "tokyo.jp", place: &TOKYO, base_rtt: 120.0 },
    ],
};

pub static NYC_TO_LONDON: MockRoute = MockRoute {
    name: "NYC to London",
    source: &NEW_YORK,
    destination: &LONDON,
    hops: &[
        MockHop { ip: "192.168.1.1", hostname: "router.local", place: &NEW_YORK, base_rtt: 1.0 },
        MockHop { ip: "68.85.103.109", hostname: "gw.nyc.verizon.net", place: &NEW_YORK, base_rtt: 5.0 },
        MockHop { ip: "154.54.30.185", hostname: "ae-6.r21.nycmny01.us.bb.gin.ntt.net", place: &NEW_YORK, base_rtt: 8.0 },
        MockHop { ip: "154.54.42.97", hostname: "ae-2.r24.stfrct01.us.bb.gin.ntt.net", place: &STAMFORD, base_rtt: 12.0 },
        MockHop { ip: "154.54.58.185", hostname: "ae-3.r20.londen12.uk.bb.gin.ntt.net", place: &LONDON, base_rtt: 70.0 },
        MockHop { ip: "130.117.1.78", hostname: "ae-1.r02.londen12.uk.bb.gin.ntt.net", place: &LONDON, base_rtt: 72.0 },
        MockHop { ip: "185.50.220.4", hostname: "london.uk", place: &LONDON, base_rtt: 75.0 },
    ],
};

/// London-bound targets get the transatlantic route, everything else goes to Tokyo.
pub fn select_route(target: &str) -> &'static MockRoute {
    let target = target.to_lowercase();
    if target.contains("london") || target.contains(".uk") {
        &NYC_TO_LONDON
    } else {
        &SF_TO_TOKYO
    }
}

impl MockRoute {
    pub fn source(&self) -> GeoLocation {
        self.source.location()
    }

    pub fn destination(&self) -> GeoLocation {
        self.destination.location()
    }

    pub fn hop_count(&self) -> usize {
        self.hops.len()
    }

    /// Materialize the route's hops with jittered RTTs
    pub fn hops<R: Rng>(&self, rng: &mut R, timestamp: i64) -> Vec<Hop> {
        let last = self.hops.len().saturating_sub(1);
        self.hops
            .iter()
            .enumerate()
            .map(|(i, mock)| {
                let rtt = rtt_samples(mock.base_rtt, rng);
                let avg_rtt = rtt.iter().sum::<f64>() / rtt.len() as f64;
                Hop {
                    hop_number: i as u32 + 1,
                    ip_address: mock.ip.to_string(),
                    hostname: Some(mock.hostname.to_string()),
                    rtt,
                    avg_rtt,
                    location: Some(mock.place.location()),
                    is_timeout: false,
                    is_destination: i == last,
                    timestamp,
                }
            })
            .collect()
    }
}

fn rtt_samples<R: Rng>(base: f64, rng: &mut R) -> Vec<f64> {
    let jitter = (base * RTT_JITTER).max(MIN_RTT_JITTER_MS);
    (0..RTT_SAMPLES)
        .map(|_| base + rng.gen_range(-1.0..=1.0) * jitter)
        .collect()
}

// ============================================================================
// Event feed
// ============================================================================

/// Trace events released as time passes.
///
/// Each entry carries the elapsed time at which it becomes due.
pub struct EventFeed {
    pending: VecDeque<(Duration, TraceEvent)>,
}

impl EventFeed {
    /// Everything due immediately (a recorded hop file)
    pub fn immediate(events: Vec<TraceEvent>) -> Self {
        Self {
            pending: events.into_iter().map(|e| (Duration::ZERO, e)).collect(),
        }
    }

    /// Simulated trace toward `target`: start, one hop every 150-400 ms, then completion.
    pub fn simulate<R: Rng>(target: &str, rng: &mut R) -> Self {
        let route = select_route(target);
        let session_id = format!("{:016x}", rng.gen::<u64>());
        let now = chrono::Utc::now().timestamp_millis();

        let mut pending = VecDeque::with_capacity(route.hop_count() + 2);
        pending.push_back((
            Duration::ZERO,
            TraceEvent::Started(TraceStarted {
                session_id: session_id.clone(),
                target: target.to_string(),
                source: Some(route.source()),
                timestamp: now,
            }),
        ));

        let hops = route.hops(rng, now);
        let total_hops = hops.len() as u32;
        let mut due = Duration::ZERO;
        for (i, mut hop) in hops.into_iter().enumerate() {
            if i > 0 {
                due += Duration::from_millis(rng.gen_range(HOP_DELAY_MS));
            }
            hop.timestamp = now + due.as_millis() as i64;
            pending.push_back((
                due,
                TraceEvent::Hop(TraceHop {
                    session_id: session_id.clone(),
                    hop,
                }),
            ));
        }

        pending.push_back((
            due,
            TraceEvent::Completed(TraceCompleted {
                session_id,
                total_hops,
                timestamp: now + due.as_millis() as i64,
            }),
        ));

        Self { pending }
    }

    /// Pop every event due at or before `elapsed`
    pub fn due(&mut self, elapsed: Duration) -> Vec<TraceEvent> {
        let mut ready = Vec::new();
        while self.pending.front().is_some_and(|(at, _)| *at <= elapsed) {
            if let Some((_, event)) = self.pending.pop_front() {
                ready.push(event);
            }
        }
        ready
    }

    /// Drain the feed regardless of timing
    pub fn drain(&mut self) -> Vec<TraceEvent> {
        self.pending.drain(..).map(|(_, e)| e).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::{TraceSession, TraceStatus};

    #[test]
    fn route_selection() {
        assert_eq!(select_route("www.bbc.co.uk").name, "NYC to London");
        assert_eq!(select_route("London-gateway").name, "NYC to London");
        assert_eq!(select_route("example.jp").name, "SF to Tokyo");
        assert_eq!(select_route("").name, "SF to Tokyo");
    }

    #[test]
    fn hops_have_jittered_rtt() {
        let mut rng = StdRng::seed_from_u64(7);
        let hops = SF_TO_TOKYO.hops(&mut rng, 0);
        assert_eq!(hops.len(), 10);
        for (i, hop) in hops.iter().enumerate() {
            let base = SF_TO_TOKYO.hops[i].base_rtt;
            let jitter = (base * RTT_JITTER).max(MIN_RTT_JITTER_MS);
            assert_eq!(hop.rtt.len(), 3);
            for sample in &hop.rtt {
                assert!((sample - base).abs() <= jitter + 1e-9);
            }
            let mean = hop.rtt.iter().sum::<f64>() / 3.0;
            assert!((hop.avg_rtt - mean).abs() < 1e-9);
            assert_eq!(hop.hop_number, i as u32 + 1);
        }
        assert!(hops.last().unwrap().is_destination);
        assert_eq!(hops.iter().filter(|h| h.is_destination).count(), 1);
    }

    #[test]
    fn destination_matches_last_hop() {
        let mut rng = StdRng::seed_from_u64(1);
        let hops = NYC_TO_LONDON.hops(&mut rng, 0);
        let last = hops.last().unwrap().location.clone().unwrap();
        assert_eq!(last.point(), NYC_TO_LONDON.destination().point());
        assert_eq!(NYC_TO_LONDON.source().city.as_deref(), Some("New York"));
    }

    #[test]
    fn simulated_feed_is_paced() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut feed = EventFeed::simulate("tokyo.jp", &mut rng);

        let first = feed.due(Duration::ZERO);
        assert_eq!(first.len(), 2, "start and the first hop are immediate");
        assert!(matches!(first[0], TraceEvent::Started(_)));

        // Next hop is at least 150 ms away
        assert!(feed.due(Duration::from_millis(149)).is_empty());

        let mut session = TraceSession::new();
        for event in first.into_iter().chain(feed.due(Duration::from_secs(10))) {
            session.apply(event);
        }
        assert!(feed.is_empty());
        assert_eq!(session.status, TraceStatus::Completed);
        assert_eq!(session.hops().len(), 10);
        assert_eq!(session.total_hops, Some(10));
    }

    #[test]
    fn immediate_feed_drains_at_once() {
        let mut rng = StdRng::seed_from_u64(3);
        let events = EventFeed::simulate("x.uk", &mut rng).drain();
        assert_eq!(events.len(), 7 + 2);
        let mut feed = EventFeed::immediate(events);
        assert_eq!(feed.due(Duration::ZERO).len(), 9);
        assert!(feed.is_empty());
    }
}
