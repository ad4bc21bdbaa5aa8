//! Drives the flight machine end to end over a simulated trace, the way the
//! interactive view does.

use hopglobe::flight::{FlightAnimation, FlightPhase, BASE_SEGMENT_DURATION_MS, HOP_PAUSE_MS};
use hopglobe::geo::GeoPoint;
use hopglobe::mock::{EventFeed, SF_TO_TOKYO};
use hopglobe::path::build_flight_path;
use hopglobe::scheduler::{FrameHandle, FramePump, FrameScheduler};
use hopglobe::trace::TraceSession;
use rand::prelude::*;

const FRAME_MS: f64 = 16.0;

fn completed_session(target: &str) -> TraceSession {
    let mut rng = StdRng::seed_from_u64(11);
    let mut session = TraceSession::new();
    for event in EventFeed::simulate(target, &mut rng).drain() {
        session.apply(event);
    }
    session
}

/// Deliver frames every 16 ms until the flight stops asking for them.
/// Returns the simulated time at which it finished.
fn fly_to_completion(animation: &mut FlightAnimation<FramePump>, limit_ms: f64) -> f64 {
    let mut now = 0.0;
    while let Some(handle) = animation.scheduler_mut().poll() {
        animation.on_frame(handle, now);

        let state = animation.state();
        assert!((0.0..=1.0).contains(&state.segment_progress));
        let packet = state.packet_position.expect("packet placed while flying");
        assert!(packet.lat.is_finite() && packet.lng.is_finite());
        assert!(state.camera_position.is_some());

        now += FRAME_MS;
        assert!(now < limit_ms, "flight did not finish");
    }
    now
}

#[test]
fn full_flight_over_simulated_trace() {
    let session = completed_session("tokyo.jp");
    let mut animation = FlightAnimation::new(FramePump::new());
    animation.update_route(session.hops(), session.origin());
    assert_eq!(animation.segments().len(), SF_TO_TOKYO.hop_count());

    animation.start();
    let finished = fly_to_completion(&mut animation, 60_000.0);

    let segments = animation.segments().len() as f64;
    let expected = segments * BASE_SEGMENT_DURATION_MS + (segments - 1.0) * HOP_PAUSE_MS;
    assert!(
        (expected - 100.0..=expected + 1000.0).contains(&finished),
        "finished at {} ms, expected about {} ms",
        finished,
        expected
    );

    let state = animation.state();
    assert_eq!(animation.phase(), FlightPhase::Complete);
    assert!(!animation.has_pending_frame());
    let tokyo = SF_TO_TOKYO.destination().point();
    let packet = state.packet_position.unwrap();
    assert!((packet.lat - tokyo.lat).abs() < 1e-6);
    assert!((packet.lng - tokyo.lng).abs() < 1e-6);
    assert_eq!(state.current_hop_index, Some(session.hops().len() - 1));
}

#[test]
fn doubled_speed_halves_flight_time() {
    let session = completed_session("london.uk");
    let mut normal = FlightAnimation::new(FramePump::new());
    normal.update_route(session.hops(), session.origin());
    normal.start();
    let normal_ms = fly_to_completion(&mut normal, 60_000.0);

    let mut fast = FlightAnimation::new(FramePump::new());
    fast.update_route(session.hops(), session.origin());
    fast.set_speed(2.0);
    fast.start();
    let fast_ms = fly_to_completion(&mut fast, 60_000.0);

    assert!((fast_ms * 2.0 - normal_ms).abs() < 500.0, "{} vs {}", fast_ms, normal_ms);
}

#[test]
fn route_growing_mid_flight_is_picked_up() {
    let session = completed_session("tokyo.jp");
    let hops = session.hops();

    let mut animation = FlightAnimation::new(FramePump::new());
    animation.update_route(&hops[..3], session.origin());
    animation.start();

    // Fly a little, then the rest of the hops arrive
    let mut now = 0.0;
    for _ in 0..10 {
        let handle = animation.scheduler_mut().poll().unwrap();
        animation.on_frame(handle, now);
        now += FRAME_MS;
    }
    animation.update_route(hops, session.origin());

    while let Some(handle) = animation.scheduler_mut().poll() {
        animation.on_frame(handle, now);
        now += FRAME_MS;
    }
    assert_eq!(animation.state().current_segment, hops.len() - 1);
    assert_eq!(animation.phase(), FlightPhase::Complete);
}

#[test]
fn path_skips_unlocated_hops() {
    let mut hops = completed_session("tokyo.jp").hops().to_vec();
    hops[3].location = None;
    hops[3].is_timeout = true;
    let mut session = TraceSession::new();
    for hop in hops {
        session.add_hop(hop);
    }

    let segments = build_flight_path(session.hops(), Some(GeoPoint::new(37.7749, -122.4194)));
    assert_eq!(segments.len(), 9);
    assert!(segments.iter().all(|s| s.hop_index != 3));
    assert_eq!(segments[3].hop_index, 4);
}

/// Scheduler that records what the machine asks of it
#[derive(Default)]
struct RecordingScheduler {
    next: u64,
    requested: Vec<FrameHandle>,
    cancelled: Vec<FrameHandle>,
}

impl FrameScheduler for RecordingScheduler {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        let handle = FrameHandle::new(self.next);
        self.requested.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        self.cancelled.push(handle);
    }
}

#[test]
fn pause_and_exit_cancel_outstanding_frames() {
    let session = completed_session("tokyo.jp");
    let mut animation = FlightAnimation::new(RecordingScheduler::default());
    animation.update_route(session.hops(), session.origin());

    animation.start();
    assert_eq!(animation.scheduler().requested.len(), 1);
    let first = animation.scheduler().requested[0];

    animation.pause();
    assert_eq!(animation.scheduler().cancelled, vec![first]);

    // A frame that was already in flight when we paused does nothing
    animation.on_frame(first, 100.0);
    assert_eq!(animation.phase(), FlightPhase::Paused);

    animation.resume();
    assert_eq!(animation.scheduler().requested.len(), 2);
    animation.exit();
    assert_eq!(animation.scheduler().cancelled.len(), 2);
    assert_eq!(animation.phase(), FlightPhase::Idle);

    // Exiting twice has no further effect
    animation.exit();
    assert_eq!(animation.scheduler().cancelled.len(), 2);
}
