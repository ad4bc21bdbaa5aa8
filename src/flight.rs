//! Packet flight animation
//!
//! A single flight moves a packet marker along the cached flight segments,
//! dwelling briefly at each router. The machine is driven by frames delivered
//! from a `FrameScheduler`, or directly through `tick` with synthetic deltas.
//!
//! ```text
//! Idle --start--> Flying <--pause/resume--> Paused
//!                   |  ^
//!          last leg |  | reset (replay)
//!                   v  |
//!                 Complete          any --exit--> Idle
//! ```

use crate::geo::{camera_behind, interpolate, CameraPose, GeoPoint};
use crate::path::{build_flight_path, FlightSegment};
use crate::scheduler::{FrameHandle, FrameScheduler};
use crate::trace::Hop;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Time to fly one segment at 1x speed
pub const BASE_SEGMENT_DURATION_MS: f64 = 2000.0;
/// Dwell at each intermediate router at 1x speed
pub const HOP_PAUSE_MS: f64 = 500.0;
/// Chase camera altitude (globe radii)
pub const CAMERA_ALTITUDE: f64 = 0.5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlightPhase {
    Idle,
    Flying,
    Paused,
    Complete,
}

impl FlightPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlightPhase::Idle => "idle",
            FlightPhase::Flying => "flying",
            FlightPhase::Paused => "paused",
            FlightPhase::Complete => "complete",
        }
    }
}

/// Snapshot of the flight read by the renderer
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FlightState {
    pub is_flying: bool,
    pub current_segment: usize,
    pub segment_progress: f64,
    pub speed: f64,
    pub is_paused: bool,
    pub is_complete: bool,
    pub packet_position: Option<GeoPoint>,
    pub camera_position: Option<CameraPose>,
    pub current_hop_index: Option<usize>,
}

impl Default for FlightState {
    fn default() -> Self {
        Self {
            is_flying: false,
            current_segment: 0,
            segment_progress: 0.0,
            speed: 1.0,
            is_paused: false,
            is_complete: false,
            packet_position: None,
            camera_position: None,
            current_hop_index: None,
        }
    }
}

impl FlightState {
    pub fn phase(&self) -> FlightPhase {
        if !self.is_flying {
            FlightPhase::Idle
        } else if self.is_complete {
            FlightPhase::Complete
        } else if self.is_paused {
            FlightPhase::Paused
        } else {
            FlightPhase::Flying
        }
    }
}

pub struct FlightAnimation<S: FrameScheduler> {
    state: FlightState,
    segments: Arc<[FlightSegment]>,
    scheduler: S,
    pending: Option<FrameHandle>,
    last_timestamp: Option<f64>,
    hop_pause_ms: f64,
}

impl<S: FrameScheduler> FlightAnimation<S> {
    pub fn new(scheduler: S) -> Self {
        Self {
            state: FlightState::default(),
            segments: Arc::from(Vec::<FlightSegment>::new()),
            scheduler,
            pending: None,
            last_timestamp: None,
            hop_pause_ms: 0.0,
        }
    }

    pub fn state(&self) -> &FlightState {
        &self.state
    }

    pub fn phase(&self) -> FlightPhase {
        self.state.phase()
    }

    pub fn segments(&self) -> &[FlightSegment] {
        &self.segments
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut S {
        &mut self.scheduler
    }

    /// True while a frame is requested and not yet delivered or cancelled
    pub fn has_pending_frame(&self) -> bool {
        self.pending.is_some()
    }

    /// Swap in a new segment list wholesale.
    pub fn set_segments(&mut self, segments: Vec<FlightSegment>) {
        debug!(count = segments.len(), "flight segments replaced");
        self.segments = Arc::from(segments);
    }

    /// Rebuild the segments from the current hop list and origin.
    pub fn update_route(&mut self, hops: &[Hop], origin: Option<GeoPoint>) {
        self.set_segments(build_flight_path(hops, origin));
    }

    /// Begin a flight from the first segment. Does nothing without segments.
    pub fn start(&mut self) {
        if self.segments.is_empty() {
            debug!("start ignored: no flight segments");
            return;
        }
        self.begin();
        info!(segments = self.segments.len(), "flight started");
    }

    /// Back to the first segment and flying again; used to replay.
    pub fn reset(&mut self) {
        if self.segments.is_empty() {
            self.cancel_pending();
            self.state.is_flying = false;
            self.state.is_complete = false;
            self.state.packet_position = None;
            self.state.camera_position = None;
            return;
        }
        self.begin();
        info!("flight replay");
    }

    pub fn pause(&mut self) {
        if !self.state.is_flying || self.state.is_paused || self.state.is_complete {
            return;
        }
        self.state.is_paused = true;
        self.cancel_pending();
        debug!("flight paused");
    }

    pub fn resume(&mut self) {
        if !self.state.is_paused {
            return;
        }
        self.state.is_paused = false;
        // Time spent paused must not count as flight time
        self.last_timestamp = None;
        if self.is_running() {
            self.schedule();
        }
        debug!("flight resumed");
    }

    /// Stop everything and return to the idle defaults.
    pub fn exit(&mut self) {
        self.cancel_pending();
        self.state = FlightState::default();
        self.last_timestamp = None;
        self.hop_pause_ms = 0.0;
        info!("flight exited");
    }

    pub fn set_speed(&mut self, multiplier: f64) {
        if !(multiplier.is_finite() && multiplier > 0.0) {
            warn!(multiplier, "ignoring invalid flight speed");
            return;
        }
        self.state.speed = multiplier;
    }

    /// Deliver a frame requested earlier. Stale or cancelled handles are ignored.
    pub fn on_frame(&mut self, handle: FrameHandle, timestamp_ms: f64) {
        if self.pending != Some(handle) {
            return;
        }
        self.pending = None;

        let elapsed = match self.last_timestamp {
            Some(last) => (timestamp_ms - last).max(0.0),
            None => 0.0,
        };
        self.last_timestamp = Some(timestamp_ms);

        self.tick(elapsed);

        if self.is_running() {
            self.schedule();
        }
    }

    /// Advance the flight by `elapsed_ms` of wall time. Negative deltas count as
    /// zero; non-finite ones are dropped.
    pub fn tick(&mut self, elapsed_ms: f64) {
        if !self.is_running() || !elapsed_ms.is_finite() {
            return;
        }
        let elapsed_ms = elapsed_ms.max(0.0);

        // Hold our own reference so a route swap cannot change the list mid-tick
        let segments = Arc::clone(&self.segments);
        let speed = self.state.speed;

        if self.hop_pause_ms > 0.0 {
            self.hop_pause_ms -= elapsed_ms * speed;
            if self.hop_pause_ms > 0.0 {
                return;
            }
            self.hop_pause_ms = 0.0;
        }

        let segment_duration = BASE_SEGMENT_DURATION_MS / speed;
        let mut progress = self.state.segment_progress + elapsed_ms / segment_duration;
        let mut index = self.state.current_segment;

        if progress >= 1.0 {
            progress = 0.0;
            index += 1;
            if index >= segments.len() {
                self.finish(&segments);
                return;
            }
            self.hop_pause_ms = HOP_PAUSE_MS;
        }

        let Some(segment) = segments.get(index) else {
            self.finish(&segments);
            return;
        };

        self.state.current_segment = index;
        self.state.segment_progress = progress;
        self.place_packet(segment, progress);
    }

    fn begin(&mut self) {
        self.cancel_pending();
        let first = self.segments[0];

        self.state.is_flying = true;
        self.state.current_segment = 0;
        self.state.segment_progress = 0.0;
        self.state.is_paused = false;
        self.state.is_complete = false;
        self.place_packet(&first, 0.0);

        self.last_timestamp = None;
        self.hop_pause_ms = 0.0;
        self.schedule();
    }

    fn finish(&mut self, segments: &[FlightSegment]) {
        self.state.is_complete = true;
        if let Some(last) = segments.last() {
            self.state.current_segment = segments.len() - 1;
            self.state.segment_progress = 1.0;
            self.place_packet(last, 1.0);
        }
        self.hop_pause_ms = 0.0;
        self.cancel_pending();
        info!("flight complete");
    }

    fn place_packet(&mut self, segment: &FlightSegment, progress: f64) {
        let packet = interpolate(segment.start, segment.end, progress);
        self.state.packet_position = Some(packet);
        self.state.camera_position = Some(camera_behind(packet, segment.end, CAMERA_ALTITUDE));
        self.state.current_hop_index = Some(segment.hop_index);
    }

    fn is_running(&self) -> bool {
        self.state.is_flying && !self.state.is_paused && !self.state.is_complete
    }

    fn schedule(&mut self) {
        self.cancel_pending();
        self.pending = Some(self.scheduler.request_frame());
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
    }
}
