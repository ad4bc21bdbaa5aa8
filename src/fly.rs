//! Interactive flight view
//!
//! Feeds trace events into the session as they come due, keeps the flight
//! machine's segments in step with the hop list, and drives its frames from
//! the render loop.

use crate::cable_source::CableSource;
use crate::cables::{highlight_for_session, SubmarineCable};
use crate::config::{FeedConfig, FlyConfig};
use crate::error::Result;
use crate::flight::{FlightAnimation, FlightPhase};
use crate::geo::GeoPoint;
use crate::globe::{self, Scene};
use crate::heatmap::{self, HeatmapPoint};
use crate::help::{render_help_overlay, FLY_HELP};
use crate::net_geo::GeoResolver;
use crate::scheduler::FramePump;
use crate::terminal::{BrailleCanvas, Terminal};
use crate::trace::{TraceEvent, TraceSession, TraceStatus};
use crossterm::event::KeyCode;
use std::time::Instant;
use tracing::{debug, info};

/// Speed multipliers on keys 1-5
const SPEED_KEYS: [f64; 5] = [0.5, 1.0, 2.0, 3.0, 5.0];

pub struct FlightView {
    session: TraceSession,
    animation: FlightAnimation<FramePump>,
    resolver: GeoResolver,
    all_cables: Vec<SubmarineCable>,
    cables: Vec<SubmarineCable>,   // Copy with route highlighting applied
    heatmap: Vec<HeatmapPoint>,
    heatmap_origin: Option<GeoPoint>,
    grid_step: f64,
    speed: f64,   // Survives exit(), which resets the machine to 1x
    auto_start: bool,
    pub show_heatmap: bool,
    pub show_cables: bool,
    pub show_help: bool,
}

impl FlightView {
    pub fn new(resolver: GeoResolver, cables: Vec<SubmarineCable>, config: &FlyConfig) -> Self {
        let mut animation = FlightAnimation::new(FramePump::new());
        animation.set_speed(config.speed);

        Self {
            speed: animation.state().speed,
            session: TraceSession::new(),
            animation,
            resolver,
            cables: cables.clone(),
            all_cables: cables,
            heatmap: Vec::new(),
            heatmap_origin: None,
            grid_step: config.grid_step,
            auto_start: config.auto_start,
            show_heatmap: config.heatmap,
            show_cables: config.cables.is_some(),
            show_help: false,
        }
    }

    pub fn session(&self) -> &TraceSession {
        &self.session
    }

    pub fn animation(&self) -> &FlightAnimation<FramePump> {
        &self.animation
    }

    pub fn heatmap(&self) -> &[HeatmapPoint] {
        &self.heatmap
    }

    pub fn cables(&self) -> &[SubmarineCable] {
        &self.cables
    }

    /// Fold newly due events into the session and react to what changed.
    pub fn ingest(&mut self, events: Vec<TraceEvent>) {
        if events.is_empty() {
            return;
        }
        let previous_id = self.session.id.clone();
        let previous_status = self.session.status;

        let mut hops_changed = false;
        for event in events {
            let event = self.resolver.resolve_event(event);
            hops_changed |= self.session.apply(event);
        }

        if self.session.id != previous_id {
            // A new trace replaced the old one
            self.animation.exit();
            self.animation.set_speed(self.speed);
        }
        if hops_changed {
            self.animation.update_route(self.session.hops(), self.session.origin());
        }

        let origin = self.session.origin();
        if origin != self.heatmap_origin {
            self.heatmap = origin
                .map(|o| heatmap::generate(o, self.grid_step))
                .unwrap_or_default();
            self.heatmap_origin = origin;
            debug!(points = self.heatmap.len(), "heatmap regenerated");
        }

        if self.session.status != previous_status {
            self.cables = highlight_for_session(&self.all_cables, &self.session);
            let lit = self.cables.iter().filter(|c| c.is_highlighted).count();
            info!(status = self.session.status.as_str(), highlighted = lit, "trace status changed");

            if self.auto_start && self.session.status == TraceStatus::Completed {
                self.animation.start();
            }
        }
    }

    /// Handle a key press. Returns true when the user asked to quit.
    pub fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.animation.exit();
                return true;
            }
            KeyCode::Enter | KeyCode::Char('f') => self.animation.start(),
            KeyCode::Char(' ') => match self.animation.phase() {
                FlightPhase::Flying => self.animation.pause(),
                FlightPhase::Paused => self.animation.resume(),
                _ => {}
            },
            KeyCode::Char('r') => self.animation.reset(),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.speed = SPEED_KEYS[idx];
                self.animation.set_speed(self.speed);
            }
            KeyCode::Char('h') => self.show_heatmap = !self.show_heatmap,
            KeyCode::Char('c') => self.show_cables = !self.show_cables,
            KeyCode::Char('?') => self.show_help = !self.show_help,
            KeyCode::Up | KeyCode::Char('k') => self.step_selection(-1),
            KeyCode::Down | KeyCode::Char('j') => self.step_selection(1),
            _ => {}
        }
        false
    }

    fn step_selection(&mut self, delta: isize) {
        let count = self.session.hops().len();
        if count == 0 {
            return;
        }
        let current = self.session.selected_hop_index.unwrap_or(count - 1) as isize;
        let next = (current + delta).clamp(0, count as isize - 1) as usize;
        self.session.select_hop(Some(next));
    }

    /// Deliver the pending animation frame, if one was requested
    pub fn frame(&mut self, now_ms: f64) {
        if let Some(handle) = self.animation.scheduler_mut().poll() {
            self.animation.on_frame(handle, now_ms);
        }
    }

    pub fn scene(&self) -> Scene<'_> {
        Scene {
            session: &self.session,
            flight: self.animation.state(),
            segments: self.animation.segments(),
            heatmap: self.show_heatmap.then_some(self.heatmap.as_slice()),
            cables: self.show_cables.then_some(self.cables.as_slice()),
        }
    }
}

/// Run the interactive globe until the user quits
pub fn run(config: FlyConfig) -> Result<()> {
    let cables = config
        .cables
        .as_ref()
        .map(|settings| CableSource::new(settings).cables_or_empty())
        .unwrap_or_default();
    let mut feed = config.feed.open()?;
    let resolver = GeoResolver::new(config.geoip_db.as_deref());
    let mut view = FlightView::new(resolver, cables, &config);

    let mut term = Terminal::interactive()?;
    let (width, height) = term.size();
    let mut canvas = BrailleCanvas::new(width, height);
    let clock = Instant::now();

    loop {
        let (width, height) = crossterm::terminal::size().unwrap_or(term.size());
        if term.resize(width, height) {
            term.clear_screen()?;
        }

        view.ingest(feed.due(clock.elapsed()));

        while let Some(code) = term.check_key()? {
            if view.handle_key(code) {
                return Ok(());
            }
        }

        view.frame(clock.elapsed().as_secs_f64() * 1000.0);

        globe::render(&mut term, &mut canvas, &view.scene());
        if view.show_help {
            render_help_overlay(&mut term, FLY_HELP);
        }
        term.present()?;
        term.sleep(config.frame_time);
    }
}

/// Play a feed to the end and return the resulting session
pub fn load_session(feed: &FeedConfig, resolver: &mut GeoResolver) -> Result<TraceSession> {
    let mut session = TraceSession::new();
    for event in feed.open()?.drain() {
        session.apply(resolver.resolve_event(event));
    }
    Ok(session)
}
