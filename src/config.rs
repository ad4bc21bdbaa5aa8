use crate::error::Result;
use crate::mock::EventFeed;
use crate::settings::CableSettings;
use crate::trace::read_events;
use rand::prelude::*;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use tracing::info;

/// Where hop events come from: a recorded JSON-lines file or a simulated trace
#[derive(Clone, Debug)]
pub struct FeedConfig {
    pub target: String,
    pub hops_file: Option<PathBuf>,
    pub seed: Option<u64>,
}

impl FeedConfig {
    pub fn open(&self) -> Result<EventFeed> {
        if let Some(path) = &self.hops_file {
            info!(path = %path.display(), "replaying hop feed");
            let events = read_events(BufReader::new(File::open(path)?))?;
            return Ok(EventFeed::immediate(events));
        }

        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(EventFeed::simulate(&self.target, &mut rng))
    }
}

/// Configuration for the interactive globe
#[derive(Clone, Debug)]
pub struct FlyConfig {
    pub feed: FeedConfig,
    pub speed: f64,
    pub frame_time: f32,
    pub heatmap: bool,
    pub grid_step: f64,
    pub cables: Option<CableSettings>,   // None when the cable layer is off
    pub geoip_db: Option<PathBuf>,
    pub auto_start: bool,   // Fly as soon as the trace completes
}

/// Configuration for the printed route listing
#[derive(Clone, Debug)]
pub struct RouteConfig {
    pub feed: FeedConfig,
    pub geoip_db: Option<PathBuf>,
}

/// Configuration for the printed heatmap
#[derive(Clone, Debug)]
pub struct HeatmapConfig {
    pub lat: f64,
    pub lng: f64,
    pub grid_step: f64,
    pub width: u16,
    pub height: u16,
    pub raw: bool,   // Tab-separated grid instead of a colored map
}

/// Configuration for the cable listing
#[derive(Clone, Debug)]
pub struct CablesConfig {
    pub feed: FeedConfig,
    pub cables: CableSettings,
    pub geoip_db: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::TraceEvent;
    use std::io::Write;

    #[test]
    fn seeded_simulation_is_reproducible() {
        let config = FeedConfig {
            target: "example.com".into(),
            hops_file: None,
            seed: Some(9),
        };
        let a = config.open().unwrap().drain();
        let b = config.open().unwrap().drain();
        let rtts = |events: &[TraceEvent]| -> Vec<f64> {
            events
                .iter()
                .filter_map(|e| match e {
                    TraceEvent::Hop(h) => Some(h.hop.avg_rtt),
                    _ => None,
                })
                .collect()
        };
        assert_eq!(rtts(&a), rtts(&b));
        assert_eq!(rtts(&a).len(), 10);
    }

    #[test]
    fn hop_file_is_replayed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"type":"started","data":{{"sessionId":"f","target":"t","source":null}}}}"#
        )
        .unwrap();
        let config = FeedConfig {
            target: String::new(),
            hops_file: Some(file.path().to_path_buf()),
            seed: None,
        };
        let mut feed = config.open().unwrap();
        assert_eq!(feed.due(std::time::Duration::ZERO).len(), 1);
    }

    #[test]
    fn missing_hop_file_is_an_error() {
        let config = FeedConfig {
            target: String::new(),
            hops_file: Some(PathBuf::from("/nonexistent/hops.jsonl")),
            seed: None,
        };
        assert!(config.open().is_err());
    }
}
