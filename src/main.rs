use clap::{Parser, Subcommand};
use hopglobe::cable_source::CableSource;
use hopglobe::cables::{classify_region, highlight_for_session};
use hopglobe::config::{CablesConfig, FeedConfig, FlyConfig, HeatmapConfig, RouteConfig};
use hopglobe::datacenter;
use hopglobe::fly::{self, load_session};
use hopglobe::geo::{haversine_km, GeoPoint};
use hopglobe::heatmap::{estimate_latency_ms, generate, MIN_GRID_STEP};
use hopglobe::logging::{self, LogTarget};
use hopglobe::mock::select_route;
use hopglobe::net_geo::GeoResolver;
use hopglobe::path::build_flight_path;
use hopglobe::settings::Settings;
use hopglobe::terminal::Terminal;
use hopglobe::trace::TraceStatus;
use hopglobe::{globe, HopGlobeError, Result};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

const DEFAULT_TARGET: &str = "example.com";

#[derive(Parser)]
#[command(name = "hopglobe")]
#[command(version)]
#[command(about = "Traceroute flights over a terminal globe", long_about = None)]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: <config dir>/hopglobe/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch a packet fly the route on an interactive globe
    Fly {
        /// Trace target (simulated unless --hops is given)
        #[arg(short = 'T', long, default_value = DEFAULT_TARGET)]
        target: String,

        /// JSON-lines hop feed to replay
        #[arg(long)]
        hops: Option<PathBuf>,

        /// Flight speed multiplier
        #[arg(short, long)]
        speed: Option<f64>,

        /// Seconds per frame
        #[arg(short, long)]
        time: Option<f32>,

        /// Start without the latency heatmap
        #[arg(long)]
        no_heatmap: bool,

        /// Skip loading submarine cables
        #[arg(long)]
        no_cables: bool,

        /// Random seed for the simulated trace
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the hops and flight segments of a trace
    Route {
        #[arg(short = 'T', long, default_value = DEFAULT_TARGET)]
        target: String,

        #[arg(long)]
        hops: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the latency heatmap around an origin
    Heatmap {
        #[arg(long, allow_hyphen_values = true, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lng: Option<f64>,

        /// Use the simulated trace's origin for this target
        #[arg(short = 'T', long, conflicts_with = "lat")]
        target: Option<String>,

        /// Grid spacing in degrees
        #[arg(long)]
        step: Option<f64>,

        /// Tab-separated lat, lng, weight, latency instead of a map
        #[arg(long)]
        raw: bool,
    },

    /// List submarine cables that plausibly carry the route
    Cables {
        #[arg(short = 'T', long, default_value = DEFAULT_TARGET)]
        target: String,

        #[arg(long)]
        hops: Option<PathBuf>,

        #[arg(long)]
        seed: Option<u64>,

        /// Local cable GeoJSON instead of the download
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("hopglobe: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let interactive = matches!(cli.command, Commands::Fly { .. });
    if interactive {
        if let Some(path) = logging::default_log_path() {
            logging::init(cli.verbose, LogTarget::File(path))?;
        }
    } else {
        logging::init(cli.verbose, LogTarget::Stderr)?;
    }

    let settings = Settings::load(cli.config.as_deref());
    let geoip_db = settings.geo.geoip_db.clone();

    match cli.command {
        Commands::Fly {
            target,
            hops,
            speed,
            time,
            no_heatmap,
            no_cables,
            seed,
        } => {
            let cables_enabled = settings.cables.enabled && !no_cables;
            let config = FlyConfig {
                feed: FeedConfig {
                    target,
                    hops_file: hops,
                    seed,
                },
                speed: speed.unwrap_or(settings.flight.speed),
                frame_time: time.unwrap_or(settings.flight.frame_time),
                heatmap: settings.heatmap.enabled && !no_heatmap,
                grid_step: settings.heatmap.grid_step,
                cables: cables_enabled.then(|| settings.cables.clone()),
                geoip_db,
                auto_start: true,
            };
            fly::run(config)?;
        }
        Commands::Route { target, hops, seed } => {
            let config = RouteConfig {
                feed: FeedConfig {
                    target,
                    hops_file: hops,
                    seed,
                },
                geoip_db,
            };
            print_route(&config)?;
        }
        Commands::Heatmap {
            lat,
            lng,
            target,
            step,
            raw,
        } => {
            let origin = match (lat, lng) {
                (Some(lat), Some(lng)) => GeoPoint::new(lat, lng),
                (None, None) => select_route(target.as_deref().unwrap_or(DEFAULT_TARGET))
                    .source()
                    .point(),
                _ => {
                    return Err(HopGlobeError::InvalidArgument(
                        "--lat and --lng go together".to_string(),
                    ))
                }
            };
            if !(-90.0..=90.0).contains(&origin.lat) || !(-180.0..=180.0).contains(&origin.lng) {
                return Err(HopGlobeError::InvalidArgument(format!(
                    "origin {}, {} is off the globe",
                    origin.lat, origin.lng
                )));
            }
            let (width, height) = crossterm::terminal::size().unwrap_or((100, 30));
            let config = HeatmapConfig {
                lat: origin.lat,
                lng: origin.lng,
                grid_step: step.unwrap_or(settings.heatmap.grid_step),
                width,
                height: height.saturating_sub(1).max(1),
                raw,
            };
            print_heatmap(&config)?;
        }
        Commands::Cables {
            target,
            hops,
            seed,
            file,
        } => {
            let mut cables = settings.cables.clone();
            if file.is_some() {
                cables.file = file;
            }
            let config = CablesConfig {
                feed: FeedConfig {
                    target,
                    hops_file: hops,
                    seed,
                },
                cables,
                geoip_db,
            };
            print_cables(&config)?;
        }
    }

    Ok(())
}

fn print_route(config: &RouteConfig) -> Result<()> {
    let mut resolver = GeoResolver::new(config.geoip_db.as_deref());
    let session = load_session(&config.feed, &mut resolver)?;
    let mut out = io::stdout().lock();

    let origin = session
        .source
        .as_ref()
        .map_or_else(|| "unknown origin".to_string(), |s| s.label());
    writeln!(
        out,
        "Trace to {} from {} ({}, {} hops)",
        session.target,
        origin,
        session.status.as_str(),
        session.hops().len()
    )?;

    for hop in session.hops() {
        if hop.is_timeout {
            writeln!(out, "{:>3}  *", hop.hop_number)?;
            continue;
        }
        let place = hop.location.as_ref().map_or_else(|| "-".to_string(), |l| l.label());
        let provider = datacenter::detect_hop(hop)
            .map(|dc| format!("  [{}]", dc.provider))
            .unwrap_or_default();
        writeln!(
            out,
            "{:>3}  {:<16} {:<40} {:<22} {:>7.1} ms{}",
            hop.hop_number,
            hop.ip_address,
            hop.hostname.as_deref().unwrap_or("-"),
            place,
            hop.avg_rtt,
            provider
        )?;
    }

    let segments = build_flight_path(session.hops(), session.origin());
    writeln!(out)?;
    writeln!(out, "{} flight segments", segments.len())?;
    let mut total_km = 0.0;
    for (i, seg) in segments.iter().enumerate() {
        let km = haversine_km(seg.start, seg.end);
        total_km += km;
        writeln!(
            out,
            "{:>3}  ({:>8.3}, {:>9.3}) -> ({:>8.3}, {:>9.3})  {:>8.0} km  hop {}",
            i + 1,
            seg.start.lat,
            seg.start.lng,
            seg.end.lat,
            seg.end.lng,
            km,
            seg.hop_index + 1
        )?;
    }
    writeln!(out, "total {:.0} km", total_km)?;
    Ok(())
}

fn print_heatmap(config: &HeatmapConfig) -> Result<()> {
    let origin = GeoPoint::new(config.lat, config.lng);
    let points = generate(origin, config.grid_step);
    if points.is_empty() {
        return Err(HopGlobeError::InvalidArgument(format!(
            "grid step must be at least {}, got {}",
            MIN_GRID_STEP,
            config.grid_step
        )));
    }

    let mut out = io::stdout().lock();
    if config.raw {
        for p in &points {
            let latency = estimate_latency_ms(haversine_km(origin, GeoPoint::new(p.lat, p.lng)));
            writeln!(out, "{}\t{}\t{:.4}\t{:.1}", p.lat, p.lng, p.weight, latency)?;
        }
        return Ok(());
    }

    let mut term = Terminal::offscreen(config.width, config.height);
    globe::draw_heatmap_map(&mut term, &points, origin);
    term.write_ansi(&mut out)?;
    Ok(())
}

fn print_cables(config: &CablesConfig) -> Result<()> {
    let mut resolver = GeoResolver::new(config.geoip_db.as_deref());
    let session = load_session(&config.feed, &mut resolver)?;
    let cables = CableSource::new(&config.cables).load()?;
    let mut out = io::stdout().lock();

    if session.status != TraceStatus::Completed {
        writeln!(out, "Trace did not complete ({}); nothing to match", session.status.as_str())?;
        return Ok(());
    }

    let points = session.route_points();
    let region = |p: Option<&GeoPoint>| {
        p.and_then(|p| classify_region(*p))
            .map_or("unclassified", |r| r.name())
    };
    writeln!(
        out,
        "Route {} -> {}",
        region(points.first()),
        region(points.last())
    )?;

    let highlighted: Vec<_> = highlight_for_session(&cables, &session)
        .into_iter()
        .filter(|c| c.is_highlighted)
        .collect();
    writeln!(out, "{} of {} cables on route", highlighted.len(), cables.len())?;
    for cable in &highlighted {
        writeln!(out, "  {:<28} {}", cable.id, cable.name)?;
    }
    Ok(())
}
