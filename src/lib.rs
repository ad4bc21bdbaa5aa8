//! hopglobe: animated traceroute flights over a terminal globe
//!
//! The engine (`geo`, `path`, `flight`, `heatmap`, `cables`) is pure and never
//! fails. The remaining modules feed it hop data and draw what it produces.

pub mod cable_source;
pub mod cables;
pub mod colors;
pub mod config;
pub mod datacenter;
pub mod error;
pub mod flight;
pub mod fly;
pub mod geo;
pub mod globe;
pub mod heatmap;
pub mod help;
pub mod logging;
pub mod mock;
pub mod net_geo;
pub mod path;
pub mod scheduler;
pub mod settings;
pub mod terminal;
pub mod trace;

pub use error::{HopGlobeError, Result};
