//! Error type for the collaborator boundaries (files, network, GeoIP, terminal).
//!
//! The geometry and animation engine never fails; only the code that talks to
//! the outside world returns these.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HopGlobeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] Box<ureq::Error>),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("GeoIP database error: {0}")]
    GeoIp(#[from] maxminddb::MaxMindDBError),

    /// Line-level failure while reading a hop feed
    #[error("bad trace event on line {line}: {source}")]
    TraceEvent {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<ureq::Error> for HopGlobeError {
    fn from(err: ureq::Error) -> Self {
        HopGlobeError::Http(Box::new(err))
    }
}

pub type Result<T> = std::result::Result<T, HopGlobeError>;
