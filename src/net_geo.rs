//! Hop geolocation
//!
//! Resolves router IPs to coordinates with a MaxMind GeoLite2 City database.
//! Private and reserved addresses are never looked up.

use crate::error::Result;
use crate::geo::GeoLocation;
use crate::trace::{Hop, TraceEvent};
use maxminddb::{geoip2, Reader};
use std::collections::{BTreeMap, HashMap};
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

// ============================================================================
// IP Cache
// ============================================================================

/// Cache for IP -> location lookups, misses included
struct IpCache {
    cache: HashMap<IpAddr, Option<GeoLocation>>,
    max_size: usize,
}

impl IpCache {
    fn new(max_size: usize) -> Self {
        Self {
            cache: HashMap::with_capacity(max_size),
            max_size,
        }
    }

    fn get_or_insert<F>(&mut self, ip: IpAddr, lookup_fn: F) -> Option<GeoLocation>
    where
        F: FnOnce(IpAddr) -> Option<GeoLocation>,
    {
        if let Some(cached) = self.cache.get(&ip) {
            return cached.clone();
        }

        // Evict half the cache if at capacity
        if self.cache.len() >= self.max_size {
            let to_remove: Vec<_> = self.cache.keys().take(self.max_size / 2).cloned().collect();
            for key in to_remove {
                self.cache.remove(&key);
            }
        }

        let result = lookup_fn(ip);
        self.cache.insert(ip, result.clone());
        result
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.cache.len()
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Looks up hop locations in a GeoLite2 database when one is available
pub struct GeoResolver {
    reader: Option<Reader<Vec<u8>>>,
    cache: IpCache,
}

impl GeoResolver {
    /// Open the first database found; without one every lookup misses.
    pub fn new(db_path: Option<&Path>) -> Self {
        let reader = find_database(db_path).and_then(|path| match Self::open(&path) {
            Ok(reader) => {
                info!(path = %path.display(), "GeoIP database loaded");
                Some(reader)
            }
            Err(e) => {
                debug!(error = %e, "GeoIP database unusable");
                None
            }
        });

        Self {
            reader,
            cache: IpCache::new(1024),
        }
    }

    /// A resolver that never finds anything
    pub fn disabled() -> Self {
        Self {
            reader: None,
            cache: IpCache::new(64),
        }
    }

    fn open(path: &Path) -> Result<Reader<Vec<u8>>> {
        Ok(Reader::open_readfile(path)?)
    }

    /// Returns true if a GeoIP database is loaded
    pub fn has_database(&self) -> bool {
        self.reader.is_some()
    }

    pub fn locate(&mut self, ip: &str) -> Option<GeoLocation> {
        let addr = parse_public_ip(ip)?;
        let reader = self.reader.as_ref();
        self.cache.get_or_insert(addr, |addr| reader.and_then(|r| lookup(r, addr)))
    }

    /// Fill in the location of a hop that arrived without one
    pub fn resolve(&mut self, mut hop: Hop) -> Hop {
        if hop.location.is_none() && !hop.is_timeout {
            hop.location = self.locate(&hop.ip_address);
        }
        hop
    }

    /// Resolve the hop carried by `event`; other events pass through
    pub fn resolve_event(&mut self, event: TraceEvent) -> TraceEvent {
        match event {
            TraceEvent::Hop(mut hop_event) => {
                hop_event.hop = self.resolve(hop_event.hop);
                TraceEvent::Hop(hop_event)
            }
            other => other,
        }
    }
}

fn lookup(reader: &Reader<Vec<u8>>, ip: IpAddr) -> Option<GeoLocation> {
    let city: geoip2::City = reader.lookup(ip).ok()?;
    let location = city.location.as_ref()?;
    Some(GeoLocation {
        latitude: location.latitude?,
        longitude: location.longitude?,
        city: city.city.as_ref().and_then(|c| english(&c.names)),
        region: city
            .subdivisions
            .as_ref()
            .and_then(|subs| subs.first())
            .and_then(|s| english(&s.names)),
        country: city.country.as_ref().and_then(|c| english(&c.names)),
        country_code: city
            .country
            .as_ref()
            .and_then(|c| c.iso_code)
            .map(str::to_string),
        ..Default::default()
    })
}

fn english(names: &Option<BTreeMap<&str, &str>>) -> Option<String> {
    names.as_ref().and_then(|n| n.get("en")).map(|s| s.to_string())
}

fn find_database(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    let candidates = [
        dirs::config_dir().map(|p| p.join("hopglobe/GeoLite2-City.mmdb")),
        Some(PathBuf::from("/usr/share/GeoIP/GeoLite2-City.mmdb")),
        Some(PathBuf::from("/var/lib/GeoIP/GeoLite2-City.mmdb")),
        Some(PathBuf::from("./GeoLite2-City.mmdb")),
    ];

    candidates.into_iter().flatten().find(|p| p.exists())
}

/// Parse `ip`, rejecting anything that cannot be geolocated
/// (private, loopback, link-local, unspecified, `*`).
fn parse_public_ip(ip: &str) -> Option<IpAddr> {
    let addr: IpAddr = ip.trim().parse().ok()?;
    let reserved = match addr {
        IpAddr::V4(v4) => {
            v4.is_private() || v4.is_loopback() || v4.is_link_local() || v4.is_unspecified()
        }
        IpAddr::V6(v6) => {
            let seg0 = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (seg0 & 0xffc0) == 0xfe80   // link-local
                || (seg0 & 0xfe00) == 0xfc00   // unique local
        }
    };
    (!reserved).then_some(addr)
}
