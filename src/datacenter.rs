//! Cloud provider detection for hop labels

use crate::trace::Hop;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DataCenter {
    pub provider: &'static str,
    pub color: &'static str,   // Brand color, #RRGGBB
}

struct Provider {
    name: &'static str,
    color: &'static str,
    patterns: &'static [&'static str],   // Lowercase, matched against org/ISP text
}

const AWS: (&str, &str) = ("AWS", "#FF9900");
const GOOGLE: (&str, &str) = ("Google Cloud", "#4285F4");
const AZURE: (&str, &str) = ("Azure", "#0078D4");
const CLOUDFLARE: (&str, &str) = ("Cloudflare", "#F38020");
const AKAMAI: (&str, &str) = ("Akamai", "#0096D6");
const FASTLY: (&str, &str) = ("Fastly", "#FF282D");
const DIGITALOCEAN: (&str, &str) = ("DigitalOcean", "#0080FF");
const LINODE: (&str, &str) = ("Linode", "#00A95C");

const PROVIDERS: &[Provider] = &[
    Provider { name: AWS.0, color: AWS.1, patterns: &["amazon", "aws", "ec2", "cloudfront"] },
    Provider { name: GOOGLE.0, color: GOOGLE.1, patterns: &["google"] },
    Provider { name: AZURE.0, color: AZURE.1, patterns: &["microsoft"] },
    Provider { name: CLOUDFLARE.0, color: CLOUDFLARE.1, patterns: &["cloudflare"] },
    Provider { name: AKAMAI.0, color: AKAMAI.1, patterns: &["akamai"] },
    Provider { name: FASTLY.0, color: FASTLY.1, patterns: &["fastly"] },
    Provider { name: DIGITALOCEAN.0, color: DIGITALOCEAN.1, patterns: &["digitalocean"] },
    Provider { name: LINODE.0, color: LINODE.1, patterns: &["linode", "akamai connected cloud"] },
    Provider { name: "Vultr", color: "#007BFC", patterns: &["vultr", "choopa"] },
    Provider { name: "OVH", color: "#000E9C", patterns: &["ovh"] },
    Provider { name: "Hetzner", color: "#D50C2D", patterns: &["hetzner"] },
];

/// Reverse-DNS fragments, checked in order when org/ISP text gives nothing
const HOSTNAME_PATTERNS: &[(&str, (&str, &str))] = &[
    ("amazonaws.com", AWS),
    ("cloudfront.net", AWS),
    ("googleusercontent.com", GOOGLE),
    ("1e100.net", GOOGLE),
    ("google.com", GOOGLE),
    ("cloudapp.azure", AZURE),
    ("azure.com", AZURE),
    ("cloudflare.com", CLOUDFLARE),
    ("akamaitechnologies.com", AKAMAI),
    ("akamai.net", AKAMAI),
    ("fastly.net", FASTLY),
    ("digitalocean.com", DIGITALOCEAN),
    ("linode.com", LINODE),
];

/// Identify a cloud provider from org/ISP text, falling back to the hostname.
pub fn detect(org: &str, isp: &str, hostname: Option<&str>) -> Option<DataCenter> {
    let combined = format!("{} {}", org, isp).to_lowercase();
    let by_org = PROVIDERS
        .iter()
        .find(|p| p.patterns.iter().any(|pat| combined.contains(pat)))
        .map(|p| DataCenter {
            provider: p.name,
            color: p.color,
        });
    if by_org.is_some() {
        return by_org;
    }

    let host = hostname?.to_lowercase();
    HOSTNAME_PATTERNS
        .iter()
        .find(|(pattern, _)| host.contains(pattern))
        .map(|&(_, (provider, color))| DataCenter { provider, color })
}

/// Provider for a hop, using the org/ISP carried on its location if any.
pub fn detect_hop(hop: &Hop) -> Option<DataCenter> {
    let (org, isp) = hop
        .location
        .as_ref()
        .map(|l| (l.org.as_deref().unwrap_or(""), l.isp.as_deref().unwrap_or("")))
        .unwrap_or(("", ""));
    detect(org, isp, hop.hostname.as_deref())
}
