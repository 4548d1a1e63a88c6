//! Target normalization, address classification and resolution.
//!
//! Raw targets arrive in whatever shape a user pasted them:
//! - Plain literals: `192.168.1.1`, `2001:db8::1`
//! - URLs: `https://example.com/login`, `http://[::1]/`
//! - Hostnames: `example.com`
//!
//! [`resolve`] turns any of these into a [`ScanTarget`] holding a literal
//! address whose family is fixed for the rest of the scan.

use crate::error::{CoreResult, ScanError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;
use trust_dns_resolver::config::{LookupIpStrategy, ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;

/// Shape of an address literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressKind {
    Ipv4,
    Ipv6,
    Unknown,
}

impl AddressKind {
    /// Socket family for this kind, if it has one.
    pub fn family(self) -> Option<AddressFamily> {
        match self {
            Self::Ipv4 => Some(AddressFamily::V4),
            Self::Ipv6 => Some(AddressFamily::V6),
            Self::Unknown => None,
        }
    }
}

/// Socket address family used for every connection of a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressFamily {
    V4,
    V6,
}

impl AddressFamily {
    /// Family of a parsed address.
    pub fn of(ip: &IpAddr) -> Self {
        match ip {
            IpAddr::V4(_) => Self::V4,
            IpAddr::V6(_) => Self::V6,
        }
    }
}

impl fmt::Display for AddressFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4 => write!(f, "IPv4"),
            Self::V6 => write!(f, "IPv6"),
        }
    }
}

/// A target that has been resolved to an address literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScanTarget {
    /// The input exactly as supplied.
    pub original: String,
    /// The input after URL and bracket stripping.
    pub host: String,
    /// The address literal to scan.
    pub literal: String,
    /// Classification of `literal`.
    pub kind: AddressKind,
}

impl ScanTarget {
    fn new(original: &str, host: String, literal: String) -> Self {
        let kind = classify(&literal);
        Self {
            original: original.to_string(),
            host,
            literal,
            kind,
        }
    }

    /// Parse the literal into a socket address and its family.
    ///
    /// Fails with [`ScanError::InvalidAddress`] when the literal does not
    /// belong to either family.
    pub fn endpoint(&self) -> CoreResult<(IpAddr, AddressFamily)> {
        let family = self
            .kind
            .family()
            .ok_or_else(|| ScanError::InvalidAddress(self.literal.clone()))?;
        let ip: IpAddr = self
            .literal
            .parse()
            .map_err(|_| ScanError::InvalidAddress(self.literal.clone()))?;
        if AddressFamily::of(&ip) != family {
            return Err(ScanError::InvalidAddress(self.literal.clone()));
        }
        Ok((ip, family))
    }
}

impl From<IpAddr> for ScanTarget {
    fn from(ip: IpAddr) -> Self {
        let literal = ip.to_string();
        Self::new(&literal, literal.clone(), literal.clone())
    }
}

impl fmt::Display for ScanTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host == self.literal {
            write!(f, "{}", self.literal)
        } else {
            write!(f, "{} ({})", self.host, self.literal)
        }
    }
}

/// Strip URL scheme, path and IPv6 brackets from a raw target.
pub fn normalize(raw: &str) -> String {
    let mut s = raw.trim();

    for scheme in ["http://", "https://"] {
        if s.get(..scheme.len()).is_some_and(|p| p.eq_ignore_ascii_case(scheme)) {
            s = &s[scheme.len()..];
            break;
        }
    }

    let s = s.split('/').next().unwrap_or_default().trim();

    if let Some(inner) = s.strip_prefix('[') {
        // "[addr]" or "[addr]:port"
        return match inner.split_once(']') {
            Some((addr, _)) => addr.to_string(),
            None => inner.to_string(),
        };
    }

    // "host:port" has exactly one colon; anything with more is IPv6.
    match s.split_once(':') {
        Some((host, port)) if !port.contains(':') && port.chars().all(|c| c.is_ascii_digit()) => {
            host.to_string()
        }
        _ => s.to_string(),
    }
}

/// Classify a string as an IPv4 literal, an IPv6 literal, or neither.
pub fn classify(s: &str) -> AddressKind {
    if is_ipv4(s) {
        AddressKind::Ipv4
    } else if is_ipv6(s) {
        AddressKind::Ipv6
    } else {
        AddressKind::Unknown
    }
}

fn is_ipv4(s: &str) -> bool {
    let groups: Vec<&str> = s.split('.').collect();
    groups.len() == 4 && groups.iter().all(|g| is_octet(g))
}

fn is_octet(g: &str) -> bool {
    if g.is_empty() || g.len() > 3 || !g.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    // Zero-padded octets are octal on some stacks, so they're ambiguous.
    if g.len() > 1 && g.starts_with('0') {
        return false;
    }
    g.parse::<u16>().map_or(false, |v| v <= 255)
}

fn is_ipv6(s: &str) -> bool {
    if !s.contains(':') {
        return false;
    }

    match s.matches("::").count() {
        0 => {
            let groups: Vec<&str> = s.split(':').collect();
            groups.len() == 8 && groups.iter().all(|g| is_hextet(g))
        }
        1 => {
            let Some((head, tail)) = s.split_once("::") else {
                return false;
            };
            let mut count = 0;
            for side in [head, tail] {
                if side.is_empty() {
                    continue;
                }
                for group in side.split(':') {
                    if !is_hextet(group) {
                        return false;
                    }
                    count += 1;
                }
            }
            // "::" stands for at least one zero group.
            count <= 7
        }
        _ => false,
    }
}

fn is_hextet(g: &str) -> bool {
    (1..=4).contains(&g.len()) && g.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Hostname lookups, one call per address family.
#[async_trait]
pub trait HostLookup: Send + Sync {
    /// A records for `host`.
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, String>;

    /// AAAA records for `host`.
    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<Ipv6Addr>, String>;
}

/// DNS lookups through the system resolver configuration.
pub struct DnsLookup {
    v4: TokioAsyncResolver,
    v6: TokioAsyncResolver,
}

impl DnsLookup {
    /// Build resolvers from `/etc/resolv.conf` (or the platform
    /// equivalent), falling back to public defaults.
    pub fn from_system() -> Self {
        let (config, opts) = trust_dns_resolver::system_conf::read_system_conf()
            .unwrap_or_else(|e| {
                debug!(error = %e, "system resolver config unavailable, using defaults");
                (ResolverConfig::default(), ResolverOpts::default())
            });

        let mut v4_opts = opts.clone();
        v4_opts.ip_strategy = LookupIpStrategy::Ipv4Only;
        let mut v6_opts = opts;
        v6_opts.ip_strategy = LookupIpStrategy::Ipv6Only;

        Self {
            v4: TokioAsyncResolver::tokio(config.clone(), v4_opts),
            v6: TokioAsyncResolver::tokio(config, v6_opts),
        }
    }
}

#[async_trait]
impl HostLookup for DnsLookup {
    async fn lookup_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, String> {
        let response = self.v4.lookup_ip(host).await.map_err(|e| e.to_string())?;
        Ok(response
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V4(v4) => Some(v4),
                IpAddr::V6(_) => None,
            })
            .collect())
    }

    async fn lookup_ipv6(&self, host: &str) -> Result<Vec<Ipv6Addr>, String> {
        let response = self.v6.lookup_ip(host).await.map_err(|e| e.to_string())?;
        Ok(response
            .iter()
            .filter_map(|ip| match ip {
                IpAddr::V6(v6) => Some(v6),
                IpAddr::V4(_) => None,
            })
            .collect())
    }
}

/// `Some` when `raw` normalizes to an address literal, an error when it
/// normalizes to nothing, `None` when a lookup is needed.
fn resolve_literal(raw: &str) -> CoreResult<Option<ScanTarget>> {
    let host = normalize(raw);
    if host.is_empty() {
        return Err(ScanError::resolution(raw.trim(), "empty target"));
    }
    if classify(&host) == AddressKind::Unknown {
        return Ok(None);
    }
    Ok(Some(ScanTarget::new(raw, host.clone(), host)))
}

/// Resolve a raw target using the system DNS configuration.
///
/// Literals and empty input never touch the resolver.
pub async fn resolve(raw: &str) -> CoreResult<ScanTarget> {
    if let Some(target) = resolve_literal(raw)? {
        return Ok(target);
    }
    resolve_with(raw, &DnsLookup::from_system()).await
}

/// Resolve a raw target with an explicit lookup backend.
///
/// Literals are returned unchanged. Hostnames are looked up as IPv4 first;
/// only when that yields nothing is IPv6 tried.
pub async fn resolve_with<L>(raw: &str, lookup: &L) -> CoreResult<ScanTarget>
where
    L: HostLookup + ?Sized,
{
    if let Some(target) = resolve_literal(raw)? {
        return Ok(target);
    }
    let host = normalize(raw);

    let v4_failure = match lookup.lookup_ipv4(&host).await {
        Ok(addrs) => match addrs.first() {
            Some(ip) => {
                debug!(host = %host, ip = %ip, "resolved via A lookup");
                return Ok(ScanTarget::new(raw, host.clone(), ip.to_string()));
            }
            None => "no A records".to_string(),
        },
        Err(e) => e,
    };
    debug!(host = %host, reason = %v4_failure, "IPv4 lookup failed, trying IPv6");

    match lookup.lookup_ipv6(&host).await {
        Ok(addrs) => match addrs.first() {
            Some(ip) => {
                debug!(host = %host, ip = %ip, "resolved via AAAA lookup");
                Ok(ScanTarget::new(raw, host.clone(), ip.to_string()))
            }
            None => Err(ScanError::resolution(
                host,
                format!("{v4_failure}; no AAAA records"),
            )),
        },
        Err(e) => Err(ScanError::resolution(host, format!("{v4_failure}; {e}"))),
    }
}
