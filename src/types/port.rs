//! Port types, port specifications and the scan job set.
//!
//! The `Port` newtype ensures values are always valid port numbers (1-65535).
//! `PortRange` and `PortSpec` handle explicit port lists, and
//! [`build_port_set`] produces the canonical job list for a scan.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Curated set of well-known ports scanned by a non-deep scan.
pub const COMMON_PORTS: [u16; 23] = [
    21, 22, 23, 25, 53, 80, 110, 135, 137, 138, 139, 143, 161, 389, 443, 445, 3306, 3389, 5432,
    5900, 8080, 8443, 9200,
];

/// Upper bound of the deep scan range (1..=1024).
pub const DEEP_SCAN_MAX: u16 = 1024;

/// A validated network port number (1-65535).
///
/// A `Port` is also the unit of work handed to the worker pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Port(u16);

impl Port {
    /// Minimum valid port number.
    pub const MIN: u16 = 1;
    /// Maximum valid port number.
    pub const MAX: u16 = 65535;

    /// Create a new Port from a u16, returning None for port 0.
    #[inline]
    pub const fn new(port: u16) -> Option<Self> {
        if port >= Self::MIN {
            Some(Self(port))
        } else {
            None
        }
    }

    /// Get the raw port number.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self.0
    }
}

impl fmt::Display for Port {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl TryFrom<u16> for Port {
    type Error = PortError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(PortError::OutOfRange(value))
    }
}

impl From<Port> for u16 {
    fn from(port: Port) -> Self {
        port.0
    }
}

/// Error type for port parsing and validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PortError {
    #[error("port {0} is out of valid range (1-65535)")]
    OutOfRange(u16),
    #[error("invalid port number: {0}")]
    InvalidFormat(String),
    #[error("invalid port range: start ({0}) > end ({1})")]
    InvalidRange(u16, u16),
    #[error("empty port specification")]
    Empty,
}

/// A range of ports (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRange {
    start: Port,
    end: Port,
}

impl PortRange {
    /// Create a new port range.
    pub fn new(start: Port, end: Port) -> Result<Self, PortError> {
        if start.0 > end.0 {
            Err(PortError::InvalidRange(start.0, end.0))
        } else {
            Ok(Self { start, end })
        }
    }

    /// Create a range containing a single port.
    pub const fn single(port: Port) -> Self {
        Self {
            start: port,
            end: port,
        }
    }

    /// Get the number of ports in this range.
    pub const fn len(&self) -> usize {
        (self.end.0 - self.start.0) as usize + 1
    }

    /// A valid range always holds at least one port.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// Iterate over all ports in this range.
    pub fn iter(&self) -> impl Iterator<Item = Port> {
        (self.start.0..=self.end.0).map(Port)
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

/// A port specification made of one or more ranges.
///
/// Supports formats like:
/// - Single port: "80"
/// - Comma-separated: "80,443,8080"
/// - Range: "1-1000"
/// - Mixed: "22,80,443,8000-9000"
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortSpec {
    ranges: Vec<PortRange>,
}

impl PortSpec {
    /// Create an empty port specification.
    pub const fn new() -> Self {
        Self { ranges: Vec::new() }
    }

    /// Add a port range to the specification.
    pub fn add_range(&mut self, range: PortRange) {
        self.ranges.push(range);
    }

    /// Add a single port to the specification.
    pub fn add_port(&mut self, port: Port) {
        self.ranges.push(PortRange::single(port));
    }

    /// Append every range of `other`.
    pub fn extend(&mut self, other: &PortSpec) {
        self.ranges.extend(other.ranges.iter().copied());
    }

    /// Get all ports as a sorted, deduplicated vector.
    pub fn to_ports(&self) -> Vec<Port> {
        let mut ports: Vec<Port> = self.ranges.iter().flat_map(|r| r.iter()).collect();
        ports.sort_unstable();
        ports.dedup();
        ports
    }

    /// Get the total number of unique ports.
    pub fn count(&self) -> usize {
        self.to_ports().len()
    }

    /// The curated common-port set.
    pub fn common() -> Self {
        let mut spec = Self::new();
        for port in COMMON_PORTS.iter().filter_map(|&p| Port::new(p)) {
            spec.add_port(port);
        }
        spec
    }

    /// Every port in 1..=1024.
    pub fn deep() -> Self {
        let mut spec = Self::new();
        spec.add_range(PortRange {
            start: Port(1),
            end: Port(DEEP_SCAN_MAX),
        });
        spec
    }
}

impl FromStr for PortSpec {
    type Err = PortError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PortError::Empty);
        }

        let mut spec = Self::new();

        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start = parse_port(start)?;
                let end = parse_port(end)?;
                spec.add_range(PortRange::new(start, end)?);
            } else {
                spec.add_port(parse_port(part)?);
            }
        }

        Ok(spec)
    }
}

fn parse_port(s: &str) -> Result<Port, PortError> {
    let s = s.trim();
    let value: u16 = s
        .parse()
        .map_err(|_| PortError::InvalidFormat(s.to_string()))?;
    Port::try_from(value)
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.ranges.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", parts.join(","))
    }
}

/// Build the ordered job list for a scan.
///
/// `deep` selects the full 1..=1024 range, otherwise the curated
/// [`COMMON_PORTS`] set. The result is ascending and free of duplicates.
pub fn build_port_set(deep: bool) -> Vec<Port> {
    if deep {
        PortSpec::deep().to_ports()
    } else {
        PortSpec::common().to_ports()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_validation() {
        assert!(Port::new(0).is_none());
        assert!(Port::new(1).is_some());
        assert!(Port::new(80).is_some());
        assert!(Port::new(65535).is_some());
        assert!(Port::try_from(0).is_err());
    }

    #[test]
    fn test_port_serde_validates() {
        assert!(serde_json::from_str::<Port>("0").is_err());
        assert!(serde_json::from_str::<Port>("70000").is_err());
        assert_eq!(serde_json::from_str::<Port>("443").unwrap().as_u16(), 443);
        assert_eq!(serde_json::to_string(&Port::new(22).unwrap()).unwrap(), "22");
    }

    #[test]
    fn test_port_range() {
        let range = PortRange::new(Port::new(1).unwrap(), Port::new(100).unwrap()).unwrap();
        assert_eq!(range.len(), 100);
        assert!(PortRange::new(Port::new(10).unwrap(), Port::new(5).unwrap()).is_err());
    }

    #[test]
    fn test_port_spec_parsing() {
        let spec: PortSpec = "80".parse().unwrap();
        assert_eq!(spec.count(), 1);

        let spec: PortSpec = "1-100".parse().unwrap();
        assert_eq!(spec.count(), 100);

        let spec: PortSpec = "22, 80,443,8000-8010".parse().unwrap();
        assert_eq!(spec.count(), 14);
        assert_eq!(spec.to_string(), "22,80,443,8000-8010");
    }

    #[test]
    fn test_port_spec_rejects_garbage() {
        assert!(matches!("".parse::<PortSpec>(), Err(PortError::Empty)));
        assert!(matches!("0".parse::<PortSpec>(), Err(PortError::OutOfRange(0))));
        assert!(matches!("http".parse::<PortSpec>(), Err(PortError::InvalidFormat(_))));
        assert!(matches!("100-50".parse::<PortSpec>(), Err(PortError::InvalidRange(100, 50))));
        assert!("70000".parse::<PortSpec>().is_err());
    }

    #[test]
    fn test_port_spec_dedup() {
        let spec: PortSpec = "80,80,443,80".parse().unwrap();
        assert_eq!(spec.count(), 2);
    }

    #[test]
    fn test_common_job_count_matches_table() {
        let jobs = build_port_set(false);
        assert_eq!(jobs.len(), COMMON_PORTS.len());
        assert!(jobs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_deep_job_set_covers_well_known_range() {
        let jobs = build_port_set(true);
        assert_eq!(jobs.len(), 1024);
        assert_eq!(jobs.first().map(|p| p.as_u16()), Some(1));
        assert_eq!(jobs.last().map(|p| p.as_u16()), Some(1024));
    }

    #[test]
    fn test_extend_with_explicit_ports() {
        let mut spec = PortSpec::deep();
        spec.extend(&"80,9000".parse::<PortSpec>().unwrap());
        let ports = spec.to_ports();
        assert_eq!(ports.len(), 1025);
        assert_eq!(ports.last().map(|p| p.as_u16()), Some(9000));
    }
}
