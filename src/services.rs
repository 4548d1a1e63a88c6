//! Service classification based on well-known port numbers.
//!
//! Maps a port to a service label, a coarse severity tier and a short
//! remediation note. The tier is a static property of the port; banner
//! content is never consulted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// Advisory attached to ports that are not in the table.
pub const GENERIC_ADVISORY: &str =
    "General exposure risk detected. Close the port if the service is not required.";

/// Label attached to ports that are not in the table.
pub const UNKNOWN_SERVICE: &str = "Unknown";

/// Coarse risk tier used for display prioritization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All tiers, most severe first.
    pub const ALL: [Severity; 4] = [Self::Critical, Self::High, Self::Medium, Self::Low];
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
            Self::Critical => write!(f, "Critical"),
        }
    }
}

/// Classification of a single port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceInfo {
    pub label: &'static str,
    pub severity: Severity,
    pub remediation: &'static str,
}

impl ServiceInfo {
    const fn new(label: &'static str, severity: Severity, remediation: &'static str) -> Self {
        Self {
            label,
            severity,
            remediation,
        }
    }
}

const UNKNOWN: ServiceInfo = ServiceInfo::new(UNKNOWN_SERVICE, Severity::Low, GENERIC_ADVISORY);

/// Static map of well-known ports to their classification.
static PORT_SERVICES: LazyLock<HashMap<u16, ServiceInfo>> = LazyLock::new(|| {
    use Severity::*;

    let mut m = HashMap::new();

    m.insert(21, ServiceInfo::new("FTP", High, "FTP: Cleartext credentials. Switch to SFTP (port 22)."));
    m.insert(22, ServiceInfo::new("SSH", Medium, "SSH: Brute-force target. Use key authentication and Fail2Ban."));
    m.insert(23, ServiceInfo::new("Telnet", Critical, "Telnet: No encryption at all. Replace with SSH."));
    m.insert(25, ServiceInfo::new("SMTP", Low, "SMTP: Check for open relay and require STARTTLS."));
    m.insert(53, ServiceInfo::new("DNS", Low, "DNS: Disable recursion for external clients and restrict zone transfers."));
    m.insert(80, ServiceInfo::new("HTTP", Medium, "HTTP: Unencrypted. Redirect to 443 and enable HSTS."));
    m.insert(110, ServiceInfo::new("POP3", Low, "POP3: Cleartext mail credentials. Use POP3S (995)."));
    m.insert(135, ServiceInfo::new("MS RPC", Low, "MS RPC: Frequent worm vector. Block at the perimeter."));
    m.insert(137, ServiceInfo::new("NetBIOS", Low, "NetBIOS: Leaks host and domain names. Block externally."));
    m.insert(138, ServiceInfo::new("NetBIOS", Low, "NetBIOS: Leaks host and domain names. Block externally."));
    m.insert(139, ServiceInfo::new("NetBIOS/SMB", Low, "NetBIOS/SMB: Legacy file sharing. Block externally."));
    m.insert(143, ServiceInfo::new("IMAP", Low, "IMAP: Cleartext mail credentials. Use IMAPS (993)."));
    m.insert(161, ServiceInfo::new("SNMP", Low, "SNMP: Default community strings leak config. Use SNMPv3."));
    m.insert(162, ServiceInfo::new("SNMP Trap", Low, "SNMP Trap: Restrict to management hosts."));
    m.insert(389, ServiceInfo::new("LDAP", Low, "LDAP: Anonymous binds leak directory data. Use LDAPS."));
    m.insert(443, ServiceInfo::new("HTTPS", Low, "HTTPS: Check for weak TLS 1.0/1.1 protocols and ciphers."));
    m.insert(445, ServiceInfo::new("SMB", High, "SMB: EternalBlue target. Firewall port 445 and patch."));
    m.insert(1433, ServiceInfo::new("MSSQL", High, "MSSQL: Database exposed. Restrict to application hosts."));
    m.insert(3306, ServiceInfo::new("MySQL", Critical, "MySQL: Database exposed. Bind to localhost or firewall."));
    m.insert(3389, ServiceInfo::new("RDP", High, "RDP: High ransomware risk. Put behind a VPN or gateway."));
    m.insert(5432, ServiceInfo::new("PostgreSQL", Low, "PostgreSQL: Database exposed. Restrict pg_hba.conf and firewall."));
    m.insert(5900, ServiceInfo::new("VNC", Low, "VNC: Weak authentication. Tunnel over SSH or VPN."));
    m.insert(6379, ServiceInfo::new("Redis", Critical, "Redis: Often unauthenticated. Enable AUTH and bind to localhost."));
    m.insert(8080, ServiceInfo::new("HTTP Alternate", Low, "HTTP Alternate: Often admin panels or proxies. Restrict access."));
    m.insert(8443, ServiceInfo::new("HTTPS Alternate", Low, "HTTPS Alternate: Verify TLS configuration and restrict access."));
    m.insert(9200, ServiceInfo::new("Elasticsearch", Low, "Elasticsearch: Unauthenticated data access. Enable security features."));
    m.insert(11211, ServiceInfo::new("Memcached", High, "Memcached: Amplification and data leak risk. Bind to localhost."));
    m.insert(27017, ServiceInfo::new("MongoDB", Critical, "MongoDB: Often unauthenticated. Enable auth and bind to localhost."));

    m
});

/// Classify a port. Ports missing from the table are `Unknown`/`Low`.
pub fn classify(port: u16) -> ServiceInfo {
    PORT_SERVICES.get(&port).copied().unwrap_or(UNKNOWN)
}
