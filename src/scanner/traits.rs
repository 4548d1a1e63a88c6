//! Scanner trait abstraction and the records it produces.
//!
//! The worker pool only knows about [`Scanner`]; the TCP connect scanner is
//! the production implementation.

use crate::banner::{truncate_banner, DEFAULT_BANNER_TIMEOUT};
use crate::services::{self, Severity};
use crate::types::{AddressFamily, Port};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Default number of concurrent workers.
pub const DEFAULT_CONCURRENCY: usize = 100;

/// Default connect timeout per port.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// An open port, as found by one worker.
///
/// Created once and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortResult {
    /// The port that accepted the connection.
    pub port: Port,
    /// Service label from the classifier.
    pub service: String,
    /// Banner or placeholder, at most [`crate::banner::MAX_BANNER_LEN`] characters.
    pub banner: String,
    /// Static risk tier of the port.
    pub severity: Severity,
    /// Remediation advice.
    #[serde(rename = "threat")]
    pub remediation: String,
}

impl PortResult {
    /// Build a result for an open port, classifying it on the way.
    pub fn new(port: Port, banner: impl Into<String>) -> Self {
        let info = services::classify(port.as_u16());
        Self {
            port,
            service: info.label.to_string(),
            banner: truncate_banner(banner.into()),
            severity: info.severity,
            remediation: info.remediation.to_string(),
        }
    }
}

/// Tuning knobs for a scan.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Upper bound on concurrent workers.
    pub concurrency: usize,
    /// Connect timeout per port.
    pub connect_timeout: Duration,
    /// Timeout for each banner read or write.
    pub banner_timeout: Duration,
    /// Name announced in SMTP `EHLO`.
    pub client_id: String,
    /// Checked by workers between jobs.
    pub cancel: CancellationToken,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            banner_timeout: DEFAULT_BANNER_TIMEOUT,
            client_id: "portscout.local".to_string(),
            cancel: CancellationToken::new(),
        }
    }
}

impl ScanConfig {
    /// Set the worker bound (at least one).
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the banner timeout.
    pub fn with_banner_timeout(mut self, timeout: Duration) -> Self {
        self.banner_timeout = timeout;
        self
    }

    /// Set the SMTP client identity.
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    /// Share a cancellation token with the caller.
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Trait for per-port scanners.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Scan a single port.
    ///
    /// `None` means the port did not accept a connection. Closed and
    /// filtered ports are not told apart.
    async fn scan_port(&self, port: Port) -> Option<PortResult>;

    /// Get the target IP address.
    fn target(&self) -> IpAddr;

    /// Address family of every socket this scanner opens.
    fn family(&self) -> AddressFamily {
        AddressFamily::of(&self.target())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::banner::MAX_BANNER_LEN;

    #[test]
    fn test_port_result_is_classified() {
        let result = PortResult::new(Port::new(23).unwrap(), "login:");
        assert_eq!(result.service, "Telnet");
        assert_eq!(result.severity, Severity::Critical);
        assert!(result.remediation.contains("SSH"));
    }

    #[test]
    fn test_port_result_bounds_banner() {
        let result = PortResult::new(Port::new(4444).unwrap(), "b".repeat(500));
        assert_eq!(result.banner.len(), MAX_BANNER_LEN);
        assert_eq!(result.service, "Unknown");
    }

    #[test]
    fn test_port_result_wire_names() {
        let result = PortResult::new(Port::new(22).unwrap(), "[SSH] SSH-2.0-OpenSSH_9.6");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["port"], 22);
        assert_eq!(json["service"], "SSH");
        assert_eq!(json["severity"], "Medium");
        assert!(json["threat"].as_str().unwrap().starts_with("SSH:"));
    }

    #[test]
    fn test_config_builder() {
        let config = ScanConfig::default()
            .with_concurrency(0)
            .with_connect_timeout(Duration::from_millis(250))
            .with_client_id("scanner.example");
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.connect_timeout, Duration::from_millis(250));
        assert_eq!(config.banner_timeout, DEFAULT_BANNER_TIMEOUT);
        assert_eq!(config.client_id, "scanner.example");
    }
}
