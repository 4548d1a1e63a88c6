//! TCP Connect Scanner implementation.
//!
//! Performs standard TCP connect scans using the operating system's
//! socket API, then hands the established stream to the banner grabber.

use crate::banner::BannerGrabber;
use crate::scanner::traits::{PortResult, Scanner};
use crate::types::{AddressFamily, Port};
use async_trait::async_trait;
use std::io;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::net::{TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::trace;

/// TCP Connect Scanner.
///
/// Uses standard socket connect() calls to determine port status.
/// Does not require elevated privileges. Every socket is created for the
/// target's address family and lives for exactly one connection attempt.
pub struct TcpConnectScanner {
    target: IpAddr,
    family: AddressFamily,
    timeout: Duration,
    grabber: BannerGrabber,
}

impl TcpConnectScanner {
    /// Create a new TCP connect scanner.
    ///
    /// # Arguments
    /// * `target` - Target IP address to scan
    /// * `timeout` - Connection timeout per port
    /// * `grabber` - Banner grabber run on every open port
    pub fn new(target: IpAddr, timeout: Duration, grabber: BannerGrabber) -> Self {
        Self {
            target,
            family: AddressFamily::of(&target),
            timeout,
            grabber,
        }
    }

    /// Attempt to connect to the target address.
    async fn attempt_connect(&self, addr: SocketAddr) -> io::Result<TcpStream> {
        let socket = match self.family {
            AddressFamily::V4 => TcpSocket::new_v4()?,
            AddressFamily::V6 => TcpSocket::new_v6()?,
        };

        match timeout(self.timeout, socket.connect(addr)).await {
            Ok(result) => result,
            Err(_) => Err(io::ErrorKind::TimedOut.into()),
        }
    }
}

#[async_trait]
impl Scanner for TcpConnectScanner {
    fn target(&self) -> IpAddr {
        self.target
    }

    fn family(&self) -> AddressFamily {
        self.family
    }

    async fn scan_port(&self, port: Port) -> Option<PortResult> {
        let addr = SocketAddr::new(self.target, port.as_u16());

        match self.attempt_connect(addr).await {
            Ok(mut stream) => {
                let banner = self.grabber.grab(&mut stream, self.target, port.as_u16()).await;
                Some(PortResult::new(port, banner))
            }
            Err(_) => {
                trace!(%port, "no connection");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn scanner(timeout: Duration) -> TcpConnectScanner {
        TcpConnectScanner::new(
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            timeout,
            BannerGrabber::new(Duration::from_millis(200), "test.local"),
        )
    }

    #[test]
    fn test_scanner_creation() {
        let scanner = scanner(Duration::from_secs(1));
        assert_eq!(scanner.target(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(scanner.family(), AddressFamily::V4);
    }

    #[tokio::test]
    async fn test_scan_closed_port() {
        // Bind then drop to get a port nobody listens on.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let result = scanner(Duration::from_millis(200))
            .scan_port(Port::new(port).unwrap())
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_scan_open_port_reads_banner() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(b"ACME widget server 1.2\r\n").await;
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
        });

        let result = scanner(Duration::from_secs(1))
            .scan_port(Port::new(port).unwrap())
            .await
            .expect("listener port should be open");
        assert_eq!(result.port.as_u16(), port);
        assert_eq!(result.banner, "ACME widget server 1.2");
        assert_eq!(result.service, "Unknown");
    }

    #[tokio::test]
    async fn test_scan_ipv6_loopback() {
        // Hosts without IPv6 loopback can't run this.
        let Ok(listener) = TcpListener::bind("[::1]:0").await else {
            return;
        };
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let _ = socket.write_all(b"V6BANNER\r\n").await;
                tokio::time::sleep(Duration::from_millis(300)).await;
            }
        });

        let scanner = TcpConnectScanner::new(
            IpAddr::V6(Ipv6Addr::LOCALHOST),
            Duration::from_secs(1),
            BannerGrabber::new(Duration::from_millis(200), "test.local"),
        );
        assert_eq!(scanner.family(), AddressFamily::V6);

        let result = scanner
            .scan_port(Port::new(port).unwrap())
            .await
            .expect("v6 listener port should be open");
        assert_eq!(result.port.as_u16(), port);
        assert_eq!(result.banner, "V6BANNER");
    }
}
