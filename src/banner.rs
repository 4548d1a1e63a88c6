//! Protocol-aware banner grabbing on established TCP connections.
//!
//! Most services announce themselves right after the handshake; a few need a
//! nudge (FTP, SMTP) or a full request (HTTP). Every strategy is bounded by
//! the grabber's timeout and never fails: I/O problems turn into a short
//! placeholder describing what happened.

use std::io;
use std::net::IpAddr;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;
use tracing::trace;

/// Maximum number of characters kept from any banner.
pub const MAX_BANNER_LEN: usize = 100;

/// Default timeout for each banner read or write.
pub const DEFAULT_BANNER_TIMEOUT: Duration = Duration::from_secs(2);

/// Placeholder for services that send nothing usable.
pub const NO_BANNER: &str = "No banner response";

/// Maximum bytes to read for a banner.
const READ_BUF_SIZE: usize = 1024;

/// How a banner is obtained for a given port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Ftp,
    Ssh,
    Telnet,
    Smtp,
    Http,
    Pop3,
    Imap,
    MySql,
    Postgres,
    Generic,
}

impl Protocol {
    /// Pick the strategy for a well-known port.
    pub fn for_port(port: u16) -> Self {
        match port {
            21 => Self::Ftp,
            22 => Self::Ssh,
            23 => Self::Telnet,
            25 => Self::Smtp,
            80 | 443 | 8080 | 8443 => Self::Http,
            110 => Self::Pop3,
            143 => Self::Imap,
            3306 => Self::MySql,
            5432 => Self::Postgres,
            _ => Self::Generic,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Ftp => "FTP",
            Self::Ssh => "SSH",
            Self::Telnet => "Telnet",
            Self::Smtp => "SMTP",
            Self::Http => "HTTP",
            Self::Pop3 => "POP3",
            Self::Imap => "IMAP",
            Self::MySql => "MySQL",
            Self::Postgres => "PostgreSQL",
            Self::Generic => "Service",
        }
    }
}

/// Outcome of a single bounded read.
#[derive(Debug)]
enum Reply {
    Data(Vec<u8>),
    /// Peer closed the connection.
    Closed,
    /// Nothing arrived before the timeout.
    Silent,
    Failed(io::ErrorKind),
}

/// Extracts identification strings from open ports.
#[derive(Debug, Clone)]
pub struct BannerGrabber {
    timeout: Duration,
    client_id: String,
}

impl Default for BannerGrabber {
    fn default() -> Self {
        Self::new(DEFAULT_BANNER_TIMEOUT, "portscout.local")
    }
}

impl BannerGrabber {
    /// Create a grabber.
    ///
    /// # Arguments
    /// * `timeout` - Bound applied to every read and write
    /// * `client_id` - Name announced in `EHLO`
    pub fn new(timeout: Duration, client_id: impl Into<String>) -> Self {
        Self {
            timeout,
            client_id: client_id.into(),
        }
    }

    /// Grab a banner using the strategy registered for `port`.
    pub async fn grab<S>(&self, stream: &mut S, ip: IpAddr, port: u16) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        self.grab_as(stream, ip, Protocol::for_port(port)).await
    }

    /// Grab a banner using an explicit strategy.
    pub async fn grab_as<S>(&self, stream: &mut S, ip: IpAddr, protocol: Protocol) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let banner = match protocol {
            Protocol::Ftp => self.grab_ftp(stream).await,
            Protocol::Ssh => self.grab_ssh(stream).await,
            Protocol::Telnet => self.grab_telnet(stream).await,
            Protocol::Smtp => self.grab_smtp(stream).await,
            Protocol::Http => self.grab_http(stream, ip).await,
            Protocol::Pop3 => self.grab_greeting(stream, protocol, "+OK").await,
            Protocol::Imap => self.grab_greeting(stream, protocol, "* OK").await,
            Protocol::MySql => self.grab_mysql(stream).await,
            Protocol::Postgres => "PostgreSQL service detected".to_string(),
            Protocol::Generic => self.grab_generic(stream).await,
        };
        truncate_banner(banner)
    }

    async fn read_reply<S>(&self, stream: &mut S) -> Reply
    where
        S: AsyncRead + Unpin,
    {
        let mut buffer = vec![0u8; READ_BUF_SIZE];
        match timeout(self.timeout, stream.read(&mut buffer)).await {
            Ok(Ok(0)) => Reply::Closed,
            Ok(Ok(n)) => {
                buffer.truncate(n);
                Reply::Data(buffer)
            }
            Ok(Err(e)) => Reply::Failed(e.kind()),
            Err(_) => Reply::Silent,
        }
    }

    async fn send<S>(&self, stream: &mut S, payload: &[u8]) -> Result<(), Reply>
    where
        S: AsyncWrite + Unpin,
    {
        match timeout(self.timeout, stream.write_all(payload)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(Reply::Failed(e.kind())),
            Err(_) => Err(Reply::Silent),
        }
    }

    /// Text for a reply that carried no data.
    fn placeholder(&self, protocol: Protocol, reply: &Reply) -> String {
        let name = protocol.name();
        match reply {
            Reply::Silent => format!(
                "{name}: no banner (timed out after {}ms)",
                self.timeout.as_millis()
            ),
            Reply::Closed => format!("{name}: connection closed without banner"),
            Reply::Failed(io::ErrorKind::ConnectionReset) => format!("{name}: connection reset"),
            Reply::Failed(kind) => format!("{name}: read failed ({kind})"),
            Reply::Data(_) => format!("{name}: {NO_BANNER}"),
        }
    }

    /// Send `nudge` and read the answer; used after a silent first read.
    async fn nudge_and_read<S>(&self, stream: &mut S, protocol: Protocol, nudge: &[u8]) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        if let Err(reply) = self.send(stream, nudge).await {
            return self.placeholder(protocol, &reply);
        }
        match self.read_reply(stream).await {
            Reply::Data(data) => non_empty(sanitize_banner(&data), protocol),
            reply => self.placeholder(protocol, &reply),
        }
    }

    async fn grab_ftp<S>(&self, stream: &mut S) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) if !sanitize_banner(&data).is_empty() => sanitize_banner(&data),
            Reply::Data(_) | Reply::Silent => {
                trace!("FTP greeting missing, sending USER");
                self.nudge_and_read(stream, Protocol::Ftp, b"USER anonymous\r\n")
                    .await
            }
            reply => self.placeholder(Protocol::Ftp, &reply),
        }
    }

    async fn grab_ssh<S>(&self, stream: &mut S) -> String
    where
        S: AsyncRead + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) => {
                let line = sanitize_banner(first_line(&data));
                if line.starts_with("SSH-") {
                    format!("[SSH] {line}")
                } else {
                    non_empty(sanitize_banner(&data), Protocol::Ssh)
                }
            }
            reply => self.placeholder(Protocol::Ssh, &reply),
        }
    }

    async fn grab_telnet<S>(&self, stream: &mut S) -> String
    where
        S: AsyncRead + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) => {
                let text = sanitize_banner(&strip_telnet_negotiation(&data));
                if text.is_empty() {
                    "Telnet: option negotiation only".to_string()
                } else {
                    text
                }
            }
            reply => self.placeholder(Protocol::Telnet, &reply),
        }
    }

    async fn grab_smtp<S>(&self, stream: &mut S) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) if !sanitize_banner(&data).is_empty() => {
                expect_prefix(sanitize_banner(&data), "220")
            }
            Reply::Data(_) | Reply::Silent => {
                trace!("SMTP greeting missing, sending EHLO");
                let ehlo = format!("EHLO {}\r\n", self.client_id);
                self.nudge_and_read(stream, Protocol::Smtp, ehlo.as_bytes())
                    .await
            }
            reply => self.placeholder(Protocol::Smtp, &reply),
        }
    }

    async fn grab_greeting<S>(&self, stream: &mut S, protocol: Protocol, prefix: &str) -> String
    where
        S: AsyncRead + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) => {
                let text = sanitize_banner(&data);
                if text.is_empty() {
                    self.placeholder(protocol, &Reply::Data(data))
                } else {
                    expect_prefix(text, prefix)
                }
            }
            reply => self.placeholder(protocol, &reply),
        }
    }

    async fn grab_http<S>(&self, stream: &mut S, ip: IpAddr) -> String
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let request = http_request(ip);
        if let Err(reply) = self.send(stream, request.as_bytes()).await {
            return self.placeholder(Protocol::Http, &reply);
        }

        match self.read_reply(stream).await {
            Reply::Data(data) => parse_http_response(&data),
            reply => self.placeholder(Protocol::Http, &reply),
        }
    }

    async fn grab_mysql<S>(&self, stream: &mut S) -> String
    where
        S: AsyncRead + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) => match parse_mysql_handshake(&data) {
                Some(MySqlGreeting::Version(version)) => format!("MySQL {version}"),
                Some(MySqlGreeting::Error(message)) => format!("MySQL (refused: {message})"),
                None => non_empty(sanitize_banner(&data), Protocol::MySql),
            },
            reply => self.placeholder(Protocol::MySql, &reply),
        }
    }

    async fn grab_generic<S>(&self, stream: &mut S) -> String
    where
        S: AsyncRead + Unpin,
    {
        match self.read_reply(stream).await {
            Reply::Data(data) => {
                let text = sanitize_banner(&data);
                if text.is_empty() {
                    NO_BANNER.to_string()
                } else {
                    text
                }
            }
            Reply::Silent => format!("{NO_BANNER} (timed out)"),
            Reply::Closed => NO_BANNER.to_string(),
            reply => self.placeholder(Protocol::Generic, &reply),
        }
    }
}

fn non_empty(text: String, protocol: Protocol) -> String {
    if text.is_empty() {
        format!("{}: {NO_BANNER}", protocol.name())
    } else {
        text
    }
}

fn expect_prefix(text: String, prefix: &str) -> String {
    if text.starts_with(prefix) {
        text
    } else {
        format!("Unexpected greeting: {text}")
    }
}

fn first_line(data: &[u8]) -> &[u8] {
    data.split(|&b| b == b'\n').next().unwrap_or(data)
}

/// Minimal `GET /` with a Host header; IPv6 hosts are bracketed.
fn http_request(ip: IpAddr) -> String {
    let host = match ip {
        IpAddr::V4(v4) => v4.to_string(),
        IpAddr::V6(v6) => format!("[{v6}]"),
    };
    format!(
        "GET / HTTP/1.1\r\nHost: {host}\r\nUser-Agent: portscout/{}\r\nAccept: */*\r\nConnection: close\r\n\r\n",
        env!("CARGO_PKG_VERSION")
    )
}

/// Summarize an HTTP response as "status line | Server: value".
fn parse_http_response(data: &[u8]) -> String {
    // TLS record header for an alert: plain HTTP sent to a TLS port.
    if data.len() >= 2 && data[0] == 0x15 && data[1] == 0x03 {
        return "TLS service (plain HTTP request rejected)".to_string();
    }

    let text = String::from_utf8_lossy(data);
    let mut lines = text.lines();
    let status = lines.next().map(str::trim).unwrap_or_default();
    if !status.starts_with("HTTP/") {
        return non_empty(sanitize_banner(data), Protocol::Http);
    }

    let server = lines
        .take_while(|line| !line.trim().is_empty())
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.trim()
                .eq_ignore_ascii_case("server")
                .then(|| value.trim().to_string())
        });

    let status = sanitize_banner(status.as_bytes());
    match server {
        Some(server) if !server.is_empty() => {
            format!("{status} | Server: {}", sanitize_banner(server.as_bytes()))
        }
        _ => status,
    }
}

/// What a MySQL server says first.
#[derive(Debug, PartialEq, Eq)]
enum MySqlGreeting {
    Version(String),
    Error(String),
}

/// Parse the initial handshake packet.
///
/// Layout: 3-byte payload length, 1-byte sequence id, then either protocol
/// version 10 followed by a NUL-terminated server version, or an error
/// packet (0xff, 2-byte code, optional `#` + 5-byte SQL state, message).
fn parse_mysql_handshake(data: &[u8]) -> Option<MySqlGreeting> {
    let payload = data.get(4..)?;
    match *payload.first()? {
        0x0a => {
            let version = payload.get(1..)?;
            let end = version.iter().position(|&b| b == 0)?;
            let version = sanitize_banner(&version[..end]);
            (!version.is_empty()).then_some(MySqlGreeting::Version(version))
        }
        0xff => {
            let mut message = payload.get(3..)?;
            if message.first() == Some(&b'#') {
                message = message.get(6..).unwrap_or_default();
            }
            Some(MySqlGreeting::Error(sanitize_banner(message)))
        }
        _ => None,
    }
}

/// Remove telnet IAC command and subnegotiation sequences.
fn strip_telnet_negotiation(data: &[u8]) -> Vec<u8> {
    const IAC: u8 = 0xff;
    const SB: u8 = 0xfa;
    const SE: u8 = 0xf0;

    let mut out = Vec::with_capacity(data.len());
    let mut i = 0;
    while i < data.len() {
        if data[i] != IAC {
            out.push(data[i]);
            i += 1;
            continue;
        }
        match data.get(i + 1).copied() {
            // Escaped 0xff data byte; not printable anyway.
            Some(IAC) => i += 2,
            // WILL, WONT, DO, DONT carry one option byte.
            Some(0xfb..=0xfe) => i += 3,
            Some(SB) => {
                let rest = &data[i + 2..];
                let end = rest
                    .windows(2)
                    .position(|w| w == [IAC, SE])
                    .map_or(rest.len(), |p| p + 2);
                i += 2 + end;
            }
            Some(_) => i += 2,
            None => i += 1,
        }
    }
    out
}

/// Strip control and non-printable characters and collapse whitespace.
fn sanitize_banner(data: &[u8]) -> String {
    let text = String::from_utf8_lossy(data);
    let mut result = String::with_capacity(text.len());
    let mut prev_space = false;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_space {
                result.push(' ');
            }
            prev_space = true;
        } else if c.is_control() || c == char::REPLACEMENT_CHARACTER {
            continue;
        } else {
            result.push(c);
            prev_space = false;
        }
    }

    result.trim().to_string()
}

/// Bound a banner to [`MAX_BANNER_LEN`] characters.
pub(crate) fn truncate_banner(banner: String) -> String {
    match banner.char_indices().nth(MAX_BANNER_LEN) {
        Some((idx, _)) => banner[..idx].to_string(),
        None => banner,
    }
}
