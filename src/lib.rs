//! # portscout - Concurrent TCP Reconnaissance Engine
//!
//! portscout resolves a target, connects to a set of TCP ports through a bounded
//! pool of async workers, grabs a protocol-aware banner from every open port
//! and rates each finding with a static severity and remediation advice.
//!
//! ## Features
//!
//! - **Flexible Targeting**: IPv4/IPv6 literals, hostnames and URLs
//! - **Two Port Sets**: a curated list of well-known ports, or all of 1-1024
//! - **Banner Grabbing**: FTP, SSH, Telnet, SMTP, HTTP, POP3, IMAP, MySQL, PostgreSQL
//! - **Live Events**: log, port-found, progress and completion events
//! - **Multiple Output Formats**: Plain text, JSON, and CSV
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use portscout::scanner::{self, NullReporter, ScanConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), portscout::ScanError> {
//!     let config = ScanConfig::default();
//!     let summary = scanner::scan("192.168.1.1", false, &config, Arc::new(NullReporter)).await?;
//!
//!     for result in &summary.ports {
//!         println!("{} {} {}", result.port, result.service, result.banner);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`types`] - Ports, port sets and target resolution
//! - [`scanner`] - The worker pool, the `Scanner` trait and scan events
//! - [`banner`] - Protocol-aware banner grabbing
//! - [`services`] - Port classification and remediation advice
//! - [`config`] - Settings file management
//! - [`output`] - Output formatting utilities
//! - [`error`] - Error types

pub mod banner;
pub mod cli;
pub mod config;
pub mod error;
pub mod output;
pub mod scanner;
pub mod services;
pub mod types;

// Re-export commonly used types
pub use error::{CliError, ConfigError, ScanError};
pub use scanner::{
    scan, FnReporter, NullReporter, PortResult, ProgressReporter, ScanConfig, ScanEvent,
    ScanSummary, Scanner,
};
pub use services::Severity;
pub use types::{Port, PortSpec, ScanId, ScanTarget};
