//! Error types for portscout.
//!
//! Uses `thiserror` for ergonomic error definitions. Only resolver-level
//! failures ever leave the scan engine; per-port connection and banner
//! failures are absorbed where they happen.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the scan engine.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Empty input, or both the IPv4 and IPv6 lookups failed.
    #[error("failed to resolve target '{target}': {reason}")]
    Resolution { target: String, reason: String },

    /// Resolution produced something that is neither an IPv4 nor an IPv6 literal.
    #[error("invalid address '{0}': address family could not be determined")]
    InvalidAddress(String),
}

impl ScanError {
    pub(crate) fn resolution(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resolution {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for scan engine operations.
pub type CoreResult<T> = Result<T, ScanError>;

/// Errors raised while loading or saving settings.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine a configuration directory for this platform")]
    DirectoryNotFound,

    #[error("failed to read {path}: {reason}")]
    ReadFailed { path: PathBuf, reason: String },

    #[error("failed to write {path}: {reason}")]
    WriteFailed { path: PathBuf, reason: String },

    #[error("invalid settings file: {0}")]
    InvalidFormat(String),

    #[error("invalid setting: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors reported by the command-line front end.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Port(#[from] crate::types::PortError),

    #[error("output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for CLI operations.
pub type CliResult<T> = Result<T, CliError>;
