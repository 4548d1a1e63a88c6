//! Output formatting module.
//!
//! Provides formatters for plain text, JSON, and CSV output of scan
//! summaries. Every formatter writes to any `io::Write` so callers choose
//! between stdout and a buffer.

mod csv_format;
mod json_format;
mod plain;

pub use csv_format::write_csv;
pub use json_format::{write_event_line, write_json};
pub use plain::{print_error, print_success, print_warning, write_plain};

use crate::scanner::ScanSummary;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

/// Output format for results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable plain text
    #[default]
    Plain,
    /// JSON structured output
    Json,
    /// CSV format for data analysis
    Csv,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Plain => write!(f, "plain"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Format and write a summary according to `format`.
pub fn write_summary<W: Write>(out: W, summary: &ScanSummary, format: OutputFormat) -> io::Result<()> {
    match format {
        OutputFormat::Plain => write_plain(out, summary),
        OutputFormat::Json => write_json(out, summary),
        OutputFormat::Csv => write_csv(out, summary),
    }
}

/// Format a summary to stdout.
pub fn print_summary(summary: &ScanSummary, format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    write_summary(stdout.lock(), summary, format)
}
