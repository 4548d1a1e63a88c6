//! JSON output formatting.

use crate::scanner::{ScanEvent, ScanSummary};
use std::io::{self, Write};

/// Write a summary as pretty-printed JSON.
pub fn write_json<W: Write>(mut out: W, summary: &ScanSummary) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut out, summary)?;
    writeln!(out)
}

/// Write one event as a single JSON line.
pub fn write_event_line<W: Write>(mut out: W, event: &ScanEvent) -> io::Result<()> {
    serde_json::to_writer(&mut out, event)?;
    writeln!(out)
}
