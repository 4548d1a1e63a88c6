//! CSV output formatting.

use crate::scanner::ScanSummary;
use std::io::{self, Write};

/// Write one row per open port.
pub fn write_csv<W: Write>(out: W, summary: &ScanSummary) -> io::Result<()> {
    let mut wtr = csv::Writer::from_writer(out);

    wtr.write_record(["port", "service", "severity", "banner", "threat"])?;

    for result in &summary.ports {
        wtr.write_record([
            &result.port.to_string(),
            &result.service,
            &result.severity.to_string(),
            &result.banner,
            &result.remediation,
        ])?;
    }

    wtr.flush()
}
