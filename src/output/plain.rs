//! Plain text output formatting.
//!
//! Produces human-readable output with colors and formatting.

use crate::scanner::ScanSummary;
use crate::services::Severity;
use console::{style, Style};
use std::io::{self, Write};

const RULE: &str = "═══════════════════════════════════════════════════════════════";
const THIN_RULE: &str = "───────────────────────────────────────────────────────────────";

fn severity_style(severity: Severity) -> Style {
    match severity {
        Severity::Critical => Style::new().red().bold(),
        Severity::High => Style::new().red(),
        Severity::Medium => Style::new().yellow(),
        Severity::Low => Style::new().green(),
    }
}

/// Write a summary in human-readable plain text format.
pub fn write_plain<W: Write>(mut out: W, summary: &ScanSummary) -> io::Result<()> {
    // Header
    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(
        out,
        "                    {} Scan Results",
        style("portscout").cyan().bold()
    )?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    // Scan info
    writeln!(out, "  {} {}", style("Target:").bold(), summary.target)?;
    writeln!(out, "  {} {}", style("IP Address:").bold(), summary.target_ip)?;
    writeln!(
        out,
        "  {} {}",
        style("Scan ID:").bold(),
        style(summary.id.short()).dim()
    )?;
    writeln!(out)?;

    // Statistics
    writeln!(
        out,
        "  {} {} ports scanned in {:.2}s, {} open",
        style("Statistics:").bold(),
        summary.total_ports_attempted,
        summary.duration_ms as f64 / 1000.0,
        style(summary.open_count()).green().bold()
    )?;
    let tiers: Vec<String> = summary
        .severity_counts()
        .into_iter()
        .filter(|(_, n)| *n > 0)
        .map(|(severity, n)| format!("{} {}", severity_style(severity).apply_to(n), severity))
        .collect();
    if !tiers.is_empty() {
        writeln!(out, "               {}", tiers.join(", "))?;
    }
    writeln!(out)?;

    // Port table
    if summary.ports.is_empty() {
        writeln!(out, "  {}", style("No open ports found.").dim())?;
    } else {
        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(
            out,
            "  {:>6}  {:<10}  {:<15}  {}",
            style("PORT").bold(),
            style("SEVERITY").bold(),
            style("SERVICE").bold(),
            style("BANNER").bold()
        )?;
        writeln!(out, "  {}", style(THIN_RULE).dim())?;

        for result in &summary.ports {
            writeln!(
                out,
                "  {:>6}  {:<10}  {:<15}  {}",
                result.port,
                severity_style(result.severity).apply_to(result.severity.to_string()),
                result.service,
                style(truncate_string(&result.banner, 35)).dim()
            )?;
        }

        writeln!(out, "  {}", style(THIN_RULE).dim())?;
        writeln!(out)?;

        // Remediation advice, most severe first
        let mut advised: Vec<_> = summary.ports.iter().collect();
        advised.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.port.cmp(&b.port)));
        for result in advised {
            writeln!(
                out,
                "  {:>6}  {}",
                severity_style(result.severity).apply_to(result.port),
                result.remediation
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", style(RULE).cyan())?;
    writeln!(out)?;

    Ok(())
}

/// Print an error message.
pub fn print_error(msg: &str) {
    eprintln!("{} {}", style("Error:").red().bold(), msg);
}

/// Print a warning message.
pub fn print_warning(msg: &str) {
    eprintln!("{} {}", style("Warning:").yellow().bold(), msg);
}

/// Print a success message.
pub fn print_success(msg: &str) {
    println!("{} {}", style("✓").green().bold(), msg);
}

/// Truncate a string to a maximum number of characters, adding an ellipsis
/// if truncated.
fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
