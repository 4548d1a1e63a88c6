//! Scan subcommand implementation.
//!
//! Handles the `portscout scan <target>` command. The engine reports through
//! an event channel; a consumer task turns those events into a progress bar
//! (plain output) and, with `--events`, JSON lines on stderr.

use crate::config::AppSettings;
use crate::error::CliResult;
use crate::output::{self, OutputFormat};
use crate::scanner::{self, ScanConfig, ScanEvent};
use crate::types::{Port, PortSpec};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Scan a target for open ports.
#[derive(Parser, Debug)]
pub struct ScanCommand {
    /// Target to scan (IP, hostname, or URL)
    ///
    /// Examples:
    ///   192.168.1.1               IPv4 address
    ///   2001:db8::1               IPv6 address
    ///   https://example.com/app   URL, scheme and path are stripped
    #[arg(value_name = "TARGET")]
    pub target: String,

    /// Scan every port in 1-1024 instead of the curated list
    #[arg(short, long, env = "PORTSCOUT_DEEP")]
    pub deep: bool,

    /// Extra ports to scan (e.g., "8000", "8000,9000", "8000-8100")
    #[arg(short, long)]
    pub ports: Option<String>,

    /// Maximum number of concurrent workers
    #[arg(short = 'c', long, env = "PORTSCOUT_CONCURRENCY")]
    pub concurrency: Option<usize>,

    /// Connection timeout in milliseconds
    #[arg(short = 't', long, env = "PORTSCOUT_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Banner read/write timeout in milliseconds
    #[arg(long, value_name = "MS", env = "PORTSCOUT_BANNER_TIMEOUT")]
    pub banner_timeout: Option<u64>,

    /// Output format for results
    #[arg(short, long, value_enum, env = "PORTSCOUT_OUTPUT")]
    pub output: Option<OutputFormat>,

    /// Stream scan events as JSON lines on stderr
    #[arg(long)]
    pub events: bool,
}

impl ScanCommand {
    /// Execute the scan command.
    pub async fn execute(&self, settings: &AppSettings, quiet: bool) -> CliResult<()> {
        let format = self.output.unwrap_or(settings.output_format);
        let jobs = self.job_set(settings)?;
        let config = self.scan_config(settings).with_cancel(CancellationToken::new());
        debug!(jobs = jobs.len(), concurrency = config.concurrency, "scan configured");

        let cancel = config.cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });

        let show_progress = !quiet && format == OutputFormat::Plain;
        let (tx, rx) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(consume_events(rx, show_progress, self.events));

        let outcome = scanner::scan_ports(&self.target, jobs, &config, Arc::new(tx)).await;
        if let Err(e) = consumer.await {
            warn!(error = %e, "event consumer failed");
        }
        let summary = outcome?;

        if config.cancel.is_cancelled() && !quiet {
            output::print_warning("Scan interrupted, results are partial.");
        }

        output::print_summary(&summary, format)?;
        Ok(())
    }

    /// Common or deep port set, extended by `--ports`.
    fn job_set(&self, settings: &AppSettings) -> CliResult<Vec<Port>> {
        let mut spec = if self.deep || settings.deep_scan {
            PortSpec::deep()
        } else {
            PortSpec::common()
        };
        if let Some(extra) = &self.ports {
            spec.extend(&extra.parse::<PortSpec>()?);
        }
        Ok(spec.to_ports())
    }

    /// Settings with command-line overrides applied.
    fn scan_config(&self, settings: &AppSettings) -> ScanConfig {
        let mut config = settings.to_scan_config();
        if let Some(concurrency) = self.concurrency {
            config = config.with_concurrency(concurrency);
        }
        if let Some(ms) = self.timeout {
            config = config.with_connect_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = self.banner_timeout {
            config = config.with_banner_timeout(Duration::from_millis(ms));
        }
        config
    }
}

/// Drain the event channel until the engine drops its sender.
async fn consume_events(
    mut rx: mpsc::UnboundedReceiver<ScanEvent>,
    show_progress: bool,
    json_lines: bool,
) {
    let bar = show_progress.then(progress_bar);

    while let Some(event) = rx.recv().await {
        if json_lines {
            if let Err(e) = output::write_event_line(io::stderr().lock(), &event) {
                warn!(error = %e, "failed to write event");
            }
        }

        let Some(bar) = &bar else {
            continue;
        };
        match event {
            ScanEvent::Log { message } => bar.set_message(message),
            ScanEvent::PortFound {
                port,
                service,
                banner,
            } => bar.println(format!("  open {port:>5}/tcp  {service:<15} {banner}")),
            ScanEvent::Progress { current, total, .. } => {
                bar.set_length(total as u64);
                bar.set_position(current as u64);
            }
            ScanEvent::Complete { .. } => bar.finish_and_clear(),
        }
    }
}

fn progress_bar() -> ProgressBar {
    let bar = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
