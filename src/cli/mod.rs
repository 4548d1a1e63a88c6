//! CLI subcommand definitions and handlers.
//!
//! Implements a git-like subcommand architecture:
//! - `portscout scan <target>` - Scan a target
//! - `portscout resolve <target>` - Show what a target resolves to
//! - `portscout config show|path|init` - Inspect or create settings

mod config;
mod resolve;
mod scan;

pub use config::ConfigCommand;
pub use resolve::ResolveCommand;
pub use scan::ScanCommand;

use crate::config::AppSettings;
use crate::error::CliResult;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// portscout - A concurrent TCP port scanner with banner grabbing.
///
/// Resolves a host, scans either a curated list of well-known ports or the
/// whole 1-1024 range, reads service banners from open ports and rates each
/// finding by severity.
#[derive(Parser, Debug)]
#[command(name = "portscout")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Concurrent TCP port scanner with banner grabbing", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to custom configuration file
    #[arg(long, global = true, value_name = "PATH", env = "PORTSCOUT_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan a target for open ports
    #[command(alias = "s")]
    Scan(ScanCommand),

    /// Resolve a target without scanning it
    #[command(alias = "r")]
    Resolve(ResolveCommand),

    /// Inspect or create the settings file
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Settings from `--config`, or the default settings file.
    pub fn settings(&self) -> CliResult<AppSettings> {
        let settings = match &self.config {
            Some(path) => AppSettings::load_from(path)?,
            None => AppSettings::load()?,
        };
        Ok(settings)
    }

    /// Run the selected subcommand.
    pub async fn execute(self) -> CliResult<()> {
        match &self.command {
            Commands::Scan(cmd) => cmd.execute(&self.settings()?, self.quiet).await,
            Commands::Resolve(cmd) => cmd.execute().await,
            Commands::Config(cmd) => cmd.execute(self.config.as_deref()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::OutputFormat;

    #[test]
    fn test_parse_scan() {
        let cli = Cli::try_parse_from([
            "portscout",
            "-v",
            "scan",
            "example.com",
            "--deep",
            "--ports",
            "8000-8010",
            "-o",
            "json",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Scan(cmd) => {
                assert_eq!(cmd.target, "example.com");
                assert!(cmd.deep);
                assert_eq!(cmd.ports.as_deref(), Some("8000-8010"));
                assert_eq!(cmd.output, Some(OutputFormat::Json));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_config_subcommand() {
        let cli = Cli::try_parse_from(["portscout", "config", "init", "--force"]).unwrap();
        assert!(matches!(cli.command, Commands::Config(ConfigCommand::Init { force: true })));
    }

    #[test]
    fn test_scan_requires_target() {
        assert!(Cli::try_parse_from(["portscout", "scan"]).is_err());
    }
}
