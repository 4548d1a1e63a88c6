//! Resolve subcommand implementation.

use crate::error::CliResult;
use crate::types::resolve;
use clap::Parser;
use console::style;

/// Show what a target normalizes and resolves to.
#[derive(Parser, Debug)]
pub struct ResolveCommand {
    /// Target to resolve (IP, hostname, or URL)
    #[arg(value_name = "TARGET")]
    pub target: String,
}

impl ResolveCommand {
    /// Execute the resolve command.
    pub async fn execute(&self) -> CliResult<()> {
        let target = resolve(&self.target).await?;
        let family = target
            .kind
            .family()
            .map_or_else(|| "unknown".to_string(), |f| f.to_string());

        println!("  {} {}", style("Host:").bold(), target.host);
        println!("  {} {}", style("Address:").bold(), style(&target.literal).green());
        println!("  {} {}", style("Family:").bold(), family);
        Ok(())
    }
}
