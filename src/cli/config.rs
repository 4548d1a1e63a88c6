//! Config subcommand implementation.

use crate::config::{AppSettings, Paths};
use crate::error::{CliError, CliResult, ConfigError};
use crate::output;
use clap::Subcommand;
use std::path::Path;

/// Inspect or create the settings file.
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective settings as JSON
    Show,

    /// Print the path of the settings file
    Path,

    /// Write default settings to the settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

impl ConfigCommand {
    /// Execute the config command against `--config`, or the default file.
    pub fn execute(&self, custom: Option<&Path>) -> CliResult<()> {
        let file = match custom {
            Some(path) => path.to_path_buf(),
            None => Paths::discover()?.settings_file(),
        };

        match self {
            Self::Show => {
                let settings = if file.exists() {
                    AppSettings::load_from(&file)?
                } else {
                    AppSettings::default()
                };
                println!(
                    "{}",
                    serde_json::to_string_pretty(&settings).map_err(ConfigError::from)?
                );
            }
            Self::Path => println!("{}", file.display()),
            Self::Init { force } => {
                init(&file, *force)?;
                output::print_success(&format!("Wrote default settings to {}", file.display()));
            }
        }
        Ok(())
    }
}

fn init(file: &Path, force: bool) -> CliResult<()> {
    if file.exists() && !force {
        return Err(CliError::Other(format!(
            "{} already exists, use --force to overwrite",
            file.display()
        )));
    }
    AppSettings::default().save_to(file)?;
    Ok(())
}
