//! Application settings and paths.
//!
//! Settings live in `settings.json` inside the platform config directory
//! (`~/.config/portscout` on Linux).

use crate::error::{ConfigError, ConfigResult};
use crate::output::OutputFormat;
use crate::scanner::ScanConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

/// Application directory paths.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Configuration directory (~/.config/portscout)
    pub config_dir: PathBuf,
}

impl Paths {
    /// Locate the configuration directory. Nothing is created on disk.
    pub fn discover() -> ConfigResult<Self> {
        let project = ProjectDirs::from("com", "portscout", "portscout")
            .ok_or(ConfigError::DirectoryNotFound)?;

        Ok(Self {
            config_dir: project.config_dir().to_path_buf(),
        })
    }

    /// Get the path to the settings file.
    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join("settings.json")
    }
}

/// Application-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Upper bound on concurrent workers.
    pub concurrency: usize,
    /// Connect timeout per port in milliseconds.
    pub connect_timeout_ms: u64,
    /// Timeout for each banner read or write in milliseconds.
    pub banner_timeout_ms: u64,
    /// Name announced in SMTP `EHLO`.
    pub client_id: String,
    /// Scan ports 1-1024 instead of the curated list.
    pub deep_scan: bool,
    /// Default output format.
    pub output_format: OutputFormat,
}

impl Default for AppSettings {
    fn default() -> Self {
        let scan = ScanConfig::default();
        Self {
            concurrency: scan.concurrency,
            connect_timeout_ms: scan.connect_timeout.as_millis() as u64,
            banner_timeout_ms: scan.banner_timeout.as_millis() as u64,
            client_id: scan.client_id,
            deep_scan: false,
            output_format: OutputFormat::Plain,
        }
    }
}

impl AppSettings {
    /// Load settings from the default location, or defaults if the file
    /// does not exist yet.
    pub fn load() -> ConfigResult<Self> {
        let file = Paths::discover()?.settings_file();

        if !file.exists() {
            debug!(path = %file.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&file)
    }

    /// Load settings from a specific file.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let settings: Self =
            serde_json::from_str(&content).map_err(|e| ConfigError::InvalidFormat(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save settings to the default location.
    pub fn save(&self) -> ConfigResult<PathBuf> {
        let file = Paths::discover()?.settings_file();
        self.save_to(&file)?;
        Ok(file)
    }

    /// Save settings to a specific file, creating parent directories.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ConfigError::WriteFailed {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Reject values no scan could run with.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(ConfigError::InvalidValue("concurrency must be at least 1".into()));
        }
        if self.connect_timeout_ms == 0 || self.banner_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue("timeouts must be positive".into()));
        }
        if self.client_id.trim().is_empty() {
            return Err(ConfigError::InvalidValue("client_id must not be empty".into()));
        }
        Ok(())
    }

    /// Engine configuration for these settings.
    pub fn to_scan_config(&self) -> ScanConfig {
        ScanConfig::default()
            .with_concurrency(self.concurrency)
            .with_connect_timeout(Duration::from_millis(self.connect_timeout_ms))
            .with_banner_timeout(Duration::from_millis(self.banner_timeout_ms))
            .with_client_id(self.client_id.clone())
    }
}
