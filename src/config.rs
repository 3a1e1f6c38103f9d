//! Configuration module for the httpscan scanner

use crate::output::OutputFormat;
use crate::ScanError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the per-user configuration file looked up in the home directory
pub const DEFAULT_CONFIG_FILE: &str = ".httpscan.toml";

/// Scan-level settings shared by the engine and every probe.
///
/// Built once before scanning starts and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Number of probes allowed in flight at once
    pub threads: usize,

    /// Timeout for connect and for the header read, in milliseconds
    pub timeout: u64,

    /// Upper bound on bytes read from one target
    pub max_header_bytes: usize,

    /// Format used for result lines
    pub output_format: OutputFormat,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            threads: 512,
            timeout: 5000,
            max_header_bytes: 16 * 1024,
            output_format: OutputFormat::Text,
        }
    }
}

impl ScanConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent probes
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Set the per-probe timeout in milliseconds
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    pub fn with_output_format(mut self, output_format: OutputFormat) -> Self {
        self.output_format = output_format;
        self
    }

    /// Get timeout as Duration
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout)
    }

    /// Load configuration from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            ScanError::ConfigError(format!("Failed to read config file {}: {}", path.display(), e))
        })?;

        let config: ScanConfig = toml::from_str(&content)
            .map_err(|e| ScanError::ConfigError(format!("Failed to parse TOML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Path of the per-user config file, if a home directory is known
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from an explicit path, or from `~/.httpscan.toml`
    /// when it exists, or fall back to defaults.
    ///
    /// An explicit path that cannot be read is an error; a broken default file
    /// is only logged.
    pub fn load(explicit: Option<&Path>) -> crate::Result<Self> {
        if let Some(path) = explicit {
            let config = Self::from_toml_file(path)?;
            log::info!("Loaded config from {}", path.display());
            return Ok(config);
        }

        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                match Self::from_toml_file(&path) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", path.display());
                        return Ok(config);
                    }
                    Err(e) => log::warn!("Ignoring {}: {}", path.display(), e),
                }
            }
        }

        Ok(Self::default())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.threads == 0 {
            return Err(ScanError::ConfigError("Thread count must be greater than 0".to_string()));
        }

        if self.timeout == 0 {
            return Err(ScanError::ConfigError("Timeout must be greater than 0".to_string()));
        }

        if self.max_header_bytes == 0 {
            return Err(ScanError::ConfigError(
                "max_header_bytes must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}
