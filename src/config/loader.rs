//! Configuration loading from disk and the command line.

use std::fs;
use std::path::{Path, PathBuf};
use crate::config::schema::SentinelConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 { write!(f, ", ")?; }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Values given on the command line. `None` keeps the file/default value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub backend_url: Option<String>,
    pub metric: Option<String>,
    pub poll_interval_secs: Option<f64>,
    pub consecutive: Option<u32>,
    pub threshold: Option<f64>,
    pub dry_run: bool,
    pub verbose: bool,
    pub events_path: Option<PathBuf>,
    pub upstream_path: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Apply the overrides on top of a loaded configuration.
    pub fn apply(self, config: &mut SentinelConfig) {
        if let Some(url) = self.backend_url {
            config.feed.backend_url = url;
        }
        if let Some(metric) = self.metric {
            config.feed.metric = metric;
        }
        if let Some(interval) = self.poll_interval_secs {
            config.detection.poll_interval_secs = interval;
        }
        if let Some(consecutive) = self.consecutive {
            config.detection.consecutive = consecutive;
        }
        if let Some(threshold) = self.threshold {
            config.detection.threshold = threshold;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.observability.log_level = "debug".to_string();
        }
        if let Some(path) = self.events_path {
            config.events.path = path;
        }
        if let Some(path) = self.upstream_path {
            config.upstream.path = path;
        }
    }
}

/// Parse a configuration file without validating it.
pub fn read_config(path: &Path) -> Result<SentinelConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    toml::from_str(&content).map_err(ConfigError::Parse)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SentinelConfig, ConfigError> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Build the effective configuration: optional file, then CLI overrides,
/// then validation of the merged result.
pub fn resolve_config(
    path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<SentinelConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => SentinelConfig::default(),
    };
    overrides.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
