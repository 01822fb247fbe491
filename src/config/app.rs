//! Plugin configuration structures.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::collector::CollectorsConfig;
use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default number of queued output blocks before jobs wait.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Environment variable the parent uses to switch internal charts off.
pub const INTERNAL_MONITORING_ENV: &str = "NETDATA_INTERNALS_MONITORING";

fn default_internal_monitoring() -> bool {
    true
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

// =============================================================================
// Plugin Configuration
// =============================================================================

/// Top-level plugin configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Emit a runtime chart per job (default: true).
    #[serde(default = "default_internal_monitoring")]
    pub internal_monitoring: bool,

    /// Output channel capacity in blocks (default: 1024).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Collector jobs grouped by module.
    #[serde(default)]
    pub collectors: CollectorsConfig,

    /// Path to a directory with additional collector config files.
    #[serde(default)]
    pub collector_path: Option<String>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            internal_monitoring: true,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            collectors: CollectorsConfig::default(),
            collector_path: None,
        }
    }
}

impl PluginConfig {
    /// Load configuration from a YAML file.
    ///
    /// `${VAR}` and `${VAR:-default}` references are expanded before parsing.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = expand_env_vars(&std::fs::read_to_string(path.as_ref())?);
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration including the `collector_path` directory.
    pub fn load_with_collector_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;

        if let Some(ref collector_dir) = config.collector_path {
            let additional = CollectorsConfig::load_from_dir(collector_dir)?;
            config.collectors = config.collectors.merge(additional);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be positive".to_string(),
            ));
        }

        self.collectors.validate()?;

        Ok(())
    }

    /// Whether runtime charts are emitted, honouring the parent's override.
    pub fn internal_monitoring_enabled(&self) -> bool {
        self.internal_monitoring && !std::env::var(INTERNAL_MONITORING_ENV).is_ok_and(|v| v == "NO")
    }
}
