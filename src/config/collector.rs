//! Collector configuration structures.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::collector::portcheck::PortcheckConfig;

use super::validation::{ConfigError, expand_env_vars};

/// Collector jobs grouped by module.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorsConfig {
    /// TCP port check jobs.
    #[serde(default)]
    pub portcheck: Vec<PortcheckConfig>,
}

impl CollectorsConfig {
    /// Merge another CollectorsConfig into this one.
    #[must_use]
    pub fn merge(mut self, other: CollectorsConfig) -> Self {
        self.portcheck.extend(other.portcheck);
        self
    }

    /// Total number of configured jobs.
    pub fn job_count(&self) -> usize {
        self.portcheck.len()
    }

    /// Raise every job's interval to at least `floor` seconds.
    pub fn apply_update_every_floor(&mut self, floor: u64) {
        for portcheck in &mut self.portcheck {
            portcheck.job.apply_floor(floor);
        }
    }

    /// Validate all collector configurations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen_names = HashSet::new();

        for portcheck in &self.portcheck {
            if portcheck.job.name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "portcheck job name cannot be empty".to_string(),
                ));
            }
            if !seen_names.insert(&portcheck.job.name) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate portcheck job name: '{}'",
                    portcheck.job.name
                )));
            }
            portcheck.validate()?;
        }

        Ok(())
    }

    /// Load collector configurations from all YAML files in a directory.
    pub fn load_from_dir(dir_path: &str) -> Result<Self, ConfigError> {
        let dir = Path::new(dir_path);
        if !dir.is_dir() {
            return Err(ConfigError::ValidationError(format!(
                "collector_path '{}' is not a directory",
                dir_path
            )));
        }

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if path.is_file() && (ext == "yaml" || ext == "yml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut merged = Self::default();
        for path in paths {
            tracing::debug!("Loading collector config from: {}", path.display());
            let content = expand_env_vars(&std::fs::read_to_string(&path)?);
            let file_config: Self = serde_yaml::from_str(&content).map_err(|e| {
                ConfigError::ValidationError(format!("failed to parse '{}': {}", path.display(), e))
            })?;
            merged = merged.merge(file_config);
        }

        Ok(merged)
    }
}
