//! Per-job scheduling configuration shared by every collector module.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{BackoffPolicy, DEFAULT_MAX_PENALTY};

use super::validation::ConfigError;

/// Default collection interval in seconds.
pub const DEFAULT_UPDATE_EVERY: u64 = 1;

/// Default number of data-less cycles before a chart is obsoleted.
pub const DEFAULT_CHART_CLEANUP: u64 = 10;

/// Default priority of a job's first chart.
pub const DEFAULT_PRIORITY: u32 = 60_000;

/// Default per-collect timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

fn default_update_every() -> u64 {
    DEFAULT_UPDATE_EVERY
}

fn default_penalty() -> bool {
    true
}

fn default_max_penalty() -> Duration {
    DEFAULT_MAX_PENALTY
}

fn default_chart_cleanup() -> u64 {
    DEFAULT_CHART_CLEANUP
}

fn default_priority() -> u32 {
    DEFAULT_PRIORITY
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

/// Scheduling and lifecycle settings of one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    /// Job name within its module. Empty for the module's only job.
    #[serde(default)]
    pub name: String,

    /// Collection interval in seconds (default: 1).
    #[serde(default = "default_update_every")]
    pub update_every: u64,

    /// Back off after consecutive failed cycles (default: true).
    #[serde(default = "default_penalty")]
    pub penalty: bool,

    /// Backoff ceiling (default: 10m).
    #[serde(default = "default_max_penalty", with = "humantime_serde")]
    pub max_penalty: Duration,

    /// Data-less cycles before a chart is obsoleted; 0 disables (default: 10).
    #[serde(default = "default_chart_cleanup")]
    pub chart_cleanup: u64,

    /// Priority of the job's first chart (default: 60000).
    #[serde(default = "default_priority")]
    pub priority: u32,

    /// Per-collect timeout (default: 5s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            update_every: DEFAULT_UPDATE_EVERY,
            penalty: true,
            max_penalty: DEFAULT_MAX_PENALTY,
            chart_cleanup: DEFAULT_CHART_CLEANUP,
            priority: DEFAULT_PRIORITY,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl JobConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_update_every(mut self, update_every: u64) -> Self {
        self.update_every = update_every;
        self
    }

    pub fn with_penalty(mut self, penalty: bool) -> Self {
        self.penalty = penalty;
        self
    }

    pub fn with_max_penalty(mut self, max_penalty: Duration) -> Self {
        self.max_penalty = max_penalty;
        self
    }

    pub fn with_chart_cleanup(mut self, chart_cleanup: u64) -> Self {
        self.chart_cleanup = chart_cleanup;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Raise the interval to at least `floor` seconds.
    pub fn apply_floor(&mut self, floor: u64) {
        self.update_every = self.update_every.max(floor);
    }

    /// Backoff policy derived from these settings.
    pub fn backoff(&self) -> BackoffPolicy {
        if self.penalty {
            BackoffPolicy::new(Duration::from_secs(self.update_every), self.max_penalty)
        } else {
            BackoffPolicy::disabled()
        }
    }

    /// Validate the settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.update_every == 0 {
            return Err(ConfigError::ValidationError(format!(
                "job '{}': update_every must be at least 1",
                self.name
            )));
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::ValidationError(format!(
                "job '{}': timeout must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_config_defaults_from_yaml() {
        let config: JobConfig = serde_yaml::from_str("name: local").unwrap();
        assert_eq!(config, JobConfig::new("local"));
        assert_eq!(config.update_every, 1);
        assert!(config.penalty);
        assert_eq!(config.max_penalty, Duration::from_secs(600));
        assert_eq!(config.chart_cleanup, 10);
        assert_eq!(config.priority, 60_000);
    }

    #[test]
    fn test_job_config_humantime_fields() {
        let config: JobConfig =
            serde_yaml::from_str("update_every: 5\nmax_penalty: 2m\ntimeout: 500ms").unwrap();
        assert_eq!(config.update_every, 5);
        assert_eq!(config.max_penalty, Duration::from_secs(120));
        assert_eq!(config.timeout, Duration::from_millis(500));
    }

    #[test]
    fn test_job_config_floor() {
        let mut config = JobConfig::default().with_update_every(2);
        config.apply_floor(5);
        assert_eq!(config.update_every, 5);
        config.apply_floor(1);
        assert_eq!(config.update_every, 5);
    }

    #[test]
    fn test_job_config_backoff() {
        let config = JobConfig::default()
            .with_update_every(10)
            .with_max_penalty(Duration::from_secs(60));
        let backoff = config.backoff();
        assert_eq!(backoff.penalty_for(2), 20);
        assert_eq!(backoff.penalty_for(5), 60);

        let config = config.with_penalty(false);
        assert!(!config.backoff().is_enabled());
    }

    #[test]
    fn test_job_config_validate() {
        assert!(JobConfig::default().validate().is_ok());

        let err = JobConfig::new("x").with_update_every(0).validate().unwrap_err();
        assert!(err.to_string().contains("update_every"));

        let err = JobConfig::new("x")
            .with_timeout(Duration::ZERO)
            .validate()
            .unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }
}
