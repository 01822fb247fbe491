//! Configuration module.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Plugin settings (internal monitoring, output channel capacity)
//! - Per-job scheduling (interval, backoff, chart cleanup, timeout)
//! - Collector jobs grouped by module

mod app;
mod collector;
mod job;
mod validation;

pub use app::{DEFAULT_CHANNEL_CAPACITY, INTERNAL_MONITORING_ENV, PluginConfig};
pub use collector::CollectorsConfig;
pub use job::{
    DEFAULT_CHART_CLEANUP, DEFAULT_PRIORITY, DEFAULT_TIMEOUT, DEFAULT_UPDATE_EVERY, JobConfig,
};
pub use validation::{ConfigError, expand_env_vars};
