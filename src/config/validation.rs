//! Errors raised while loading the plugin and job files, and the `${VAR}`
//! expansion applied to them before parsing.

use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

/// Why the plugin or a job file could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The plugin file or a file under `collector_path` is unreadable.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// A file is not valid YAML for its section.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// A job or plugin setting is out of range, or job names collide.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Replace `${VAR}` and `${VAR:-default}` references in raw file text.
///
/// Unset variables without a default expand to an empty string, so a job
/// file can leave a host or port to the parent's environment.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_REF: OnceLock<Regex> = OnceLock::new();

    let pattern = ENV_REF.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var pattern is valid")
    });

    pattern
        .replace_all(input, |caps: &Captures| {
            let fallback = caps.get(2).map_or("", |m| m.as_str());
            std::env::var(&caps[1]).unwrap_or_else(|_| fallback.to_string())
        })
        .into_owned()
}
