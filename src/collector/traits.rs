//! Core collector trait and errors.

use thiserror::Error;

use crate::output::OutputError;
use crate::protocol::{ChartDefinitions, ChartError, Charts, Samples};

/// Errors that can occur during collection.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Network I/O error.
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),

    /// Timeout elapsed.
    #[error("timeout elapsed")]
    Timeout,

    /// Configuration error.
    #[error("config error: {0}")]
    Config(String),

    /// Chart declaration rejected.
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),

    /// The protocol pipe is gone.
    #[error("output error: {0}")]
    Output(#[from] OutputError),

    /// The preliminary collection produced no data.
    #[error("check failed: {0}")]
    CheckFailed(String),

    /// The collector cannot continue.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl CollectorError {
    /// Whether the job must stop instead of retrying.
    ///
    /// Rejected chart declarations are programming errors and never retried.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_) | Self::Output(_) | Self::Chart(_))
    }
}

/// Core collector trait for implementing data collectors.
///
/// A collector describes its charts once through [`definitions`](Self::definitions)
/// and then returns one [`Samples`] mapping per cycle. The job driver owns
/// scheduling, timeouts, backoff and encoding.
///
/// # Error Handling
///
/// - **Data gaps** (target unreachable, nothing to report): return `Ok(None)`
///   or a non-fatal error. The cycle counts as failed and is retried with
///   backoff.
/// - **Fatal errors**: return [`CollectorError::Fatal`] to stop the job. A
///   [`ChartError`] from a runtime declaration stops the job as well.
#[async_trait::async_trait]
pub trait Collector: Send + 'static {
    /// Module name, e.g. `"portcheck"`.
    fn module_name(&self) -> &str;

    /// Job name within the module. Empty for single-job modules.
    fn job_name(&self) -> &str;

    /// Chart layout created before the first cycle.
    fn definitions(&self) -> ChartDefinitions;

    /// Perform one collection cycle.
    ///
    /// `charts` may be changed to add, hide or remove charts and dimensions
    /// at runtime; changes are declared before the cycle's data.
    async fn collect(&mut self, charts: &mut Charts) -> Result<Option<Samples>, CollectorError>;
}

/// Full job name: the module name alone, or `<module>_<job>`.
pub fn job_full_name(module: &str, job: &str) -> String {
    if job.is_empty() || job == module {
        module.to_string()
    } else {
        format!("{module}_{job}")
    }
}
