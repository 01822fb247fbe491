//! Collector Layer
//!
//! Data collection framework: collectors produce one sample mapping per
//! cycle and jobs turn those samples into protocol output. Each job runs in
//! its own Tokio task.
//!
//! # Architecture
//!
//! - [`Collector`]: Core trait for implementing data collectors
//! - [`JobRegistry`]: Starts jobs and manages their lifecycle and shutdown
//! - [`portcheck`]: TCP port check reference collector
//!
//! # Example
//!
//! ```rust,no_run
//! use plugind::collector::portcheck::{PortcheckCollector, PortcheckConfig};
//! use plugind::{JobContext, JobRegistry, OutputBuilder};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let output = OutputBuilder::stdout().build()?;
//! let registry = JobRegistry::new(JobContext::new(output.writer.clone(), "plugind"));
//! let config = PortcheckConfig::new("redis", "127.0.0.1", 6379).with_update_every(5);
//! let job = config.job.clone();
//! registry.spawn(PortcheckCollector::new(config), job).await?;
//! # Ok(())
//! # }
//! ```

pub mod portcheck;
mod registry;
mod traits;

pub use registry::{DEFAULT_SHUTDOWN_TIMEOUT, JobInfo, JobRegistry};
pub use traits::{Collector, CollectorError, job_full_name};
