//! plugind - external data collection plugin runtime
//!
//! Runs collector jobs on a fixed schedule and streams their samples to a
//! parent monitoring agent over standard output, using the agent's
//! line-oriented plugin protocol.
//!
//! # Architecture
//!
//! - **Clock**: interval-aligned scheduling with exponential retry backoff
//! - **Protocol**: chart model and text encoder (`CHART`, `DIMENSION`, `BEGIN`/`SET`/`END`)
//! - **Jobs**: per-collector driver tying collection, encoding and scheduling together
//! - **Collectors**: the [`Collector`] trait, the job registry and reference collectors
//! - **Output**: single writer thread that keeps blocks from concurrent jobs whole
//! - **Config**: YAML configuration with per-job scheduling settings
//!
//! # Example
//!
//! ```rust
//! use plugind::protocol::{Charts, Samples};
//! use serde_json::json;
//!
//! let mut charts = Charts::new("example").with_update_every(1);
//! let chart = charts
//!     .add_chart(&json!(["requests", null, "Requests", "requests/s", "web", "example.requests"]))
//!     .unwrap();
//! chart.add_dimension(&json!(["ok", "ok", "incremental"])).unwrap();
//!
//! let data = Samples::from([("ok".to_string(), json!(12))]);
//! let mut out = String::new();
//! charts.update(&data, 1, 0, &mut out);
//! assert!(out.ends_with("BEGIN 'example.requests' 0\nSET 'ok' = 12\nEND\n"));
//! ```

pub mod clock;
pub mod collector;
pub mod config;
pub mod job;
pub mod output;
pub mod protocol;

pub use clock::{BackoffPolicy, RuntimeCounters};
pub use collector::{Collector, CollectorError, JobInfo, JobRegistry};
pub use config::{ConfigError, JobConfig, PluginConfig};
pub use job::{Job, JobContext, JobExit, JobState};
pub use output::{MemorySink, OutputBuilder, OutputError, OutputHandles, OutputWriter};
pub use protocol::{Chart, ChartDefinitions, ChartError, Charts, Dimension, Samples};
