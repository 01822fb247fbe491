//! TCP port check collector.
//!
//! - [`PortcheckCollector`]: TCP connect latency and status probe

mod collector;

pub use collector::{PortcheckCollector, PortcheckConfig};
