//! Protocol output.
//!
//! A single writer thread owns standard output (or any other sink) and
//! receives complete blocks from jobs over a bounded channel:
//!
//! - [`OutputWriter`]: cloneable async sender handed to every job
//! - [`OutputBuilder`] / [`OutputHandles`]: construction and shutdown
//! - [`MemorySink`]: in-memory sink for capturing output

mod actor;
mod builder;
mod error;
mod sink;
mod writer;

pub use builder::{OutputBuilder, OutputHandles};
pub use error::OutputError;
pub use sink::MemorySink;
pub use writer::OutputWriter;
