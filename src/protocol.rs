//! Chart model and text encoder for the plugin protocol.
//!
//! A job declares [`Chart`]s made of [`Dimension`]s and [`ChartVariable`]s,
//! then feeds each cycle's [`Samples`] through [`Charts::update`], which
//! appends the protocol lines for that cycle to a caller-owned buffer.

mod chart;
mod charts;
mod dimension;
mod error;
mod line;
mod params;
pub mod sample;
mod variable;

pub use chart::{Chart, ChartFlags, ChartState, ChartType};
pub use charts::{ChartDefinition, ChartDefinitions, Charts};
pub use dimension::{Algorithm, Dimension};
pub use error::ChartError;
pub use sample::Samples;
pub use variable::ChartVariable;
