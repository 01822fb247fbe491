//! Chart-scoped variables.

use std::fmt::{self, Write};
use std::hash::{Hash, Hasher};

use serde_json::Value;

use crate::protocol::line::Quoted;
use crate::protocol::params;
use crate::protocol::{ChartError, Samples, sample};

/// A scalar bound to a chart but not plotted, such as an alarm threshold.
#[derive(Debug, Clone)]
pub struct ChartVariable {
    id: String,
    value: Option<i64>,
}

impl ChartVariable {
    const KIND: &'static str = "variable";

    pub fn new(id: impl Into<String>, value: Option<i64>) -> Self {
        Self {
            id: id.into(),
            value,
        }
    }

    /// Build from `[id, value]`. A missing or non-integer value leaves it unset.
    pub fn from_params(params: &Value) -> Result<Self, ChartError> {
        let list = params::as_list(params, Self::KIND, 1)?;
        Ok(Self::new(params::id(list, 0, Self::KIND)?, params::int(list, 1)))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn value(&self) -> Option<i64> {
        self.value
    }

    /// Whether the variable holds a value. Zero counts as set.
    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    /// Value of this variable in `data`, if any.
    pub fn get_value(&self, data: Option<&Samples>) -> Option<i64> {
        sample::resolve(data, &self.id)
    }

    /// Append a `VARIABLE CHART` line for `value`.
    pub fn write_set(&self, value: i64, out: &mut String) {
        let _ = writeln!(out, "VARIABLE CHART {} = {}", Quoted(&self.id), value);
    }
}

impl fmt::Display for ChartVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl PartialEq for ChartVariable {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ChartVariable {}

impl Hash for ChartVariable {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}
