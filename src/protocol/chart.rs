//! Charts and their protocol lifecycle.
//!
//! A [`Chart`] owns its dimensions and variables and renders them into
//! protocol text. Its [`ChartState`] guarantees the parent never receives a
//! data line for a chart it has not seen declared:
//!
//! ```text
//! Pending ──declare──▶ Created { push: false } ──update──▶ Created { updated: true }
//!    ▲                     │  ▲                                   │
//!    │                 refresh│ declare                       obsolete
//!    │                     ▼  │                                   ▼
//!    └────refresh──── Created { push: true }  ◀──refresh── Obsoleted { created }
//! ```

use std::fmt::{self, Write};

use serde_json::Value;
use strum_macros::{AsRefStr, Display, EnumString};

use crate::protocol::line::{Quoted, flags};
use crate::protocol::params;
use crate::protocol::{ChartError, ChartVariable, Dimension, Samples};

/// Rendering style of a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Area,
    Stacked,
    /// Written in place of a chart type name that is not recognized.
    Absolute,
}

/// Lifecycle of a chart with respect to the parent process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartState {
    /// Never declared.
    Pending,
    /// Declared at least once. `push` means the declaration must be re-sent
    /// before the next data cycle; `updated` means a data cycle was sent.
    Created { push: bool, updated: bool },
    /// Marked obsolete. `created` tells whether the parent knows the chart.
    Obsoleted { created: bool, updated: bool },
}

/// Boolean view of a [`ChartState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartFlags {
    pub push: bool,
    pub created: bool,
    pub updated: bool,
    pub obsoleted: bool,
}

impl ChartState {
    pub fn flags(self) -> ChartFlags {
        match self {
            Self::Pending => ChartFlags {
                push: true,
                created: false,
                updated: false,
                obsoleted: false,
            },
            Self::Created { push, updated } => ChartFlags {
                push,
                created: true,
                updated,
                obsoleted: false,
            },
            Self::Obsoleted { created, updated } => ChartFlags {
                push: true,
                created,
                updated,
                obsoleted: true,
            },
        }
    }

    fn declared(self) -> Self {
        Self::Created {
            push: false,
            updated: self.flags().updated,
        }
    }

    fn collected(self) -> Self {
        Self::Created {
            push: false,
            updated: true,
        }
    }

    fn refreshed(self) -> Self {
        match self {
            Self::Pending | Self::Obsoleted { created: false, .. } => Self::Pending,
            Self::Created { updated, .. } | Self::Obsoleted { updated, .. } => Self::Created {
                push: true,
                updated,
            },
        }
    }

    fn obsoleted(self) -> Self {
        let flags = self.flags();
        Self::Obsoleted {
            created: flags.created,
            updated: flags.updated,
        }
    }
}

/// A named group of dimensions plotted together, identified by `type.id`.
#[derive(Debug, Clone)]
pub struct Chart {
    kind: String,
    id: String,
    name: String,
    title: String,
    units: String,
    family: String,
    context: String,
    chart_type: ChartType,
    hidden: bool,
    priority: u32,
    update_every: u64,
    plugin: String,
    module: String,
    job_label: String,
    dimensions: Vec<Dimension>,
    variables: Vec<ChartVariable>,
    state: ChartState,
    penalty: u64,
}

impl Chart {
    const KIND: &'static str = "chart";
    const REQUIRED: usize = 7;

    /// Create an empty chart `kind.id` with blank descriptive attributes.
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
            name: String::new(),
            title: String::new(),
            units: String::new(),
            family: String::new(),
            context: String::new(),
            chart_type: ChartType::Line,
            hidden: false,
            priority: 0,
            update_every: 1,
            plugin: String::new(),
            module: String::new(),
            job_label: String::new(),
            dimensions: Vec::new(),
            variables: Vec::new(),
            state: ChartState::Pending,
            penalty: 0,
        }
    }

    /// Build from `[type, id, name, title, units, family, context, chart_type, hidden]`.
    ///
    /// The first seven fields are required and `type`/`id` must be non-empty.
    /// A missing chart type means `line` and an unrecognized one `absolute`;
    /// the chart is hidden only when the last field is exactly `"hidden"`.
    pub fn from_params(params: &Value) -> Result<Self, ChartError> {
        let list = params::as_list(params, Self::KIND, Self::REQUIRED)?;
        let mut chart = Self::new(
            params::id(list, 0, Self::KIND)?,
            params::id(list, 1, Self::KIND)?,
        );
        chart.name = params::text(list, 2);
        chart.title = params::text(list, 3);
        chart.units = params::text(list, 4);
        chart.family = params::text(list, 5);
        chart.context = params::text(list, 6);
        let chart_type = params::text(list, 7);
        if !chart_type.is_empty() {
            chart.chart_type = chart_type.parse().unwrap_or(ChartType::Absolute);
        }
        chart.hidden = params::text(list, 8) == "hidden";
        Ok(chart)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = units.into();
        self
    }

    pub fn with_family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = context.into();
        self
    }

    pub fn with_chart_type(mut self, chart_type: ChartType) -> Self {
        self.chart_type = chart_type;
        self
    }

    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_update_every(mut self, update_every: u64) -> Self {
        self.update_every = update_every;
        self
    }

    /// Set the plugin and module names carried by the declaration.
    pub fn with_origin(mut self, plugin: impl Into<String>, module: impl Into<String>) -> Self {
        self.plugin = plugin.into();
        self.module = module.into();
        self
    }

    /// Set the `_collect_job` label value.
    pub fn with_job_label(mut self, job: impl Into<String>) -> Self {
        self.job_label = job.into();
        self
    }

    /// Chart type prefix, usually the owning job's name.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// `type.id`, the identifier the parent knows the chart by.
    pub fn full_id(&self) -> String {
        format!("{}.{}", self.kind, self.id)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn units(&self) -> &str {
        &self.units
    }

    pub fn family(&self) -> &str {
        &self.family
    }

    pub fn context(&self) -> &str {
        &self.context
    }

    pub fn chart_type(&self) -> ChartType {
        self.chart_type
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn update_every(&self) -> u64 {
        self.update_every
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn variables(&self) -> &[ChartVariable] {
        &self.variables
    }

    pub fn dimension(&self, id: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| *d == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.dimension(id).is_some()
    }

    pub fn state(&self) -> ChartState {
        self.state
    }

    pub fn flags(&self) -> ChartFlags {
        self.state.flags()
    }

    pub fn is_obsoleted(&self) -> bool {
        matches!(self.state, ChartState::Obsoleted { .. })
    }

    /// Consecutive update attempts without matching data.
    pub fn penalty(&self) -> u64 {
        self.penalty
    }

    /// Declare a dimension from its parameter list.
    pub fn add_dimension(&mut self, params: &Value) -> Result<&Dimension, ChartError> {
        self.insert_dimension(Dimension::from_params(params)?)
    }

    /// Declare an already built dimension.
    ///
    /// A dimension still waiting for its final obsolete declaration is
    /// replaced; any other id collision is an error.
    pub fn insert_dimension(&mut self, dim: Dimension) -> Result<&Dimension, ChartError> {
        let idx = match self.dimensions.iter().position(|d| *d == dim) {
            Some(idx) if self.dimensions[idx].is_obsolete() => {
                self.dimensions[idx] = dim;
                idx
            }
            Some(_) => {
                return Err(ChartError::DuplicateItem {
                    kind: "dimension",
                    id: dim.id().to_string(),
                });
            }
            None => {
                self.dimensions.push(dim);
                self.dimensions.len() - 1
            }
        };
        self.refresh();
        Ok(&self.dimensions[idx])
    }

    /// Declare a variable. Re-adding a known id keeps the existing one.
    pub fn add_variable(&mut self, params: &Value) -> Result<(), ChartError> {
        let var = ChartVariable::from_params(params)?;
        if !self.variables.contains(&var) {
            self.variables.push(var);
        }
        Ok(())
    }

    /// Remove a dimension. Unknown ids are ignored.
    ///
    /// With `hide`, the dimension stays until the next declaration has told
    /// the parent it is hidden and obsolete; otherwise it is dropped at once.
    /// Returns whether a dimension was affected.
    pub fn del_dimension(&mut self, id: &str, hide: bool) -> bool {
        let Some(idx) = self.dimensions.iter().position(|d| d == id) else {
            return false;
        };
        if hide {
            let dim = &mut self.dimensions[idx];
            dim.set_hidden(true);
            dim.set_obsolete();
        } else {
            self.dimensions.remove(idx);
        }
        self.refresh();
        true
    }

    /// Hide a dimension from graphs, or unhide it with `reverse`.
    /// Unknown ids are ignored.
    pub fn hide_dimension(&mut self, id: &str, reverse: bool) -> bool {
        let Some(dim) = self.dimensions.iter_mut().find(|d| *d == id) else {
            return false;
        };
        dim.set_hidden(!reverse);
        self.refresh();
        true
    }

    /// Whether `data` carries a key for any live dimension or variable.
    pub fn can_be_updated(&self, data: &Samples) -> bool {
        self.dimensions
            .iter()
            .any(|d| !d.is_obsolete() && data.contains_key(d.id()))
            || self.variables.iter().any(|v| data.contains_key(v.id()))
    }

    /// Force the declaration to be re-sent and clear staleness.
    pub fn refresh(&mut self) {
        self.penalty = 0;
        self.state = self.state.refreshed();
    }

    /// Append the full declaration: chart line, labels, dimensions and set
    /// variables. Dimensions pending removal are purged afterwards.
    pub fn write_create(&mut self, out: &mut String) {
        self.write_chart_line(self.hidden, false, out);
        let _ = writeln!(out, "CLABEL '_collect_job' {} '0'", Quoted(&self.job_label));
        out.push_str("CLABEL_COMMIT\n");
        for dim in &self.dimensions {
            dim.write_create(out);
        }
        for var in &self.variables {
            if let Some(value) = var.value() {
                var.write_set(value, out);
            }
        }
        self.dimensions.retain(|d| !d.is_obsolete());
        self.state = self.state.declared();
    }

    /// Mark the chart obsolete, announcing it if the parent knows the chart.
    ///
    /// Returns `false` when the chart already was obsolete.
    pub fn obsolete(&mut self, out: &mut String) -> bool {
        if self.is_obsoleted() {
            return false;
        }
        if self.flags().created {
            self.write_chart_line(self.hidden, true, out);
        }
        self.state = self.state.obsoleted();
        true
    }

    /// Emit one data cycle from `data`.
    ///
    /// Returns `false` and grows the staleness penalty when nothing in `data`
    /// belongs to this chart. Otherwise (re)declares the chart if needed and
    /// writes `BEGIN`, one `SET` per resolvable dimension, one `VARIABLE` per
    /// resolvable variable and `END`. The first cycle reports a zero interval.
    pub fn update(&mut self, data: &Samples, since_last: u64, out: &mut String) -> bool {
        if !self.can_be_updated(data) {
            self.penalty += 1;
            return false;
        }
        if self.is_obsoleted() {
            self.refresh();
        }
        if self.flags().push {
            self.write_create(out);
        }

        let since_last = if self.flags().updated { since_last } else { 0 };
        let _ = writeln!(out, "BEGIN {} {}", Quoted(&self.full_id()), since_last);
        for dim in self.dimensions.iter().filter(|d| !d.is_obsolete()) {
            if let Some(value) = dim.get_value(Some(data)) {
                dim.write_set(value, out);
            }
        }
        for var in &self.variables {
            if let Some(value) = var.get_value(Some(data)) {
                var.write_set(value, out);
            }
        }
        out.push_str("END\n");

        self.state = self.state.collected();
        self.penalty = 0;
        true
    }

    fn write_chart_line(&self, hidden: bool, obsolete: bool, out: &mut String) {
        let _ = writeln!(
            out,
            "CHART {} {} {} {} {} {} {} {} {} {} {} {}",
            Quoted(&self.full_id()),
            Quoted(&self.name),
            Quoted(&self.title),
            Quoted(&self.units),
            Quoted(&self.family),
            Quoted(&self.context),
            Quoted(self.chart_type.as_ref()),
            self.priority,
            self.update_every,
            Quoted(flags(hidden, obsolete)),
            Quoted(&self.plugin),
            Quoted(&self.module),
        );
    }
}

impl fmt::Display for Chart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl<'a> IntoIterator for &'a Chart {
    type Item = &'a Dimension;
    type IntoIter = std::slice::Iter<'a, Dimension>;

    fn into_iter(self) -> Self::IntoIter {
        self.dimensions.iter()
    }
}
