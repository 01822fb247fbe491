//! The chart collection owned by one job.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::protocol::params;
use crate::protocol::{Chart, ChartError, Samples};

/// Declarative chart layout of a collector module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDefinitions {
    /// Chart ids in declaration order.
    #[serde(default)]
    pub order: Vec<String>,
    #[serde(default)]
    pub definitions: HashMap<String, ChartDefinition>,
}

/// Positional parameters of one chart.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartDefinition {
    /// `[name, title, units, family, context, chart_type, hidden]`
    #[serde(default)]
    pub options: Vec<Value>,
    /// One `[id, name, algorithm, multiplier, divisor, hidden]` per dimension.
    #[serde(default)]
    pub lines: Vec<Value>,
    /// One `[id, value]` per variable.
    #[serde(default)]
    pub variables: Vec<Value>,
}

impl ChartDefinitions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chart definition, keeping declaration order.
    pub fn chart(mut self, id: impl Into<String>, definition: ChartDefinition) -> Self {
        let id = id.into();
        self.order.push(id.clone());
        self.definitions.insert(id, definition);
        self
    }
}

/// Charts of one job, keyed by chart id.
///
/// Every chart gets the job's full name as its type, the next priority in
/// sequence and the job's interval and origin.
#[derive(Debug, Clone)]
pub struct Charts {
    job_name: String,
    job_label: String,
    plugin: String,
    module: String,
    update_every: u64,
    next_priority: u32,
    charts: Vec<Chart>,
    pending: String,
}

impl Charts {
    /// Create an empty collection for the job with full name `job_name`.
    pub fn new(job_name: impl Into<String>) -> Self {
        let job_name = job_name.into();
        Self {
            job_label: job_name.clone(),
            job_name,
            plugin: String::new(),
            module: String::new(),
            update_every: 1,
            next_priority: 0,
            charts: Vec::new(),
            pending: String::new(),
        }
    }

    pub fn with_origin(mut self, plugin: impl Into<String>, module: impl Into<String>) -> Self {
        self.plugin = plugin.into();
        self.module = module.into();
        self
    }

    /// Value of the `_collect_job` label on every chart.
    pub fn with_job_label(mut self, label: impl Into<String>) -> Self {
        self.job_label = label.into();
        self
    }

    pub fn with_update_every(mut self, update_every: u64) -> Self {
        self.update_every = update_every;
        self
    }

    /// Priority of the first chart; each further chart gets the next one.
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.next_priority = priority;
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Chart> {
        self.charts.iter().find(|c| c.id() == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Chart> {
        self.charts.iter_mut().find(|c| c.id() == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Chart> {
        self.charts.iter()
    }

    /// Build every chart in `defs.order`, with its dimensions and variables.
    ///
    /// Ids listed in the order without a definition are skipped.
    pub fn create(&mut self, defs: &ChartDefinitions) -> Result<(), ChartError> {
        for id in &defs.order {
            let Some(def) = defs.definitions.get(id) else {
                debug!(job = %self.job_name, chart = %id, "no definition, skipping chart");
                continue;
            };
            let mut params = vec![Value::String(id.clone())];
            params.extend(def.options.iter().cloned());

            let chart = self.add_chart(&Value::Array(params))?;
            for line in &def.lines {
                chart.add_dimension(line)?;
            }
            for var in &def.variables {
                chart.add_variable(var)?;
            }
        }
        Ok(())
    }

    /// Declare a chart from `[id, name, title, units, family, context, chart_type, hidden]`.
    pub fn add_chart(&mut self, params: &Value) -> Result<&mut Chart, ChartError> {
        let chart = self.build(params)?;
        if self.contains(chart.id()) {
            return Err(ChartError::DuplicateItem {
                kind: "chart",
                id: chart.id().to_string(),
            });
        }
        let chart = chart.with_priority(self.take_priority());
        self.charts.push(chart);
        let idx = self.charts.len() - 1;
        Ok(&mut self.charts[idx])
    }

    /// Declare a chart, replacing any chart with the same id in place.
    ///
    /// The replacement keeps the old chart's priority and is declared afresh.
    pub fn replace_chart(&mut self, params: &Value) -> Result<&mut Chart, ChartError> {
        let chart = self.build(params)?;
        match self.charts.iter().position(|c| c.id() == chart.id()) {
            Some(idx) => {
                let priority = self.charts[idx].priority();
                self.charts[idx] = chart.with_priority(priority);
                Ok(&mut self.charts[idx])
            }
            None => self.add_chart(params),
        }
    }

    /// Mark a chart obsolete. The announcement goes out with the next block.
    ///
    /// Returns `false` for unknown or already obsolete charts.
    pub fn obsolete_chart(&mut self, id: &str) -> bool {
        let Some(chart) = self.charts.iter_mut().find(|c| c.id() == id) else {
            return false;
        };
        chart.obsolete(&mut self.pending)
    }

    /// Run one data cycle over every chart and return how many were updated.
    ///
    /// Pending announcements are written first. With `cleanup > 0`, a chart
    /// that has gone `cleanup` cycles without data is obsoleted; obsolete
    /// charts are skipped until matching data revives them.
    pub fn update(&mut self, data: &Samples, since_last: u64, cleanup: u64, out: &mut String) -> usize {
        out.push_str(&self.pending);
        self.pending.clear();

        let mut updated = 0;
        for chart in &mut self.charts {
            if chart.is_obsoleted() && !chart.can_be_updated(data) {
                continue;
            }
            if chart.update(data, since_last, out) {
                updated += 1;
            } else if cleanup > 0 && chart.penalty() >= cleanup {
                debug!(chart = %chart.full_id(), penalty = chart.penalty(), "obsoleting stale chart");
                chart.obsolete(out);
            }
        }
        updated
    }

    fn build(&self, params: &Value) -> Result<Chart, ChartError> {
        let list = params::as_list(params, "chart", 6)?;
        let mut full = Vec::with_capacity(list.len() + 1);
        full.push(Value::String(self.job_name.clone()));
        full.extend(list.iter().cloned());

        Ok(Chart::from_params(&Value::Array(full))?
            .with_update_every(self.update_every)
            .with_origin(self.plugin.clone(), self.module.clone())
            .with_job_label(self.job_label.clone()))
    }

    fn take_priority(&mut self) -> u32 {
        let priority = self.next_priority;
        self.next_priority = self.next_priority.saturating_add(1);
        priority
    }
}

impl<'a> IntoIterator for &'a Charts {
    type Item = &'a Chart;
    type IntoIter = std::slice::Iter<'a, Chart>;

    fn into_iter(self) -> Self::IntoIter {
        self.charts.iter()
    }
}
