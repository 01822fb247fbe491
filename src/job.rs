//! Job lifecycle driver.
//!
//! A [`Job`] binds one collector to its chart model, scheduling counters and
//! the shared output writer. Each cycle:
//!
//! 1. sleeps until the next slot of the `update_every` grid (plus penalty)
//! 2. collects with a timeout
//! 3. encodes the samples into one block and hands it to the writer
//! 4. records success or failure in the [`RuntimeCounters`]
//!
//! Sleeping and collecting stop at once on shutdown; a block already being
//! handed over is always completed.

use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use strum_macros::{AsRefStr, Display};
use tokio::sync::watch;
use tokio::time::{Instant, timeout};
use tracing::{debug, error, info, warn};

use crate::clock::RuntimeCounters;
use crate::collector::{Collector, CollectorError, job_full_name};
use crate::config::JobConfig;
use crate::output::OutputWriter;
use crate::protocol::{Chart, Charts, Dimension, Samples};

/// Priority of the per-job runtime chart.
const RUNTIME_CHART_PRIORITY: u32 = 145_000;

/// Engine context shared by every job.
#[derive(Debug, Clone)]
pub struct JobContext {
    /// Destination of protocol blocks.
    pub writer: OutputWriter,
    /// Plugin name carried in chart declarations.
    pub plugin: String,
    /// Emit a runtime chart per job.
    pub internal_monitoring: bool,
}

impl JobContext {
    pub fn new(writer: OutputWriter, plugin: impl Into<String>) -> Self {
        Self {
            writer,
            plugin: plugin.into(),
            internal_monitoring: true,
        }
    }

    pub fn with_internal_monitoring(mut self, enabled: bool) -> Self {
        self.internal_monitoring = enabled;
        self
    }
}

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum JobState {
    /// Built but not yet cycled.
    Created,
    /// Last cycle left no penalty.
    Running,
    /// Consecutive failures are delaying the schedule.
    BackingOff,
    /// Stopped for good.
    Terminated,
}

/// Why a job's run loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobExit {
    /// Shutdown was requested.
    Shutdown,
    /// The job hit an unrecoverable error.
    Fatal(String),
}

impl std::fmt::Display for JobExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Shutdown => f.write_str("shutdown"),
            Self::Fatal(reason) => write!(f, "fatal: {reason}"),
        }
    }
}

/// One collector instance with its charts and schedule.
pub struct Job<C: Collector> {
    collector: C,
    name: String,
    config: JobConfig,
    ctx: JobContext,
    counters: RuntimeCounters,
    charts: Charts,
    runtime: Option<Chart>,
    state: JobState,
}

impl<C: Collector> std::fmt::Debug for Job<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("counters", &self.counters)
            .finish_non_exhaustive()
    }
}

impl<C: Collector> Job<C> {
    pub fn new(collector: C, config: JobConfig, ctx: JobContext) -> Self {
        let module = collector.module_name().to_string();
        let name = job_full_name(&module, collector.job_name());
        let label = match collector.job_name() {
            "" => module.clone(),
            job => job.to_string(),
        };
        let counters = RuntimeCounters::new(config.update_every, config.backoff());
        let charts = Charts::new(name.clone())
            .with_origin(ctx.plugin.clone(), module)
            .with_job_label(label)
            .with_update_every(counters.update_every())
            .with_priority(config.priority);

        Self {
            collector,
            name,
            config,
            ctx,
            counters,
            charts,
            runtime: None,
            state: JobState::Created,
        }
    }

    /// Full job name, also the type of every chart it declares.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn counters(&self) -> &RuntimeCounters {
        &self.counters
    }

    pub fn charts(&self) -> &Charts {
        &self.charts
    }

    pub fn config(&self) -> &JobConfig {
        &self.config
    }

    /// Run one preliminary collection; the job is usable only if it
    /// returns data.
    pub async fn check(&mut self) -> Result<(), CollectorError> {
        match self.collect().await? {
            Some(data) if !data.is_empty() => {
                debug!(job = %self.name, samples = data.len(), "check passed");
                Ok(())
            }
            _ => Err(CollectorError::CheckFailed(format!(
                "job '{}' returned no data",
                self.name
            ))),
        }
    }

    /// Build the chart model from the collector's definitions.
    pub fn create(&mut self) -> Result<(), CollectorError> {
        let defs = self.collector.definitions();
        self.charts.create(&defs)?;
        if self.ctx.internal_monitoring {
            self.runtime = Some(self.runtime_chart()?);
        }
        info!(job = %self.name, charts = self.charts.len(), "job created");
        Ok(())
    }

    /// Collect and emit one cycle. Returns whether any chart was updated.
    pub async fn run_cycle(&mut self) -> Result<bool, CollectorError> {
        let started = Instant::now();
        let data = self.collect().await?;
        self.emit(data, started).await
    }

    /// Cycle until shutdown is signalled or a fatal error occurs.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> JobExit {
        info!(job = %self.name, update_every = self.counters.update_every(), "job started");

        let exit = loop {
            if *shutdown.borrow() {
                break JobExit::Shutdown;
            }

            let delay = self.counters.delay_until_next(wall_clock());
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = stopped(&mut shutdown) => break JobExit::Shutdown,
            }

            let started = Instant::now();
            let data = tokio::select! {
                data = self.collect() => data,
                _ = stopped(&mut shutdown) => break JobExit::Shutdown,
            };

            let result = match data {
                Ok(data) => self.emit(data, started).await,
                Err(e) => Err(e),
            };
            if let Err(e) = result {
                error!(job = %self.name, error = %e, "job stopped");
                break JobExit::Fatal(e.to_string());
            }
        };

        self.state = JobState::Terminated;
        info!(job = %self.name, exit = %exit, runs = self.counters.runs(), "job terminated");
        exit
    }

    async fn collect(&mut self) -> Result<Option<Samples>, CollectorError> {
        match timeout(self.config.timeout, self.collector.collect(&mut self.charts)).await {
            Ok(Ok(data)) => Ok(data),
            Ok(Err(e)) if e.is_fatal() => Err(e),
            Ok(Err(e)) => {
                warn!(job = %self.name, error = %e, "collection failed");
                Ok(None)
            }
            Err(_) => {
                warn!(job = %self.name, timeout_ms = self.config.timeout.as_millis() as u64, "collection timed out");
                Ok(None)
            }
        }
    }

    async fn emit(&mut self, data: Option<Samples>, started: Instant) -> Result<bool, CollectorError> {
        let data = data.unwrap_or_default();
        let since_last = self.counters.since_last();
        let mut block = String::new();

        let updated =
            self.charts
                .update(&data, since_last, self.config.chart_cleanup, &mut block)
                > 0;
        if updated && let Some(runtime) = self.runtime.as_mut() {
            let run_time = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
            let sample = Samples::from([("run_time".to_string(), json!(run_time))]);
            runtime.update(&sample, since_last, &mut block);
        }

        self.ctx.writer.write_block(block).await?;
        self.counters.record(updated);
        self.state = if self.counters.penalty() > 0 {
            JobState::BackingOff
        } else {
            JobState::Running
        };

        if !updated {
            debug!(
                job = %self.name,
                retries = self.counters.retries(),
                penalty = self.counters.penalty(),
                "no data collected"
            );
        }
        Ok(updated)
    }

    fn runtime_chart(&self) -> Result<Chart, CollectorError> {
        let mut chart = Chart::new("netdata", format!("runtime_{}", self.name))
            .with_title(format!("Execution time for {}", self.name))
            .with_units("ms")
            .with_family(self.ctx.plugin.clone())
            .with_context("netdata.plugind_runtime")
            .with_priority(RUNTIME_CHART_PRIORITY)
            .with_update_every(self.counters.update_every())
            .with_origin(self.ctx.plugin.clone(), self.collector.module_name())
            .with_job_label(self.name.clone());
        chart.insert_dimension(Dimension::new("run_time").with_name("run time"))?;
        Ok(chart)
    }
}

/// Wall-clock time since the UNIX epoch.
fn wall_clock() -> Duration {
    let now = Utc::now();
    Duration::new(
        u64::try_from(now.timestamp()).unwrap_or(0),
        now.timestamp_subsec_nanos(),
    )
}

/// Resolves once shutdown is requested or the signal source is gone.
async fn stopped(rx: &mut watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use serde_json::Value;

    use crate::output::{MemorySink, OutputBuilder, OutputHandles};
    use crate::protocol::{ChartDefinition, ChartDefinitions};

    type Step = Result<Option<Samples>, CollectorError>;

    /// Collector replaying a fixed script, then reporting no data.
    struct ScriptedCollector {
        job: String,
        script: VecDeque<Step>,
    }

    impl ScriptedCollector {
        fn new(script: Vec<Step>) -> Self {
            Self {
                job: String::new(),
                script: script.into(),
            }
        }

        fn with_job(mut self, job: &str) -> Self {
            self.job = job.to_string();
            self
        }
    }

    #[async_trait::async_trait]
    impl Collector for ScriptedCollector {
        fn module_name(&self) -> &str {
            "mock"
        }

        fn job_name(&self) -> &str {
            &self.job
        }

        fn definitions(&self) -> ChartDefinitions {
            ChartDefinitions::new().chart(
                "traffic",
                ChartDefinition {
                    options: vec![
                        Value::Null,
                        json!("Traffic"),
                        json!("kilobits/s"),
                        json!("net"),
                        json!("mock.traffic"),
                    ],
                    lines: vec![json!(["bytes_in", "in", "incremental", 8, 1000])],
                    variables: vec![],
                },
            )
        }

        async fn collect(&mut self, _charts: &mut Charts) -> Step {
            self.script.pop_front().unwrap_or(Ok(None))
        }
    }

    fn data(value: i64) -> Step {
        Ok(Some(Samples::from([("bytes_in".to_string(), json!(value))])))
    }

    fn output() -> (MemorySink, OutputHandles) {
        let sink = MemorySink::new();
        let handles = OutputBuilder::new(sink.clone()).build().unwrap();
        (sink, handles)
    }

    fn job(script: Vec<Step>, handles: &OutputHandles) -> Job<ScriptedCollector> {
        let ctx = JobContext::new(handles.writer.clone(), "plugind");
        let mut job = Job::new(
            ScriptedCollector::new(script),
            JobConfig::default().with_update_every(1),
            ctx,
        );
        job.create().unwrap();
        job
    }

    #[tokio::test]
    async fn test_job_naming() {
        let (_sink, handles) = output();
        let ctx = JobContext::new(handles.writer.clone(), "plugind");
        let job = Job::new(
            ScriptedCollector::new(vec![]).with_job("local"),
            JobConfig::new("local"),
            ctx.clone(),
        );
        assert_eq!(job.name(), "mock_local");
        assert_eq!(job.state(), JobState::Created);

        let job = Job::new(ScriptedCollector::new(vec![]), JobConfig::default(), ctx);
        assert_eq!(job.name(), "mock");
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_check() {
        let (_sink, handles) = output();
        let ctx = JobContext::new(handles.writer.clone(), "plugind");

        let mut ok = Job::new(ScriptedCollector::new(vec![data(1)]), JobConfig::default(), ctx.clone());
        assert!(ok.check().await.is_ok());

        let mut empty = Job::new(
            ScriptedCollector::new(vec![Ok(Some(Samples::new()))]),
            JobConfig::default(),
            ctx.clone(),
        );
        assert!(matches!(empty.check().await, Err(CollectorError::CheckFailed(_))));

        let mut failing = Job::new(
            ScriptedCollector::new(vec![Err(CollectorError::Timeout)]),
            JobConfig::default(),
            ctx.clone(),
        );
        assert!(matches!(failing.check().await, Err(CollectorError::CheckFailed(_))));

        let mut fatal = Job::new(
            ScriptedCollector::new(vec![Err(CollectorError::Fatal("gone".into()))]),
            JobConfig::default(),
            ctx,
        );
        assert!(matches!(fatal.check().await, Err(CollectorError::Fatal(_))));
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_create_builds_charts() {
        let (_sink, handles) = output();
        let job = job(vec![], &handles);
        let chart = job.charts().get("traffic").unwrap();
        assert_eq!(chart.full_id(), "mock.traffic");
        assert_eq!(chart.priority(), 60_000);
        assert!(job.runtime.is_some());
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_run_cycle_emits_block() {
        let (sink, handles) = output();
        let mut job = job(vec![data(100), data(150)], &handles);

        assert!(job.run_cycle().await.unwrap());
        assert!(job.run_cycle().await.unwrap());
        handles.writer.flush().await.unwrap();

        let out = sink.contents();
        assert!(out.starts_with(
            "CHART 'mock.traffic' '' 'Traffic' 'kilobits/s' 'net' 'mock.traffic' 'line' 60000 1 '' 'plugind' 'mock'\n\
             CLABEL '_collect_job' 'mock' '0'\n\
             CLABEL_COMMIT\n\
             DIMENSION 'bytes_in' 'in' 'incremental' 8 1000 ''\n\
             BEGIN 'mock.traffic' 0\n\
             SET 'bytes_in' = 100\n\
             END\n"
        ));
        assert!(out.contains("CHART 'netdata.runtime_mock' '' 'Execution time for mock' 'ms'"));
        assert!(out.contains("BEGIN 'mock.traffic' 1\nSET 'bytes_in' = 150\nEND\n"));
        assert_eq!(out.matches("CHART 'mock.traffic'").count(), 1);
        assert_eq!(job.state(), JobState::Running);
        assert_eq!(job.counters().runs(), 3);
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_runtime_chart_disabled() {
        let (sink, handles) = output();
        let ctx = JobContext::new(handles.writer.clone(), "plugind").with_internal_monitoring(false);
        let mut job = Job::new(ScriptedCollector::new(vec![data(1)]), JobConfig::default(), ctx);
        job.create().unwrap();
        job.run_cycle().await.unwrap();
        handles.writer.flush().await.unwrap();

        assert!(!sink.contents().contains("netdata.runtime_"));
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_failures_back_off_and_success_resets() {
        let (sink, handles) = output();
        let mut job = job(
            vec![Ok(None), Err(CollectorError::Timeout), Ok(None), data(7)],
            &handles,
        );

        assert!(!job.run_cycle().await.unwrap());
        assert_eq!(job.counters().retries(), 1);
        assert_eq!(job.state(), JobState::Running);

        assert!(!job.run_cycle().await.unwrap());
        assert!(!job.run_cycle().await.unwrap());
        assert_eq!(job.counters().retries(), 3);
        assert_eq!(job.counters().penalty(), 4);
        assert_eq!(job.state(), JobState::BackingOff);
        assert_eq!(job.charts().get("traffic").unwrap().penalty(), 3);

        assert!(job.run_cycle().await.unwrap());
        assert_eq!(job.counters().retries(), 0);
        assert_eq!(job.counters().penalty(), 0);
        assert_eq!(job.state(), JobState::Running);

        handles.writer.flush().await.unwrap();
        assert!(sink.contents().contains("BEGIN 'mock.traffic' 0\nSET 'bytes_in' = 7\nEND\n"));
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_chart_cleanup_and_revival() {
        let (sink, handles) = output();
        let ctx = JobContext::new(handles.writer.clone(), "plugind").with_internal_monitoring(false);
        let mut job = Job::new(
            ScriptedCollector::new(vec![data(1), Ok(None), Ok(None), data(2)]),
            JobConfig::default().with_chart_cleanup(2).with_penalty(false),
            ctx,
        );
        job.create().unwrap();

        for _ in 0..3 {
            job.run_cycle().await.unwrap();
        }
        assert!(job.charts().get("traffic").unwrap().is_obsoleted());

        job.run_cycle().await.unwrap();
        assert!(!job.charts().get("traffic").unwrap().is_obsoleted());
        handles.writer.flush().await.unwrap();

        let lines = sink.lines();
        let obsolete = lines
            .iter()
            .position(|l| l.starts_with("CHART 'mock.traffic'") && l.contains("'obsolete'"))
            .unwrap();
        let redeclared = lines
            .iter()
            .rposition(|l| l.starts_with("CHART 'mock.traffic'") && !l.contains("'obsolete'"))
            .unwrap();
        assert!(redeclared > obsolete);
        assert_eq!(lines.last().unwrap(), "END");
        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_closed_output_is_fatal() {
        let (_sink, handles) = output();
        let mut job = job(vec![data(1)], &handles);
        handles.shutdown().await.unwrap();

        let err = job.run_cycle().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(matches!(err, CollectorError::Output(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_until_shutdown() {
        let (_sink, handles) = output();
        let mut job = job((0..100).map(data).collect(), &handles);
        let (tx, rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let exit = job.run(rx).await;
            (exit, job)
        });
        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(true).unwrap();

        let (exit, job) = task.await.unwrap();
        assert_eq!(exit, JobExit::Shutdown);
        assert_eq!(job.state(), JobState::Terminated);
        assert!(job.counters().runs() > 1);
        handles.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_fatal() {
        let (_sink, handles) = output();
        let mut job = job(
            vec![data(1), Err(CollectorError::Fatal("device removed".into()))],
            &handles,
        );
        let (_tx, rx) = watch::channel(false);

        let exit = job.run(rx).await;
        assert_eq!(exit, JobExit::Fatal("fatal: device removed".to_string()));
        assert_eq!(job.state(), JobState::Terminated);
        handles.shutdown().await.unwrap();
    }

    /// Collector that declares its chart again on every cycle.
    struct RedeclaringCollector;

    #[async_trait::async_trait]
    impl Collector for RedeclaringCollector {
        fn module_name(&self) -> &str {
            "redeclare"
        }

        fn job_name(&self) -> &str {
            ""
        }

        fn definitions(&self) -> ChartDefinitions {
            ScriptedCollector::new(vec![]).definitions()
        }

        async fn collect(&mut self, charts: &mut Charts) -> Step {
            charts.add_chart(&json!(["traffic", null, "Traffic", "kilobits/s", "net", "mock.traffic"]))?;
            data(1)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_chart_error() {
        let (sink, handles) = output();
        let ctx = JobContext::new(handles.writer.clone(), "plugind");
        let mut job = Job::new(RedeclaringCollector, JobConfig::default(), ctx);
        job.create().unwrap();
        let (_tx, rx) = watch::channel(false);

        let exit = job.run(rx).await;
        assert_eq!(
            exit,
            JobExit::Fatal("chart error: duplicate chart 'traffic'".to_string())
        );
        assert_eq!(job.state(), JobState::Terminated);
        assert_eq!(job.counters().retries(), 0);

        handles.writer.flush().await.unwrap();
        assert!(sink.contents().is_empty());
        handles.shutdown().await.unwrap();
    }

    #[test]
    fn test_job_exit_display() {
        assert_eq!(JobExit::Shutdown.to_string(), "shutdown");
        assert_eq!(JobExit::Fatal("x".into()).to_string(), "fatal: x");
    }
}
