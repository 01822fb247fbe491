//! Job registry for managing job lifecycle.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::collector::{Collector, CollectorError};
use crate::config::JobConfig;
use crate::job::{Job, JobContext, JobExit};

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Metadata about a registered job.
#[derive(Debug, Clone)]
pub struct JobInfo {
    /// Job UUID.
    pub id: uuid::Uuid,
    /// Full job name.
    pub name: String,
    /// Schedule description.
    pub schedule: String,
    /// When the job task was started.
    pub started_at: DateTime<Utc>,
    /// How the job ended, once it has.
    pub exit: Option<JobExit>,
}

struct JobEntry {
    info: JobInfo,
    stop: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

/// Registry for managing concurrently running jobs.
///
/// Every job runs in its own Tokio task and owns its collector, charts and
/// counters; the registry only keeps the handles needed to stop and observe
/// them.
pub struct JobRegistry {
    ctx: JobContext,
    jobs: Arc<RwLock<HashMap<uuid::Uuid, JobEntry>>>,
    active: Arc<watch::Sender<usize>>,
}

impl JobRegistry {
    /// Create a new job registry sharing `ctx` with every job.
    pub fn new(ctx: JobContext) -> Self {
        Self {
            ctx,
            jobs: Arc::new(RwLock::new(HashMap::new())),
            active: Arc::new(watch::Sender::new(0)),
        }
    }
}

impl std::fmt::Debug for JobRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JobRegistry")
            .field(
                "job_count",
                &self.jobs.try_read().map(|j| j.len()).unwrap_or(0),
            )
            .field("active", &*self.active.borrow())
            .finish_non_exhaustive()
    }
}

impl JobRegistry {
    /// Check, create and start a job.
    ///
    /// The job is not started when its check collection returns no data or
    /// its charts cannot be built.
    pub async fn spawn<C: Collector>(
        &self,
        collector: C,
        config: JobConfig,
    ) -> Result<uuid::Uuid, CollectorError> {
        let mut job = Job::new(collector, config, self.ctx.clone());
        let name = job.name().to_string();

        job.check()
            .await
            .inspect_err(|e| tracing::warn!(job = %name, error = %e, "Job check failed"))?;
        job.create()
            .inspect_err(|e| tracing::error!(job = %name, error = %e, "Job create failed"))?;

        let job_id = uuid::Uuid::new_v4();
        let schedule = format!("every {}s", job.counters().update_every());
        let (stop, stop_rx) = watch::channel(false);

        // Hold the lock until the entry is in place so the task cannot
        // record its exit before the entry exists.
        let mut jobs = self.jobs.write().await;
        self.active.send_modify(|n| *n += 1);
        let handle = tokio::spawn(run_job(
            job,
            job_id,
            stop_rx,
            Arc::clone(&self.jobs),
            Arc::clone(&self.active),
        ));
        jobs.insert(
            job_id,
            JobEntry {
                info: JobInfo {
                    id: job_id,
                    name: name.clone(),
                    schedule: schedule.clone(),
                    started_at: Utc::now(),
                    exit: None,
                },
                stop,
                handle: Some(handle),
            },
        );

        tracing::info!(job = %name, job_id = %job_id, schedule = %schedule, "Job registered");
        Ok(job_id)
    }

    /// List all registered jobs, sorted by name.
    pub async fn list_jobs(&self) -> Vec<JobInfo> {
        let mut jobs: Vec<_> = self
            .jobs
            .read()
            .await
            .values()
            .map(|e| e.info.clone())
            .collect();
        jobs.sort_by(|a, b| a.name.cmp(&b.name));
        jobs
    }

    /// Get the number of registered jobs, finished ones included.
    pub async fn job_count(&self) -> usize {
        self.jobs.read().await.len()
    }

    /// Number of jobs still running.
    pub fn active_count(&self) -> usize {
        *self.active.borrow()
    }

    /// Wait until no job is running.
    pub async fn wait_idle(&self) {
        let mut rx = self.active.subscribe();
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Stop and remove a specific job by ID.
    pub async fn remove(&self, job_id: &uuid::Uuid) -> Result<(), CollectorError> {
        let entry = self.jobs.write().await.remove(job_id);
        let Some(mut entry) = entry else {
            return Err(CollectorError::Config(format!("unknown job '{job_id}'")));
        };

        let _ = entry.stop.send(true);
        if let Some(handle) = entry.handle.take() {
            let _ = handle.await;
        }

        tracing::info!(job = %entry.info.name, job_id = %job_id, "Job removed");
        Ok(())
    }

    /// Gracefully stop every job with default timeout.
    pub async fn shutdown(self) -> Result<(), CollectorError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Shutdown with custom timeout. Jobs still running afterwards are aborted.
    pub async fn shutdown_with_timeout(self, timeout: Duration) -> Result<(), CollectorError> {
        let mut handles = Vec::new();
        {
            let mut jobs = self.jobs.write().await;
            for entry in jobs.values_mut() {
                let _ = entry.stop.send(true);
                if let Some(handle) = entry.handle.take() {
                    handles.push(handle);
                }
            }
        }
        let job_count = handles.len();

        let aborts: Vec<_> = handles.iter().map(|h| h.abort_handle()).collect();
        let joined = tokio::time::timeout(timeout, async {
            for handle in handles {
                let _ = handle.await;
            }
        })
        .await;

        if joined.is_err() {
            for abort in aborts {
                abort.abort();
            }
            tracing::warn!(job_count, "Job shutdown timed out");
        } else {
            tracing::info!(job_count, "Job shutdown complete");
        }
        Ok(())
    }
}

/// Drive one job to completion and record how it ended.
async fn run_job<C: Collector>(
    mut job: Job<C>,
    job_id: uuid::Uuid,
    stop: watch::Receiver<bool>,
    jobs: Arc<RwLock<HashMap<uuid::Uuid, JobEntry>>>,
    active: Arc<watch::Sender<usize>>,
) {
    let exit = job.run(stop).await;
    if let JobExit::Fatal(reason) = &exit {
        tracing::error!(job = %job.name(), job_id = %job_id, reason = %reason, "Job failed");
    }

    if let Some(entry) = jobs.write().await.get_mut(&job_id) {
        entry.info.exit = Some(exit);
    }
    active.send_modify(|n| *n = n.saturating_sub(1));
}
