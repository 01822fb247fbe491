//! Run scheduling and retry backoff for a single job.
//!
//! [`RuntimeCounters`] decides when a job runs next and how long it is held
//! back after consecutive failed cycles:
//!
//! - Runs are aligned to the `update_every` grid of the wall clock, so two jobs
//!   with the same interval collect at the same second.
//! - After `k >= 2` consecutive failures the next run is pushed back by
//!   `min(max_penalty, base * 2^(k-1))` seconds; one success clears it.
//! - The elapsed time reported to the parent is the configured interval, never
//!   the measured delta, so downstream rates stay deterministic.

use std::time::Duration;

/// Default ceiling for the retry penalty (10 minutes).
pub const DEFAULT_MAX_PENALTY: Duration = Duration::from_secs(600);

/// Exponential backoff applied after consecutive failed cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    enabled: bool,
    base: u64,
    max: u64,
}

impl BackoffPolicy {
    /// Create a policy with the given base step and ceiling (whole seconds).
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            enabled: true,
            base: base.as_secs().max(1),
            max: max.as_secs(),
        }
    }

    /// A policy that never delays.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            base: 1,
            max: 0,
        }
    }

    /// Whether failures are penalised at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Maximum penalty in seconds.
    pub fn max_penalty(&self) -> u64 {
        if self.enabled { self.max } else { 0 }
    }

    /// Penalty in seconds after `retries` consecutive failures.
    ///
    /// Zero for fewer than two failures, then doubles per failure until it
    /// reaches the ceiling.
    pub fn penalty_for(&self, retries: u32) -> u64 {
        if !self.enabled || retries < 2 {
            return 0;
        }
        let factor = 1u64.checked_shl(retries - 1).unwrap_or(u64::MAX);
        self.base.saturating_mul(factor).min(self.max)
    }
}

/// Per-job scheduling counters.
#[derive(Debug, Clone)]
pub struct RuntimeCounters {
    update_every: u64,
    backoff: BackoffPolicy,
    retries: u32,
    penalty: u64,
    runs: u64,
    collected: bool,
}

impl RuntimeCounters {
    /// Create counters for a job running every `update_every` seconds.
    ///
    /// An interval of zero is raised to one second.
    pub fn new(update_every: u64, backoff: BackoffPolicy) -> Self {
        Self {
            update_every: update_every.max(1),
            backoff,
            retries: 0,
            penalty: 0,
            runs: 1,
            collected: false,
        }
    }

    pub fn update_every(&self) -> u64 {
        self.update_every
    }

    /// Whether failures delay the schedule.
    pub fn do_penalty(&self) -> bool {
        self.backoff.is_enabled()
    }

    /// Consecutive failed cycles since the last success.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Current extra delay in seconds.
    pub fn penalty(&self) -> u64 {
        self.penalty
    }

    /// Cycle counter, starting at 1 before the first cycle runs.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Interval plus penalty; always within `[update_every, update_every + max_penalty]`.
    pub fn effective_interval(&self) -> u64 {
        self.update_every + self.penalty
    }

    /// Absolute time (seconds since the epoch) of the next run after `now`.
    pub fn next_run(&self, now: Duration) -> Duration {
        let every = Duration::from_secs(self.update_every);
        let into_slot = Duration::from_nanos((now.as_nanos() % every.as_nanos()) as u64);
        now - into_slot + every + Duration::from_secs(self.penalty)
    }

    /// How long to sleep from `now` until the next run.
    pub fn delay_until_next(&self, now: Duration) -> Duration {
        self.next_run(now).saturating_sub(now)
    }

    /// Elapsed interval to report for the coming cycle.
    ///
    /// Zero until the job has completed one successful cycle, then the
    /// configured interval.
    pub fn since_last(&self) -> u64 {
        if self.collected { self.update_every } else { 0 }
    }

    /// Register a cycle outcome.
    pub fn record(&mut self, updated: bool) {
        self.runs += 1;
        if updated {
            self.handle_success();
        } else {
            self.handle_retries();
        }
    }

    /// Register a failed cycle and grow the penalty.
    pub fn handle_retries(&mut self) {
        self.retries = self.retries.saturating_add(1);
        self.penalty = self.backoff.penalty_for(self.retries);
    }

    /// Register a successful cycle and clear any penalty.
    pub fn handle_success(&mut self) {
        self.retries = 0;
        self.penalty = 0;
        self.collected = true;
    }
}
