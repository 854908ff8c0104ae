use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{error, info, warn};
use tokio::sync::watch;

use crate::metrics::SnapshotCache;
use crate::providers::{Collector, Gateway};

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const BACKOFF_UNIT: Duration = Duration::from_secs(60);

/// How often a failed cycle is retried and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_unit: Duration) -> Self {
        Self {
            max_retries,
            backoff_unit,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before the retry that follows failed attempt `attempt` (0-based):
    /// `(attempt + 1)` backoff units.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.backoff_unit.saturating_mul(attempt.saturating_add(1))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, BACKOFF_UNIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Fetching { attempt: u32 },
    Backoff { attempt: u32, delay: Duration },
    Committed,
}

impl SchedulerState {
    pub fn phase(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Fetching { .. } => "fetching",
            Self::Backoff { .. } => "backoff",
            Self::Committed => "committed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    Committed { attempts: u32, lines: usize },
    Abandoned { attempts: u32 },
}

/// Drives periodic refreshes of the snapshot cache.
///
/// Cycles never overlap: the next one is only scheduled once the current
/// one has committed or given up. A cycle that exhausts its retries leaves
/// the previous snapshot in place.
pub struct Scheduler<G> {
    collector: Collector<G>,
    cache: Arc<SnapshotCache>,
    policy: RetryPolicy,
    interval: Duration,
    state: watch::Sender<SchedulerState>,
}

impl<G: Gateway> Scheduler<G> {
    pub fn new(collector: Collector<G>, cache: Arc<SnapshotCache>) -> Self {
        let (state, _) = watch::channel(SchedulerState::Idle);
        Self {
            collector,
            cache,
            policy: RetryPolicy::default(),
            interval: DEFAULT_REFRESH_INTERVAL,
            state,
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    #[cfg(test)]
    pub fn collector(&self) -> &Collector<G> {
        &self.collector
    }

    fn set_state(&self, state: SchedulerState) {
        self.state.send_replace(state);
    }

    /// Runs one cycle, retrying per the policy, and commits on success.
    pub async fn run_cycle(&self) -> CycleOutcome {
        let mut attempt = 0;
        info!("Fetching new metrics data...");
        loop {
            self.set_state(SchedulerState::Fetching { attempt });
            let started = Instant::now();

            match self.collector.collect().await {
                Ok(lines) => {
                    let count = lines.len();
                    self.cache.replace(lines);
                    self.set_state(SchedulerState::Committed);
                    info!(
                        "Metrics updated. Fetched {count} metrics in {:?}",
                        started.elapsed()
                    );
                    return CycleOutcome::Committed {
                        attempts: attempt + 1,
                        lines: count,
                    };
                }
                Err(e) if self.policy.should_retry(attempt) => {
                    let delay = self.policy.delay(attempt);
                    warn!(
                        "Error retrieving data: {e}, retrying in {}s ({}/{})",
                        delay.as_secs(),
                        attempt + 1,
                        self.policy.max_retries()
                    );
                    self.set_state(SchedulerState::Backoff { attempt, delay });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    error!(
                        "Giving up on refresh after {} attempts, keeping previous metrics: {e}",
                        attempt + 1
                    );
                    self.set_state(SchedulerState::Idle);
                    return CycleOutcome::Abandoned {
                        attempts: attempt + 1,
                    };
                }
            }
        }
    }

    /// Refreshes immediately, then once per interval until `shutdown` fires.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Refresh scheduler started (interval {}s)",
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                outcome = self.run_cycle() => match outcome {
                    CycleOutcome::Committed { attempts, lines } if attempts > 1 => {
                        info!("Refresh recovered after {attempts} attempts ({lines} metrics)");
                    }
                    CycleOutcome::Committed { .. } => {}
                    CycleOutcome::Abandoned { attempts } => {
                        warn!("Serving stale metrics after {attempts} failed attempts");
                    }
                },
                _ = shutdown.changed() => break,
            }

            self.set_state(SchedulerState::Idle);
            info!("Waiting {}s before next update...", self.interval.as_secs());

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("Refresh scheduler stopped");
    }
}
