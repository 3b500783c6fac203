//! Periodic retention sweeping.
//!
//! Expiry is not done on the insert path. Instead a background task rebuilds
//! every host series once per [`RetentionPolicy::sweep_interval`], dropping
//! samples older than [`RetentionPolicy::max_age`]. Between sweeps series may
//! grow past the horizon; see [`StoreConfig::max_series_len`] for a hard cap.
//!
//! [`StoreConfig::max_series_len`]: crate::StoreConfig::max_series_len

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error};

use crate::error::{Result, StoreError};
use crate::storage::TimeSeriesStore;
use crate::types::now_nanos;

/// Smallest accepted sweep period.
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// How long samples are kept and how often they are swept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    /// Maximum age of a sample before it becomes eligible for removal.
    pub max_age: Duration,
    /// Period between two sweeps.
    pub sweep_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age: Duration::from_secs(24 * 3600),
            sweep_interval: Duration::from_secs(3600),
        }
    }
}

impl RetentionPolicy {
    /// Set the retention horizon.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    /// Set the sweep period.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }
}

/// Handle for controlling a running sweeper task.
///
/// Dropping the handle also stops the sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    running: Arc<AtomicBool>,
    sweeps: Arc<AtomicU64>,
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Check if the sweeper task is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Number of sweeps completed so far.
    #[must_use]
    pub fn sweeps_completed(&self) -> u64 {
        self.sweeps.load(Ordering::SeqCst)
    }

    /// Signal the sweeper to stop. Takes effect immediately, not at the next tick.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::SweeperAlreadyStopped` if it was already stopped.
    pub fn stop(&self) -> Result<()> {
        if !self.running.swap(false, Ordering::SeqCst) {
            return Err(StoreError::SweeperAlreadyStopped);
        }
        self.shutdown.send_replace(true);
        Ok(())
    }

    /// Wait for the sweeper task to exit.
    pub async fn join(mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                error!(error = %e, "retention sweeper task failed");
            }
        }
    }
}

/// Start the retention sweeper on the current tokio runtime.
///
/// The first sweep happens one full `sweep_interval` after the call.
pub fn spawn_sweeper(store: TimeSeriesStore, policy: RetentionPolicy) -> SweeperHandle {
    let running = Arc::new(AtomicBool::new(true));
    let sweeps = Arc::new(AtomicU64::new(0));
    let (shutdown, mut shutdown_rx) = watch::channel(false);

    let task_running = Arc::clone(&running);
    let task_sweeps = Arc::clone(&sweeps);
    let period = policy.sweep_interval.max(MIN_SWEEP_INTERVAL);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // interval() fires immediately; skip it so sweeps start one period out
        ticker.tick().await;

        debug!(
            max_age_secs = policy.max_age.as_secs(),
            interval_secs = period.as_secs(),
            "retention sweeper started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    store.sweep(now_nanos(), policy.max_age);
                    task_sweeps.fetch_add(1, Ordering::SeqCst);
                }
                changed = shutdown_rx.changed() => {
                    // Err means the handle was dropped
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
            }
        }

        task_running.store(false, Ordering::SeqCst);
        debug!("retention sweeper stopped");
    });

    SweeperHandle {
        running,
        sweeps,
        shutdown,
        task: Some(task),
    }
}
