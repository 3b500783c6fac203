//! Shared state for the aggregator server.

use std::time::Instant;

use parking_lot::RwLock;
use watchtower_store::TimeSeriesStore;

use crate::alerts::{AlertThresholds, ThresholdUpdate};
use crate::config::ServerConfig;

/// Shared state handed to every request handler.
#[derive(Debug)]
pub struct AppState {
    /// The time-series store (shared with the retention sweeper).
    store: TimeSeriesStore,
    /// Alert thresholds, adjustable at runtime.
    thresholds: RwLock<AlertThresholds>,
    /// Server start time.
    start_time: Instant,
}

impl AppState {
    /// Create state with an empty store configured from `config`.
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_store(TimeSeriesStore::new(config.store_config()), config.thresholds)
    }

    /// Create state around an existing store.
    pub fn with_store(store: TimeSeriesStore, thresholds: AlertThresholds) -> Self {
        Self {
            store,
            thresholds: RwLock::new(thresholds),
            start_time: Instant::now(),
        }
    }

    /// The time-series store.
    pub const fn store(&self) -> &TimeSeriesStore {
        &self.store
    }

    /// Current alert thresholds.
    pub fn thresholds(&self) -> AlertThresholds {
        *self.thresholds.read()
    }

    /// Apply a partial threshold update and return the result.
    pub fn update_thresholds(&self, update: ThresholdUpdate) -> AlertThresholds {
        let mut thresholds = self.thresholds.write();
        thresholds.apply(update);
        *thresholds
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
