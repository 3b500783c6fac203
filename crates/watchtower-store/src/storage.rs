//! In-memory per-host series storage.
//!
//! This module provides the [`TimeSeriesStore`], a map from hostname to the
//! append-ordered series of [`Metric`]s received for that host.
//!
//! # Locking
//!
//! A single `parking_lot::RwLock` guards the whole map and every series in it.
//! `insert` and `sweep` take the write lock; every query takes the read lock,
//! so readers always observe a consistent snapshot and never a half-appended
//! or half-rebuilt series. Granularity is store-wide: an insert for one host
//! blocks a query for any other host for the duration of the append.
//!
//! `sweep` holds the write lock while it rebuilds *every* series. With a large
//! fleet this is the longest critical section in the process and therefore
//! the main source of ingest and query latency spikes; sweeps slower than
//! [`StoreConfig::slow_sweep_threshold`] are logged at `warn`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{Result, StoreError};
use crate::types::{Metric, TimeWindow, duration_nanos};

/// Tuning knobs for a [`TimeSeriesStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Upper bound on the length of a single host series.
    ///
    /// `None` (the default) leaves series unbounded between sweeps. When set,
    /// an insert that would exceed the cap drops the oldest appended samples
    /// of that host.
    pub max_series_len: Option<usize>,
    /// Sweeps that hold the write lock longer than this are logged at `warn`.
    pub slow_sweep_threshold: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_series_len: None,
            slow_sweep_threshold: Duration::from_millis(250),
        }
    }
}

impl StoreConfig {
    /// Caps every host series at `max_len` samples (minimum 1).
    #[must_use]
    pub fn with_max_series_len(mut self, max_len: usize) -> Self {
        self.max_series_len = Some(max_len.max(1));
        self
    }

    /// Sets the slow-sweep warning threshold.
    #[must_use]
    pub const fn with_slow_sweep_threshold(mut self, threshold: Duration) -> Self {
        self.slow_sweep_threshold = threshold;
        self
    }
}

/// Outcome of a retention sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Number of host series visited (including already-empty ones).
    pub hosts: usize,
    /// Samples that survived the sweep.
    pub retained: usize,
    /// Samples dropped for being at or beyond the retention horizon.
    pub evicted: usize,
}

/// Thread-safe in-memory storage for host metric series.
///
/// Cloning a store is cheap and yields a handle to the same data, which is how
/// request handlers and the retention sweeper share it.
#[derive(Debug, Clone)]
pub struct TimeSeriesStore {
    config: StoreConfig,
    /// Hostname -> samples in arrival order.
    data: Arc<RwLock<HashMap<String, Vec<Metric>>>>,
}

impl TimeSeriesStore {
    /// Creates an empty store with the given configuration.
    #[must_use]
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            data: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the store configuration.
    #[must_use]
    pub const fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Appends a metric to the end of its host's series.
    ///
    /// The series is created if the host has not been seen before. Numeric
    /// fields are stored exactly as received.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidHostname` if the hostname is empty.
    #[allow(clippy::significant_drop_tightening)] // append and cap must be one critical section
    pub fn insert(&self, metric: Metric) -> Result<()> {
        if metric.hostname.is_empty() {
            return Err(StoreError::InvalidHostname {
                reason: "hostname cannot be empty".to_string(),
            });
        }

        debug!(
            host = %metric.hostname,
            cpu = metric.cpu_usage,
            memory = metric.memory_usage,
            disk = metric.disk_usage,
            "stored metric"
        );

        let mut data = self.data.write();
        let series = data.entry(metric.hostname.clone()).or_default();
        series.push(metric);

        if let Some(cap) = self.config.max_series_len {
            if series.len() > cap {
                let excess = series.len() - cap;
                series.drain(..excess);
            }
        }

        Ok(())
    }

    /// Returns the host's samples strictly inside `window`, in arrival order.
    ///
    /// An unknown host yields an empty vector, not an error.
    #[must_use]
    pub fn query(&self, hostname: &str, window: TimeWindow) -> Vec<Metric> {
        let data = self.data.read();

        data.get(hostname)
            .map(|series| filter_series(series, window))
            .unwrap_or_default()
    }

    /// Applies [`query`](Self::query) to every host.
    ///
    /// Hosts with no sample inside the window are left out of the map
    /// entirely rather than mapped to an empty vector.
    #[must_use]
    pub fn query_all(&self, window: TimeWindow) -> HashMap<String, Vec<Metric>> {
        let data = self.data.read();

        data.iter()
            .filter_map(|(hostname, series)| {
                let filtered = filter_series(series, window);
                (!filtered.is_empty()).then(|| (hostname.clone(), filtered))
            })
            .collect()
    }

    /// Returns the most recently appended sample for the host.
    ///
    /// This is arrival order, not the greatest timestamp: a delayed sample
    /// that arrives last is "latest" even if its timestamp is older.
    #[must_use]
    pub fn latest(&self, hostname: &str) -> Option<Metric> {
        let data = self.data.read();
        data.get(hostname).and_then(|series| series.last().cloned())
    }

    /// Returns the last appended sample of every host with a non-empty series.
    #[must_use]
    pub fn all_latest(&self) -> HashMap<String, Metric> {
        let data = self.data.read();

        data.iter()
            .filter_map(|(hostname, series)| {
                series.last().map(|last| (hostname.clone(), last.clone()))
            })
            .collect()
    }

    /// Drops every sample whose timestamp is not after `now - max_age`.
    ///
    /// Relative order is preserved and hosts whose series become empty stay
    /// in the store. The write lock is held for the whole pass.
    pub fn sweep(&self, now: i64, max_age: Duration) -> SweepStats {
        let cutoff = now.saturating_sub(duration_nanos(max_age));
        let started = Instant::now();

        let stats = {
            let mut data = self.data.write();
            let mut stats = SweepStats {
                hosts: data.len(),
                ..SweepStats::default()
            };

            for series in data.values_mut() {
                let before = series.len();
                series.retain(|m| m.timestamp > cutoff);
                stats.retained += series.len();
                stats.evicted += before - series.len();
            }

            stats
        };

        let elapsed = started.elapsed();
        if elapsed > self.config.slow_sweep_threshold {
            warn!(
                hosts = stats.hosts,
                elapsed_ms = elapsed.as_millis() as u64,
                "retention sweep held the store lock longer than expected"
            );
        }

        info!(
            hosts = stats.hosts,
            retained = stats.retained,
            evicted = stats.evicted,
            "cleaned up old metrics"
        );

        stats
    }

    /// Returns the number of known hosts, including those with empty series.
    #[must_use]
    pub fn host_count(&self) -> usize {
        self.data.read().len()
    }

    /// Returns the sorted list of known hostnames.
    #[must_use]
    pub fn hostnames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.data.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns the number of stored samples for a host (0 if unknown).
    #[must_use]
    pub fn series_len(&self, hostname: &str) -> usize {
        self.data.read().get(hostname).map_or(0, Vec::len)
    }

    /// Returns the number of samples across all hosts.
    #[must_use]
    pub fn total_points(&self) -> usize {
        self.data.read().values().map(Vec::len).sum()
    }

    /// Returns true if no host has ever been inserted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn filter_series(series: &[Metric], window: TimeWindow) -> Vec<Metric> {
    if window.is_degenerate() {
        return Vec::new();
    }

    series
        .iter()
        .filter(|m| window.contains(m.timestamp))
        .cloned()
        .collect()
}
