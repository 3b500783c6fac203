//! Core types for the store.
//!
//! - [`Metric`]: one observation for one host at one instant
//! - [`TimeWindow`]: an exclusive-exclusive nanosecond window for queries

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Nanoseconds in one hour.
pub const NANOS_PER_HOUR: i64 = 3_600 * 1_000_000_000;

/// Returns the current wall-clock time as Unix epoch nanoseconds.
///
/// Saturates at `i64::MAX` past the year 2262.
#[must_use]
pub fn now_nanos() -> i64 {
    chrono::Utc::now()
        .timestamp_nanos_opt()
        .unwrap_or(i64::MAX)
}

/// Converts a duration to nanoseconds, saturating at `i64::MAX`.
#[must_use]
pub fn duration_nanos(duration: Duration) -> i64 {
    i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX)
}

/// A single host observation as pushed by an agent.
///
/// The store accepts every numeric field verbatim: the percentages are
/// nominally `0..=100` but are never range-checked, and `timestamp` is not
/// checked for skew or monotonicity. Fields missing from a JSON document
/// decode as empty or zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metric {
    /// Host identifier and partition key. Must be non-empty.
    pub hostname: String,
    /// Unix epoch timestamp in nanoseconds, as sent by the agent.
    pub timestamp: i64,
    /// CPU utilization percentage over the agent's last interval.
    pub cpu_usage: f64,
    /// Memory utilization percentage.
    pub memory_usage: f64,
    /// Root filesystem utilization percentage.
    pub disk_usage: f64,
    /// Cumulative bytes read from disk since the agent started.
    ///
    /// This is a counter, not a rate. Diff consecutive samples to get one.
    pub disk_io_read: i64,
}

impl Metric {
    /// Creates a metric for `hostname` at `timestamp` with all readings zeroed.
    #[must_use]
    pub fn new(hostname: impl Into<String>, timestamp: i64) -> Self {
        Self {
            hostname: hostname.into(),
            timestamp,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            disk_usage: 0.0,
            disk_io_read: 0,
        }
    }

    /// Sets the CPU usage and returns self for chaining.
    #[must_use]
    pub const fn with_cpu(mut self, cpu_usage: f64) -> Self {
        self.cpu_usage = cpu_usage;
        self
    }

    /// Sets the memory usage and returns self for chaining.
    #[must_use]
    pub const fn with_memory(mut self, memory_usage: f64) -> Self {
        self.memory_usage = memory_usage;
        self
    }

    /// Sets the disk usage and returns self for chaining.
    #[must_use]
    pub const fn with_disk(mut self, disk_usage: f64) -> Self {
        self.disk_usage = disk_usage;
        self
    }

    /// Sets the cumulative disk read counter and returns self for chaining.
    #[must_use]
    pub const fn with_disk_io_read(mut self, disk_io_read: i64) -> Self {
        self.disk_io_read = disk_io_read;
        self
    }
}

/// A query window over nanosecond timestamps.
///
/// Both bounds are **exclusive**. A window with `start >= end` is valid and
/// matches nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Lower bound (exclusive), in nanoseconds.
    pub start: i64,
    /// Upper bound (exclusive), in nanoseconds.
    pub end: i64,
}

impl TimeWindow {
    /// Creates a window. Never fails; degenerate windows are simply empty.
    #[must_use]
    pub const fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Creates the window `(now - duration, now)`.
    #[must_use]
    pub fn last(duration: Duration) -> Self {
        Self::ending_at(now_nanos(), duration_nanos(duration))
    }

    /// Creates the window `(now - hours, now)`.
    ///
    /// Zero or negative `hours` yield a degenerate window.
    #[must_use]
    pub fn last_hours(hours: i64) -> Self {
        Self::ending_at(now_nanos(), hours.saturating_mul(NANOS_PER_HOUR))
    }

    const fn ending_at(end: i64, span: i64) -> Self {
        Self {
            start: end.saturating_sub(span),
            end,
        }
    }

    /// Returns true if no timestamp can fall inside this window.
    #[must_use]
    pub const fn is_degenerate(&self) -> bool {
        // (start, end) exclusive holds an integer only if end - start >= 2
        self.start >= self.end.saturating_sub(1)
    }

    /// Checks if a timestamp falls strictly between the bounds.
    #[must_use]
    pub const fn contains(&self, timestamp: i64) -> bool {
        self.start < timestamp && timestamp < self.end
    }
}
