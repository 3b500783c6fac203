//! Caller-side helpers over query results.
//!
//! The store hands back raw series. Everything here works on a slice returned
//! by [`TimeSeriesStore::query`](crate::TimeSeriesStore::query) and never takes
//! the store lock itself.
//!
//! # Example
//!
//! ```rust
//! use watchtower_store::{Aggregation, Metric, MetricField, TimeSeriesStore, TimeWindow, aggregate};
//!
//! let store = TimeSeriesStore::default();
//! store.insert(Metric::new("web-01", 10).with_cpu(20.0)).unwrap();
//! store.insert(Metric::new("web-01", 20).with_cpu(40.0)).unwrap();
//!
//! let series = store.query("web-01", TimeWindow::new(0, 100));
//! assert_eq!(aggregate(&series, MetricField::Cpu, Aggregation::Avg), Some(30.0));
//! ```

use serde::{Deserialize, Serialize};

use crate::types::Metric;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// One of the percentage readings carried by a [`Metric`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricField {
    /// `cpu_usage`
    Cpu,
    /// `memory_usage`
    Memory,
    /// `disk_usage`
    Disk,
}

impl MetricField {
    /// Every percentage field, in display order.
    pub const ALL: [Self; 3] = [Self::Cpu, Self::Memory, Self::Disk];

    /// Reads this field from a metric.
    #[must_use]
    pub const fn value(self, metric: &Metric) -> f64 {
        match self {
            Self::Cpu => metric.cpu_usage,
            Self::Memory => metric.memory_usage,
            Self::Disk => metric.disk_usage,
        }
    }

    /// Returns the field as a string.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Memory => "memory",
            Self::Disk => "disk",
        }
    }
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Aggregation functions over a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    /// Average (mean) of all values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
    /// Last appended value.
    Last,
    /// Count of samples.
    Count,
}

impl Aggregation {
    /// Applies this aggregation to a slice of values.
    ///
    /// Returns `None` if the slice is empty.
    #[must_use]
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }

        match self {
            Self::Avg => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.iter().copied().reduce(f64::min),
            Self::Max => values.iter().copied().reduce(f64::max),
            Self::Last => values.last().copied(),
            Self::Count => Some(values.len() as f64),
        }
    }
}

/// Aggregates one field over a series.
#[must_use]
pub fn aggregate(series: &[Metric], field: MetricField, aggregation: Aggregation) -> Option<f64> {
    let values: Vec<f64> = series.iter().map(|m| field.value(m)).collect();
    aggregation.apply(&values)
}

/// Average disk read throughput in bytes per second across a series.
///
/// `disk_io_read` is a cumulative counter, so this diffs the first and last
/// appended samples. Returns `None` for fewer than two samples, a
/// non-positive elapsed time, or a counter that went backwards (agent restart).
#[must_use]
pub fn disk_read_rate(series: &[Metric]) -> Option<f64> {
    let (first, last) = match series {
        [first, .., last] => (first, last),
        _ => return None,
    };

    let elapsed = last.timestamp.checked_sub(first.timestamp)?;
    let delta = last.disk_io_read.checked_sub(first.disk_io_read)?;
    if elapsed <= 0 || delta < 0 {
        return None;
    }

    Some(delta as f64 / (elapsed as f64 / NANOS_PER_SEC))
}

/// Per-host digest of a queried series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostSummary {
    /// Number of samples in the series.
    pub samples: usize,
    /// Mean CPU usage.
    pub cpu_avg: f64,
    /// Peak CPU usage.
    pub cpu_max: f64,
    /// Mean memory usage.
    pub memory_avg: f64,
    /// Peak memory usage.
    pub memory_max: f64,
    /// Mean disk usage.
    pub disk_avg: f64,
    /// Peak disk usage.
    pub disk_max: f64,
    /// Disk read throughput in bytes/s, if it can be derived.
    pub disk_read_rate: Option<f64>,
    /// Last appended sample.
    pub latest: Metric,
}

/// Summarizes a series. Returns `None` for an empty series.
#[must_use]
pub fn summarize(series: &[Metric]) -> Option<HostSummary> {
    let latest = series.last()?.clone();
    let stat = |field, agg| aggregate(series, field, agg).unwrap_or_default();

    Some(HostSummary {
        samples: series.len(),
        cpu_avg: stat(MetricField::Cpu, Aggregation::Avg),
        cpu_max: stat(MetricField::Cpu, Aggregation::Max),
        memory_avg: stat(MetricField::Memory, Aggregation::Avg),
        memory_max: stat(MetricField::Memory, Aggregation::Max),
        disk_avg: stat(MetricField::Disk, Aggregation::Avg),
        disk_max: stat(MetricField::Disk, Aggregation::Max),
        disk_read_rate: disk_read_rate(series),
        latest,
    })
}
