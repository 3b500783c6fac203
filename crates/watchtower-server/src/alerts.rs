//! Threshold alerts over the latest snapshot.
//!
//! Alerts are derived on demand from [`TimeSeriesStore::all_latest`]: a host
//! is alerting for a resource when its most recently received metric is
//! strictly above that resource's threshold. Nothing is persisted, so an
//! alert clears as soon as a lower reading arrives.
//!
//! [`TimeSeriesStore::all_latest`]: watchtower_store::TimeSeriesStore::all_latest

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use watchtower_store::{Metric, MetricField};

/// Per-resource percentage thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertThresholds {
    /// CPU usage threshold.
    pub cpu: f64,
    /// Memory usage threshold.
    pub memory: f64,
    /// Disk usage threshold.
    pub disk: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            cpu: 80.0,
            memory: 85.0,
            disk: 90.0,
        }
    }
}

impl AlertThresholds {
    /// Returns the threshold for a resource.
    #[must_use]
    pub const fn for_kind(&self, kind: AlertKind) -> f64 {
        match kind {
            AlertKind::Cpu => self.cpu,
            AlertKind::Memory => self.memory,
            AlertKind::Disk => self.disk,
        }
    }

    /// Applies a partial update, leaving unspecified thresholds unchanged.
    pub fn apply(&mut self, update: ThresholdUpdate) {
        if let Some(cpu) = update.cpu {
            self.cpu = cpu;
        }
        if let Some(memory) = update.memory {
            self.memory = memory;
        }
        if let Some(disk) = update.disk {
            self.disk = disk;
        }
    }
}

/// Partial threshold update as accepted by `POST /alerts/config`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ThresholdUpdate {
    /// New CPU threshold.
    pub cpu: Option<f64>,
    /// New memory threshold.
    pub memory: Option<f64>,
    /// New disk threshold.
    pub disk: Option<f64>,
}

/// The resource an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlertKind {
    /// CPU usage.
    #[serde(rename = "CPU")]
    Cpu,
    /// Memory usage.
    Memory,
    /// Disk usage.
    Disk,
}

impl AlertKind {
    /// Every alertable resource, in evaluation order.
    pub const ALL: [Self; 3] = [Self::Cpu, Self::Memory, Self::Disk];

    const fn field(self) -> MetricField {
        match self {
            Self::Cpu => MetricField::Cpu,
            Self::Memory => MetricField::Memory,
            Self::Disk => MetricField::Disk,
        }
    }
}

/// A threshold violation by one host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Offending host.
    pub hostname: String,
    /// Resource over its threshold.
    #[serde(rename = "type")]
    pub kind: AlertKind,
    /// Observed value.
    pub value: f64,
    /// Threshold it exceeded.
    pub threshold: f64,
    /// When the violation was evaluated.
    pub timestamp: DateTime<Utc>,
}

/// Evaluates every host's latest metric against the thresholds.
///
/// The result is sorted by hostname, then resource.
#[must_use]
pub fn evaluate(
    latest: &HashMap<String, Metric>,
    thresholds: &AlertThresholds,
    now: DateTime<Utc>,
) -> Vec<Alert> {
    let mut alerts: Vec<Alert> = latest
        .iter()
        .flat_map(|(hostname, metric)| {
            AlertKind::ALL.into_iter().filter_map(move |kind| {
                let value = kind.field().value(metric);
                let threshold = thresholds.for_kind(kind);
                (value > threshold).then(|| Alert {
                    hostname: hostname.clone(),
                    kind,
                    value,
                    threshold,
                    timestamp: now,
                })
            })
        })
        .collect();

    alerts.sort_by(|a, b| a.hostname.cmp(&b.hostname).then(a.kind.cmp(&b.kind)));
    alerts
}
