//! Aggregator server configuration.

use std::net::SocketAddr;
use std::time::Duration;

use watchtower_store::{RetentionPolicy, StoreConfig};

use crate::alerts::AlertThresholds;

/// Configuration for the aggregator server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP server to.
    pub bind_addr: SocketAddr,
    /// Retention horizon and sweep period.
    pub retention: RetentionPolicy,
    /// Optional hard cap on samples kept per host between sweeps.
    pub max_series_len: Option<usize>,
    /// Initial alert thresholds.
    pub thresholds: AlertThresholds,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            retention: RetentionPolicy::default(),
            max_series_len: None,
            thresholds: AlertThresholds::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new configuration with the specified bind address.
    #[must_use]
    pub fn new(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            ..Self::default()
        }
    }

    /// Set the retention horizon.
    #[must_use]
    pub const fn with_max_age(mut self, max_age: Duration) -> Self {
        self.retention.max_age = max_age;
        self
    }

    /// Set the sweep period.
    #[must_use]
    pub const fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.retention.sweep_interval = interval;
        self
    }

    /// Cap every host series at `max_len` samples.
    #[must_use]
    pub const fn with_max_series_len(mut self, max_len: usize) -> Self {
        self.max_series_len = Some(max_len);
        self
    }

    /// Set the initial alert thresholds.
    #[must_use]
    pub const fn with_thresholds(mut self, thresholds: AlertThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Store configuration derived from this server configuration.
    #[must_use]
    pub fn store_config(&self) -> StoreConfig {
        match self.max_series_len {
            Some(max_len) => StoreConfig::default().with_max_series_len(max_len),
            None => StoreConfig::default(),
        }
    }
}
