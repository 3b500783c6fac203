//! Agent configuration.

use std::time::Duration;

use crate::client::DEFAULT_TIMEOUT;
use crate::error::{AgentError, Result};

/// Where metrics are pushed when no URL is configured.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8080/metrics";

/// Configuration for one agent process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    /// Full URL of the aggregator's ingest endpoint.
    pub server_url: String,
    /// Hostname stamped on every metric.
    pub hostname: String,
    /// Time between samples.
    pub interval: Duration,
    /// Per-request timeout for pushes.
    pub request_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            hostname: system_hostname(),
            interval: Duration::from_secs(5),
            request_timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl AgentConfig {
    /// Create a configuration pushing to `server_url` as `hostname`.
    #[must_use]
    pub fn new(server_url: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            hostname: hostname.into(),
            ..Self::default()
        }
    }

    /// Set the sampling interval.
    #[must_use]
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Check the configuration before starting.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] for an empty hostname, a zero interval
    /// or timeout, or a URL that is not `http://` or `https://`.
    pub fn validate(&self) -> Result<()> {
        if self.hostname.trim().is_empty() {
            return Err(AgentError::Config("hostname cannot be empty".to_string()));
        }
        if self.interval.is_zero() {
            return Err(AgentError::Config("interval must be positive".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(AgentError::Config(
                "request timeout must be positive".to_string(),
            ));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(AgentError::Config(format!(
                "server URL must start with http:// or https://, got {:?}",
                self.server_url
            )));
        }
        Ok(())
    }
}

/// The system hostname, or `"unknown"` if it cannot be determined.
#[must_use]
pub fn system_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
