//! HTTP push client for the aggregator's `POST /metrics` endpoint.

use std::time::Duration;

use tracing::debug;
use watchtower_store::Metric;

use crate::error::{AgentError, Result};

/// Request timeout used by [`MetricsClient::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Posts metrics to one aggregator URL.
///
/// Cloning is cheap and shares the underlying connection pool.
#[derive(Debug, Clone)]
pub struct MetricsClient {
    http: reqwest::Client,
    url: String,
}

impl MetricsClient {
    /// Create a client for `url` with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_TIMEOUT)
    }

    /// Create a client for `url` whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            url: url.into(),
        })
    }

    /// The URL metrics are posted to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Post one metric as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Http`] if the request could not be completed and
    /// [`AgentError::Rejected`] if the server answered with a non-2xx status.
    pub async fn send(&self, metric: &Metric) -> Result<()> {
        let response = self.http.post(&self.url).json(metric).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %self.url, host = %metric.hostname, "metric delivered");
        Ok(())
    }
}
