//! The sample-and-push loop.

use std::future::Future;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::client::MetricsClient;
use crate::config::AgentConfig;
use crate::error::Result;
use crate::sampler::{HostProbe, ProcfsProbe, Sampler};

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AgentStats {
    /// Metrics accepted by the aggregator.
    pub sent: u64,
    /// Ticks where sampling or delivery failed.
    pub failed: u64,
}

/// Sample the local host and push to the aggregator until `shutdown` completes.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the HTTP client cannot
/// be built, or the initial CPU reading fails. Failures after startup are
/// logged and counted, never returned.
pub async fn run_agent<F>(config: &AgentConfig, shutdown: F) -> Result<AgentStats>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let client = MetricsClient::with_timeout(config.server_url.clone(), config.request_timeout)?;
    let sampler = Sampler::new(config.hostname.clone(), ProcfsProbe::new())?;

    info!(
        server = %config.server_url,
        hostname = %config.hostname,
        interval_secs = config.interval.as_secs(),
        "agent started"
    );

    Ok(run_loop(sampler, &client, config.interval, shutdown).await)
}

/// Drive `sampler` on a fixed interval, pushing each sample through `client`.
///
/// The first sample is taken immediately. A failed tick is logged at `warn`
/// and the loop carries on.
pub async fn run_loop<P, F>(
    mut sampler: Sampler<P>,
    client: &MetricsClient,
    interval: Duration,
    shutdown: F,
) -> AgentStats
where
    P: HostProbe,
    F: Future<Output = ()>,
{
    let mut stats = AgentStats::default();
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            () = &mut shutdown => break,
            _ = ticker.tick() => {
                match collect_and_send(&mut sampler, client).await {
                    Ok(()) => stats.sent += 1,
                    Err(e) => {
                        stats.failed += 1;
                        warn!(error = %e, host = %sampler.hostname(), "failed to deliver metrics");
                    }
                }
            }
        }
    }

    info!(sent = stats.sent, failed = stats.failed, "agent stopped");
    stats
}

async fn collect_and_send<P: HostProbe>(
    sampler: &mut Sampler<P>,
    client: &MetricsClient,
) -> Result<()> {
    let metric = sampler.sample()?;
    client.send(&metric).await
}
