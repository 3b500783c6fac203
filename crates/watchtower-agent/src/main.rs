//! watchtower-agent - host metrics collector
//!
//! Samples this host every few seconds and pushes the readings to a
//! Watchtower aggregator.

use std::time::Duration;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use watchtower_agent::{AgentConfig, DEFAULT_SERVER_URL, run_agent, system_hostname};

#[derive(Parser)]
#[command(name = "watchtower-agent")]
#[command(about = "Watchtower host metrics agent")]
#[command(version)]
struct Cli {
    /// Aggregator ingest URL
    #[arg(long, env = "WATCHTOWER_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    server_url: String,

    /// Seconds between samples
    #[arg(long, env = "WATCHTOWER_INTERVAL_SECS", default_value_t = 5)]
    interval_secs: u64,

    /// Hostname to report (defaults to the system hostname)
    #[arg(long, env = "WATCHTOWER_HOSTNAME")]
    hostname: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, env = "WATCHTOWER_TIMEOUT_SECS", default_value_t = 5)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?)
        .init();

    let cli = Cli::parse();

    let hostname = cli.hostname.unwrap_or_else(system_hostname);
    let config = AgentConfig::new(cli.server_url, hostname)
        .with_interval(Duration::from_secs(cli.interval_secs))
        .with_request_timeout(Duration::from_secs(cli.timeout_secs));

    let stats = run_agent(&config, async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
        info!("shutdown signal received");
    })
    .await?;

    info!(sent = stats.sent, failed = stats.failed, "exiting");
    Ok(())
}
