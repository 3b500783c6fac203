//! watchtower-server - fleet metrics aggregator
//!
//! Accepts metrics pushed by `watchtower-agent` instances and serves them
//! back over HTTP+JSON.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use watchtower_server::{AggregatorServer, ServerConfig};

#[derive(Parser)]
#[command(name = "watchtower-server")]
#[command(about = "Watchtower fleet metrics aggregator")]
#[command(version)]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "WATCHTOWER_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Discard samples older than this many seconds
    #[arg(long, env = "WATCHTOWER_MAX_AGE_SECS", default_value_t = 86_400)]
    max_age_secs: u64,

    /// Seconds between retention sweeps
    #[arg(long, env = "WATCHTOWER_SWEEP_INTERVAL_SECS", default_value_t = 3_600)]
    sweep_interval_secs: u64,

    /// Keep at most this many samples per host between sweeps
    #[arg(long, env = "WATCHTOWER_MAX_SERIES_LEN")]
    max_series_len: Option<usize>,

    /// Log output format
    #[arg(long, env = "WATCHTOWER_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))?;

    match format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let mut config = ServerConfig::new(cli.bind)
        .with_max_age(Duration::from_secs(cli.max_age_secs))
        .with_sweep_interval(Duration::from_secs(cli.sweep_interval_secs));
    if let Some(max_len) = cli.max_series_len {
        config = config.with_max_series_len(max_len);
    }

    info!("Starting Watchtower aggregator on {}", cli.bind);
    info!("  POST metrics:  http://{}/metrics", cli.bind);
    info!("  Query:         http://{}/query?hostname=H&hours=N", cli.bind);
    info!("  Latest:        http://{}/latest", cli.bind);
    info!("  Agents push via: WATCHTOWER_SERVER_URL=http://{}/metrics", cli.bind);

    let server = AggregatorServer::new(config);
    server.serve_with_shutdown(cli.bind, shutdown_signal()).await?;

    Ok(())
}
