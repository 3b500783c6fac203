//! # watchtower-agent
//!
//! Samples host resource counters and pushes them to a Watchtower aggregator.
//!
//! Each tick the agent reads `/proc/stat`, `/proc/meminfo` and
//! `/proc/diskstats`, measures used space on `/`, and posts one
//! [`Metric`](watchtower_store::Metric) as JSON:
//!
//! - CPU usage is the busy share of CPU time since the previous tick.
//! - Memory usage is `MemTotal - MemAvailable` as a percentage.
//! - `disk_io_read` is the cumulative byte counter since boot; the
//!   aggregator stores it raw and consumers diff it.
//!
//! ## Example
//!
//! ```rust,no_run
//! use watchtower_agent::{AgentConfig, run_agent};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AgentConfig::new("http://aggregator:8080/metrics", "web-01");
//!     run_agent(&config, async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod client;
pub mod config;
pub mod error;
pub mod procfs;
pub mod sampler;

pub use agent::{AgentStats, run_agent, run_loop};
pub use client::MetricsClient;
pub use config::{AgentConfig, DEFAULT_SERVER_URL, system_hostname};
pub use error::{AgentError, Result};
pub use procfs::CpuTimes;
pub use sampler::{CpuTracker, HostProbe, ProcfsProbe, Sampler};
