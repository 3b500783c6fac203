//! # watchtower-server
//!
//! HTTP+JSON aggregator for the Watchtower fleet monitor.
//!
//! Agents push one [`Metric`](watchtower_store::Metric) per collection tick;
//! dashboards and scripts read windows and latest snapshots back out. All
//! state lives in a [`TimeSeriesStore`](watchtower_store::TimeSeriesStore)
//! swept by a background retention task.
//!
//! ## Example
//!
//! ```rust,no_run
//! use watchtower_server::{AggregatorServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let server = AggregatorServer::new(config);
//!     // server.serve("0.0.0.0:8080".parse().unwrap()).await.unwrap();
//! }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/metrics` | POST | Ingest one metric |
//! | `/query?hostname=H&hours=N` | GET | Metrics from the last N hours (default 1) |
//! | `/latest` | GET | Last received metric of every host |
//! | `/summary?hostname=H&hours=N` | GET | Per-host averages, peaks and disk read rate |
//! | `/alerts` | GET | Hosts whose latest metric exceeds a threshold |
//! | `/alerts/config` | GET, POST | Read or update alert thresholds |
//! | `/health` | GET | Liveness probe |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod alerts;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use alerts::{Alert, AlertKind, AlertThresholds, ThresholdUpdate};
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::AggregatorServer;
pub use state::AppState;
