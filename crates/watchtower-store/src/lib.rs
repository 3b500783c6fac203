//! In-memory time-series store for fleet host metrics.
#![forbid(unsafe_code)]
//!
//! `watchtower-store` holds the per-host metric series that the Watchtower
//! aggregator receives from its agents. Every host gets an append-ordered
//! series; queries filter it by an exclusive time window and a periodic sweep
//! drops samples older than the retention horizon.
//!
//! # Features
//!
//! - **Append-only ingest**: samples are kept in arrival order, never re-sorted
//! - **Latest snapshot**: "latest" is the most recently appended sample
//! - **Retention sweeping**: a background task rebuilds every series on a fixed period
//! - **Single lock**: one reader/writer lock guards the whole store
//!
//! # Example
//!
//! ```rust
//! use watchtower_store::{Metric, TimeSeriesStore, TimeWindow};
//!
//! let store = TimeSeriesStore::default();
//!
//! store
//!     .insert(Metric::new("web-01", 1_000).with_cpu(42.5))
//!     .unwrap();
//!
//! let points = store.query("web-01", TimeWindow::new(900, 1_100));
//! assert_eq!(points.len(), 1);
//!
//! let latest = store.latest("web-01").unwrap();
//! assert_eq!(latest.timestamp, 1_000);
//! ```

#![doc(html_root_url = "https://docs.rs/watchtower-store/0.1.0")]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod error;
pub mod query;
pub mod retention;
pub mod storage;
pub mod types;

// Re-export main types at crate root
pub use error::{Result, StoreError};
pub use query::{Aggregation, HostSummary, MetricField, aggregate, disk_read_rate, summarize};
pub use retention::{RetentionPolicy, SweeperHandle, spawn_sweeper};
pub use storage::{StoreConfig, SweepStats, TimeSeriesStore};
pub use types::{Metric, TimeWindow, now_nanos};
