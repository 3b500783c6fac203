//! Error types for the watchtower-store crate.

use thiserror::Error;

/// Errors that can occur in the time-series store.
///
/// Queries never fail: unknown hosts and empty windows produce empty results.
/// Only ingest and sweeper control can report an error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The metric's hostname is unusable as a partition key.
    #[error("invalid hostname: {reason}")]
    InvalidHostname {
        /// The reason the hostname was rejected.
        reason: String,
    },

    /// `stop` was called on a sweeper that is no longer running.
    #[error("retention sweeper already stopped")]
    SweeperAlreadyStopped,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
