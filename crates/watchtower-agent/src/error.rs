//! Error types for the watchtower agent.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while sampling or pushing metrics.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A counter file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A counter file had unexpected contents.
    #[error("failed to parse {what}: {reason}")]
    Parse {
        /// Which file or field was being parsed.
        what: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// The HTTP request could not be completed.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The aggregator answered with a non-success status.
    #[error("server rejected metric with status {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl AgentError {
    pub(crate) fn parse(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Parse {
            what,
            reason: reason.into(),
        }
    }
}

/// Result type for agent operations.
pub type Result<T> = std::result::Result<T, AgentError>;
