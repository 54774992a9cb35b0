//! Cluster query error definitions.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a cluster round-trip.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The call did not complete within its deadline.
    #[error("cluster call timed out after {0:?}")]
    Timeout(Duration),

    /// The poll cycle owning the call was cancelled.
    #[error("cluster call cancelled")]
    Cancelled,

    /// Transport-level failure (connection refused, reset, TLS).
    #[error("cluster request failed: {0}")]
    Http(String),

    /// The gateway answered with a non-success status.
    #[error("cluster returned {status} for {path}")]
    Status { status: u16, path: String },

    /// The response body could not be decoded.
    #[error("failed to decode cluster response: {0}")]
    Decode(String),
}

impl ClusterError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ClusterError::Cancelled)
    }

    /// Short label used for metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ClusterError::Timeout(_) => "timeout",
            ClusterError::Cancelled => "cancelled",
            ClusterError::Http(_) => "http",
            ClusterError::Status { .. } => "status",
            ClusterError::Decode(_) => "decode",
        }
    }
}

/// Result type for cluster operations.
pub type ClusterResult<T> = Result<T, ClusterError>;
