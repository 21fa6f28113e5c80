//! Error taxonomy for the health engine.
//!
//! Unhealthy nodes and drives are never errors; they are ordinary
//! [`RunOutcome`](crate::router::RunOutcome) values.

use std::path::PathBuf;

use health_config::ConfigError;
use notify::DeliveryError;
use thiserror::Error;

/// Failure to obtain data from the cluster.
///
/// Any of these during a run becomes a connectivity-failure outcome.
#[derive(Debug, Clone, Error)]
pub enum AcquisitionError {
    /// The cluster endpoint could not be reached
    #[error("Cannot connect to cluster at {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    /// The cluster rejected the credentials
    #[error("Cluster authentication failed: {0}")]
    Auth(String),

    /// A query failed or returned a malformed record
    #[error("Cluster query '{query}' failed: {reason}")]
    Query { query: String, reason: String },

    /// A remote call did not complete in time
    #[error("Cluster API call '{query}' timed out")]
    Timeout { query: String },
}

impl AcquisitionError {
    pub fn query(query: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Query {
            query: query.into(),
            reason: reason.into(),
        }
    }

    /// Short machine-readable label for logs.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Auth(_) => "auth",
            Self::Query { .. } => "query",
            Self::Timeout { .. } => "timeout",
        }
    }
}

/// Failure reading or writing persisted snapshot generations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The requested generation does not exist
    #[error("Snapshot file {} does not exist", .path.display())]
    Missing { path: PathBuf },

    /// The generation exists but is not a valid snapshot document
    #[error("Snapshot file {} is corrupt: {source}", .path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Filesystem failure
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors that end a run without a normal outcome.
///
/// The binary reports these to the operator and exits non-zero.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// The single notification attempt failed; there is no fallback channel
    #[error("Failed to deliver {kind} notification: {source}")]
    Delivery {
        kind: &'static str,
        #[source]
        source: DeliveryError,
    },
}
