//! Error types for the notification system.

use thiserror::Error;

/// Errors that can occur when delivering a notification.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The mail server could not be reached or rejected the submission
    #[error("Mail transport failure via {server}: {reason}")]
    TransportFailure { server: String, reason: String },

    /// The message could not be built (bad address, empty recipient set)
    #[error("Invalid mail message: {0}")]
    InvalidMessage(String),
}
