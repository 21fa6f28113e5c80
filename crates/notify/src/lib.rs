//! Notification delivery for cluster health alerts.
//!
//! This crate is the boundary between the health engine and the outside
//! world: it accepts a composed [`MailMessage`] and hands it to exactly one
//! channel, once.
//!
//! # Usage
//!
//! ```no_run
//! # async fn example() -> Result<(), notify::DeliveryError> {
//! use notify::{AlertKind, MailMessage, Notifier, Recipients, SmtpSettings};
//!
//! let notifier = Notifier::smtp(SmtpSettings::default());
//!
//! let message = MailMessage::new(
//!     AlertKind::HealthAlert,
//!     "CoffeeTime",
//!     "<b>Node 2 offline</b>".to_string(),
//!     "cluster_alerts@example.com".to_string(),
//!     Recipients::new(vec!["oncall@example.com".to_string()])?,
//!     "mail.example.com".to_string(),
//! );
//! notifier.deliver(&message).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`NotifyChannel`] trait defines the interface for notification channels
//! - [`SmtpChannel`] submits mail through `lettre`
//! - [`DryRunChannel`] logs what would have been sent
//! - [`Notifier`] makes a single delivery attempt per message; it never
//!   retries and never batches

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod channels;
pub mod error;
pub mod message;

pub use channels::dry_run::DryRunChannel;
pub use channels::smtp::{SmtpChannel, SmtpSettings};
pub use channels::NotifyChannel;
pub use error::DeliveryError;
pub use message::{AlertKind, MailMessage, Recipients};

use std::sync::Arc;
use tracing::{error, info};

/// Single-channel notification dispatcher.
#[derive(Clone)]
pub struct Notifier {
    channel: Arc<dyn NotifyChannel>,
}

impl Notifier {
    /// Create a notifier that sends through `channel`.
    #[must_use]
    pub fn new(channel: Arc<dyn NotifyChannel>) -> Self {
        Self { channel }
    }

    /// Create a notifier backed by SMTP.
    #[must_use]
    pub fn smtp(settings: SmtpSettings) -> Self {
        Self::new(Arc::new(SmtpChannel::new(settings)))
    }

    /// Create a notifier that only logs messages.
    #[must_use]
    pub fn dry_run() -> Self {
        Self::new(Arc::new(DryRunChannel))
    }

    /// Name of the underlying channel.
    #[must_use]
    pub fn channel_name(&self) -> &'static str {
        self.channel.name()
    }

    /// Deliver `message`, making exactly one attempt.
    pub async fn deliver(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        let channel_name = self.channel.name();

        match self.channel.send(message).await {
            Ok(()) => {
                info!(
                    channel = channel_name,
                    kind = message.kind.as_str(),
                    to = %message.recipients.joined(),
                    subject = %message.subject,
                    "Notification sent"
                );
                Ok(())
            }
            Err(e) => {
                error!(
                    channel = channel_name,
                    kind = message.kind.as_str(),
                    error = %e,
                    "Failed to send notification"
                );
                Err(e)
            }
        }
    }
}
