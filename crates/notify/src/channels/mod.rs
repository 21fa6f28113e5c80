//! Notification channel implementations.

pub mod dry_run;
pub mod smtp;

use async_trait::async_trait;

use crate::error::DeliveryError;
use crate::message::MailMessage;

/// Trait for notification channels (SMTP, dry-run).
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Get the name of this channel.
    fn name(&self) -> &'static str;

    /// Deliver a message. Implementations make a single attempt.
    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError>;
}
