//! Channel that logs messages instead of sending them.

use async_trait::async_trait;
use tracing::info;

use crate::error::DeliveryError;
use crate::message::MailMessage;
use crate::NotifyChannel;

/// Logs the composed message at `info` and reports success.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryRunChannel;

#[async_trait]
impl NotifyChannel for DryRunChannel {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        info!(
            channel = "dry-run",
            kind = message.kind.as_str(),
            subject = %message.subject,
            from = %message.sender,
            to = %message.recipients.joined(),
            server = %message.server,
            "Would send notification"
        );
        info!(channel = "dry-run", body = %message.body, "Notification body");
        Ok(())
    }
}
