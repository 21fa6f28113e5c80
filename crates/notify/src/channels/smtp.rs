//! SMTP notification channel.

use std::time::Duration;

use async_trait::async_trait;
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, warn};

use crate::error::DeliveryError;
use crate::message::MailMessage;
use crate::NotifyChannel;

/// Default SMTP command timeout.
const DEFAULT_SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport settings shared by every message sent through the channel.
///
/// The server host travels with each [`MailMessage`].
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub port: u16,
    /// Upgrade the connection with STARTTLS before submitting.
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub timeout: Duration,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            port: 25,
            starttls: false,
            username: None,
            password: None,
            timeout: DEFAULT_SMTP_TIMEOUT,
        }
    }
}

/// SMTP submission channel backed by `lettre`.
pub struct SmtpChannel {
    settings: SmtpSettings,
}

impl SmtpChannel {
    #[must_use]
    pub const fn new(settings: SmtpSettings) -> Self {
        Self { settings }
    }

    /// Build the MIME message (single HTML part).
    pub fn build_message(message: &MailMessage) -> Result<Message, DeliveryError> {
        let from: Mailbox = message.sender.parse().map_err(|e| {
            DeliveryError::InvalidMessage(format!("invalid sender '{}': {e}", message.sender))
        })?;

        let mut builder = Message::builder()
            .from(from)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_HTML);

        for addr in message.recipients.iter() {
            let to: Mailbox = addr.parse().map_err(|e| {
                DeliveryError::InvalidMessage(format!("invalid recipient '{addr}': {e}"))
            })?;
            builder = builder.to(to);
        }

        builder
            .body(message.body.clone())
            .map_err(|e| DeliveryError::InvalidMessage(e.to_string()))
    }

    fn transport(&self, server: &str) -> Result<AsyncSmtpTransport<Tokio1Executor>, DeliveryError> {
        let builder = if self.settings.starttls {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(server).map_err(|e| {
                DeliveryError::TransportFailure {
                    server: server.to_string(),
                    reason: e.to_string(),
                }
            })?
        } else {
            // Internal relays commonly accept plain submission on port 25.
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(server)
        };

        let mut builder = builder
            .port(self.settings.port)
            .timeout(Some(self.settings.timeout));

        if let (Some(username), Some(password)) = (&self.settings.username, &self.settings.password)
        {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(builder.build())
    }
}

#[async_trait]
impl NotifyChannel for SmtpChannel {
    fn name(&self) -> &'static str {
        "smtp"
    }

    async fn send(&self, message: &MailMessage) -> Result<(), DeliveryError> {
        let email = Self::build_message(message)?;
        let mailer = self.transport(&message.server)?;

        debug!(
            channel = "smtp",
            server = %message.server,
            port = self.settings.port,
            subject = %message.subject,
            "Submitting message"
        );

        match mailer.send(email).await {
            Ok(response) => {
                debug!(channel = "smtp", code = %response.code(), "Message accepted");
                Ok(())
            }
            Err(e) => {
                warn!(
                    channel = "smtp",
                    server = %message.server,
                    error = %e,
                    "SMTP submission failed"
                );
                Err(DeliveryError::TransportFailure {
                    server: message.server.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{AlertKind, Recipients};

    fn message(sender: &str) -> MailMessage {
        MailMessage::new(
            AlertKind::HealthAlert,
            "CoffeeTime",
            "<b>body</b>".to_string(),
            sender.to_string(),
            Recipients::new(vec![
                "oncall@example.com".to_string(),
                "storage@example.com".to_string(),
            ])
            .unwrap(),
            "mail.example.com".to_string(),
        )
    }

    #[test]
    fn test_build_message_sets_headers() {
        let email = SmtpChannel::build_message(&message("alerts@example.com")).unwrap();
        let raw = String::from_utf8(email.formatted()).unwrap();

        assert!(raw.contains("Subject: Event alert for cluster: CoffeeTime"));
        assert!(raw.contains("alerts@example.com"));
        assert!(raw.contains("oncall@example.com"));
        assert!(raw.contains("storage@example.com"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("<b>body</b>"));
    }

    #[test]
    fn test_bad_sender_is_invalid_message() {
        let err = SmtpChannel::build_message(&message("not an address")).unwrap_err();
        assert!(matches!(err, DeliveryError::InvalidMessage(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_failure() {
        let channel = SmtpChannel::new(SmtpSettings {
            port: 1,
            timeout: Duration::from_secs(2),
            ..SmtpSettings::default()
        });
        let mut msg = message("alerts@example.com");
        msg.server = "127.0.0.1".to_string();

        let err = channel.send(&msg).await.unwrap_err();
        assert!(matches!(err, DeliveryError::TransportFailure { .. }));
    }
}
