//! Mail message types for cluster health notifications.

use serde::Serialize;

use crate::error::DeliveryError;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    /// The cluster reported unhealthy nodes or drives
    HealthAlert,
    /// The monitor could not reach or query the cluster
    ScriptFailure,
}

impl AlertKind {
    /// Subject line for a message about `cluster_name`.
    #[must_use]
    pub fn subject(&self, cluster_name: &str) -> String {
        match self {
            Self::HealthAlert => format!("Event alert for cluster: {cluster_name}"),
            Self::ScriptFailure => format!("Script failure for cluster: {cluster_name}"),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::HealthAlert => "health_alert",
            Self::ScriptFailure => "script_failure",
        }
    }
}

/// A non-empty set of recipient addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipients(Vec<String>);

impl Recipients {
    /// Build a recipient set, dropping blanks and duplicates.
    pub fn new(addresses: impl IntoIterator<Item = String>) -> Result<Self, DeliveryError> {
        let mut unique: Vec<String> = Vec::new();
        for addr in addresses {
            let addr = addr.trim().to_string();
            if !addr.is_empty() && !unique.contains(&addr) {
                unique.push(addr);
            }
        }

        if unique.is_empty() {
            return Err(DeliveryError::InvalidMessage(
                "recipient list is empty".to_string(),
            ));
        }
        Ok(Self(unique))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Never true for a constructed set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used in logs and the `To` header.
    #[must_use]
    pub fn joined(&self) -> String {
        self.0.join(", ")
    }
}

/// A fully composed notification ready for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    pub kind: AlertKind,
    pub subject: String,
    /// HTML body.
    pub body: String,
    pub sender: String,
    pub recipients: Recipients,
    /// Mail server host the message is submitted to.
    pub server: String,
}

impl MailMessage {
    /// Compose a message whose subject is derived from `kind` and `cluster_name`.
    #[must_use]
    pub fn new(
        kind: AlertKind,
        cluster_name: &str,
        body: String,
        sender: String,
        recipients: Recipients,
        server: String,
    ) -> Self {
        Self {
            kind,
            subject: kind.subject(cluster_name),
            body,
            sender,
            recipients,
            server,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subjects_name_cluster_and_kind() {
        assert_eq!(
            AlertKind::HealthAlert.subject("CoffeeTime"),
            "Event alert for cluster: CoffeeTime"
        );
        assert_eq!(
            AlertKind::ScriptFailure.subject("CoffeeTime"),
            "Script failure for cluster: CoffeeTime"
        );
    }

    #[test]
    fn test_recipients_reject_empty_set() {
        assert!(Recipients::new(Vec::<String>::new()).is_err());
        assert!(Recipients::new(vec![" ".to_string()]).is_err());
    }

    #[test]
    fn test_recipients_dedup_and_trim() {
        let recipients = Recipients::new(vec![
            "a@example.com".to_string(),
            " a@example.com ".to_string(),
            "b@example.com".to_string(),
        ])
        .unwrap();
        assert_eq!(recipients.len(), 2);
        assert_eq!(recipients.joined(), "a@example.com, b@example.com");
    }
}
