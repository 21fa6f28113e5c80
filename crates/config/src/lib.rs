//! Configuration for the cluster health monitor.
//!
//! The monitor reads a single JSON document that supplies the cluster
//! connection parameters, the mail settings and the location of the
//! persisted snapshots:
//!
//! ```json
//! {
//!   "cluster_settings": {
//!     "cluster_address": "10.120.0.34",
//!     "cluster_name": "CoffeeTime",
//!     "username": "admin",
//!     "password": "secret",
//!     "rest_port": 8000
//!   },
//!   "email_settings": {
//!     "sender": "cluster_alerts@example.com",
//!     "server": "mail.example.com",
//!     "mail_to": ["storage-oncall@example.com"]
//!   }
//! }
//! ```
//!
//! Loading produces a validated [`MonitorConfig`] value that is passed
//! explicitly into every component; nothing here is process-global.

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

mod error;

pub use error::ConfigError;

use lettre::message::Mailbox;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `cluster_settings.password`.
pub const ENV_CLUSTER_PASSWORD: &str = "CLUSTER_HEALTH_PASSWORD";

/// Default config file name, relative to the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "config.json";

/// Default timeout for a single cluster API call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default SMTP submission port (plain relay).
pub const DEFAULT_SMTP_PORT: u16 = 25;

/// Validated monitor configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    pub cluster: ClusterSettings,
    pub email: EmailSettings,
    pub state: StateSettings,
}

/// Cluster connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSettings {
    /// Hostname or IP of the cluster REST endpoint.
    pub address: String,
    /// Display name used in alert subjects.
    pub name: String,
    pub username: String,
    pub password: String,
    pub rest_port: u16,
    pub timeout_secs: u64,
    /// Storage appliances usually ship self-signed certificates.
    pub accept_invalid_certs: bool,
}

/// Mail submission settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailSettings {
    pub sender: String,
    pub server: String,
    /// Never empty once validated.
    pub recipients: Vec<String>,
    pub port: u16,
    pub starttls: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Where the snapshot generations live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSettings {
    pub directory: PathBuf,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("."),
        }
    }
}

// =============================================================================
// On-disk document
// =============================================================================

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    #[serde(default)]
    cluster_settings: Option<RawClusterSettings>,
    #[serde(default)]
    email_settings: Option<RawEmailSettings>,
    #[serde(default)]
    state_settings: Option<RawStateSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct RawClusterSettings {
    cluster_address: Option<String>,
    cluster_name: Option<String>,
    username: Option<String>,
    password: Option<String>,
    rest_port: Option<u16>,
    timeout_secs: Option<u64>,
    accept_invalid_certs: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawEmailSettings {
    sender: Option<String>,
    server: Option<String>,
    mail_to: Option<Vec<String>>,
    port: Option<u16>,
    starttls: Option<bool>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawStateSettings {
    directory: Option<PathBuf>,
}

/// Collects missing required fields so they can be reported together.
#[derive(Default)]
struct Missing(Vec<String>);

impl Missing {
    fn string(&mut self, field: &str, value: Option<String>) -> String {
        match value {
            Some(v) if !v.trim().is_empty() => v,
            _ => {
                self.0.push(field.to_string());
                String::new()
            }
        }
    }

    fn value<T: Default>(&mut self, field: &str, value: Option<T>) -> T {
        value.unwrap_or_else(|| {
            self.0.push(field.to_string());
            T::default()
        })
    }
}

impl MonitorConfig {
    /// Load and validate the configuration file at `path`.
    ///
    /// The cluster password may come from [`ENV_CLUSTER_PASSWORD`] instead of
    /// the file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config = Self::parse(&content, std::env::var(ENV_CLUSTER_PASSWORD).ok())?;
        tracing::debug!(
            path = %path.display(),
            cluster = %config.cluster.name,
            recipients = config.email.recipients.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse and validate a configuration document.
    ///
    /// `password_override` replaces `cluster_settings.password` when set.
    pub fn parse(content: &str, password_override: Option<String>) -> Result<Self, ConfigError> {
        let raw: RawConfig = serde_json::from_str(content)?;
        Self::from_raw(raw, password_override)
    }

    fn from_raw(raw: RawConfig, password_override: Option<String>) -> Result<Self, ConfigError> {
        let mut missing = Missing::default();

        let cluster = raw.cluster_settings.unwrap_or_default();
        let email = raw.email_settings.unwrap_or_default();
        let state = raw.state_settings.unwrap_or_default();

        let password = password_override
            .filter(|p| !p.is_empty())
            .or(cluster.password);

        let cluster = ClusterSettings {
            address: missing.string("cluster_settings.cluster_address", cluster.cluster_address),
            name: missing.string("cluster_settings.cluster_name", cluster.cluster_name),
            username: missing.string("cluster_settings.username", cluster.username),
            password: missing.string("cluster_settings.password", password),
            rest_port: missing.value("cluster_settings.rest_port", cluster.rest_port),
            timeout_secs: cluster.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: cluster.accept_invalid_certs.unwrap_or(true),
        };

        let sender = missing.string("email_settings.sender", email.sender);
        let server = missing.string("email_settings.server", email.server);
        let recipients: Vec<String> = email
            .mail_to
            .unwrap_or_default()
            .into_iter()
            .map(|addr| addr.trim().to_string())
            .filter(|addr| !addr.is_empty())
            .collect();
        if recipients.is_empty() {
            missing.0.push("email_settings.mail_to".to_string());
        }

        let email = EmailSettings {
            sender,
            server,
            recipients,
            port: email.port.unwrap_or(DEFAULT_SMTP_PORT),
            starttls: email.starttls.unwrap_or(false),
            username: email.username.filter(|u| !u.is_empty()),
            password: email.password.filter(|p| !p.is_empty()),
        };

        if !missing.0.is_empty() {
            return Err(ConfigError::MissingField { fields: missing.0 });
        }

        let config = Self {
            cluster,
            email,
            state: StateSettings {
                directory: state.directory.unwrap_or_else(|| PathBuf::from(".")),
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.cluster.rest_port == 0 {
            return Err(ConfigError::InvalidField {
                field: "cluster_settings.rest_port".to_string(),
                reason: "port must be non-zero".to_string(),
            });
        }
        if self.cluster.timeout_secs == 0 {
            return Err(ConfigError::InvalidField {
                field: "cluster_settings.timeout_secs".to_string(),
                reason: "timeout must be at least one second".to_string(),
            });
        }

        check_address("email_settings.sender", &self.email.sender)?;
        for addr in &self.email.recipients {
            check_address("email_settings.mail_to", addr)?;
        }

        if self.email.username.is_some() != self.email.password.is_some() {
            return Err(ConfigError::InvalidField {
                field: "email_settings.username".to_string(),
                reason: "SMTP username and password must be set together".to_string(),
            });
        }

        Ok(())
    }
}

/// Parse `addr` as a mailbox so bad addresses fail before any cluster contact.
fn check_address(field: &str, addr: &str) -> Result<(), ConfigError> {
    addr.parse::<Mailbox>()
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidField {
            field: field.to_string(),
            reason: format!("'{addr}' is not a mail address: {e}"),
        })
}
