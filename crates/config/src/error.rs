//! Error types for configuration loading.

use thiserror::Error;

/// Errors raised while loading or validating the monitor configuration.
///
/// All of these are fatal and are reported before any network call is made.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist
    #[error("Config file \"{0}\" does not exist")]
    NotFound(String),

    /// The configuration file exists but could not be read
    #[error("Failed to read config file {path}: {reason}")]
    Read { path: String, reason: String },

    /// The configuration file is not valid JSON, or a field has the wrong type
    #[error("Invalid JSON in config file: {0}")]
    Parse(#[from] serde_json::Error),

    /// One or more required fields are absent or empty
    #[error("Configuration element missing: {}", fields.join(", "))]
    MissingField { fields: Vec<String> },

    /// A field is present but its value cannot be used
    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },
}
