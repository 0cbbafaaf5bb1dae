//! Error types for reportgen-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading, validating, or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (permission denied, disk full, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization error (save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path for context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`, so `~/.reportgen/` cannot be located.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,

    /// A value parsed but breaks a configuration rule.
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// A [`GenerationRequest`](crate::types::GenerationRequest) rule that was not met.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("area name must not be empty")]
    EmptyArea,

    #[error("at least one postal code is required")]
    EmptyPostalCodes,

    #[error("invalid postal code '{0}'; expected 5 digits")]
    InvalidPostalCode(String),

    #[error("lookback window must be at least one day")]
    ZeroLookback,

    #[error("choose at least one delivery option")]
    NoDeliveryIntent,

    #[error("email delivery needs at least one recipient")]
    NoRecipients,

    #[error("invalid recipient address '{0}'")]
    InvalidRecipient(String),
}
