//! Error types for shared configuration handling.

use thiserror::Error;

/// Errors raised while loading or validating settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings sources could not be read or merged
    #[error("Configuration error: {0}")]
    Load(String),

    /// Settings were read but hold an unusable value
    #[error("Invalid setting {key}: {message}")]
    Invalid { key: String, message: String },
}

impl ConfigError {
    /// Create an invalid-value error for the given key.
    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            key: key.into(),
            message: message.into(),
        }
    }
}
