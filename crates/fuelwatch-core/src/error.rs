//! Error types for the fuelwatch system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for fuelwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the fuelwatch system
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (fatal, reported before the loop starts)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Feed source errors (fetch or decode failures)
    #[error("Feed error: {0}")]
    Feed(String),

    /// Change log errors (read or write failures)
    #[error("Change log error: {0}")]
    ChangeLog(String),

    /// Notifier errors
    #[error("Notifier error: {0}")]
    Notifier(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Source-specific error
    #[error("Provider error ({provider}): {message}")]
    Provider {
        /// Feed source or notifier name
        provider: String,
        /// Error message
        message: String,
    },

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a feed error
    pub fn feed(msg: impl Into<String>) -> Self {
        Self::Feed(msg.into())
    }

    /// Create a change log error
    pub fn change_log(msg: impl Into<String>) -> Self {
        Self::ChangeLog(msg.into())
    }

    /// Create a notifier error
    pub fn notifier(msg: impl Into<String>) -> Self {
        Self::Notifier(msg.into())
    }

    /// Create a provider-specific error
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a configuration error
    ///
    /// The daemon treats these as fatal and exits instead of retrying.
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_flagged() {
        assert!(Error::config("bad fuel").is_config());
        assert!(!Error::feed("timeout").is_config());
        assert!(!Error::change_log("disk full").is_config());
    }

    #[test]
    fn provider_error_names_the_source() {
        let err = Error::provider("economie", "HTTP 503");
        assert_eq!(err.to_string(), "Provider error (economie): HTTP 503");
    }
}
