//! Error types for the address-book reconciliation system
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for reconciliation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the reconciliation system
#[derive(Error, Debug)]
pub enum Error {
    /// Address source errors not tied to a specific fetch
    #[error("Address source error: {0}")]
    Source(String),

    /// A source fetch failed; the whole run is aborted
    #[error("Source fetch failed ({source_name}): {message}")]
    SourceFetch {
        /// Source label (URL, host or factory name)
        source_name: String,
        /// Error message
        message: String,
    },

    /// Device session errors (lock, apply, commit)
    #[error("Device error: {0}")]
    Device(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Differ or planner precondition violated (unsorted or
    /// differently-normalized inputs). Never recovered from.
    #[error("Contract violation: {0}")]
    Contract(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an address source error
    pub fn source(msg: impl Into<String>) -> Self {
        Self::Source(msg.into())
    }

    /// Create a source fetch error
    pub fn source_fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceFetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a device error
    pub fn device(msg: impl Into<String>) -> Self {
        Self::Device(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create a contract violation error
    pub fn contract(msg: impl Into<String>) -> Self {
        Self::Contract(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Whether this error came from a source fetch
    pub fn is_source_failure(&self) -> bool {
        matches!(self, Self::Source(_) | Self::SourceFetch { .. } | Self::Http(_))
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
