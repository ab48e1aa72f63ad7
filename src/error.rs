//! Error types for the Metrica bridge.
//!
//! Validation failures are raised before any I/O. Transport failures keep
//! the status code and body text exactly as the service returned them.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while building or executing a report request.
#[derive(Error, Debug)]
pub enum MetrikaError {
    /// A parameter failed validation. Raised before any network activity.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No operation is registered under the given name.
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// The request did not complete within the configured timeout.
    #[error("request timed out after {timeout:?}")]
    Timeout {
        /// The per-attempt timeout that elapsed.
        timeout: Duration,
    },

    /// The service answered 500, 502 or 503.
    #[error("service unavailable (HTTP {status}): {body}")]
    ServiceUnavailable {
        /// HTTP status code returned.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// The service answered with any other non-success status.
    #[error("request failed with HTTP {status}: {body}")]
    RequestFailed {
        /// HTTP status code returned.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// Low-level network failure (DNS, connection reset, TLS).
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success status came back with a body that is not JSON.
    #[error("invalid API response: {message}")]
    InvalidResponse {
        /// Description of what was invalid.
        message: String,
    },

    /// No access token was supplied.
    #[error("missing access token - set METRIKA_TOKEN or pass --token")]
    MissingToken,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Failed to read the configuration file.
    #[error("failed to read config file '{path}': {source}")]
    ConfigFileRead {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {source}")]
    ConfigParse {
        /// The underlying JSON parsing error.
        #[source]
        source: serde_json::Error,
    },
}

impl MetrikaError {
    /// Whether the transport core may retry after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::ServiceUnavailable { .. })
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServiceUnavailable { status, .. } | Self::RequestFailed { status, .. } => {
                Some(*status)
            }
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameter(message.into())
    }
}

/// Result type alias for Metrica operations.
pub type Result<T> = std::result::Result<T, MetrikaError>;
