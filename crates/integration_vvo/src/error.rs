//! VVO client error types

use thiserror::Error;

/// Errors that can occur while talking to the VVO web API
#[derive(Debug, Error)]
pub enum VvoError {
    /// A point record did not have the expected nine fields
    #[error("Invalid point record: expected 9 fields, got {fields}")]
    InvalidPointRecord {
        /// Number of fields actually found
        fields: usize,
    },

    /// A field of a point record could not be interpreted
    #[error("Invalid value for {field}: {value:?}")]
    InvalidField {
        /// Name of the offending field
        field: &'static str,
        /// Raw field content
        value: String,
    },

    /// A departure or route query was made for a point that is not a stop
    #[error("Not a stop: {0}")]
    NotAStop(String),

    /// The query arguments cannot be combined
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// No embedded epoch timestamp found
    #[error("Invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The server sent a mode of transport this client does not know
    #[error("Unknown transport mode: {0}")]
    UnknownTransportMode(String),

    /// The server sent a punctuality state this client does not know
    #[error("Unknown punctuality state: {0}")]
    UnknownPunctuality(String),

    /// Failed to parse response from the VVO service
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The service answered with a non-`Ok` status
    #[error("Service returned status {code}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        /// Status code reported by the service
        code: String,
        /// Optional human readable message
        message: Option<String>,
    },

    /// HTTP request to the VVO service failed
    #[error("Request failed: {0}")]
    RequestFailed(String),

    /// Connection to the VVO service failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timeout
    #[error("Request timed out after {timeout_secs} seconds")]
    Timeout {
        /// The timeout duration in seconds
        timeout_secs: u64,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl VvoError {
    /// Returns true if this error is retryable
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed(_) | Self::RequestFailed(_) | Self::Timeout { .. }
        )
    }

    /// Returns true if the error was raised before any request was sent
    #[must_use]
    pub const fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidPointRecord { .. }
                | Self::InvalidField { .. }
                | Self::NotAStop(_)
                | Self::InvalidQuery(_)
        )
    }
}
