//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing failed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Server rejected the request before streaming began.
    #[error("Request rejected ({status}): {body}")]
    RequestRejected {
        /// HTTP status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// Server answered with a success status but no body to stream.
    #[error("No response body (status {status})")]
    NoResponseBody {
        /// HTTP status code.
        status: u16,
    },

    /// The byte stream failed mid-read.
    #[error("Stream interrupted: {0}")]
    TransportInterrupted(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// HTTP status carried by a rejection, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestRejected { status, .. } | Error::NoResponseBody { status } => {
                Some(*status)
            }
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::RequestRejected { status: 404, .. })
    }

    /// Check if this is an authentication error.
    pub fn is_auth_error(&self) -> bool {
        matches!(self, Error::RequestRejected { status: 401 | 403, .. })
    }

    /// Check if this is a rate limit error.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Error::RequestRejected { status: 429, .. })
    }

    /// Check if this is a server error.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::RequestRejected { status, .. } if *status >= 500)
    }

    /// Check if the connection failed or was cut mid-stream.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Http(_) | Error::TransportInterrupted(_))
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;
