//! Service Errors
//!
//! Errors reported by the remote service contracts. Controllers never surface
//! these to the user directly: the chat path degrades to the canned fallback,
//! feedback failures are logged, and only the dashboard's initial load turns a
//! failure into visible state.

use thiserror::Error;

/// Errors from the QA/feedback and classroom services
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The request never produced a response (connect, timeout, I/O)
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        /// Endpoint path that was requested
        endpoint: String,
        /// The underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status
    #[error("{endpoint} returned {status}: {body}")]
    Status {
        /// Endpoint path that was requested
        endpoint: String,
        /// HTTP status code
        status: u16,
        /// Response body (may be empty)
        body: String,
    },

    /// The response body did not match the expected shape
    #[error("Malformed response from {endpoint}: {reason}")]
    Decode {
        /// Endpoint path that was requested
        endpoint: String,
        /// What went wrong while decoding
        reason: String,
    },

    /// The configured base URL cannot be joined with an endpoint path
    #[error("Invalid service URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL
        url: String,
        /// Parser message
        reason: String,
    },
}

impl ServiceError {
    /// Build a status error, mostly useful for fakes in tests
    pub fn status(endpoint: impl Into<String>, status: u16) -> Self {
        Self::Status {
            endpoint: endpoint.into(),
            status,
            body: String::new(),
        }
    }

    /// The endpoint this error relates to, when known
    #[must_use]
    pub fn endpoint(&self) -> Option<&str> {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => Some(endpoint),
            Self::InvalidUrl { .. } => None,
        }
    }

    /// Whether the service was reached at all
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }
}
