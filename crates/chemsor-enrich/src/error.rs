//! Error types for external identifier lookups.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LookupError {
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Malformed base URL or path segment.
    #[error("invalid {service} URL: {message}")]
    Url {
        service: &'static str,
        message: String,
    },

    /// Connection or transport failure.
    #[error("{service} request failed: {message}")]
    Network {
        service: &'static str,
        message: String,
    },

    #[error("{service} request timed out")]
    Timeout { service: &'static str },

    /// Non-success status other than 404.
    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    /// Body did not have the expected shape.
    #[error("malformed {service} response: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },
}

impl LookupError {
    /// Returns true if the request may succeed when repeated.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Client(_) | Self::Url { .. } | Self::Malformed { .. } => false,
        }
    }

    pub(crate) fn from_reqwest(service: &'static str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { service }
        } else {
            Self::Network {
                service,
                message: err.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, LookupError>;
