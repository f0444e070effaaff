//! API client errors.

use thiserror::Error;

/// Errors that can occur when calling the storefront API.
///
/// Every [`ApiClient`](super::ApiClient) method returns one of these instead
/// of panicking; the `Display` text is safe to show to the customer.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered 401. The stored token has already been cleared.
    #[error("Unauthorized - Please login again")]
    Unauthorized,

    /// The server answered with a non-2xx status.
    ///
    /// `message` is the server's own error text when it sent one, otherwise
    /// `HTTP {code}: {reason}`.
    #[error("{message}")]
    Status { status: u16, message: String },

    /// Transport failure or timeout; no response was received.
    #[error("Network error: {0}")]
    Network(String),

    /// The response body could not be decoded into the expected type.
    #[error("Invalid response from server: {0}")]
    Decode(String),

    /// A call needed a refresh token and none is stored.
    #[error("No refresh token available")]
    NoRefreshToken,

    /// The request could not be built (bad path or body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ApiError {
    /// HTTP status carried by the error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized => Some(401),
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the server reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Status { status: 404, .. })
    }

    /// Whether the failure happened before a response arrived.
    #[must_use]
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Network("request timed out".to_string())
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
