//! Collaborator error types

use super::types::ErrorBody;
use thiserror::Error;

/// Error from a Chat or Auth API call, with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub message: String,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(kind: ApiErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    #[must_use]
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Timeout, message)
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Decode, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ApiErrorKind::Unknown, message)
    }

    /// Classify a transport-level reqwest failure
    pub fn from_reqwest(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::timeout(format!("Request timeout: {e}"))
        } else if e.is_connect() {
            Self::network(format!("Connection failed: {e}"))
        } else if e.is_decode() {
            Self::decode(format!("Failed to decode response: {e}"))
        } else {
            Self::unknown(format!("Request failed: {e}"))
        }
    }

    /// Classify a non-success HTTP response.
    ///
    /// Uses the server's `{ "message": ... }` body when present.
    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let message = serde_json::from_str::<ErrorBody>(body)
            .map(|b| b.message)
            .unwrap_or_else(|_| body.to_string());
        let kind = match status.as_u16() {
            401 | 403 => ApiErrorKind::Auth,
            404 => ApiErrorKind::NotFound,
            408 | 504 => ApiErrorKind::Timeout,
            400 | 409 | 422 => ApiErrorKind::InvalidRequest,
            429 => ApiErrorKind::RateLimit,
            500..=599 => ApiErrorKind::ServerError,
            _ => ApiErrorKind::Unknown,
        };
        let message = if message.is_empty() {
            format!("HTTP {status}")
        } else {
            message
        };
        Self::new(kind, message).with_status(status.as_u16())
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    /// Connection refused, DNS failure, reset
    Network,
    /// Client or gateway timeout
    Timeout,
    /// Authentication failed (401, 403)
    Auth,
    /// Conversation does not exist (404)
    NotFound,
    /// Bad request (400, 409, 422)
    InvalidRequest,
    /// Rate limited (429)
    RateLimit,
    /// Server error (5xx)
    ServerError,
    /// Response body did not match the expected shape
    Decode,
    Unknown,
}

impl ApiErrorKind {
    /// Whether retrying the same call later could succeed
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Self::Network | Self::Timeout | Self::RateLimit | Self::ServerError
        )
    }
}
