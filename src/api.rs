//! HTTP collaborators: the Chat API and the Auth API

pub mod auth;
mod error;
mod http;
pub mod types;

pub use auth::{AuthClient, AuthSession};
pub use error::{ApiError, ApiErrorKind};
pub use http::HttpChatApi;
pub use types::{Conversation, Message, Origin, Sender, User};

use std::time::Duration;

/// Build the shared reqwest client used by both collaborators
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, ApiError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ApiError::unknown(format!("Failed to create HTTP client: {e}")))
}

/// Join a base URL and an absolute API path without doubling slashes
pub(crate) fn join_url(base_url: &str, path: &str) -> String {
    format!("{}{}", base_url.trim_end_matches('/'), path)
}
