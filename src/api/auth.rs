//! Auth API client and the explicit signed-in session
//!
//! The session is a plain value handed to [`super::HttpChatApi`]; there is no
//! process-wide "current user".

use super::join_url;
use super::types::{ErrorBody, LoginRequest, LoginResponse, RegisterRequest, User};
use super::ApiError;
use reqwest::{Client, StatusCode};

const LOGIN_FAILED: &str = "Login failed";
const REGISTRATION_FAILED: &str = "Registration failed";

/// Bearer credential plus the user it belongs to
#[derive(Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
}

impl AuthSession {
    pub fn new(token: impl Into<String>, user: User) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

// Keep the token out of logs.
impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("token", &"<redacted>")
            .field("user", &self.user)
            .finish()
    }
}

/// Client for `/api/auth/*`
pub struct AuthClient {
    client: Client,
    base_url: String,
}

impl AuthClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// `POST /api/auth/login`
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSession, ApiError> {
        tracing::debug!(email = %email, "Logging in");
        let response = self
            .client
            .post(join_url(&self.base_url, "/api/auth/login"))
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(auth_error(status, &body, LOGIN_FAILED));
        }

        let parsed: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| ApiError::decode(format!("Failed to parse login response: {e}")))?;
        tracing::info!(user = %parsed.user.name, "Logged in");
        Ok(AuthSession::new(parsed.token, parsed.user))
    }

    /// `POST /api/auth/register`. The caller logs in afterwards.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        tracing::debug!(email = %email, "Registering");
        let response = self
            .client
            .post(join_url(&self.base_url, "/api/auth/register"))
            .json(&RegisterRequest {
                name,
                email,
                password,
            })
            .send()
            .await
            .map_err(|e| ApiError::from_reqwest(&e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(auth_error(status, &body, REGISTRATION_FAILED))
    }
}

/// Classify a failed auth call. Only a server `{message}` is shown as is;
/// any other body becomes the generic `fallback`.
fn auth_error(status: StatusCode, body: &str, fallback: &str) -> ApiError {
    let mut err = ApiError::from_status(status, body);
    err.message = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.message.trim().is_empty() => parsed.message,
        _ => fallback.to_string(),
    };
    err
}
