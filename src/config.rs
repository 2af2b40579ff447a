//! Client configuration from the environment

use crate::state_machine::state::{DEFAULT_ASSISTANT_NAME, DEFAULT_SEND_TIMEOUT};
use crate::state_machine::SessionContext;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a positive number of seconds, got {value:?}")]
    InvalidDuration { name: &'static str, value: String },
    #[error("No credentials: set CHAT_TOKEN, or CHAT_EMAIL and CHAT_PASSWORD")]
    MissingCredentials,
}

/// How the terminal client signs in
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    Token(String),
    Password { email: String, password: String },
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Credentials::Token(_) => f.write_str("Token(<redacted>)"),
            Credentials::Password { email, .. } => f
                .debug_struct("Password")
                .field("email", email)
                .finish_non_exhaustive(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    pub credentials: Option<Credentials>,
    pub send_timeout: Duration,
    pub http_timeout: Duration,
    pub assistant_name: String,
    pub log_json: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credentials: None,
            send_timeout: DEFAULT_SEND_TIMEOUT,
            http_timeout: DEFAULT_HTTP_TIMEOUT,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            log_json: false,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source, so tests don't touch the process env
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let credentials = match (var("CHAT_TOKEN"), var("CHAT_EMAIL"), var("CHAT_PASSWORD")) {
            (Some(token), _, _) => Some(Credentials::Token(token)),
            (None, Some(email), Some(password)) => Some(Credentials::Password { email, password }),
            _ => None,
        };

        Ok(Self {
            api_url: var("CHAT_API_URL").unwrap_or(defaults.api_url),
            credentials,
            send_timeout: parse_secs("CHAT_SEND_TIMEOUT_SECS", var("CHAT_SEND_TIMEOUT_SECS"))?
                .unwrap_or(defaults.send_timeout),
            http_timeout: parse_secs("CHAT_HTTP_TIMEOUT_SECS", var("CHAT_HTTP_TIMEOUT_SECS"))?
                .unwrap_or(defaults.http_timeout),
            assistant_name: var("CHAT_ASSISTANT_NAME").unwrap_or(defaults.assistant_name),
            log_json: var("CHAT_LOG_JSON").is_some_and(|v| matches!(v.as_str(), "1" | "true")),
        })
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(&self.assistant_name, self.send_timeout)
    }

    pub fn require_credentials(&self) -> Result<&Credentials, ConfigError> {
        self.credentials.as_ref().ok_or(ConfigError::MissingCredentials)
    }
}

fn parse_secs(name: &'static str, value: Option<String>) -> Result<Option<Duration>, ConfigError> {
    let Some(value) = value else {
        return Ok(None);
    };
    match value.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Some(Duration::from_secs(secs))),
        _ => Err(ConfigError::InvalidDuration { name, value }),
    }
}
