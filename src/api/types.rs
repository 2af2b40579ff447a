//! Wire types for the Chat and Auth APIs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title shown for conversations the server has not named yet
pub const DEFAULT_TITLE: &str = "New Chat";

/// A server-identified chat thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, rename = "createdAt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "updatedAt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Conversation {
    pub fn new(id: impl Into<String>, title: Option<&str>) -> Self {
        Self {
            id: id.into(),
            title: title.map(str::to_string),
            created_at: None,
            updated_at: None,
        }
    }

    /// Title to display, falling back to [`DEFAULT_TITLE`] for blank titles
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => DEFAULT_TITLE,
        }
    }
}

/// Who authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    #[serde(alias = "assistant")]
    Bot,
}

/// Where a buffered message came from.
///
/// Never serialized: messages from the server are always `Confirmed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Origin {
    #[default]
    Confirmed,
    /// Local echo of a user message not yet confirmed by the server
    Optimistic,
    /// Pending "typing" entry while a send is outstanding
    Placeholder,
    /// Local notice shown after a send timed out or failed
    Fallback,
}

/// A single chat message. `text` is markdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(skip)]
    pub origin: Origin,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            origin: Origin::Confirmed,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            text: text.into(),
            origin: Origin::Confirmed,
        }
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    pub fn is_pending(&self) -> bool {
        self.origin == Origin::Placeholder
    }
}

/// Body of `POST /api/chat/{id}/message`
#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub text: &'a str,
}

/// Body of `PUT /api/chat/{id}/rename`
#[derive(Debug, Serialize)]
pub struct RenameRequest<'a> {
    pub title: &'a str,
}

/// Body of `POST /api/auth/login`
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Body of `POST /api/auth/register`
#[derive(Debug, Serialize)]
pub struct RegisterRequest<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

/// Signed-in user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Response of `POST /api/auth/login`
#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    #[serde(default)]
    pub user: User,
}

/// Error body the server sends on failures
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub message: String,
}
