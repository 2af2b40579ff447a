//! Session state types

use crate::api::{Message, Origin};
use crate::directory::Directory;
use std::time::Duration;

/// How long a send may take before the fallback notice replaces the placeholder
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(12);

pub const DEFAULT_ASSISTANT_NAME: &str = "PlacementAI";

pub const FALLBACK_NOTICE: &str = "⚠️ **Chat limit reached**\n\n\
This conversation has reached its maximum limit.\n\n\
👉 **Start a new chat with /new to continue**";

/// Immutable per-session settings consulted by the transition function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionContext {
    pub placeholder_text: String,
    pub fallback_notice: String,
    pub send_timeout: Duration,
}

impl SessionContext {
    pub fn new(assistant_name: &str, send_timeout: Duration) -> Self {
        Self {
            placeholder_text: format!("{assistant_name} is typing..."),
            fallback_notice: FALLBACK_NOTICE.to_string(),
            send_timeout,
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new(DEFAULT_ASSISTANT_NAME, DEFAULT_SEND_TIMEOUT)
    }
}

/// Progress of the one request that owns the message buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DispatchState {
    #[default]
    Idle,

    /// Waiting for the server to create a conversation.
    /// `pending_text` is dispatched once the conversation exists.
    Creating { pending_text: Option<String> },

    /// Loading history after the user opened a conversation
    Loading { conversation_id: String },

    /// Send request racing the timeout; buffer ends with the placeholder
    Sending { conversation_id: String },

    /// Send acknowledged; re-fetching the authoritative history
    Reconciling { conversation_id: String },
}

impl DispatchState {
    pub fn is_idle(&self) -> bool {
        matches!(self, DispatchState::Idle)
    }
}

/// The client-side session: directory, active conversation and its buffer
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionState {
    pub directory: Directory,
    pub active: Option<String>,
    pub messages: Vec<Message>,
    pub dispatch: DispatchState,
    /// Current request epoch. Completions tagged with another value are stale.
    pub generation: u64,
    /// List/rename/delete calls still in flight
    pub directory_requests: u32,
}

impl SessionState {
    /// No dispatch and no directory call outstanding
    pub fn is_idle(&self) -> bool {
        self.dispatch.is_idle() && self.directory_requests == 0
    }

    /// Start a new epoch, returning its generation
    pub(crate) fn next_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Make `conversation_id` active with an empty buffer.
    /// Anything in flight for the previous conversation becomes stale.
    pub(crate) fn switch_to(&mut self, conversation_id: Option<String>) {
        self.active = conversation_id;
        self.messages.clear();
        self.next_generation();
    }

    /// Drop the trailing placeholder (if any) and append the fallback notice
    pub(crate) fn apply_fallback(&mut self, notice: &str) {
        if self.messages.last().is_some_and(Message::is_pending) {
            self.messages.pop();
        }
        self.messages
            .push(Message::bot(notice).with_origin(Origin::Fallback));
    }

    /// Structural invariants. Returns a description of the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.active.is_none() && !self.messages.is_empty() {
            return Err("no active conversation but message buffer is not empty".into());
        }

        let placeholders = self.messages.iter().filter(|m| m.is_pending()).count();
        match &self.dispatch {
            DispatchState::Sending { conversation_id }
            | DispatchState::Reconciling { conversation_id } => {
                if self.active.as_deref() != Some(conversation_id.as_str()) {
                    return Err(format!(
                        "dispatching for {conversation_id} while {:?} is active",
                        self.active
                    ));
                }
                if placeholders != 1 || !self.messages.last().is_some_and(Message::is_pending) {
                    return Err("pending send must end the buffer with one placeholder".into());
                }
            }
            DispatchState::Loading { conversation_id } => {
                if self.active.as_deref() != Some(conversation_id.as_str()) {
                    return Err(format!("loading {conversation_id} which is not active"));
                }
                if placeholders != 0 {
                    return Err("placeholder present outside of a send".into());
                }
            }
            DispatchState::Idle | DispatchState::Creating { .. } => {
                if placeholders != 0 {
                    return Err("placeholder present outside of a send".into());
                }
            }
        }
        Ok(())
    }
}
