//! Runtime for executing a chat session
//!
//! One actor task owns the [`SessionState`]; commands and request completions
//! arrive on a single channel and are applied one at a time.

mod executor;
pub mod traits;


pub use executor::SessionRuntime;
pub use traits::*;

use crate::api::{Conversation, Message};
use crate::state_machine::{DispatchOutcome, Event, Operation, SessionState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, watch};
use tokio_util::sync::CancellationToken;

/// Notifications sent to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    /// A send resolved, either reconciled or with the fallback notice
    DispatchSettled { outcome: DispatchOutcome },
    /// A user-initiated operation failed or was rejected
    Error { operation: Operation, message: String },
}

/// Point-in-time copy of the session, published after every event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub conversations: Vec<Conversation>,
    pub active: Option<String>,
    pub messages: Vec<Message>,
    pub dispatching: bool,
    pub idle: bool,
    /// Number of user commands the runtime has applied
    pub commands_processed: u64,
}

impl SessionSnapshot {
    pub(crate) fn from_state(state: &SessionState, commands_processed: u64) -> Self {
        Self {
            conversations: state.directory.conversations().to_vec(),
            active: state.active.clone(),
            messages: state.messages.clone(),
            dispatching: !state.dispatch.is_idle(),
            idle: state.is_idle(),
            commands_processed,
        }
    }

    pub fn active_conversation(&self) -> Option<&Conversation> {
        let id = self.active.as_deref()?;
        self.conversations.iter().find(|c| c.id == id)
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session runtime has stopped")]
    Stopped,
}

/// Cloneable handle used by front ends to drive a running session
#[derive(Clone)]
pub struct SessionHandle {
    event_tx: mpsc::Sender<Event>,
    broadcast_tx: broadcast::Sender<SessionUpdate>,
    snapshot_rx: watch::Receiver<SessionSnapshot>,
    shutdown: CancellationToken,
    commands_sent: Arc<AtomicU64>,
}

impl SessionHandle {
    pub(crate) fn new(
        event_tx: mpsc::Sender<Event>,
        broadcast_tx: broadcast::Sender<SessionUpdate>,
        snapshot_rx: watch::Receiver<SessionSnapshot>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            event_tx,
            broadcast_tx,
            snapshot_rx,
            shutdown,
            commands_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    async fn command(&self, event: Event) -> Result<(), SessionError> {
        debug_assert!(event.is_command());
        // Count before sending so `settled` never observes the command applied but uncounted.
        self.commands_sent.fetch_add(1, Ordering::SeqCst);
        if self.event_tx.send(event).await.is_err() {
            self.commands_sent.fetch_sub(1, Ordering::SeqCst);
            return Err(SessionError::Stopped);
        }
        Ok(())
    }

    /// Send a user message. Blank text is ignored.
    pub async fn send(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.command(Event::UserSend { text: text.into() }).await
    }

    pub async fn new_conversation(&self) -> Result<(), SessionError> {
        self.command(Event::NewConversation).await
    }

    /// Make a conversation active and load its history
    pub async fn open(&self, conversation_id: impl Into<String>) -> Result<(), SessionError> {
        self.command(Event::OpenConversation {
            conversation_id: conversation_id.into(),
        })
        .await
    }

    /// Rename a conversation. A blank title is ignored.
    pub async fn rename(
        &self,
        conversation_id: impl Into<String>,
        title: impl Into<String>,
    ) -> Result<(), SessionError> {
        self.command(Event::RenameConversation {
            conversation_id: conversation_id.into(),
            title: title.into(),
        })
        .await
    }

    pub async fn delete(&self, conversation_id: impl Into<String>) -> Result<(), SessionError> {
        self.command(Event::DeleteConversation {
            conversation_id: conversation_id.into(),
        })
        .await
    }

    /// Re-fetch the conversation list
    pub async fn refresh(&self) -> Result<(), SessionError> {
        self.command(Event::RefreshDirectory).await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionUpdate> {
        self.broadcast_tx.subscribe()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        self.snapshot_rx.borrow().conversations.clone()
    }

    pub fn current_messages(&self) -> Vec<Message> {
        self.snapshot_rx.borrow().messages.clone()
    }

    /// Wait until every command sent through this handle has been applied and
    /// nothing is in flight. Abandoned sends do not count as in flight.
    pub async fn settled(&self) -> Result<SessionSnapshot, SessionError> {
        let mut rx = self.snapshot_rx.clone();
        loop {
            {
                let sent = self.commands_sent.load(Ordering::SeqCst);
                let snapshot = rx.borrow_and_update();
                if snapshot.idle && snapshot.commands_processed >= sent {
                    return Ok(snapshot.clone());
                }
            }
            if rx.changed().await.is_err() {
                return Err(SessionError::Stopped);
            }
        }
    }

    /// Stop the runtime. Requests already in flight finish but are ignored.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.shutdown.is_cancelled() || self.event_tx.is_closed()
    }
}
