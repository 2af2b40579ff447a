//! Effects produced by state transitions

use std::fmt;
use std::time::Duration;

/// Which user-initiated operation a notification refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    List,
    Create,
    Load,
    Send,
    Rename,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::List => "list conversations",
            Operation::Create => "create conversation",
            Operation::Load => "load messages",
            Operation::Send => "send message",
            Operation::Rename => "rename conversation",
            Operation::Delete => "delete conversation",
        };
        f.write_str(name)
    }
}

/// How a dispatch ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Buffer replaced with the server's history
    Reconciled,
    /// Placeholder replaced with the fallback notice
    Fallback,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// `GET /api/chat`
    ListConversations,

    /// `POST /api/chat/new`
    CreateConversation { generation: u64 },

    /// `GET /api/chat/{id}/messages`
    FetchMessages {
        conversation_id: String,
        generation: u64,
    },

    /// `POST /api/chat/{id}/message` (spawned, never cancelled)
    SendMessage {
        conversation_id: String,
        text: String,
        generation: u64,
    },

    /// Fire `SendTimedOut` after `delay`
    ScheduleSendTimeout { delay: Duration, generation: u64 },

    /// `PUT /api/chat/{id}/rename`
    RenameConversation {
        conversation_id: String,
        title: String,
    },

    /// `DELETE /api/chat/{id}`
    DeleteConversation { conversation_id: String },

    /// Surface a failed operation to subscribers
    NotifyError { operation: Operation, message: String },

    /// Tell subscribers a dispatch has resolved
    NotifyDispatchSettled { outcome: DispatchOutcome },
}

impl Effect {
    pub fn notify_error(operation: Operation, message: impl Into<String>) -> Self {
        Effect::NotifyError {
            operation,
            message: message.into(),
        }
    }
}
