//! Events that can occur in a session

use crate::api::{ApiError, Conversation, Message};

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User commands
    UserSend {
        text: String,
    },
    NewConversation,
    OpenConversation {
        conversation_id: String,
    },
    RenameConversation {
        conversation_id: String,
        title: String,
    },
    DeleteConversation {
        conversation_id: String,
    },
    RefreshDirectory,

    // Collaborator completions
    DirectoryLoaded {
        result: Result<Vec<Conversation>, ApiError>,
    },
    ConversationCreated {
        generation: u64,
        result: Result<Conversation, ApiError>,
    },
    MessagesLoaded {
        generation: u64,
        conversation_id: String,
        result: Result<Vec<Message>, ApiError>,
    },
    SendSettled {
        generation: u64,
        result: Result<(), ApiError>,
    },
    SendTimedOut {
        generation: u64,
    },
    ConversationRenamed {
        conversation_id: String,
        result: Result<Conversation, ApiError>,
    },
    ConversationDeleted {
        conversation_id: String,
        result: Result<(), ApiError>,
    },
}

impl Event {
    /// Whether the event came from the user rather than from a completed request
    pub fn is_command(&self) -> bool {
        matches!(
            self,
            Event::UserSend { .. }
                | Event::NewConversation
                | Event::OpenConversation { .. }
                | Event::RenameConversation { .. }
                | Event::DeleteConversation { .. }
                | Event::RefreshDirectory
        )
    }

    /// Request epoch for completions tied to the message buffer
    pub fn generation(&self) -> Option<u64> {
        match self {
            Event::ConversationCreated { generation, .. }
            | Event::MessagesLoaded { generation, .. }
            | Event::SendSettled { generation, .. }
            | Event::SendTimedOut { generation } => Some(*generation),
            _ => None,
        }
    }
}
