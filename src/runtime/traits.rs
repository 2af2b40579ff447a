//! Trait abstractions for runtime I/O
//!
//! These traits enable testing the executor with mock implementations.

use crate::api::{ApiError, Conversation, Message};
use async_trait::async_trait;
use std::sync::Arc;

/// The Chat API collaborator
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// `GET /api/chat`
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError>;

    /// `POST /api/chat/new`
    async fn create_conversation(&self) -> Result<Conversation, ApiError>;

    /// `GET /api/chat/{id}/messages`
    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, ApiError>;

    /// `POST /api/chat/{id}/message`; the acknowledgement body is ignored
    async fn send_message(&self, conv_id: &str, text: &str) -> Result<(), ApiError>;

    /// `DELETE /api/chat/{id}`
    async fn delete_conversation(&self, conv_id: &str) -> Result<(), ApiError>;

    /// `PUT /api/chat/{id}/rename`
    async fn rename_conversation(
        &self,
        conv_id: &str,
        title: &str,
    ) -> Result<Conversation, ApiError>;
}

// ============================================================================
// Arc implementation for trait objects
// ============================================================================

#[async_trait]
impl<T: ChatApi + ?Sized> ChatApi for Arc<T> {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        (**self).list_conversations().await
    }

    async fn create_conversation(&self) -> Result<Conversation, ApiError> {
        (**self).create_conversation().await
    }

    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, ApiError> {
        (**self).get_messages(conv_id).await
    }

    async fn send_message(&self, conv_id: &str, text: &str) -> Result<(), ApiError> {
        (**self).send_message(conv_id, text).await
    }

    async fn delete_conversation(&self, conv_id: &str) -> Result<(), ApiError> {
        (**self).delete_conversation(conv_id).await
    }

    async fn rename_conversation(
        &self,
        conv_id: &str,
        title: &str,
    ) -> Result<Conversation, ApiError> {
        (**self).rename_conversation(conv_id, title).await
    }
}
