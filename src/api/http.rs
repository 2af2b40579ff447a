//! reqwest implementation of the Chat API

use super::auth::AuthSession;
use super::join_url;
use super::types::{Conversation, Message, RenameRequest, SendMessageRequest};
use super::ApiError;
use crate::runtime::ChatApi;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

/// Chat API client bound to one signed-in session
#[derive(Clone)]
pub struct HttpChatApi {
    client: Client,
    base_url: String,
    auth: AuthSession,
}

impl HttpChatApi {
    pub fn new(client: Client, base_url: impl Into<String>, auth: AuthSession) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            auth,
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client
            .request(method, join_url(&self.base_url, path))
            .bearer_auth(&self.auth.token)
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, ApiError> {
        let response = builder.send().await.map_err(|e| ApiError::from_reqwest(&e))?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_status(status, &body))
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(builder).await?;
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("Failed to read response: {e}")))?;
        serde_json::from_str(&body)
            .map_err(|e| ApiError::decode(format!("Failed to parse response: {e} - body: {body}")))
    }
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.execute_json(self.request(Method::GET, "/api/chat")).await
    }

    async fn create_conversation(&self) -> Result<Conversation, ApiError> {
        self.execute_json(self.request(Method::POST, "/api/chat/new"))
            .await
    }

    async fn get_messages(&self, conv_id: &str) -> Result<Vec<Message>, ApiError> {
        let path = format!("/api/chat/{conv_id}/messages");
        self.execute_json(self.request(Method::GET, &path)).await
    }

    async fn send_message(&self, conv_id: &str, text: &str) -> Result<(), ApiError> {
        let path = format!("/api/chat/{conv_id}/message");
        let builder = self
            .request(Method::POST, &path)
            .json(&SendMessageRequest { text });
        self.execute(builder).await.map(|_| ())
    }

    async fn delete_conversation(&self, conv_id: &str) -> Result<(), ApiError> {
        let path = format!("/api/chat/{conv_id}");
        self.execute(self.request(Method::DELETE, &path))
            .await
            .map(|_| ())
    }

    async fn rename_conversation(
        &self,
        conv_id: &str,
        title: &str,
    ) -> Result<Conversation, ApiError> {
        let path = format!("/api/chat/{conv_id}/rename");
        let builder = self
            .request(Method::PUT, &path)
            .json(&RenameRequest { title });
        self.execute_json(builder).await
    }
}
