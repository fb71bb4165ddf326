//! REST transport for the messaging endpoints.
//!
//! Every call is stateless and returns the server payload as-is; state
//! reconciliation lives in the controllers. Failures are logged here at
//! debug level only; the caller picks the severity.

use async_trait::async_trait;
use reqwest::{multipart, Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{
    Conversation, ConversationId, Message, MessageId, NewConversation, NewMessage, OrganizationId,
    OrganizationUser, Page, PinnedMessage,
};

/// Messaging REST API consumed by the controllers.
#[async_trait]
pub trait MessagingApi: Send + Sync {
    /// GET /messaging/conversations/
    async fn list_conversations(&self) -> AppResult<Vec<Conversation>>;

    /// GET /messaging/conversations/{id}/
    async fn get_conversation(&self, id: ConversationId) -> AppResult<Conversation>;

    /// POST /messaging/conversations/
    async fn create_conversation(&self, request: &NewConversation) -> AppResult<Conversation>;

    /// GET /messaging/conversations/organization_users/?organization_id=
    async fn list_organization_users(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<OrganizationUser>>;

    /// GET /messaging/messages/?conversation_id=&page=
    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: u32,
    ) -> AppResult<Page<Message>>;

    /// POST /messaging/messages/ (JSON, or multipart when files are attached)
    async fn send_message(&self, message: &NewMessage) -> AppResult<Message>;

    /// POST /messaging/messages/{id}/read/
    async fn mark_read(&self, message_id: MessageId) -> AppResult<()>;

    /// POST /messaging/messages/{id}/react/
    async fn react(&self, message_id: MessageId, reaction: &str) -> AppResult<()>;

    /// POST /messaging/messages/{id}/pin/
    async fn pin(&self, message_id: MessageId) -> AppResult<()>;

    /// POST /messaging/messages/{id}/unpin/
    async fn unpin(&self, message_id: MessageId) -> AppResult<()>;

    /// POST /messaging/messages/{id}/save/
    async fn save(&self, message_id: MessageId) -> AppResult<()>;

    /// POST /messaging/messages/{id}/unsave/
    async fn unsave(&self, message_id: MessageId) -> AppResult<()>;

    /// GET /messaging/messages/pinned/?conversation_id=
    async fn pinned_messages(&self, conversation_id: ConversationId)
        -> AppResult<Vec<PinnedMessage>>;

    /// POST /messaging/messages/{id}/typing/
    ///
    /// The route sits under the message detail path, but the backend reads
    /// the path id as the conversation being typed in.
    async fn typing(&self, conversation_id: ConversationId) -> AppResult<()>;
}

/// List endpoints answer either with a bare array or a paginated envelope
/// depending on server pagination settings.
#[derive(Deserialize)]
#[serde(untagged)]
enum ListOrPage<T> {
    List(Vec<T>),
    Page(Page<T>),
}

impl<T> ListOrPage<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            ListOrPage::List(items) => items,
            ListOrPage::Page(page) => page.results,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    conversation: ConversationId,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ReactRequest<'a> {
    reaction: &'a str,
}

/// reqwest-backed implementation of [`MessagingApi`].
#[derive(Clone)]
pub struct HttpMessagingApi {
    client: Client,
    /// API base without trailing slash (e.g. "http://localhost:8000/api")
    base_url: String,
    /// Attached as `Authorization: Bearer <token>` when present
    access_token: Option<String>,
}

impl HttpMessagingApi {
    pub fn new(
        base_url: impl Into<String>,
        access_token: Option<String>,
        timeout: std::time::Duration,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        })
    }

    pub fn from_config(config: &Config) -> AppResult<Self> {
        Self::new(
            config.api_base_url.clone(),
            config.access_token.clone(),
            config.request_timeout,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}/messaging/{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match &self.access_token {
            Some(token) => builder.header("Authorization", format!("Bearer {token}")),
            None => builder,
        }
    }

    async fn send(&self, operation: &'static str, builder: RequestBuilder) -> AppResult<reqwest::Response> {
        let response = builder.send().await.map_err(|e| {
            debug!(operation, error = %e, "messaging API request failed");
            AppError::from(e)
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(operation, status = status.as_u16(), "messaging API request succeeded");
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        debug!(
            operation,
            status = status.as_u16(),
            body = %body,
            "messaging API returned error"
        );
        Err(AppError::from_status(status.as_u16(), body))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        builder: RequestBuilder,
    ) -> AppResult<T> {
        let response = self.send(operation, builder).await?;
        response.json::<T>().await.map_err(|e| {
            debug!(operation, error = %e, "failed to decode messaging API response");
            AppError::Decode(format!("{operation}: {e}"))
        })
    }

    async fn post_action(&self, operation: &'static str, message_id: MessageId, action: &str) -> AppResult<()> {
        let path = format!("messages/{message_id}/{action}/");
        self.send(operation, self.request(Method::POST, &path)).await?;
        Ok(())
    }

    fn multipart_form(message: &NewMessage) -> AppResult<multipart::Form> {
        let mut form = multipart::Form::new().text("conversation", message.conversation.to_string());

        if let Some(content) = message.content.as_deref().filter(|c| !c.is_empty()) {
            form = form.text("content", content.to_string());
        }

        for file in &message.files {
            let part = multipart::Part::bytes(file.bytes.clone())
                .file_name(file.file_name.clone())
                .mime_str(file.content_type.as_ref())
                .map_err(|e| AppError::Internal(format!("invalid attachment type: {e}")))?;
            form = form.part("files", part);
        }

        Ok(form)
    }
}

#[async_trait]
impl MessagingApi for HttpMessagingApi {
    async fn list_conversations(&self) -> AppResult<Vec<Conversation>> {
        let list: ListOrPage<Conversation> = self
            .fetch("list_conversations", self.request(Method::GET, "conversations/"))
            .await?;
        Ok(list.into_vec())
    }

    async fn get_conversation(&self, id: ConversationId) -> AppResult<Conversation> {
        let path = format!("conversations/{id}/");
        self.fetch("get_conversation", self.request(Method::GET, &path))
            .await
    }

    async fn create_conversation(&self, request: &NewConversation) -> AppResult<Conversation> {
        let builder = self.request(Method::POST, "conversations/").json(request);
        self.fetch("create_conversation", builder).await
    }

    async fn list_organization_users(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<OrganizationUser>> {
        let builder = self
            .request(Method::GET, "conversations/organization_users/")
            .query(&[("organization_id", organization_id.to_string())]);
        let list: ListOrPage<OrganizationUser> =
            self.fetch("list_organization_users", builder).await?;
        Ok(list.into_vec())
    }

    async fn list_messages(
        &self,
        conversation_id: ConversationId,
        page: u32,
    ) -> AppResult<Page<Message>> {
        let builder = self.request(Method::GET, "messages/").query(&[
            ("conversation_id", conversation_id.to_string()),
            ("page", page.max(1).to_string()),
        ]);
        self.fetch("list_messages", builder).await
    }

    async fn send_message(&self, message: &NewMessage) -> AppResult<Message> {
        let builder = self.request(Method::POST, "messages/");
        let builder = if message.is_multipart() {
            builder.multipart(Self::multipart_form(message)?)
        } else {
            builder.json(&SendMessageRequest {
                conversation: message.conversation,
                content: message.content.as_deref().unwrap_or_default(),
            })
        };
        self.fetch("send_message", builder).await
    }

    async fn mark_read(&self, message_id: MessageId) -> AppResult<()> {
        self.post_action("mark_read", message_id, "read").await
    }

    async fn react(&self, message_id: MessageId, reaction: &str) -> AppResult<()> {
        let path = format!("messages/{message_id}/react/");
        let builder = self
            .request(Method::POST, &path)
            .json(&ReactRequest { reaction });
        self.send("react", builder).await?;
        Ok(())
    }

    async fn pin(&self, message_id: MessageId) -> AppResult<()> {
        self.post_action("pin", message_id, "pin").await
    }

    async fn unpin(&self, message_id: MessageId) -> AppResult<()> {
        self.post_action("unpin", message_id, "unpin").await
    }

    async fn save(&self, message_id: MessageId) -> AppResult<()> {
        self.post_action("save", message_id, "save").await
    }

    async fn unsave(&self, message_id: MessageId) -> AppResult<()> {
        self.post_action("unsave", message_id, "unsave").await
    }

    async fn pinned_messages(
        &self,
        conversation_id: ConversationId,
    ) -> AppResult<Vec<PinnedMessage>> {
        let builder = self
            .request(Method::GET, "messages/pinned/")
            .query(&[("conversation_id", conversation_id.to_string())]);
        let list: ListOrPage<PinnedMessage> = self.fetch("pinned_messages", builder).await?;
        Ok(list.into_vec())
    }

    async fn typing(&self, conversation_id: ConversationId) -> AppResult<()> {
        self.post_action("typing", conversation_id, "typing").await
    }
}
