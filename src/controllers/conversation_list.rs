use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::Notify;
use tracing::{info, warn};

use crate::error::AppResult;
use crate::models::{
    Conversation, ConversationId, CurrentUser, NewConversation, OrganizationId, OrganizationUser,
};
use crate::services::MessagingApi;

/// Request from a detail view for the list to refetch.
///
/// The list and the detail views share no store; unread counts stay in step
/// only because detail views raise this after every page fetch.
#[derive(Clone, Default)]
pub struct RefreshSignal {
    inner: Arc<RefreshInner>,
}

#[derive(Default)]
struct RefreshInner {
    dirty: AtomicBool,
    requests: AtomicUsize,
    notify: Notify,
}

impl RefreshSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request(&self) {
        self.inner.requests.fetch_add(1, Ordering::SeqCst);
        self.inner.dirty.store(true, Ordering::SeqCst);
        self.inner.notify.notify_one();
    }

    /// Consumes a pending request.
    pub fn take(&self) -> bool {
        self.inner.dirty.swap(false, Ordering::SeqCst)
    }

    /// Total requests raised since creation
    pub fn request_count(&self) -> usize {
        self.inner.requests.load(Ordering::SeqCst)
    }

    pub async fn requested(&self) {
        if self.inner.dirty.load(Ordering::SeqCst) {
            return;
        }
        self.inner.notify.notified().await;
    }
}

/// One row of the conversation sidebar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub id: ConversationId,
    pub title: String,
    pub preview: Option<String>,
    pub unread_count: u32,
    pub unread: bool,
}

pub struct ConversationList {
    api: Arc<dyn MessagingApi>,
    current_user: CurrentUser,
    conversations: Vec<Conversation>,
    loaded: bool,
    signal: RefreshSignal,
}

impl ConversationList {
    pub fn new(api: Arc<dyn MessagingApi>, current_user: CurrentUser) -> Self {
        Self {
            api,
            current_user,
            conversations: Vec::new(),
            loaded: false,
            signal: RefreshSignal::new(),
        }
    }

    /// Handle to give to detail views.
    pub fn refresh_signal(&self) -> RefreshSignal {
        self.signal.clone()
    }

    /// Replaces the list with the server's current collection, in server
    /// order. A failed fetch is logged and leaves the empty state.
    pub async fn refresh(&mut self) {
        match self.api.list_conversations().await {
            Ok(conversations) => {
                info!(count = conversations.len(), "conversation list refreshed");
                self.conversations = conversations;
            }
            Err(err) => {
                warn!(error = %err, "failed to load conversations");
                self.conversations.clear();
            }
        }
        self.loaded = true;
    }

    /// Refreshes if a detail view asked for it since the last call.
    pub async fn refresh_if_requested(&mut self) -> bool {
        if self.signal.take() {
            self.refresh().await;
            true
        } else {
            false
        }
    }

    pub fn conversations(&self) -> &[Conversation] {
        &self.conversations
    }

    pub fn get(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// "No conversations yet"
    pub fn is_empty_state(&self) -> bool {
        self.loaded && self.conversations.is_empty()
    }

    /// Conversations with at least one unread message
    pub fn unread_conversations(&self) -> usize {
        self.conversations.iter().filter(|c| c.has_unread()).count()
    }

    pub fn rows(&self) -> Vec<ConversationRow> {
        self.conversations
            .iter()
            .map(|c| ConversationRow {
                id: c.id,
                title: c.display_name(&self.current_user),
                preview: c.last_message.as_ref().map(|m| m.content.clone()),
                unread_count: c.unread_count,
                unread: c.has_unread(),
            })
            .collect()
    }

    /// Creates a conversation and reloads the list so it shows up.
    pub async fn create_conversation(&mut self, request: NewConversation) -> AppResult<Conversation> {
        let conversation = self.api.create_conversation(&request).await?;
        info!(
            conversation_id = conversation.id,
            is_group = conversation.is_group,
            "conversation created"
        );
        self.refresh().await;
        Ok(conversation)
    }

    /// Candidates for the new-conversation picker, excluding the current user.
    pub async fn organization_users(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<OrganizationUser>> {
        let users = self.api.list_organization_users(organization_id).await?;
        Ok(users
            .into_iter()
            .filter(|u| !self.current_user.is(&u.user))
            .collect())
    }
}
