#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use messaging_client::models::{
    Conversation, ConversationId, CurrentUser, LastMessage, Message, MessageId, NewConversation,
    NewMessage, OrganizationId, OrganizationUser, Page, Participant, PinnedMessage, UserRef,
};
use messaging_client::services::MessagingApi;
use messaging_client::{AppError, AppResult};

pub const ME: i64 = 1;
pub const ALICE: i64 = 2;
pub const BOB: i64 = 3;

pub fn user(id: i64) -> UserRef {
    let name = match id {
        ME => "me",
        ALICE => "alice",
        BOB => "bob",
        _ => "someone",
    };
    UserRef::new(id, name)
}

pub fn me() -> CurrentUser {
    CurrentUser::new(user(ME))
}

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
}

pub fn message(id: MessageId, conversation: ConversationId, sender: i64, minute: i64) -> Message {
    Message {
        id,
        conversation,
        sender: user(sender),
        content: format!("message {id}"),
        created_at: base_time() + chrono::Duration::minutes(minute),
        edited_at: None,
        attachments: vec![],
        reactions: vec![],
        read_by: vec![],
        is_pinned: None,
    }
}

pub fn conversation(id: ConversationId, unread_count: u32) -> Conversation {
    Conversation {
        id,
        is_group: false,
        name: None,
        participants: vec![
            Participant { user: user(ME) },
            Participant { user: user(ALICE) },
        ],
        last_message: Some(LastMessage {
            content: "latest".into(),
            sender: Some(user(ALICE)),
            created_at: base_time(),
        }),
        unread_count,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListConversations,
    GetConversation(ConversationId),
    CreateConversation(Option<String>),
    ListOrganizationUsers(OrganizationId),
    ListMessages {
        conversation: ConversationId,
        page: u32,
    },
    Send {
        conversation: ConversationId,
        content: Option<String>,
        files: usize,
    },
    MarkRead(MessageId),
    React(MessageId, String),
    Pin(MessageId),
    Unpin(MessageId),
    Save(MessageId),
    Unsave(MessageId),
    Pinned(ConversationId),
    Typing(ConversationId),
}

#[derive(Default)]
struct State {
    conversations: Vec<Conversation>,
    /// Oldest first
    messages: HashMap<ConversationId, Vec<Message>>,
    pinned: HashMap<ConversationId, Vec<PinnedMessage>>,
    organization_users: Vec<OrganizationUser>,
    calls: Vec<Call>,
    next_id: MessageId,
    failing_page: Option<u32>,
}

/// In-memory messaging backend that echoes state changes back through its
/// read endpoints, the way the real server does.
pub struct FakeBackend {
    state: Mutex<State>,
    page_size: usize,
    pub fail_conversations: bool,
    /// Metadata requests fail with a server error instead of 404
    pub fail_metadata: bool,
    pub fail_pinned: bool,
    pub fail_send: bool,
    pub side_effect_delay: Option<Duration>,
}

impl FakeBackend {
    pub fn new(page_size: usize) -> Self {
        Self {
            state: Mutex::new(State {
                next_id: 1000,
                ..State::default()
            }),
            page_size,
            fail_conversations: false,
            fail_metadata: false,
            fail_pinned: false,
            fail_send: false,
            side_effect_delay: None,
        }
    }

    pub fn into_arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn add_conversation(&self, conversation: Conversation) {
        let mut state = self.state.lock().unwrap();
        state.messages.entry(conversation.id).or_default();
        state.conversations.push(conversation);
    }

    pub fn add_messages(&self, conversation: ConversationId, messages: Vec<Message>) {
        let mut state = self.state.lock().unwrap();
        let stored = state.messages.entry(conversation).or_default();
        stored.extend(messages);
        stored.sort_by_key(|m| m.created_at);
    }

    pub fn add_organization_user(&self, user: UserRef) {
        self.state.lock().unwrap().organization_users.push(OrganizationUser {
            user,
            email: None,
        });
    }

    /// Makes requests for `page` fail until reset with `None`.
    pub fn fail_messages_page(&self, page: Option<u32>) {
        self.state.lock().unwrap().failing_page = page;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| predicate(c)).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn stored_message(&self, conversation: ConversationId, id: MessageId) -> Option<Message> {
        self.state
            .lock()
            .unwrap()
            .messages
            .get(&conversation)
            .and_then(|ms| ms.iter().find(|m| m.id == id).cloned())
    }

    fn record(&self, call: Call) {
        self.state.lock().unwrap().calls.push(call);
    }

    async fn delay(&self) {
        if let Some(delay) = self.side_effect_delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn find_message_mut<'a>(state: &'a mut State, id: MessageId) -> Option<&'a mut Message> {
        state
            .messages
            .values_mut()
            .flat_map(|ms| ms.iter_mut())
            .find(|m| m.id == id)
    }
}

#[async_trait]
impl MessagingApi for FakeBackend {
    async fn list_conversations(&self) -> AppResult<Vec<Conversation>> {
        self.record(Call::ListConversations);
        if self.fail_conversations {
            return Err(AppError::Transport("connection refused".into()));
        }
        Ok(self.state.lock().unwrap().conversations.clone())
    }

    async fn get_conversation(&self, id: ConversationId) -> AppResult<Conversation> {
        self.record(Call::GetConversation(id));
        if self.fail_metadata {
            return Err(AppError::Api {
                status: 503,
                message: "Service unavailable".into(),
            });
        }
        self.state
            .lock()
            .unwrap()
            .conversations
            .iter()
            .find(|c| c.id == id)
            .cloned()
            .ok_or(AppError::NotFound)
    }

    async fn create_conversation(&self, request: &NewConversation) -> AppResult<Conversation> {
        self.record(Call::CreateConversation(request.name.clone()));
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Conversation {
            id: state.next_id,
            is_group: request.is_group,
            name: request.name.clone(),
            participants: request
                .participant_ids
                .iter()
                .map(|id| Participant { user: user(*id) })
                .collect(),
            last_message: None,
            unread_count: 0,
        };
        state.conversations.insert(0, created.clone());
        Ok(created)
    }

    async fn list_organization_users(
        &self,
        organization_id: OrganizationId,
    ) -> AppResult<Vec<OrganizationUser>> {
        self.record(Call::ListOrganizationUsers(organization_id));
        Ok(self.state.lock().unwrap().organization_users.clone())
    }

    /// Pages are counted from the newest message; each page is returned
    /// newest first.
    async fn list_messages(
        &self,
        conversation: ConversationId,
        page: u32,
    ) -> AppResult<Page<Message>> {
        self.record(Call::ListMessages { conversation, page });
        let state = self.state.lock().unwrap();
        if state.failing_page == Some(page) {
            return Err(AppError::Transport("connection reset".into()));
        }
        let all = state.messages.get(&conversation).ok_or(AppError::NotFound)?;

        let newest_first: Vec<Message> = all.iter().rev().cloned().collect();
        let start = (page.max(1) as usize - 1) * self.page_size;
        if start > newest_first.len() || (start == newest_first.len() && start > 0) {
            return Err(AppError::NotFound);
        }
        let end = (start + self.page_size).min(newest_first.len());
        let next = (end < newest_first.len()).then(|| {
            format!(
                "http://fake/messaging/messages/?conversation_id={conversation}&page={}",
                page + 1
            )
        });

        Ok(Page {
            count: Some(newest_first.len() as u64),
            next,
            previous: None,
            results: newest_first[start..end].to_vec(),
        })
    }

    async fn send_message(&self, request: &NewMessage) -> AppResult<Message> {
        self.record(Call::Send {
            conversation: request.conversation,
            content: request.content.clone(),
            files: request.files.len(),
        });
        if self.fail_send {
            return Err(AppError::Api {
                status: 400,
                message: "content: This field may not be blank.".into(),
            });
        }

        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Message {
            id: state.next_id,
            conversation: request.conversation,
            sender: user(ME),
            content: request.content.clone().unwrap_or_default(),
            created_at: Utc::now(),
            edited_at: None,
            attachments: vec![],
            reactions: vec![],
            read_by: vec![],
            is_pinned: None,
        };
        state
            .messages
            .entry(request.conversation)
            .or_default()
            .push(created.clone());
        Ok(created)
    }

    async fn mark_read(&self, message_id: MessageId) -> AppResult<()> {
        self.delay().await;
        self.record(Call::MarkRead(message_id));
        let mut state = self.state.lock().unwrap();
        let Some(message) = Self::find_message_mut(&mut state, message_id) else {
            return Err(AppError::NotFound);
        };
        let conversation_id = message.conversation;
        if message.record_read_receipt(&user(ME)) {
            if let Some(c) = state.conversations.iter_mut().find(|c| c.id == conversation_id) {
                c.unread_count = c.unread_count.saturating_sub(1);
            }
        }
        Ok(())
    }

    async fn react(&self, message_id: MessageId, reaction: &str) -> AppResult<()> {
        self.delay().await;
        self.record(Call::React(message_id, reaction.to_string()));
        Ok(())
    }

    async fn pin(&self, message_id: MessageId) -> AppResult<()> {
        self.record(Call::Pin(message_id));
        let mut state = self.state.lock().unwrap();
        let Some(message) = Self::find_message_mut(&mut state, message_id) else {
            return Err(AppError::NotFound);
        };
        message.is_pinned = Some(true);
        let pinned = PinnedMessage {
            message: message.clone(),
            pinned_by: user(ME),
            pinned_at: base_time(),
        };
        state
            .pinned
            .entry(pinned.message.conversation)
            .or_default()
            .push(pinned);
        Ok(())
    }

    async fn unpin(&self, message_id: MessageId) -> AppResult<()> {
        self.record(Call::Unpin(message_id));
        let mut state = self.state.lock().unwrap();
        if let Some(message) = Self::find_message_mut(&mut state, message_id) {
            message.is_pinned = Some(false);
        }
        for pinned in state.pinned.values_mut() {
            pinned.retain(|p| p.message.id != message_id);
        }
        Ok(())
    }

    async fn save(&self, message_id: MessageId) -> AppResult<()> {
        self.record(Call::Save(message_id));
        Ok(())
    }

    async fn unsave(&self, message_id: MessageId) -> AppResult<()> {
        self.record(Call::Unsave(message_id));
        Ok(())
    }

    async fn pinned_messages(
        &self,
        conversation_id: ConversationId,
    ) -> AppResult<Vec<PinnedMessage>> {
        self.record(Call::Pinned(conversation_id));
        if self.fail_pinned {
            return Err(AppError::Transport("connection reset".into()));
        }
        Ok(self
            .state
            .lock()
            .unwrap()
            .pinned
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn typing(&self, conversation_id: ConversationId) -> AppResult<()> {
        self.delay().await;
        self.record(Call::Typing(conversation_id));
        Ok(())
    }
}
