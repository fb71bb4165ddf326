use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::{CurrentUser, UserId, UserRef};
use super::{ConversationId, OrganizationId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: UserRef,
}

/// Summary of the newest message, as shown in the conversation list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastMessage {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub sender: Option<UserRef>,
    pub created_at: DateTime<Utc>,
}

/// Conversation summary. Server-owned: the list replaces these wholesale on
/// every refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    #[serde(default)]
    pub is_group: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub last_message: Option<LastMessage>,
    #[serde(default)]
    pub unread_count: u32,
}

impl Conversation {
    pub fn has_unread(&self) -> bool {
        self.unread_count > 0
    }

    /// Group name if set, otherwise the other participants' names.
    pub fn display_name(&self, current_user: &CurrentUser) -> String {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            return name.to_string();
        }

        let others: Vec<String> = self
            .participants
            .iter()
            .filter(|p| !current_user.is(&p.user))
            .map(|p| p.user.display_name())
            .collect();

        if others.is_empty() {
            format!("Conversation {}", self.id)
        } else {
            others.join(", ")
        }
    }
}

/// Request body for POST /messaging/conversations/
#[derive(Debug, Clone, Serialize)]
pub struct NewConversation {
    pub name: Option<String>,
    pub organization: OrganizationId,
    pub is_group: bool,
    pub participant_ids: Vec<UserId>,
}

/// Entry of the organization member picker used to start a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationUser {
    #[serde(flatten)]
    pub user: UserRef,
    #[serde(default)]
    pub email: Option<String>,
}
