use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::user::{CurrentUser, UserId, UserRef};
use super::{ConversationId, MessageId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// File URL served by the backend
    pub file: String,
    #[serde(default)]
    pub file_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    /// Unicode emoji or emoji code
    pub reaction: String,
    pub user: UserRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadReceipt {
    pub user: UserRef,
}

/// Message as returned by the messages endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation: ConversationId,
    pub sender: UserRef,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub read_by: Vec<ReadReceipt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_pinned: Option<bool>,
}

impl Message {
    pub fn is_read_by(&self, user_id: UserId) -> bool {
        self.read_by.iter().any(|r| r.user.id == user_id)
    }

    /// Adds a read receipt for `user` unless one is already present.
    /// Returns whether the set changed.
    pub fn record_read_receipt(&mut self, user: &UserRef) -> bool {
        if self.is_read_by(user.id) {
            return false;
        }
        self.read_by.push(ReadReceipt { user: user.clone() });
        true
    }

    /// Someone else's message that the current user has not read yet.
    pub fn needs_read_receipt(&self, current_user: &CurrentUser) -> bool {
        !current_user.is(&self.sender) && !self.is_read_by(current_user.id())
    }

    pub fn pinned(&self) -> bool {
        self.is_pinned.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedMessage {
    pub message: Message,
    pub pinned_by: UserRef,
    pub pinned_at: DateTime<Utc>,
}

/// Paginated list envelope. `next` is the has-more signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    pub fn has_more(&self) -> bool {
        self.next.is_some()
    }
}

/// File attached to an outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: mime::Mime,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let content_type = guess_content_type(&file_name);
        Self {
            file_name,
            content_type,
            bytes,
        }
    }
}

fn guess_content_type(file_name: &str) -> mime::Mime {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => mime::IMAGE_PNG,
        "jpg" | "jpeg" => mime::IMAGE_JPEG,
        "gif" => mime::IMAGE_GIF,
        "svg" => mime::IMAGE_SVG,
        "pdf" => mime::APPLICATION_PDF,
        "txt" | "md" | "log" => mime::TEXT_PLAIN,
        "csv" => mime::TEXT_CSV,
        "json" => mime::APPLICATION_JSON,
        _ => mime::APPLICATION_OCTET_STREAM,
    }
}

/// Outgoing message. Sent as JSON when `files` is empty, multipart otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMessage {
    pub conversation: ConversationId,
    /// Trimmed text; `None` when only attachments are sent
    pub content: Option<String>,
    pub files: Vec<FileUpload>,
}

impl NewMessage {
    pub fn is_multipart(&self) -> bool {
        !self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_from(sender: UserId) -> Message {
        serde_json::from_value(serde_json::json!({
            "id": 10,
            "conversation": 42,
            "sender": {"id": sender, "username": "someone"},
            "content": "hi",
            "created_at": "2024-03-01T09:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn read_receipt_is_idempotent() {
        let me = UserRef::new(1, "me");
        let mut message = message_from(2);

        assert!(message.record_read_receipt(&me));
        assert!(!message.record_read_receipt(&me));
        assert_eq!(message.read_by.len(), 1);
    }

    #[test]
    fn own_messages_never_need_receipts() {
        let me = CurrentUser::new(UserRef::new(1, "me"));
        assert!(!message_from(1).needs_read_receipt(&me));

        let mut other = message_from(2);
        assert!(other.needs_read_receipt(&me));
        other.record_read_receipt(me.user());
        assert!(!other.needs_read_receipt(&me));
    }

    #[test]
    fn page_next_is_has_more() {
        let page: Page<Message> = serde_json::from_value(serde_json::json!({
            "count": 40,
            "next": "http://api/messaging/messages/?conversation_id=42&page=2",
            "previous": null,
            "results": []
        }))
        .unwrap();
        assert!(page.has_more());
    }

    #[test]
    fn guesses_content_type_from_extension() {
        assert_eq!(FileUpload::new("shot.PNG", vec![]).content_type, mime::IMAGE_PNG);
        assert_eq!(
            FileUpload::new("blob", vec![1]).content_type,
            mime::APPLICATION_OCTET_STREAM
        );
    }
}
