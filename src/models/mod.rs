pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::{Conversation, LastMessage, NewConversation, OrganizationUser, Participant};
pub use message::{
    Attachment, FileUpload, Message, NewMessage, Page, PinnedMessage, Reaction, ReadReceipt,
};
pub use user::{CurrentUser, UserId, UserRef};

pub type ConversationId = i64;
pub type MessageId = i64;
pub type OrganizationId = i64;
