use chrono::Utc;

use crate::models::{
    Attachment, ConversationId, CurrentUser, FileUpload, Message, NewMessage, ReadReceipt,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Backspace,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPress {
    pub key: Key,
    pub shift: bool,
}

impl KeyPress {
    pub fn plain(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn shifted(key: Key) -> Self {
        Self { key, shift: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Enter without Shift
    Submit,
    /// Text changed; callers ping the typing indicator
    Edited,
    Ignored,
}

/// Draft text and attachments for the next outgoing message.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    text: String,
    files: Vec<FileUpload>,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn attachments(&self) -> &[FileUpload] {
        &self.files
    }

    pub fn attach(&mut self, file: FileUpload) {
        self.files.push(file);
    }

    pub fn remove_attachment(&mut self, index: usize) -> Option<FileUpload> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    /// Blank text with no attachments cannot be sent.
    pub fn can_submit(&self) -> bool {
        !self.text.trim().is_empty() || !self.files.is_empty()
    }

    pub fn handle_key(&mut self, press: KeyPress) -> KeyOutcome {
        match press.key {
            Key::Enter if press.shift => {
                self.text.push('\n');
                KeyOutcome::Edited
            }
            Key::Enter => KeyOutcome::Submit,
            Key::Backspace => {
                if self.text.pop().is_some() {
                    KeyOutcome::Edited
                } else {
                    KeyOutcome::Ignored
                }
            }
            Key::Char(c) => {
                self.text.push(c);
                KeyOutcome::Edited
            }
            Key::Other => KeyOutcome::Ignored,
        }
    }

    /// Request for the current draft, or `None` when the guard blocks it.
    pub fn draft(&self, conversation: ConversationId) -> Option<NewMessage> {
        if !self.can_submit() {
            return None;
        }

        let trimmed = self.text.trim();
        Some(NewMessage {
            conversation,
            content: (!trimmed.is_empty()).then(|| trimmed.to_string()),
            files: self.files.clone(),
        })
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.files.clear();
    }
}

/// Optimistic local copy of a draft, shown until the server confirms it.
/// The id is a placeholder; the timeline tracks the entry by temporary id.
pub fn optimistic_message(draft: &NewMessage, current_user: &CurrentUser) -> Message {
    Message {
        id: 0,
        conversation: draft.conversation,
        sender: current_user.user().clone(),
        content: draft.content.clone().unwrap_or_default(),
        created_at: Utc::now(),
        edited_at: None,
        attachments: draft
            .files
            .iter()
            .map(|f| Attachment {
                file: String::new(),
                file_name: f.file_name.clone(),
            })
            .collect(),
        reactions: Vec::new(),
        read_by: vec![ReadReceipt {
            user: current_user.user().clone(),
        }],
        is_pinned: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRef;

    #[test]
    fn blank_draft_is_blocked() {
        let mut composer = Composer::new();
        assert!(composer.draft(42).is_none());

        composer.set_text("   \n\t");
        assert!(!composer.can_submit());
        assert!(composer.draft(42).is_none());
    }

    #[test]
    fn attachments_alone_produce_multipart_without_content() {
        let mut composer = Composer::new();
        composer.set_text("  ");
        composer.attach(FileUpload::new("plan.pdf", b"%PDF".to_vec()));

        let draft = composer.draft(42).unwrap();
        assert!(draft.is_multipart());
        assert_eq!(draft.content, None);
        assert_eq!(draft.files.len(), 1);
    }

    #[test]
    fn text_is_trimmed() {
        let mut composer = Composer::new();
        composer.set_text("  hello \n");
        let draft = composer.draft(42).unwrap();
        assert_eq!(draft.content.as_deref(), Some("hello"));
        assert!(!draft.is_multipart());
    }

    #[test]
    fn enter_submits_and_shift_enter_inserts_newline() {
        let mut composer = Composer::new();
        assert_eq!(composer.handle_key(KeyPress::plain(Key::Char('a'))), KeyOutcome::Edited);
        assert_eq!(composer.handle_key(KeyPress::shifted(Key::Enter)), KeyOutcome::Edited);
        assert_eq!(composer.handle_key(KeyPress::plain(Key::Char('b'))), KeyOutcome::Edited);
        assert_eq!(composer.text(), "a\nb");

        assert_eq!(composer.handle_key(KeyPress::plain(Key::Enter)), KeyOutcome::Submit);
        assert_eq!(composer.text(), "a\nb");
    }

    #[test]
    fn backspace_on_empty_is_ignored() {
        let mut composer = Composer::new();
        assert_eq!(composer.handle_key(KeyPress::plain(Key::Backspace)), KeyOutcome::Ignored);
    }

    #[test]
    fn optimistic_copy_is_read_by_sender() {
        let me = CurrentUser::new(UserRef::new(1, "me"));
        let mut composer = Composer::new();
        composer.set_text("hello");

        let local = optimistic_message(&composer.draft(42).unwrap(), &me);
        assert_eq!(local.content, "hello");
        assert!(local.is_read_by(1));
        assert!(!local.needs_read_receipt(&me));
    }
}
