//! Ordered, in-memory message store for one open conversation.
//!
//! Entries are kept oldest-first. Server messages are keyed by their id;
//! optimistic sends get a temporary [`Uuid`] until the server confirms them.

use uuid::Uuid;

use crate::models::{Message, MessageId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKey {
    Server(MessageId),
    Pending(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    key: EntryKey,
    message: Message,
}

impl TimelineEntry {
    pub fn key(&self) -> EntryKey {
        self.key
    }

    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_pending(&self) -> bool {
        matches!(self.key, EntryKey::Pending(_))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Timeline {
    entries: Vec<TimelineEntry>,
}

fn sort_oldest_first(messages: &mut [Message]) {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
}

impl Timeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.entries.iter().map(|e| &e.message)
    }

    pub fn get(&self, id: MessageId) -> Option<&Message> {
        self.position(id).map(|i| &self.entries[i].message)
    }

    pub fn pending_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_pending()).count()
    }

    fn position(&self, id: MessageId) -> Option<usize> {
        self.entries
            .iter()
            .position(|e| e.key == EntryKey::Server(id))
    }

    /// Replaces everything with the first fetched page.
    pub fn replace_with_page(&mut self, mut page: Vec<Message>) {
        sort_oldest_first(&mut page);
        page.dedup_by_key(|m| m.id);
        self.entries = page
            .into_iter()
            .map(|message| TimelineEntry {
                key: EntryKey::Server(message.id),
                message,
            })
            .collect();
    }

    /// Puts an older page in front of the existing entries. Messages already
    /// present (page boundaries shift when new messages arrive) are skipped.
    /// Returns how many entries were added.
    pub fn prepend_older(&mut self, mut page: Vec<Message>) -> usize {
        sort_oldest_first(&mut page);
        page.dedup_by_key(|m| m.id);

        let older: Vec<TimelineEntry> = page
            .into_iter()
            .filter(|m| self.position(m.id).is_none())
            .map(|message| TimelineEntry {
                key: EntryKey::Server(message.id),
                message,
            })
            .collect();

        let added = older.len();
        self.entries.splice(0..0, older);
        added
    }

    /// Reconciles a re-fetched page: known ids are replaced in place, unseen
    /// messages are inserted by timestamp ahead of any pending sends.
    /// Returns how many entries were added.
    pub fn merge_latest(&mut self, mut page: Vec<Message>) -> usize {
        sort_oldest_first(&mut page);
        let mut added = 0;

        for message in page {
            if let Some(i) = self.position(message.id) {
                self.entries[i].message = message;
                continue;
            }

            self.insert_confirmed(message);
            added += 1;
        }

        added
    }

    /// Appends an optimistic message and returns its temporary id.
    pub fn push_pending(&mut self, message: Message) -> Uuid {
        let temp_id = Uuid::new_v4();
        self.entries.push(TimelineEntry {
            key: EntryKey::Pending(temp_id),
            message,
        });
        temp_id
    }

    /// Swaps the pending entry for the server's copy, placed by its server
    /// timestamp among the confirmed entries. If a reload already brought the
    /// server copy in, the pending entry is dropped instead.
    /// Returns false when `temp_id` is unknown.
    pub fn confirm_pending(&mut self, temp_id: Uuid, message: Message) -> bool {
        let Some(pending_at) = self
            .entries
            .iter()
            .position(|e| e.key == EntryKey::Pending(temp_id))
        else {
            return false;
        };
        self.entries.remove(pending_at);

        if let Some(existing) = self.position(message.id) {
            self.entries[existing].message = message;
        } else {
            self.insert_confirmed(message);
        }
        true
    }

    /// Inserts a server message by timestamp, ahead of any pending sends.
    fn insert_confirmed(&mut self, message: Message) {
        let confirmed_end = self
            .entries
            .iter()
            .position(|e| e.is_pending())
            .unwrap_or(self.entries.len());
        let at = self.entries[..confirmed_end]
            .iter()
            .rposition(|e| e.message.created_at <= message.created_at)
            .map(|i| i + 1)
            .unwrap_or(0);

        self.entries.insert(
            at,
            TimelineEntry {
                key: EntryKey::Server(message.id),
                message,
            },
        );
    }

    pub fn discard_pending(&mut self, temp_id: Uuid) -> Option<Message> {
        let at = self
            .entries
            .iter()
            .position(|e| e.key == EntryKey::Pending(temp_id))?;
        Some(self.entries.remove(at).message)
    }
}
