use tracing::info;

use crate::error::AppResult;
use crate::models::{MessageId, PinnedMessage};
use crate::services::MessagingApi;

/// Pinned messages of the open conversation, toggled from the header.
///
/// The panel never edits its own list: after an unpin the owning
/// conversation view refetches and calls [`PinnedPanel::replace`].
#[derive(Debug, Clone, Default)]
pub struct PinnedPanel {
    visible: bool,
    items: Vec<PinnedMessage>,
}

impl PinnedPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn toggle(&mut self) -> bool {
        self.visible = !self.visible;
        self.visible
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn items(&self) -> &[PinnedMessage] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, message_id: MessageId) -> bool {
        self.items.iter().any(|p| p.message.id == message_id)
    }

    pub fn replace(&mut self, items: Vec<PinnedMessage>) {
        self.items = items;
    }

    pub fn reset(&mut self) {
        self.visible = false;
        self.items.clear();
    }

    /// Issues the unpin request only.
    pub async fn unpin(&self, api: &dyn MessagingApi, message_id: MessageId) -> AppResult<()> {
        api.unpin(message_id).await?;
        info!(message_id, "message unpinned");
        Ok(())
    }
}
