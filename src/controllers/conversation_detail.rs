//! State of one open conversation: paged timeline, pinned panel and typing
//! indicator, kept in sync with the server by explicit refetches.
//!
//! Opening a conversation fires three independent requests (metadata, first
//! message page, pinned set). Every page fetch marks the other participants'
//! unread messages as read, one request per message, and asks the
//! conversation list to refresh. Side effects run on a task queue owned by
//! this view and are aborted when it switches conversation or is dropped.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeZone;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::composer::{optimistic_message, Composer, KeyOutcome, KeyPress};
use crate::controllers::conversation_list::RefreshSignal;
use crate::controllers::pinned_panel::PinnedPanel;
use crate::error::{log_failure, AppError, AppResult, Severity};
use crate::grouping::{group_by_day, DayGroup};
use crate::models::{
    Conversation, ConversationId, CurrentUser, Message, MessageId, NewMessage, UserRef,
};
use crate::services::{BackgroundTasks, MessagingApi};
use crate::timeline::Timeline;
use crate::typing::TypingIndicator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No conversation open
    Idle,
    /// Initial fetches in flight
    Loading,
    Ready,
    /// Older page in flight
    LoadingMore,
    /// Conversation metadata could not be fetched
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Nothing to send; no request was made
    Blocked,
    Sent(MessageId),
}

/// Optimistic send waiting for the server response.
#[derive(Debug, Clone)]
pub struct PendingSend {
    temp_id: Uuid,
    draft: NewMessage,
}

impl PendingSend {
    pub fn temp_id(&self) -> Uuid {
        self.temp_id
    }

    pub fn draft(&self) -> &NewMessage {
        &self.draft
    }
}

pub struct ConversationDetail {
    api: Arc<dyn MessagingApi>,
    current_user: CurrentUser,
    conversation_id: Option<ConversationId>,
    conversation: Option<Conversation>,
    phase: Phase,
    timeline: Timeline,
    /// Last page fetched successfully (0 before the first one)
    page: u32,
    has_more: bool,
    pinned: PinnedPanel,
    typing: TypingIndicator,
    tasks: BackgroundTasks,
    list_refresh: Option<RefreshSignal>,
}

impl ConversationDetail {
    pub fn new(api: Arc<dyn MessagingApi>, current_user: CurrentUser) -> Self {
        Self {
            api,
            current_user,
            conversation_id: None,
            conversation: None,
            phase: Phase::Idle,
            timeline: Timeline::new(),
            page: 0,
            has_more: false,
            pinned: PinnedPanel::new(),
            typing: TypingIndicator::default(),
            tasks: BackgroundTasks::new(),
            list_refresh: None,
        }
    }

    pub fn with_list_refresh(mut self, signal: RefreshSignal) -> Self {
        self.list_refresh = Some(signal);
        self
    }

    pub fn with_typing_expiry(mut self, expiry: Duration) -> Self {
        self.typing = TypingIndicator::new(expiry);
        self
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        self.conversation_id
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn current_user(&self) -> &CurrentUser {
        &self.current_user
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn messages(&self) -> impl Iterator<Item = &Message> + '_ {
        self.timeline.messages()
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Whether the "load more" control is offered.
    pub fn can_load_more(&self) -> bool {
        self.phase == Phase::Ready && self.has_more
    }

    pub fn pinned(&self) -> &PinnedPanel {
        &self.pinned
    }

    pub fn toggle_pinned_panel(&mut self) -> bool {
        self.pinned.toggle()
    }

    /// Side effects still queued or running
    pub fn background_len(&self) -> usize {
        self.tasks.len()
    }

    pub fn grouped<Tz: TimeZone>(&self, tz: &Tz) -> Vec<DayGroup<'_>> {
        group_by_day(self.timeline.messages(), &self.current_user, tz)
    }

    /// Drops all state of the current conversation and cancels its
    /// background work.
    pub fn close(&mut self) {
        if let Some(id) = self.conversation_id.take() {
            debug!(conversation_id = id, "closing conversation");
        }
        self.tasks.abort_all();
        self.conversation = None;
        self.phase = Phase::Idle;
        self.timeline.clear();
        self.page = 0;
        self.has_more = false;
        self.pinned.reset();
        self.typing.clear();
    }

    /// Opens `conversation_id`, resetting any previous state.
    ///
    /// Message and pinned failures are logged and leave those parts empty;
    /// a metadata failure moves to [`Phase::NotFound`] and is returned unless
    /// it was a plain 404.
    pub async fn open(&mut self, conversation_id: ConversationId) -> AppResult<()> {
        self.close();
        self.conversation_id = Some(conversation_id);
        self.phase = Phase::Loading;

        let api = Arc::clone(&self.api);
        let (conversation, first_page, pinned) = futures::join!(
            api.get_conversation(conversation_id),
            api.list_messages(conversation_id, 1),
            api.pinned_messages(conversation_id)
        );

        let conversation = match conversation {
            Ok(conversation) => conversation,
            Err(AppError::NotFound) => {
                info!(conversation_id, "conversation not found");
                self.phase = Phase::NotFound;
                return Ok(());
            }
            Err(err) => {
                warn!(conversation_id, error = %err, "failed to load conversation");
                self.phase = Phase::NotFound;
                return Err(err);
            }
        };
        self.conversation = Some(conversation);

        match first_page {
            Ok(page) => {
                self.page = 1;
                self.has_more = page.has_more();
                let fetched = page.results;
                self.after_page_fetch(&fetched);
                self.timeline.replace_with_page(fetched);
            }
            Err(err) => {
                warn!(conversation_id, error = %err, "failed to load messages");
            }
        }

        match pinned {
            Ok(items) => self.pinned.replace(items),
            Err(err) => warn!(conversation_id, error = %err, "failed to load pinned messages"),
        }

        self.phase = Phase::Ready;
        info!(
            conversation_id,
            messages = self.timeline.len(),
            has_more = self.has_more,
            "conversation ready"
        );
        Ok(())
    }

    /// Fetches the next older page and puts it in front of the timeline.
    /// Returns false without a request unless the view is `Ready` with more
    /// pages available.
    pub async fn load_more(&mut self) -> AppResult<bool> {
        let Some(conversation_id) = self.conversation_id else {
            return Ok(false);
        };
        if !self.can_load_more() {
            return Ok(false);
        }

        self.phase = Phase::LoadingMore;
        let next_page = self.page + 1;
        let result = self.api.list_messages(conversation_id, next_page).await;
        self.phase = Phase::Ready;

        let page = result.map_err(|err| {
            warn!(conversation_id, page = next_page, error = %err, "failed to load more messages");
            err
        })?;

        self.page = next_page;
        self.has_more = page.has_more();
        let fetched = page.results;
        self.after_page_fetch(&fetched);
        let added = self.timeline.prepend_older(fetched);
        debug!(conversation_id, page = next_page, added, "older messages loaded");
        Ok(true)
    }

    /// Re-fetches the newest page and reconciles it into the timeline.
    /// Returns how many messages were new.
    pub async fn reload_latest(&mut self) -> AppResult<usize> {
        let Some(conversation_id) = self.conversation_id else {
            return Ok(0);
        };
        if self.phase != Phase::Ready {
            return Ok(0);
        }

        let page = self.api.list_messages(conversation_id, 1).await?;
        if self.page == 0 {
            self.page = 1;
            self.has_more = page.has_more();
        }
        let fetched = page.results;
        self.after_page_fetch(&fetched);
        Ok(self.timeline.merge_latest(fetched))
    }

    fn after_page_fetch(&mut self, fetched: &[Message]) {
        for message in fetched.iter().filter(|m| m.needs_read_receipt(&self.current_user)) {
            let api = Arc::clone(&self.api);
            let message_id = message.id;
            self.tasks
                .spawn("mark_read", async move { api.mark_read(message_id).await });
        }

        if let Some(signal) = &self.list_refresh {
            signal.request();
        }
    }

    /// Replaces the pinned set with a fresh server copy.
    pub async fn refresh_pinned(&mut self) {
        let Some(conversation_id) = self.conversation_id else {
            return;
        };
        match self.api.pinned_messages(conversation_id).await {
            Ok(items) => self.pinned.replace(items),
            Err(err) => log_failure("pinned_messages", Severity::Logged, &err),
        }
    }

    pub async fn pin_message(&mut self, message_id: MessageId) {
        if let Err(err) = self.api.pin(message_id).await {
            log_failure("pin", Severity::Logged, &err);
        }
        self.refresh_pinned().await;
    }

    pub async fn unpin_message(&mut self, message_id: MessageId) {
        if let Err(err) = self.pinned.unpin(self.api.as_ref(), message_id).await {
            log_failure("unpin", Severity::Logged, &err);
        }
        self.refresh_pinned().await;
    }

    pub fn react(&mut self, message_id: MessageId, reaction: impl Into<String>) {
        let api = Arc::clone(&self.api);
        let reaction = reaction.into();
        self.tasks
            .spawn("react", async move { api.react(message_id, &reaction).await });
    }

    pub fn save_message(&mut self, message_id: MessageId) {
        let api = Arc::clone(&self.api);
        self.tasks
            .spawn("save", async move { api.save(message_id).await });
    }

    pub fn unsave_message(&mut self, message_id: MessageId) {
        let api = Arc::clone(&self.api);
        self.tasks
            .spawn("unsave", async move { api.unsave(message_id).await });
    }

    /// Pings the typing endpoint. Called on every composer keystroke.
    pub fn on_keystroke(&mut self) {
        let Some(conversation_id) = self.conversation_id else {
            return;
        };
        let api = Arc::clone(&self.api);
        self.tasks
            .spawn("typing", async move { api.typing(conversation_id).await });
    }

    /// Feeds a key press to `composer`, pinging typing when the text changed.
    /// Submission on Enter is left to the caller ([`Self::submit`]).
    pub fn handle_key(&mut self, composer: &mut Composer, press: KeyPress) -> KeyOutcome {
        let outcome = composer.handle_key(press);
        if outcome == KeyOutcome::Edited {
            self.on_keystroke();
        }
        outcome
    }

    /// Appends the optimistic copy of the composer's draft. `None` when the
    /// draft is blank or no conversation is open.
    pub fn begin_send(&mut self, composer: &Composer) -> Option<PendingSend> {
        let conversation_id = self.conversation_id?;
        let draft = composer.draft(conversation_id)?;
        let temp_id = self
            .timeline
            .push_pending(optimistic_message(&draft, &self.current_user));
        Some(PendingSend { temp_id, draft })
    }

    /// Settles an optimistic send with the server's answer. On success the
    /// server copy, with the sender's own read receipt added, replaces the
    /// optimistic one; on failure the optimistic copy is removed.
    pub fn complete_send(
        &mut self,
        pending: PendingSend,
        result: AppResult<Message>,
    ) -> AppResult<MessageId> {
        match result {
            Ok(mut message) => {
                message.record_read_receipt(self.current_user.user());
                let id = message.id;
                if !self.timeline.confirm_pending(pending.temp_id, message) {
                    debug!(message_id = id, "send confirmed after conversation changed");
                }
                info!(message_id = id, conversation_id = pending.draft.conversation, "message sent");
                Ok(id)
            }
            Err(err) => {
                self.timeline.discard_pending(pending.temp_id);
                log_failure("send_message", Severity::Alert, &err);
                Err(err)
            }
        }
    }

    /// Sends the composer's draft. The composer is cleared on success and
    /// keeps its contents on failure.
    pub async fn submit(&mut self, composer: &mut Composer) -> AppResult<SubmitOutcome> {
        let Some(pending) = self.begin_send(composer) else {
            return Ok(SubmitOutcome::Blocked);
        };

        let result = self.api.send_message(pending.draft()).await;
        let id = self.complete_send(pending, result)?;
        composer.clear();
        Ok(SubmitOutcome::Sent(id))
    }

    /// Records a typing event from another participant.
    pub fn observe_typing(&mut self, user: UserRef) {
        if self.current_user.is(&user) {
            return;
        }
        self.typing.observe(user, Instant::now());
    }

    pub fn typing_users(&mut self) -> Vec<UserRef> {
        self.typing.active(Instant::now()).to_vec()
    }

    pub fn typing_label(&mut self) -> Option<String> {
        self.typing.label(Instant::now())
    }

    /// Resolves once the current typing window has elapsed.
    pub async fn typing_expired(&self) {
        if let Some(deadline) = self.typing.deadline() {
            tokio::time::sleep_until(deadline).await;
        }
    }

    /// Waits for queued side effects to finish.
    pub async fn settle(&mut self) {
        self.tasks.drain().await;
    }
}
