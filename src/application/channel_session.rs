//! Channel session: the owner of one channel's message state.
//!
//! Opening a session joins the channel's event stream and loads the newest
//! page of history. Every mutation of the message list flows through the
//! pagination controller, the optimistic write coordinator, the message
//! actions or the event applier, all sharing one [`SessionState`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::services::{
    DedupPolicy, LOCAL_TYPING_STOP_AFTER, REMOTE_TYPING_TIMEOUT, ThreadNode, TypingSignaler,
    TypingTracker, organize,
};
use crate::application::session_state::{SessionState, SharedSessionState};
use crate::application::use_cases::{
    EventApplier, LoadOutcome, MessageActions, OptimisticWriteCoordinator, PaginationController,
    ReactionChange,
};
use crate::domain::entities::{
    ChannelId, Message, MessageId, PaginationCursor, Sender, TypingEntry,
};
use crate::domain::errors::SyncError;
use crate::domain::ports::{
    ChannelEvent, ChannelTransportPort, MessageServicePort, NotificationPort,
};

/// Default number of messages requested per history page.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Tunables of a channel session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub page_size: usize,
    pub dedup: DedupPolicy,
    pub remote_typing_timeout: Duration,
    pub local_typing_stop_after: Duration,
    pub notifications_enabled: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            dedup: DedupPolicy::default(),
            remote_typing_timeout: REMOTE_TYPING_TIMEOUT,
            local_typing_stop_after: LOCAL_TYPING_STOP_AFTER,
            notifications_enabled: true,
        }
    }
}

/// A message composed by the local user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub content: String,
    pub reply_to: Option<MessageId>,
}

impl OutgoingMessage {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reply_to: None,
        }
    }

    #[must_use]
    pub fn replying_to(mut self, message_id: MessageId) -> Self {
        self.reply_to = Some(message_id);
        self
    }
}

/// External collaborators of a session.
#[derive(Clone)]
pub struct SessionPorts {
    pub messages: Arc<dyn MessageServicePort>,
    pub transport: Arc<dyn ChannelTransportPort>,
    pub notifier: Option<Arc<dyn NotificationPort>>,
}

/// Live view of one channel.
///
/// Call [`close`](Self::close) when done. Dropping an open session stops
/// event handling and flushes the typing stop, but cannot await `leave` on
/// the transport.
pub struct ChannelSession {
    channel_id: ChannelId,
    state: SharedSessionState,
    transport: Arc<dyn ChannelTransportPort>,
    pagination: PaginationController,
    writer: OptimisticWriteCoordinator,
    actions: MessageActions,
    typing: TypingSignaler,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelSession {
    /// Joins `channel_id`, starts applying its events and loads the first page.
    ///
    /// The subscription is set up before the initial load so no event is
    /// missed; anything that arrives twice is merged by id. A failed initial
    /// load does not fail the open: the error is exposed through
    /// [`ChannelSession::error`] and [`ChannelSession::retry`] reloads.
    ///
    /// # Errors
    /// Returns `SyncError` if the channel cannot be joined.
    pub async fn open(
        channel_id: ChannelId,
        local_user: Sender,
        ports: SessionPorts,
        config: SessionConfig,
    ) -> Result<Self, SyncError> {
        info!(channel_id = %channel_id, user_id = %local_user.id(), "Opening channel session");

        let state = SessionState::new(
            channel_id.clone(),
            local_user,
            config.page_size,
            TypingTracker::with_timeout(config.remote_typing_timeout),
        )
        .shared();

        let mut applier = EventApplier::new(config.dedup);
        if config.notifications_enabled
            && let Some(notifier) = ports.notifier
        {
            applier = applier.with_notifier(notifier);
        }
        let applier = Arc::new(applier);

        let events = ports.transport.join(&channel_id).await?;
        let pump = tokio::spawn(pump_events(
            Arc::clone(&applier),
            Arc::clone(&state),
            events,
        ));

        let session = Self {
            pagination: PaginationController::new(Arc::clone(&ports.messages), Arc::clone(&state)),
            writer: OptimisticWriteCoordinator::new(
                Arc::clone(&ports.messages),
                applier,
                Arc::clone(&state),
            ),
            actions: MessageActions::new(Arc::clone(&ports.messages), Arc::clone(&state)),
            typing: TypingSignaler::new(
                Arc::clone(&ports.transport),
                channel_id.clone(),
                config.local_typing_stop_after,
            ),
            transport: ports.transport,
            pump: Mutex::new(Some(pump)),
            channel_id,
            state,
        };

        if let Err(e) = session.pagination.load_initial().await {
            debug!(error = %e, "Initial load failed, session stays open for retry");
        }

        Ok(session)
    }

    /// Tears the session down.
    ///
    /// Stops applying events, leaves the channel and flushes a pending
    /// typing stop. Requests still in flight resolve but their results are
    /// dropped. Closing twice is a no-op.
    pub async fn close(&self) {
        let was_mounted = {
            let mut state = self.state.lock();
            let mounted = state.mounted;
            if mounted {
                state.unmount();
            }
            mounted
        };
        if !was_mounted {
            return;
        }

        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            pump.abort();
        }
        self.transport.leave(&self.channel_id).await;
        self.typing.shutdown().await;
        info!(channel_id = %self.channel_id, "Channel session closed");
    }

    #[must_use]
    pub const fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.lock().mounted
    }

    /// Returns the ordered message list.
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.state.lock().store.messages().to_vec()
    }

    /// Returns the messages grouped into threads.
    #[must_use]
    pub fn threads(&self) -> Vec<ThreadNode> {
        organize(self.state.lock().store.messages())
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.lock().loading_initial
    }

    #[must_use]
    pub fn is_loading_more(&self) -> bool {
        self.state.lock().loading_more
    }

    #[must_use]
    pub fn has_more(&self) -> bool {
        let state = self.state.lock();
        state.loaded && state.cursor.has_more()
    }

    #[must_use]
    pub fn cursor(&self) -> PaginationCursor {
        self.state.lock().cursor
    }

    /// Returns the last load error, cleared by the next load attempt.
    #[must_use]
    pub fn error(&self) -> Option<SyncError> {
        self.state.lock().error.clone()
    }

    /// Returns the remote users currently typing.
    #[must_use]
    pub fn typing_users(&self) -> Vec<TypingEntry> {
        let state = self.state.lock();
        state
            .typing
            .active(Instant::now())
            .into_iter()
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn typing_indicator(&self) -> Option<String> {
        self.state.lock().typing.format_indicator(Instant::now())
    }

    /// Returns a receiver that changes whenever the visible state does.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.state.lock().subscribe()
    }

    /// Loads the next older page of history.
    ///
    /// # Errors
    /// Returns `SyncError::LoadFailed` if the page could not be fetched.
    pub async fn load_more(&self) -> Result<LoadOutcome, SyncError> {
        self.pagination.load_more().await
    }

    /// Retries after a load error.
    ///
    /// Reloads from scratch if no page has been loaded yet, otherwise
    /// continues backward pagination.
    ///
    /// # Errors
    /// Returns `SyncError::LoadFailed` if the page could not be fetched.
    pub async fn retry(&self) -> Result<LoadOutcome, SyncError> {
        let loaded = self.state.lock().loaded;
        if loaded {
            self.pagination.load_more().await
        } else {
            self.pagination.load_initial().await
        }
    }

    /// Sends a message, showing it immediately.
    ///
    /// # Errors
    /// Returns `SyncError::SendFailed` if the send was rejected; the
    /// optimistic entry has been removed by then.
    pub async fn send_message(&self, outgoing: OutgoingMessage) -> Result<Message, SyncError> {
        self.typing.stop();
        self.writer
            .send(&outgoing.content, outgoing.reply_to.as_ref())
            .await
    }

    /// Edits one of the loaded messages.
    ///
    /// # Errors
    /// Returns `SyncError` if the message is unknown, unconfirmed, or the
    /// service rejects the edit.
    pub async fn edit_message(&self, message_id: &MessageId, content: &str) -> Result<(), SyncError> {
        self.actions.edit(message_id, content).await
    }

    /// Deletes one of the loaded messages.
    ///
    /// # Errors
    /// Returns `SyncError` if the message is unknown, unconfirmed, or the
    /// service rejects the delete.
    pub async fn delete_message(&self, message_id: &MessageId) -> Result<(), SyncError> {
        self.actions.delete(message_id).await
    }

    /// Toggles the local user's reaction on a message.
    ///
    /// # Errors
    /// Returns `SyncError` if the message is unknown, unconfirmed, or the
    /// service rejects the change.
    pub async fn react(&self, message_id: &MessageId, emoji: &str) -> Result<ReactionChange, SyncError> {
        self.actions.toggle_reaction(message_id, emoji).await
    }

    /// Reports a change of the draft text.
    pub fn start_typing(&self, draft: &str) {
        self.typing.on_input(draft);
    }

    /// Reports that the input lost focus.
    pub fn stop_typing(&self) {
        self.typing.stop();
    }
}

impl Drop for ChannelSession {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.get_mut().take() {
            pump.abort();
        }
        let mut state = self.state.lock();
        if state.mounted {
            state.unmount();
            drop(state);
            self.typing.stop();
            warn!(channel_id = %self.channel_id, "Channel session dropped without close");
        }
    }
}

async fn pump_events(
    applier: Arc<EventApplier>,
    state: SharedSessionState,
    mut events: mpsc::UnboundedReceiver<ChannelEvent>,
) {
    while let Some(event) = events.recv().await {
        applier.handle(&state, event);
    }

    let mut state = state.lock();
    if state.mounted {
        warn!(channel_id = %state.channel_id, "Channel event stream closed while session is open");
        state.error = Some(SyncError::unexpected("channel event stream closed"));
        state.touch();
    } else {
        debug!("Channel event stream ended");
    }
}
