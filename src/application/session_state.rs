//! Mutable state of one open channel.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::application::services::{MessageStore, TypingTracker};
use crate::domain::entities::{ChannelId, PaginationCursor, Sender, UserId};
use crate::domain::errors::SyncError;

/// State shared between the session, its use cases and the event pump.
///
/// Every mutation happens under the lock and the lock is never held across
/// an `.await`, so each handler runs to completion before the next one.
pub type SharedSessionState = Arc<Mutex<SessionState>>;

pub struct SessionState {
    pub channel_id: ChannelId,
    pub local_user: Sender,
    pub store: MessageStore,
    pub cursor: PaginationCursor,
    /// Set once the first page has been applied.
    pub loaded: bool,
    pub loading_initial: bool,
    pub loading_more: bool,
    pub error: Option<SyncError>,
    pub typing: TypingTracker,
    pub typing_timers: HashMap<UserId, JoinHandle<()>>,
    /// Cleared on teardown; late results are dropped once this is false.
    pub mounted: bool,
    changes: watch::Sender<u64>,
}

impl SessionState {
    #[must_use]
    pub fn new(
        channel_id: ChannelId,
        local_user: Sender,
        page_size: usize,
        typing: TypingTracker,
    ) -> Self {
        let (changes, _) = watch::channel(0);
        Self {
            channel_id,
            local_user,
            store: MessageStore::new(),
            cursor: PaginationCursor::new(page_size),
            loaded: false,
            loading_initial: false,
            loading_more: false,
            error: None,
            typing,
            typing_timers: HashMap::new(),
            mounted: true,
            changes,
        }
    }

    #[must_use]
    pub fn shared(self) -> SharedSessionState {
        Arc::new(Mutex::new(self))
    }

    #[must_use]
    pub fn is_local_user(&self, user_id: &UserId) -> bool {
        self.local_user.id() == user_id
    }

    /// Signals observers that the visible state changed.
    pub fn touch(&self) {
        self.changes.send_modify(|revision| *revision = revision.wrapping_add(1));
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }

    pub fn cancel_typing_timer(&mut self, user_id: &UserId) {
        if let Some(timer) = self.typing_timers.remove(user_id) {
            timer.abort();
        }
    }

    /// Marks the state as torn down and releases every timer.
    pub fn unmount(&mut self) {
        self.mounted = false;
        for (_, timer) in self.typing_timers.drain() {
            timer.abort();
        }
        self.typing.clear();
        self.touch();
    }
}
