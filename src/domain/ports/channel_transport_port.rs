//! Push transport port and the channel events it delivers.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::domain::entities::{ChannelId, Message, MessageId, UserId};
use crate::domain::errors::SyncError;

/// Out-of-band event pushed for a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    MessageCreated {
        message: Message,
    },
    MessageUpdated {
        channel_id: ChannelId,
        message_id: MessageId,
        content: String,
        edited_at: Option<DateTime<Utc>>,
    },
    MessageDeleted {
        channel_id: ChannelId,
        message_id: MessageId,
    },
    ReactionAdded {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: String,
    },
    ReactionRemoved {
        channel_id: ChannelId,
        message_id: MessageId,
        user_id: UserId,
        emoji: String,
    },
    TypingStarted {
        channel_id: ChannelId,
        user_id: UserId,
        user_name: Option<String>,
    },
    TypingStopped {
        channel_id: ChannelId,
        user_id: UserId,
    },
}

impl ChannelEvent {
    #[must_use]
    pub const fn channel_id(&self) -> &ChannelId {
        match self {
            Self::MessageCreated { message } => message.channel_id(),
            Self::MessageUpdated { channel_id, .. }
            | Self::MessageDeleted { channel_id, .. }
            | Self::ReactionAdded { channel_id, .. }
            | Self::ReactionRemoved { channel_id, .. }
            | Self::TypingStarted { channel_id, .. }
            | Self::TypingStopped { channel_id, .. } => channel_id,
        }
    }

    /// Wire name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageCreated { .. } => "message_sent",
            Self::MessageUpdated { .. } => "message_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::ReactionAdded { .. } => "message_reaction_added",
            Self::ReactionRemoved { .. } => "message_reaction_removed",
            Self::TypingStarted { .. } => "channel_typing_start",
            Self::TypingStopped { .. } => "channel_typing_stop",
        }
    }
}

/// Local typing signal sent to the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypingSignal {
    Start,
    Stop,
}

/// Port for the channel push transport.
///
/// Joining hands back the event stream for the channel; dropping the
/// receiver and calling [`ChannelTransportPort::leave`] ends the subscription.
#[async_trait]
pub trait ChannelTransportPort: Send + Sync {
    /// Joins the channel and subscribes to its events.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the subscription cannot be established.
    async fn join(
        &self,
        channel_id: &ChannelId,
    ) -> Result<mpsc::UnboundedReceiver<ChannelEvent>, SyncError>;

    /// Leaves the channel.
    async fn leave(&self, channel_id: &ChannelId);

    /// Broadcasts the local user's typing state.
    ///
    /// # Errors
    ///
    /// Returns `SyncError` if the signal cannot be delivered.
    async fn send_typing(
        &self,
        channel_id: &ChannelId,
        signal: TypingSignal,
    ) -> Result<(), SyncError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory transport for testing.
    #[derive(Default)]
    pub struct MockChannelTransport {
        sender: Mutex<Option<mpsc::UnboundedSender<ChannelEvent>>>,
        pub signals: Mutex<Vec<TypingSignal>>,
        pub leave_calls: AtomicUsize,
    }

    impl MockChannelTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pushes an event to the joined subscriber.
        pub fn emit(&self, event: ChannelEvent) {
            if let Some(tx) = self.sender.lock().as_ref() {
                let _ = tx.send(event);
            }
        }

        pub fn signals(&self) -> Vec<TypingSignal> {
            self.signals.lock().clone()
        }
    }

    #[async_trait]
    impl ChannelTransportPort for MockChannelTransport {
        async fn join(
            &self,
            _channel_id: &ChannelId,
        ) -> Result<mpsc::UnboundedReceiver<ChannelEvent>, SyncError> {
            let (tx, rx) = mpsc::unbounded_channel();
            *self.sender.lock() = Some(tx);
            Ok(rx)
        }

        async fn leave(&self, _channel_id: &ChannelId) {
            self.leave_calls.fetch_add(1, Ordering::SeqCst);
            self.sender.lock().take();
        }

        async fn send_typing(
            &self,
            _channel_id: &ChannelId,
            signal: TypingSignal,
        ) -> Result<(), SyncError> {
            self.signals.lock().push(signal);
            Ok(())
        }
    }
}
