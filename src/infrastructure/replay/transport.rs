//! In-process channel transport.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::domain::entities::ChannelId;
use crate::domain::errors::SyncError;
use crate::domain::ports::{ChannelEvent, ChannelTransportPort, TypingSignal};

/// Delivers events emitted in-process to the sessions that joined the channel.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    subscribers: Mutex<HashMap<ChannelId, mpsc::UnboundedSender<ChannelEvent>>>,
    signals: Mutex<Vec<(ChannelId, TypingSignal)>>,
    refuse_joins: bool,
}

impl LoopbackTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose joins always fail.
    #[must_use]
    pub fn offline() -> Self {
        Self {
            refuse_joins: true,
            ..Self::default()
        }
    }

    /// Delivers `event` to the channel it names.
    ///
    /// Returns `false` if nobody has joined that channel.
    pub fn emit(&self, event: ChannelEvent) -> bool {
        let subscribers = self.subscribers.lock();
        let Some(tx) = subscribers.get(event.channel_id()) else {
            trace!(event = event.name(), "No subscriber for event");
            return false;
        };
        tx.send(event).is_ok()
    }

    #[must_use]
    pub fn is_joined(&self, channel_id: &ChannelId) -> bool {
        self.subscribers.lock().contains_key(channel_id)
    }

    /// Returns the typing signals sent so far, oldest first.
    #[must_use]
    pub fn typing_signals(&self) -> Vec<(ChannelId, TypingSignal)> {
        self.signals.lock().clone()
    }
}

#[async_trait]
impl ChannelTransportPort for LoopbackTransport {
    async fn join(
        &self,
        channel_id: &ChannelId,
    ) -> Result<mpsc::UnboundedReceiver<ChannelEvent>, SyncError> {
        if self.refuse_joins {
            return Err(SyncError::network("transport offline"));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        if self.subscribers.lock().insert(channel_id.clone(), tx).is_some() {
            debug!(channel_id = %channel_id, "Replaced existing subscriber");
        }
        Ok(rx)
    }

    async fn leave(&self, channel_id: &ChannelId) {
        self.subscribers.lock().remove(channel_id);
    }

    async fn send_typing(
        &self,
        channel_id: &ChannelId,
        signal: TypingSignal,
    ) -> Result<(), SyncError> {
        self.signals.lock().push((channel_id.clone(), signal));
        Ok(())
    }
}
