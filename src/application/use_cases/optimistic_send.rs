//! Optimistic message sending.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::application::services::StoreMutation;
use crate::application::session_state::SharedSessionState;
use crate::application::use_cases::event_applier::EventApplier;
use crate::domain::entities::{InlineReply, Message, MessageId};
use crate::domain::errors::SyncError;
use crate::domain::ports::{MessageServicePort, SendMessageRequest};

/// A message shown locally and awaiting the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    pub temp_id: MessageId,
    pub request: SendMessageRequest,
    /// Parent whose inline replies were bumped, if any.
    pub patched_parent: Option<MessageId>,
}

/// Shows sends immediately and settles them once the server answers.
#[derive(Clone)]
pub struct OptimisticWriteCoordinator {
    service: Arc<dyn MessageServicePort>,
    applier: Arc<EventApplier>,
    state: SharedSessionState,
}

impl OptimisticWriteCoordinator {
    #[must_use]
    pub const fn new(
        service: Arc<dyn MessageServicePort>,
        applier: Arc<EventApplier>,
        state: SharedSessionState,
    ) -> Self {
        Self {
            service,
            applier,
            state,
        }
    }

    /// Stages and dispatches a send.
    ///
    /// # Errors
    /// Returns `SyncError::SendFailed` if the content is blank or the
    /// service rejects the send, in which case the optimistic entry has
    /// already been rolled back.
    pub async fn send(
        &self,
        content: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<Message, SyncError> {
        let pending = self.stage(content, reply_to)?;
        self.dispatch(pending).await
    }

    /// Inserts the optimistic message and, for replies, patches the parent.
    ///
    /// The thread root is the parent's root when the parent is itself a
    /// reply, otherwise the parent.
    ///
    /// # Errors
    /// Returns an error if the content is blank or the session is closed.
    pub fn stage(
        &self,
        content: &str,
        reply_to: Option<&MessageId>,
    ) -> Result<PendingSend, SyncError> {
        if content.trim().is_empty() {
            return Err(SyncError::send_failed("message is empty"));
        }

        let mut state = self.state.lock();
        if !state.mounted {
            return Err(SyncError::SessionClosed);
        }

        let temp_id = MessageId::temporary();
        let mut request = SendMessageRequest::new(content);
        let mut message = Message::new(
            temp_id.clone(),
            state.channel_id.clone(),
            state.local_user.clone(),
            content,
            Utc::now(),
        )
        .with_optimistic(true);

        let mut patched_parent = None;
        if let Some(parent_id) = reply_to {
            let parent = state.store.get(parent_id);
            let root = parent
                .and_then(|p| p.thread_root().filter(|_| p.is_thread_reply()))
                .cloned()
                .unwrap_or_else(|| parent_id.clone());
            let parent_loaded = parent.is_some();

            request = request.with_thread(parent_id.clone(), root.clone());
            message = message.with_thread(parent_id.clone(), root);

            if parent_loaded {
                state.store.apply(StoreMutation::ReplyLinked {
                    parent: parent_id.clone(),
                    reply: InlineReply::of(&message),
                });
                patched_parent = Some(parent_id.clone());
            }
        }

        state.store.apply(StoreMutation::Upsert(message));
        state.touch();
        debug!(temp_id = %temp_id, reply = reply_to.is_some(), "Staged optimistic message");

        Ok(PendingSend {
            temp_id,
            request,
            patched_parent,
        })
    }

    /// Sends `pending` and settles the optimistic entry.
    ///
    /// On success the confirmed copy goes through the same path as a pushed
    /// `message_sent`; on failure the entry and any parent patch are undone.
    ///
    /// # Errors
    /// Returns the service's `SyncError` after rolling back.
    pub async fn dispatch(&self, pending: PendingSend) -> Result<Message, SyncError> {
        let channel_id = self.state.lock().channel_id.clone();
        let result = self
            .service
            .send_message(&channel_id, pending.request.clone())
            .await;

        match result {
            Ok(confirmed) => {
                self.confirm(&pending, confirmed.clone());
                info!(channel_id = %channel_id, message_id = %confirmed.id(), "Message sent");
                Ok(confirmed)
            }
            Err(e) => {
                warn!(channel_id = %channel_id, temp_id = %pending.temp_id, error = %e, "Failed to send message");
                self.rollback(&pending);
                Err(e)
            }
        }
    }

    /// Removes the optimistic entry and reverts the parent patch.
    pub fn rollback(&self, pending: &PendingSend) {
        let mut state = self.state.lock();
        if !state.mounted {
            return;
        }
        state
            .store
            .apply(StoreMutation::Remove(pending.temp_id.clone()));
        if let Some(parent) = &pending.patched_parent {
            state.store.apply(StoreMutation::ReplyUnlinked {
                parent: parent.clone(),
                reply: pending.temp_id.clone(),
            });
        }
        state.touch();
    }

    fn confirm(&self, pending: &PendingSend, confirmed: Message) {
        let mut state = self.state.lock();
        if !state.mounted {
            debug!(temp_id = %pending.temp_id, "Session closed before send confirmed");
            return;
        }

        let confirmed_id = confirmed.id().clone();
        self.applier.apply_created(&mut state, confirmed.clone());

        // Content match missed (server rewrote the text): pair by the known temp id.
        if state.store.contains(&pending.temp_id) {
            state.store.apply(StoreMutation::Reconcile {
                pending: pending.temp_id.clone(),
                confirmed,
            });
            if let Some(parent) = &pending.patched_parent {
                state
                    .store
                    .rename_reply(parent, &pending.temp_id, &confirmed_id);
            }
        }
        state.touch();
    }
}
