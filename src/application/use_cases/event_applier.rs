//! Applies push events to a channel session.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, trace};

use crate::application::services::{DedupPolicy, StoreMutation};
use crate::application::session_state::{SessionState, SharedSessionState};
use crate::domain::entities::{InlineReply, Message, MessageId, UserId};
use crate::domain::ports::{ChannelEvent, NotificationPort};

/// Why an event left the session unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    OtherChannel,
    UnknownMessage,
    OwnTyping,
    Unchanged,
    Closed,
}

/// What applying one event did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new confirmed message was inserted.
    Inserted(MessageId),
    /// An optimistic message was replaced by its confirmed copy.
    Reconciled {
        pending: MessageId,
        confirmed: MessageId,
    },
    /// An existing message changed (content, reactions, re-delivery).
    Updated(MessageId),
    Removed(MessageId),
    TypingStarted(UserId),
    TypingStopped(UserId),
    Ignored(IgnoreReason),
}

impl ApplyOutcome {
    #[must_use]
    pub const fn is_ignored(&self) -> bool {
        matches!(self, Self::Ignored(_))
    }
}

/// Routes channel events to the message store and typing state.
pub struct EventApplier {
    policy: DedupPolicy,
    notifier: Option<Arc<dyn NotificationPort>>,
}

impl EventApplier {
    #[must_use]
    pub fn new(policy: DedupPolicy) -> Self {
        Self {
            policy,
            notifier: None,
        }
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationPort>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    #[must_use]
    pub const fn policy(&self) -> &DedupPolicy {
        &self.policy
    }

    /// Applies `event` to the shared state and runs its side effects.
    ///
    /// Schedules remote typing expiry and dispatches notifications for
    /// messages from other users once the lock is released.
    pub fn handle(&self, shared: &SharedSessionState, event: ChannelEvent) -> ApplyOutcome {
        let name = event.name();

        let (outcome, notification) = {
            let mut state = shared.lock();
            if !state.mounted {
                return ApplyOutcome::Ignored(IgnoreReason::Closed);
            }
            let notification = match &event {
                ChannelEvent::MessageCreated { message }
                    if self.notifier.is_some() && !state.is_local_user(message.sender().id()) =>
                {
                    Some(notification_for(message))
                }
                _ => None,
            };
            let outcome = self.apply(&mut state, event, Instant::now());
            if let ApplyOutcome::TypingStarted(user_id) = &outcome {
                let timeout = state.typing.timeout();
                schedule_typing_expiry(shared, &mut state, user_id.clone(), timeout);
            }
            if !outcome.is_ignored() {
                state.touch();
            }
            (outcome, notification)
        };

        match &outcome {
            ApplyOutcome::Ignored(reason) => {
                trace!(event = name, ?reason, "Ignored channel event");
            }
            ApplyOutcome::Inserted(_) => {
                if let (Some(notifier), Some((title, body))) = (&self.notifier, notification) {
                    notifier.send(&title, &body);
                }
            }
            _ => {}
        }

        outcome
    }

    /// Applies `event` to `state` without side effects beyond the state itself.
    pub fn apply(&self, state: &mut SessionState, event: ChannelEvent, now: Instant) -> ApplyOutcome {
        if event.channel_id() != &state.channel_id {
            return ApplyOutcome::Ignored(IgnoreReason::OtherChannel);
        }

        match event {
            ChannelEvent::MessageCreated { message } => self.apply_created(state, message),
            ChannelEvent::MessageUpdated {
                message_id,
                content,
                edited_at,
                ..
            } => {
                let mutation = StoreMutation::Edit {
                    id: message_id.clone(),
                    content,
                    edited_at,
                };
                changed(state, &message_id, mutation, ApplyOutcome::Updated(message_id.clone()))
            }
            ChannelEvent::MessageDeleted { message_id, .. } => remove_message(state, &message_id),
            ChannelEvent::ReactionAdded {
                message_id,
                user_id,
                emoji,
                ..
            } => {
                let mutation = StoreMutation::ReactionAdded {
                    id: message_id.clone(),
                    emoji,
                    user: user_id,
                };
                changed(state, &message_id, mutation, ApplyOutcome::Updated(message_id.clone()))
            }
            ChannelEvent::ReactionRemoved {
                message_id,
                user_id,
                emoji,
                ..
            } => {
                let mutation = StoreMutation::ReactionRemoved {
                    id: message_id.clone(),
                    emoji,
                    user: user_id,
                };
                changed(state, &message_id, mutation, ApplyOutcome::Updated(message_id.clone()))
            }
            ChannelEvent::TypingStarted {
                user_id, user_name, ..
            } => {
                if state.is_local_user(&user_id) {
                    return ApplyOutcome::Ignored(IgnoreReason::OwnTyping);
                }
                state.typing.start(user_id.clone(), user_name, now);
                ApplyOutcome::TypingStarted(user_id)
            }
            ChannelEvent::TypingStopped { user_id, .. } => {
                if state.is_local_user(&user_id) {
                    return ApplyOutcome::Ignored(IgnoreReason::OwnTyping);
                }
                // The expiry timer stays armed and drops the stopped entry.
                if state.typing.stop(&user_id) {
                    ApplyOutcome::TypingStopped(user_id)
                } else {
                    ApplyOutcome::Ignored(IgnoreReason::Unchanged)
                }
            }
        }
    }

    /// Inserts a confirmed message, reconciling it with a pending send if one matches.
    pub fn apply_created(&self, state: &mut SessionState, message: Message) -> ApplyOutcome {
        let confirmed_id = message.id().clone();
        let parent = message.connected_to().cloned();

        if state.store.contains(&confirmed_id) {
            let changed = state.store.apply(StoreMutation::Upsert(message));
            debug!(message_id = %confirmed_id, changed, "Absorbed duplicate delivery");
            return if changed {
                ApplyOutcome::Updated(confirmed_id)
            } else {
                ApplyOutcome::Ignored(IgnoreReason::Unchanged)
            };
        }

        let pending = self
            .policy
            .find_match(state.store.messages(), &message)
            .map(|m| m.id().clone());

        let reply = InlineReply::of(&message);
        if let Some(pending) = pending {
            state.store.apply(StoreMutation::Reconcile {
                pending: pending.clone(),
                confirmed: message,
            });
            if let Some(parent) = &parent {
                state.store.rename_reply(parent, &pending, &confirmed_id);
            }
            debug!(pending = %pending, confirmed = %confirmed_id, "Reconciled optimistic message");
            return ApplyOutcome::Reconciled {
                pending,
                confirmed: confirmed_id,
            };
        }

        state.store.apply(StoreMutation::Upsert(message));
        if let Some(parent) = parent {
            state.store.apply(StoreMutation::ReplyLinked { parent, reply });
        }
        ApplyOutcome::Inserted(confirmed_id)
    }
}

/// Removes a message and unlinks it from its parent's inline replies.
pub(crate) fn remove_message(state: &mut SessionState, id: &MessageId) -> ApplyOutcome {
    let parent = state
        .store
        .get(id)
        .and_then(|m| m.connected_to().cloned());

    if !state.store.apply(StoreMutation::Remove(id.clone())) {
        return ApplyOutcome::Ignored(IgnoreReason::UnknownMessage);
    }
    if let Some(parent) = parent {
        state.store.apply(StoreMutation::ReplyUnlinked {
            parent,
            reply: id.clone(),
        });
    }
    ApplyOutcome::Removed(id.clone())
}

fn changed(
    state: &mut SessionState,
    id: &MessageId,
    mutation: StoreMutation,
    outcome: ApplyOutcome,
) -> ApplyOutcome {
    if !state.store.contains(id) {
        return ApplyOutcome::Ignored(IgnoreReason::UnknownMessage);
    }
    if state.store.apply(mutation) {
        outcome
    } else {
        ApplyOutcome::Ignored(IgnoreReason::Unchanged)
    }
}

fn schedule_typing_expiry(
    shared: &SharedSessionState,
    state: &mut SessionState,
    user_id: UserId,
    timeout: Duration,
) {
    state.cancel_typing_timer(&user_id);
    let shared = Arc::clone(shared);
    let key = user_id.clone();
    let timer = tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let mut state = shared.lock();
        state.typing_timers.remove(&user_id);
        if state.typing.expire_user(&user_id, Instant::now()) {
            debug!(user_id = %user_id, "Typing indicator expired");
            state.touch();
        }
    });
    state.typing_timers.insert(key, timer);
}

fn notification_for(message: &Message) -> (String, String) {
    let title = format!("New message from {}", message.sender().display_name());
    let body = if !message.content().is_empty() {
        message.content().to_string()
    } else if let Some(attachment) = message.attachment() {
        format!("[{}]", attachment.filename())
    } else if message.kind().has_media() {
        "[media]".to_string()
    } else {
        String::new()
    };
    (title, body)
}
