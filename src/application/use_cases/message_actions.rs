//! Edit, delete and reaction actions on loaded messages.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::services::StoreMutation;
use crate::application::session_state::{SessionState, SharedSessionState};
use crate::application::use_cases::event_applier::remove_message;
use crate::domain::entities::{ChannelId, Message, MessageId, UserId};
use crate::domain::errors::SyncError;
use crate::domain::ports::MessageServicePort;

/// Direction of a reaction toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    Added,
    Removed,
}

/// Forwards message mutations to the service and applies the results.
#[derive(Clone)]
pub struct MessageActions {
    service: Arc<dyn MessageServicePort>,
    state: SharedSessionState,
}

impl MessageActions {
    #[must_use]
    pub const fn new(service: Arc<dyn MessageServicePort>, state: SharedSessionState) -> Self {
        Self { service, state }
    }

    /// Edits a confirmed message.
    ///
    /// # Errors
    /// Returns `SyncError::NotFound` for unknown ids, `EditFailed` for
    /// unconfirmed messages, or the service error.
    pub async fn edit(&self, message_id: &MessageId, content: &str) -> Result<(), SyncError> {
        let channel_id =
            self.confirmed_target(message_id, |message| SyncError::EditFailed { message })?;

        let updated = self
            .service
            .edit_message(&channel_id, message_id, content)
            .await
            .map_err(|e| {
                warn!(channel_id = %channel_id, message_id = %message_id, error = %e, "Failed to edit message");
                e
            })?;

        let mut state = self.state.lock();
        if !state.mounted {
            return Ok(());
        }
        state.store.apply(StoreMutation::Edit {
            id: message_id.clone(),
            content: updated.content().to_string(),
            edited_at: updated.edited_at(),
        });
        state.touch();
        info!(channel_id = %channel_id, message_id = %message_id, "Message edited");
        Ok(())
    }

    /// Deletes a confirmed message.
    ///
    /// # Errors
    /// Returns `SyncError::NotFound` for unknown ids, `DeleteFailed` for
    /// unconfirmed messages, or the service error.
    pub async fn delete(&self, message_id: &MessageId) -> Result<(), SyncError> {
        let channel_id =
            self.confirmed_target(message_id, |message| SyncError::DeleteFailed { message })?;

        self.service
            .delete_message(&channel_id, message_id)
            .await
            .map_err(|e| {
                warn!(channel_id = %channel_id, message_id = %message_id, error = %e, "Failed to delete message");
                e
            })?;

        let mut state = self.state.lock();
        if !state.mounted {
            return Ok(());
        }
        remove_message(&mut state, message_id);
        state.touch();
        info!(channel_id = %channel_id, message_id = %message_id, "Message deleted");
        Ok(())
    }

    /// Toggles the local user's `emoji` reaction.
    ///
    /// The change is shown immediately and reverted if the service rejects it.
    ///
    /// # Errors
    /// Returns `SyncError::NotFound` for unknown ids, `ReactionFailed` for
    /// unconfirmed messages, or the service error.
    pub async fn toggle_reaction(
        &self,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<ReactionChange, SyncError> {
        let (channel_id, change) = {
            let mut state = self.state.lock();
            let channel_id = confirmed_in(&state, message_id, |message| {
                SyncError::ReactionFailed { message }
            })?;
            let user = state.local_user.id().clone();
            let reacted = state.store.get(message_id).is_some_and(|m| {
                m.reactions()
                    .iter()
                    .any(|r| r.emoji() == emoji && r.contains(&user))
            });
            let change = if reacted {
                ReactionChange::Removed
            } else {
                ReactionChange::Added
            };
            state
                .store
                .apply(reaction_mutation(change, message_id, emoji, &user));
            state.touch();
            (channel_id, change)
        };

        let result = match change {
            ReactionChange::Added => {
                self.service
                    .add_reaction(&channel_id, message_id, emoji)
                    .await
            }
            ReactionChange::Removed => {
                self.service
                    .remove_reaction(&channel_id, message_id, emoji)
                    .await
            }
        };

        if let Err(e) = result {
            warn!(channel_id = %channel_id, message_id = %message_id, emoji, error = %e, "Failed to update reaction, reverting");
            let mut state = self.state.lock();
            if state.mounted {
                let inverse = match change {
                    ReactionChange::Added => ReactionChange::Removed,
                    ReactionChange::Removed => ReactionChange::Added,
                };
                let user = state.local_user.id().clone();
                state
                    .store
                    .apply(reaction_mutation(inverse, message_id, emoji, &user));
                state.touch();
            }
            return Err(e);
        }

        debug!(channel_id = %channel_id, message_id = %message_id, emoji, ?change, "Reaction updated");
        Ok(change)
    }

    fn confirmed_target(
        &self,
        message_id: &MessageId,
        unconfirmed: fn(String) -> SyncError,
    ) -> Result<ChannelId, SyncError> {
        let state = self.state.lock();
        confirmed_in(&state, message_id, unconfirmed)
    }
}

/// Resolves the channel for an action on `message_id`.
fn confirmed_in(
    state: &SessionState,
    message_id: &MessageId,
    unconfirmed: fn(String) -> SyncError,
) -> Result<ChannelId, SyncError> {
    if !state.mounted {
        return Err(SyncError::SessionClosed);
    }
    let message: &Message = state
        .store
        .get(message_id)
        .ok_or_else(|| SyncError::not_found(message_id.as_str()))?;
    if message.is_optimistic() {
        return Err(unconfirmed("message is still sending".to_string()));
    }
    Ok(state.channel_id.clone())
}

fn reaction_mutation(
    change: ReactionChange,
    message_id: &MessageId,
    emoji: &str,
    user: &UserId,
) -> StoreMutation {
    let id = message_id.clone();
    let emoji = emoji.to_string();
    let user = user.clone();
    match change {
        ReactionChange::Added => StoreMutation::ReactionAdded { id, emoji, user },
        ReactionChange::Removed => StoreMutation::ReactionRemoved { id, emoji, user },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::TypingTracker;
    use crate::domain::entities::Sender;
    use crate::domain::ports::mocks::MockMessageService;
    use chrono::DateTime;

    fn setup(messages: Vec<Message>) -> (Arc<MockMessageService>, MessageActions) {
        let service = Arc::new(MockMessageService::new());
        let mut state = SessionState::new(
            ChannelId::from("c1"),
            Sender::new("me", "Me"),
            50,
            TypingTracker::new(),
        );
        state.store.merge(messages);
        let actions = MessageActions::new(service.clone(), state.shared());
        (service, actions)
    }

    fn msg(id: &str) -> Message {
        Message::new(
            id,
            "c1",
            Sender::new("me", "Me"),
            "original",
            DateTime::from_timestamp_millis(10).unwrap(),
        )
    }

    fn reactions_on(actions: &MessageActions, id: &str) -> Vec<(String, usize)> {
        actions
            .state
            .lock()
            .store
            .get(&MessageId::from(id))
            .unwrap()
            .reactions()
            .iter()
            .map(|r| (r.emoji().to_string(), r.count()))
            .collect()
    }

    #[tokio::test]
    async fn test_edit_applies_server_copy() {
        let (_, actions) = setup(vec![msg("m1")]);

        actions.edit(&MessageId::from("m1"), "fixed").await.unwrap();

        let state = actions.state.lock();
        let message = state.store.get(&MessageId::from("m1")).unwrap();
        assert_eq!(message.content(), "fixed");
        assert!(message.is_edited());
        assert!(message.edited_at().is_some());
    }

    #[tokio::test]
    async fn test_edit_failure_leaves_message() {
        let (service, actions) = setup(vec![msg("m1")]);
        service.set_fail_mutations(true);

        let err = actions.edit(&MessageId::from("m1"), "fixed").await.unwrap_err();

        assert!(matches!(err, SyncError::EditFailed { .. }));
        let state = actions.state.lock();
        assert_eq!(state.store.messages()[0].content(), "original");
    }

    #[tokio::test]
    async fn test_actions_on_unknown_or_pending_messages() {
        let (_, actions) = setup(vec![msg("temp_1").with_optimistic(true)]);

        let missing = actions.delete(&MessageId::from("nope")).await.unwrap_err();
        assert_eq!(missing, SyncError::not_found("nope"));

        let pending = actions.delete(&MessageId::from("temp_1")).await.unwrap_err();
        assert!(matches!(pending, SyncError::DeleteFailed { .. }));
    }

    #[tokio::test]
    async fn test_delete_removes_message() {
        let (_, actions) = setup(vec![msg("m1"), msg("m2")]);

        actions.delete(&MessageId::from("m1")).await.unwrap();

        let state = actions.state.lock();
        assert_eq!(state.store.len(), 1);
        assert!(!state.store.contains(&MessageId::from("m1")));
    }

    #[tokio::test]
    async fn test_reaction_toggles() {
        let (_, actions) = setup(vec![msg("m1")]);
        let id = MessageId::from("m1");

        let first = actions.toggle_reaction(&id, "🎉").await.unwrap();
        assert_eq!(first, ReactionChange::Added);
        assert_eq!(reactions_on(&actions, "m1"), vec![("🎉".to_string(), 1)]);

        let second = actions.toggle_reaction(&id, "🎉").await.unwrap();
        assert_eq!(second, ReactionChange::Removed);
        assert!(reactions_on(&actions, "m1").is_empty());
    }

    #[tokio::test]
    async fn test_rejected_reaction_is_reverted() {
        let (service, actions) = setup(vec![msg("m1")]);
        service.set_fail_mutations(true);

        let err = actions
            .toggle_reaction(&MessageId::from("m1"), "🎉")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::ReactionFailed { .. }));
        assert!(reactions_on(&actions, "m1").is_empty());
    }
}
