//! Message service port definition.

use async_trait::async_trait;

use crate::domain::entities::{ChannelId, Message, MessageId, MessagePage, PageRequest};
use crate::domain::errors::SyncError;

/// Outgoing message as handed to the message service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageRequest {
    pub content: String,
    pub reply_to: Option<MessageId>,
    pub thread_root: Option<MessageId>,
}

impl SendMessageRequest {
    #[must_use]
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            reply_to: None,
            thread_root: None,
        }
    }

    #[must_use]
    pub fn with_thread(mut self, reply_to: MessageId, thread_root: MessageId) -> Self {
        self.reply_to = Some(reply_to);
        self.thread_root = Some(thread_root);
        self
    }
}

/// Port for the remote message API.
#[async_trait]
pub trait MessageServicePort: Send + Sync {
    /// Fetches one page of history, newest page first.
    async fn list_messages(
        &self,
        channel_id: &ChannelId,
        request: PageRequest,
    ) -> Result<MessagePage, SyncError>;

    /// Sends a message and returns the server-confirmed copy.
    async fn send_message(
        &self,
        channel_id: &ChannelId,
        request: SendMessageRequest,
    ) -> Result<Message, SyncError>;

    /// Edits message content and returns the updated copy.
    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<Message, SyncError>;

    /// Deletes a message.
    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), SyncError>;

    /// Adds the local user's reaction.
    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), SyncError>;

    /// Removes the local user's reaction.
    async fn remove_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), SyncError>;
}
