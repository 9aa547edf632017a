//! In-memory message service.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use tracing::debug;

use super::transport::LoopbackTransport;
use crate::domain::entities::{
    ChannelId, Message, MessageId, MessagePage, PageRequest, Sender, with_reaction_added,
    with_reaction_removed,
};
use crate::domain::errors::SyncError;
use crate::domain::ports::{ChannelEvent, MessageServicePort, SendMessageRequest};

/// Kind of request a scripted failure applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Load,
    Send,
    Mutation,
}

/// Serves one channel's history from memory.
///
/// With an echo transport attached, every accepted write is also pushed
/// back through the channel's event stream, the way a server broadcasts to
/// all members including the author.
pub struct InMemoryMessageService {
    channel_id: ChannelId,
    author: Sender,
    history: Mutex<Vec<Message>>,
    failures: Mutex<HashSet<Operation>>,
    next_id: Mutex<u64>,
    echo: Option<Arc<LoopbackTransport>>,
}

impl InMemoryMessageService {
    /// Creates a service for `channel_id`, authoring sends as `author`.
    #[must_use]
    pub fn new(channel_id: ChannelId, author: Sender, mut history: Vec<Message>) -> Self {
        history.sort_by_key(Message::timestamp);
        Self {
            channel_id,
            author,
            history: Mutex::new(history),
            failures: Mutex::new(HashSet::new()),
            next_id: Mutex::new(1),
            echo: None,
        }
    }

    #[must_use]
    pub fn with_echo(mut self, transport: Arc<LoopbackTransport>) -> Self {
        self.echo = Some(transport);
        self
    }

    /// Makes the next request of `operation` kind fail.
    pub fn fail_next(&self, operation: Operation) {
        self.failures.lock().insert(operation);
    }

    /// Adds a message to the stored history without broadcasting it.
    pub fn insert(&self, message: Message) {
        let mut history = self.history.lock();
        history.retain(|m| m.id() != message.id());
        history.push(message);
        history.sort_by_key(Message::timestamp);
    }

    /// Returns the stored history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<Message> {
        self.history.lock().clone()
    }

    fn take_failure(&self, operation: Operation) -> bool {
        self.failures.lock().remove(&operation)
    }

    fn check_channel(&self, channel_id: &ChannelId) -> Result<(), SyncError> {
        if channel_id == &self.channel_id {
            Ok(())
        } else {
            Err(SyncError::network(format!("unknown channel {channel_id}")))
        }
    }

    fn next_message_id(&self) -> MessageId {
        let history = self.history.lock();
        let mut next = self.next_id.lock();
        loop {
            let id = MessageId(format!("srv_{}", *next));
            *next += 1;
            if !history.iter().any(|m| m.id() == &id) {
                return id;
            }
        }
    }

    fn broadcast(&self, event: ChannelEvent) {
        if let Some(transport) = &self.echo {
            transport.emit(event);
        }
    }

    fn update<F>(&self, message_id: &MessageId, f: F) -> Option<Message>
    where
        F: FnOnce(Message) -> Message,
    {
        let mut history = self.history.lock();
        let slot = history.iter_mut().find(|m| m.id() == message_id)?;
        *slot = f(slot.clone());
        Some(slot.clone())
    }
}

#[async_trait]
impl MessageServicePort for InMemoryMessageService {
    async fn list_messages(
        &self,
        channel_id: &ChannelId,
        request: PageRequest,
    ) -> Result<MessagePage, SyncError> {
        self.check_channel(channel_id)
            .map_err(|e| SyncError::load_failed(e.to_string()))?;
        if self.take_failure(Operation::Load) {
            return Err(SyncError::load_failed("scripted failure"));
        }

        let history = self.history.lock();
        let total = history.len();
        let messages: Vec<Message> = history
            .iter()
            .rev()
            .skip(request.offset)
            .take(request.limit)
            .cloned()
            .collect();
        let has_more = request.offset + messages.len() < total;

        debug!(
            offset = request.offset,
            limit = request.limit,
            count = messages.len(),
            total,
            "Serving history page"
        );
        Ok(MessagePage::new(messages, total, has_more))
    }

    async fn send_message(
        &self,
        channel_id: &ChannelId,
        request: SendMessageRequest,
    ) -> Result<Message, SyncError> {
        self.check_channel(channel_id)
            .map_err(|e| SyncError::send_failed(e.to_string()))?;
        if self.take_failure(Operation::Send) {
            return Err(SyncError::send_failed("scripted failure"));
        }

        let mut message = Message::new(
            self.next_message_id(),
            channel_id.clone(),
            self.author.clone(),
            request.content,
            Utc::now(),
        );
        if let (Some(reply_to), Some(root)) = (request.reply_to, request.thread_root) {
            message = message.with_thread(reply_to, root);
        }

        self.insert(message.clone());
        self.broadcast(ChannelEvent::MessageCreated {
            message: message.clone(),
        });
        Ok(message)
    }

    async fn edit_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        content: &str,
    ) -> Result<Message, SyncError> {
        self.check_channel(channel_id)
            .map_err(|e| SyncError::edit_failed(e.to_string()))?;
        if self.take_failure(Operation::Mutation) {
            return Err(SyncError::edit_failed("scripted failure"));
        }

        let edited_at = Utc::now();
        let message = self
            .update(message_id, |m| m.edited(content, Some(edited_at)))
            .ok_or_else(|| SyncError::edit_failed(format!("message {message_id} does not exist")))?;

        self.broadcast(ChannelEvent::MessageUpdated {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            content: content.to_string(),
            edited_at: Some(edited_at),
        });
        Ok(message)
    }

    async fn delete_message(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
    ) -> Result<(), SyncError> {
        self.check_channel(channel_id)
            .map_err(|e| SyncError::delete_failed(e.to_string()))?;
        if self.take_failure(Operation::Mutation) {
            return Err(SyncError::delete_failed("scripted failure"));
        }

        {
            let mut history = self.history.lock();
            let before = history.len();
            history.retain(|m| m.id() != message_id);
            if history.len() == before {
                return Err(SyncError::delete_failed(format!(
                    "message {message_id} does not exist"
                )));
            }
        }

        self.broadcast(ChannelEvent::MessageDeleted {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
        });
        Ok(())
    }

    async fn add_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), SyncError> {
        self.check_channel(channel_id)
            .map_err(|e| SyncError::reaction_failed(e.to_string()))?;
        if self.take_failure(Operation::Mutation) {
            return Err(SyncError::reaction_failed("scripted failure"));
        }

        let user = self.author.id().clone();
        self.update(message_id, |m| {
            let reactions = with_reaction_added(m.reactions(), emoji, &user);
            m.with_reactions(reactions)
        })
        .ok_or_else(|| SyncError::reaction_failed(format!("message {message_id} does not exist")))?;

        self.broadcast(ChannelEvent::ReactionAdded {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            user_id: user,
            emoji: emoji.to_string(),
        });
        Ok(())
    }

    async fn remove_reaction(
        &self,
        channel_id: &ChannelId,
        message_id: &MessageId,
        emoji: &str,
    ) -> Result<(), SyncError> {
        self.check_channel(channel_id)
            .map_err(|e| SyncError::reaction_failed(e.to_string()))?;
        if self.take_failure(Operation::Mutation) {
            return Err(SyncError::reaction_failed("scripted failure"));
        }

        let user = self.author.id().clone();
        self.update(message_id, |m| {
            let reactions = with_reaction_removed(m.reactions(), emoji, &user);
            m.with_reactions(reactions)
        })
        .ok_or_else(|| SyncError::reaction_failed(format!("message {message_id} does not exist")))?;

        self.broadcast(ChannelEvent::ReactionRemoved {
            channel_id: channel_id.clone(),
            message_id: message_id.clone(),
            user_id: user,
            emoji: emoji.to_string(),
        });
        Ok(())
    }
}
