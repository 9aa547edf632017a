//! Ordered, deduplicated message list for one channel.
//!
//! Every write goes through [`canonicalize`], which merges by id and sorts by
//! timestamp, so the list stays unique and non-decreasing regardless of the
//! order pages and events arrive in.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::entities::{
    InlineReply, Message, MessageId, UserId, with_reaction_added, with_reaction_removed,
};

/// A single id-addressed change to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMutation {
    /// Inserts or overwrites a message by id.
    Upsert(Message),
    /// Drops the optimistic `pending` entry and inserts `confirmed` in its place.
    Reconcile {
        pending: MessageId,
        confirmed: Message,
    },
    /// Replaces content and flags the message as edited.
    Edit {
        id: MessageId,
        content: String,
        edited_at: Option<DateTime<Utc>>,
    },
    Remove(MessageId),
    ReactionAdded {
        id: MessageId,
        emoji: String,
        user: UserId,
    },
    ReactionRemoved {
        id: MessageId,
        emoji: String,
        user: UserId,
    },
    /// Records `reply` on its parent's inline reply list.
    ReplyLinked {
        parent: MessageId,
        reply: InlineReply,
    },
    ReplyUnlinked {
        parent: MessageId,
        reply: MessageId,
    },
}

impl StoreMutation {
    /// Id of the message this mutation writes.
    #[must_use]
    pub fn target(&self) -> &MessageId {
        match self {
            Self::Upsert(message) | Self::Reconcile { confirmed: message, .. } => message.id(),
            Self::Edit { id, .. }
            | Self::Remove(id)
            | Self::ReactionAdded { id, .. }
            | Self::ReactionRemoved { id, .. } => id,
            Self::ReplyLinked { parent, .. } | Self::ReplyUnlinked { parent, .. } => parent,
        }
    }
}

/// Ids written while a history reload is in flight.
#[derive(Debug, Clone, Default)]
struct LiveWrites {
    touched: HashSet<MessageId>,
    removed: HashSet<MessageId>,
}

impl LiveWrites {
    fn touch(&mut self, id: &MessageId) {
        self.removed.remove(id);
        self.touched.insert(id.clone());
    }

    fn remove(&mut self, id: &MessageId) {
        self.touched.remove(id);
        self.removed.insert(id.clone());
    }
}

/// Channel message store.
#[derive(Debug, Clone, Default)]
pub struct MessageStore {
    messages: Vec<Message>,
    live: Option<LiveWrites>,
}

impl MessageStore {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            messages: Vec::new(),
            live: None,
        }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| m.id() == id)
    }

    #[must_use]
    pub fn contains(&self, id: &MessageId) -> bool {
        self.get(id).is_some()
    }

    /// Merges `incoming` into the store.
    pub fn merge(&mut self, incoming: Vec<Message>) {
        if incoming.is_empty() {
            return;
        }
        if let Some(live) = &mut self.live {
            for message in &incoming {
                live.touch(message.id());
            }
        }
        let existing = std::mem::take(&mut self.messages);
        self.messages = canonicalize(existing, incoming);
    }

    /// Starts recording writes that a later [`replace_history`] must keep.
    ///
    /// [`replace_history`]: Self::replace_history
    pub fn begin_reload(&mut self) {
        self.live = Some(LiveWrites::default());
    }

    /// Stops recording without replacing anything.
    pub fn abort_reload(&mut self) {
        self.live = None;
    }

    /// Replaces all confirmed history with `page`.
    ///
    /// Unconfirmed sends survive, and so does every write made since
    /// [`begin_reload`](Self::begin_reload): messages inserted or updated in
    /// the meantime win over their page copy, and removed ones stay removed.
    pub fn replace_history(&mut self, page: Vec<Message>) {
        let live = self.live.take().unwrap_or_default();
        let kept: Vec<Message> = self
            .messages
            .drain(..)
            .filter(|m| m.is_optimistic() || live.touched.contains(m.id()))
            .collect();
        let page: Vec<Message> = page
            .into_iter()
            .filter(|m| !live.removed.contains(m.id()))
            .collect();
        self.messages = canonicalize(page, kept);
    }

    /// Applies one mutation, returning whether the store changed.
    ///
    /// Mutations addressing an id that is not present are ignored.
    pub fn apply(&mut self, mutation: StoreMutation) -> bool {
        let target = mutation.target().clone();
        let next = match mutation {
            StoreMutation::Upsert(message) => {
                let before = self.messages.clone();
                self.merge(vec![message]);
                return before != self.messages;
            }
            StoreMutation::Reconcile { pending, confirmed } => {
                if let Some(live) = &mut self.live {
                    live.touch(&target);
                }
                let existing: Vec<Message> = self
                    .messages
                    .drain(..)
                    .filter(|m| m.id() != &pending)
                    .collect();
                self.messages = canonicalize(existing, vec![confirmed]);
                return true;
            }
            StoreMutation::Edit {
                id,
                content,
                edited_at,
            } => self.replace_with(&id, |m| m.edited(content, edited_at)),
            StoreMutation::Remove(id) => {
                let before = self.messages.len();
                self.messages.retain(|m| m.id() != &id);
                if let Some(live) = &mut self.live {
                    live.remove(&id);
                }
                return before != self.messages.len();
            }
            StoreMutation::ReactionAdded { id, emoji, user } => self.replace_with(&id, |m| {
                let reactions = with_reaction_added(m.reactions(), &emoji, &user);
                m.with_reactions(reactions)
            }),
            StoreMutation::ReactionRemoved { id, emoji, user } => self.replace_with(&id, |m| {
                let reactions = with_reaction_removed(m.reactions(), &emoji, &user);
                m.with_reactions(reactions)
            }),
            StoreMutation::ReplyLinked { parent, reply } => {
                self.replace_with(&parent, |m| m.with_reply_added(reply))
            }
            StoreMutation::ReplyUnlinked { parent, reply } => {
                self.replace_with(&parent, |m| m.with_reply_removed(&reply))
            }
        };

        match next {
            Some(messages) if messages != self.messages => {
                self.messages = messages;
                if let Some(live) = &mut self.live {
                    live.touch(&target);
                }
                true
            }
            Some(_) => false,
            None => {
                debug!("store mutation addressed a message that is not loaded");
                false
            }
        }
    }

    /// Renames an inline reply on `parent` after its reply was confirmed.
    pub fn rename_reply(&mut self, parent: &MessageId, from: &MessageId, to: &MessageId) {
        if let Some(messages) = self.replace_with(parent, |m| m.with_reply_renamed(from, to)) {
            self.messages = messages;
            if let Some(live) = &mut self.live {
                live.touch(parent);
            }
        }
    }

    fn replace_with(
        &self,
        id: &MessageId,
        update: impl FnOnce(Message) -> Message,
    ) -> Option<Vec<Message>> {
        let pos = self.messages.iter().position(|m| m.id() == id)?;
        let mut next = self.messages.clone();
        let updated = update(next[pos].clone());
        next[pos] = updated;
        Some(next)
    }
}

/// Combines `existing` and `incoming` into one ordered, id-unique list.
///
/// For a repeated id the later record wins, except that the result is only
/// optimistic if every representation was.
#[must_use]
pub fn canonicalize(existing: Vec<Message>, incoming: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(existing.len() + incoming.len());
    let mut index: HashMap<MessageId, usize> = HashMap::with_capacity(merged.capacity());

    for message in existing.into_iter().chain(incoming) {
        if let Some(&pos) = index.get(message.id()) {
            let optimistic = merged[pos].is_optimistic() && message.is_optimistic();
            merged[pos] = message.with_optimistic(optimistic);
        } else {
            index.insert(message.id().clone(), merged.len());
            merged.push(message);
        }
    }

    merged.sort_by_key(Message::timestamp);
    merged
}
