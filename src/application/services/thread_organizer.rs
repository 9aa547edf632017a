//! Derives a root -> replies view from the flat message list.
//!
//! Replies whose root is not loaded yet (pagination boundary or out-of-order
//! delivery) are shown as standalone roots until the root arrives.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::domain::entities::{Message, MessageId};

/// A top-level message with its derived replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ThreadNode {
    pub root: Message,
    pub replies: Vec<Message>,
}

impl ThreadNode {
    #[must_use]
    pub fn reply_count(&self) -> usize {
        self.replies.len()
    }
}

/// Groups `messages` into threads, ordered ascending by timestamp.
///
/// The input is not modified.
#[must_use]
pub fn organize(messages: &[Message]) -> Vec<ThreadNode> {
    let by_id: HashMap<&MessageId, &Message> = messages.iter().map(|m| (m.id(), m)).collect();

    let root_ids: HashSet<&MessageId> = messages
        .iter()
        .filter(|m| attached_root(m, &by_id).is_none())
        .map(Message::id)
        .collect();

    let mut replies: HashMap<&MessageId, Vec<Message>> = HashMap::new();
    for message in messages {
        if let Some(root) = attached_root(message, &by_id) {
            replies.entry(root).or_default().push(message.clone());
        }
    }

    let mut nodes: Vec<ThreadNode> = messages
        .iter()
        .filter(|m| root_ids.contains(m.id()))
        .map(|root| {
            let mut thread = replies.remove(root.id()).unwrap_or_default();
            thread.sort_by_key(Message::timestamp);
            ThreadNode {
                root: root.clone(),
                replies: thread,
            }
        })
        .collect();

    nodes.sort_by_key(|node| node.root.timestamp());
    nodes
}

/// Returns the loaded root `message` hangs under, if any.
fn attached_root<'a>(
    message: &'a Message,
    by_id: &HashMap<&MessageId, &Message>,
) -> Option<&'a MessageId> {
    if !message.is_thread_reply() {
        return None;
    }
    let root = message.thread_root()?;
    if root == message.id() {
        return None;
    }
    by_id
        .get(root)
        .filter(|candidate| !candidate.is_thread_reply())
        .map(|_| root)
}
