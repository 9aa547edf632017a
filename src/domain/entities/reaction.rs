//! Emoji reactions and their pure update rules.

use serde::{Deserialize, Serialize};

use super::UserId;

/// An emoji bucket on a message.
///
/// The count is always derived from the set of reacting users, so it can
/// never drift from the membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    emoji: String,
    users: Vec<UserId>,
}

impl Reaction {
    /// Creates a bucket holding a single user.
    #[must_use]
    pub fn new(emoji: impl Into<String>, user: UserId) -> Self {
        Self {
            emoji: emoji.into(),
            users: vec![user],
        }
    }

    /// Creates a bucket from a user list, dropping repeated ids.
    #[must_use]
    pub fn from_users(emoji: impl Into<String>, users: impl IntoIterator<Item = UserId>) -> Self {
        let mut unique: Vec<UserId> = Vec::new();
        for user in users {
            if !unique.contains(&user) {
                unique.push(user);
            }
        }
        Self {
            emoji: emoji.into(),
            users: unique,
        }
    }

    #[must_use]
    pub fn emoji(&self) -> &str {
        &self.emoji
    }

    #[must_use]
    pub fn users(&self) -> &[UserId] {
        &self.users
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.users.len()
    }

    #[must_use]
    pub fn contains(&self, user: &UserId) -> bool {
        self.users.contains(user)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

/// Returns a new reaction list with `user` added to the `emoji` bucket.
///
/// Adding a user that already reacted with the same emoji is a no-op.
#[must_use]
pub fn with_reaction_added(reactions: &[Reaction], emoji: &str, user: &UserId) -> Vec<Reaction> {
    let mut next = reactions.to_vec();
    match next.iter_mut().find(|r| r.emoji == emoji) {
        Some(bucket) => {
            if !bucket.contains(user) {
                bucket.users.push(user.clone());
            }
        }
        None => next.push(Reaction::new(emoji, user.clone())),
    }
    next
}

/// Returns a new reaction list with `user` removed from the `emoji` bucket.
///
/// Empty buckets are dropped. Removing a non-member is a no-op.
#[must_use]
pub fn with_reaction_removed(reactions: &[Reaction], emoji: &str, user: &UserId) -> Vec<Reaction> {
    reactions
        .iter()
        .filter_map(|reaction| {
            if reaction.emoji != emoji {
                return Some(reaction.clone());
            }
            let users: Vec<UserId> = reaction
                .users
                .iter()
                .filter(|u| *u != user)
                .cloned()
                .collect();
            if users.is_empty() {
                None
            } else {
                Some(Reaction {
                    emoji: reaction.emoji.clone(),
                    users,
                })
            }
        })
        .collect()
}
