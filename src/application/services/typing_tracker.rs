use std::time::Duration;

use tokio::time::Instant;

use crate::domain::entities::{TypingEntry, UserId};

/// How long a remote "start" stays valid without a refresh.
pub const REMOTE_TYPING_TIMEOUT: Duration = Duration::from_secs(5);

/// Tracks which remote users are typing in the channel.
#[derive(Debug, Clone)]
pub struct TypingTracker {
    entries: Vec<TypingEntry>,
    timeout: Duration,
}

impl TypingTracker {
    #[must_use]
    pub const fn new() -> Self {
        Self::with_timeout(REMOTE_TYPING_TIMEOUT)
    }

    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            entries: Vec::new(),
            timeout,
        }
    }

    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Records a "started" signal, creating or refreshing the entry.
    pub fn start(&mut self, user_id: UserId, user_name: Option<String>, now: Instant) {
        if let Some(existing) = self.entries.iter_mut().find(|e| e.user_id == user_id) {
            existing.refresh(user_name, now);
        } else {
            let name = user_name.unwrap_or_else(|| user_id.to_string());
            self.entries.push(TypingEntry::new(user_id, name, now));
        }
    }

    /// Records a "stopped" signal. Returns whether an active entry was cleared.
    pub fn stop(&mut self, user_id: &UserId) -> bool {
        match self.entries.iter_mut().find(|e| &e.user_id == user_id) {
            Some(entry) if entry.is_typing => {
                entry.is_typing = false;
                true
            }
            _ => false,
        }
    }

    /// Drops the entry for `user_id` if it has not been refreshed within the timeout.
    pub fn expire_user(&mut self, user_id: &UserId, now: Instant) -> bool {
        let timeout = self.timeout;
        let before = self.entries.len();
        self.entries
            .retain(|e| &e.user_id != user_id || !e.is_expired(timeout, now));
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Returns the users currently typing.
    #[must_use]
    pub fn active(&self, now: Instant) -> Vec<&TypingEntry> {
        self.entries
            .iter()
            .filter(|e| e.is_typing && !e.is_expired(self.timeout, now))
            .collect()
    }

    #[must_use]
    pub fn format_indicator(&self, now: Instant) -> Option<String> {
        let users = self.active(now);

        match users.len() {
            0 => None,
            1 => Some(format!("{} is typing...", users[0].user_name)),
            2 => Some(format!(
                "{} and {} are typing...",
                users[0].user_name, users[1].user_name
            )),
            3 => Some(format!(
                "{}, {} and {} are typing...",
                users[0].user_name, users[1].user_name, users[2].user_name
            )),
            _ => Some("Several people are typing...".to_string()),
        }
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}
