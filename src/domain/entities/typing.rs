use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use super::UserId;

/// Ephemeral "is typing" state for one remote user.
#[derive(Debug, Clone, Serialize)]
pub struct TypingEntry {
    pub user_id: UserId,
    pub user_name: String,
    pub is_typing: bool,
    #[serde(skip)]
    pub last_typing_time: Instant,
}

impl TypingEntry {
    #[must_use]
    pub fn new(user_id: UserId, user_name: String, now: Instant) -> Self {
        Self {
            user_id,
            user_name,
            is_typing: true,
            last_typing_time: now,
        }
    }

    /// Marks the user as typing again, moving the expiry forward.
    pub fn refresh(&mut self, user_name: Option<String>, now: Instant) {
        if let Some(name) = user_name {
            self.user_name = name;
        }
        self.is_typing = true;
        self.last_typing_time = now;
    }

    #[must_use]
    pub fn is_expired(&self, timeout: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.last_typing_time) >= timeout
    }
}
