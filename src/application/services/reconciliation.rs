//! Matching of optimistic messages to their server-confirmed counterparts.
//!
//! The server never sees the temporary id, so a confirmed message is paired
//! with a pending one by sender, normalized content and a time window. The
//! match is approximate: two identical sends inside one window pair up in
//! send order.

use std::borrow::Cow;
use std::time::Duration;

use crate::domain::entities::Message;

/// Default tolerance between an optimistic timestamp and the confirmed one.
pub const DEFAULT_DEDUP_WINDOW: Duration = Duration::from_secs(10);

/// Content/time heuristic used to reconcile optimistic messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DedupPolicy {
    window: Duration,
    case_insensitive: bool,
    trim: bool,
}

impl Default for DedupPolicy {
    fn default() -> Self {
        Self {
            window: DEFAULT_DEDUP_WINDOW,
            case_insensitive: true,
            trim: true,
        }
    }
}

impl DedupPolicy {
    #[must_use]
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            case_insensitive: true,
            trim: true,
        }
    }

    #[must_use]
    pub const fn with_case_insensitive(mut self, enabled: bool) -> Self {
        self.case_insensitive = enabled;
        self
    }

    #[must_use]
    pub const fn with_trim(mut self, enabled: bool) -> Self {
        self.trim = enabled;
        self
    }

    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Normalizes content for comparison.
    #[must_use]
    pub fn normalize<'a>(&self, content: &'a str) -> Cow<'a, str> {
        let trimmed = if self.trim { content.trim() } else { content };
        if self.case_insensitive {
            Cow::Owned(trimmed.to_lowercase())
        } else {
            Cow::Borrowed(trimmed)
        }
    }

    /// Returns true if `candidate` is the optimistic twin of `confirmed`.
    #[must_use]
    pub fn matches(&self, candidate: &Message, confirmed: &Message) -> bool {
        if !candidate.is_optimistic() || confirmed.is_optimistic() {
            return false;
        }
        if candidate.sender().id() != confirmed.sender().id() {
            return false;
        }
        if self.normalize(candidate.content()) != self.normalize(confirmed.content()) {
            return false;
        }
        let delta = (confirmed.timestamp() - candidate.timestamp()).abs();
        delta
            .to_std()
            .is_ok_and(|delta| delta <= self.window)
    }

    /// Finds the oldest optimistic message matching `confirmed`.
    #[must_use]
    pub fn find_match<'a>(&self, messages: &'a [Message], confirmed: &Message) -> Option<&'a Message> {
        messages
            .iter()
            .filter(|m| self.matches(m, confirmed))
            .min_by_key(|m| m.timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::Sender;
    use chrono::DateTime;
    use test_case::test_case;

    fn at(millis: i64) -> chrono::DateTime<chrono::Utc> {
        DateTime::from_timestamp_millis(millis).unwrap()
    }

    fn optimistic(id: &str, sender: &str, content: &str, millis: i64) -> Message {
        Message::new(id, "c1", Sender::new(sender, sender), content, at(millis)).with_optimistic(true)
    }

    fn confirmed(id: &str, sender: &str, content: &str, millis: i64) -> Message {
        Message::new(id, "c1", Sender::new(sender, sender), content, at(millis))
    }

    #[test_case("hi", "hi", true ; "identical")]
    #[test_case("  Hi ", "hi", true ; "trimmed_and_case_folded")]
    #[test_case("hi", "hello", false ; "different_content")]
    fn test_content_normalization(local: &str, remote: &str, expected: bool) {
        let policy = DedupPolicy::default();
        let pending = optimistic("temp_1", "me", local, 100);
        let server = confirmed("srv_1", "me", remote, 300);
        assert_eq!(policy.matches(&pending, &server), expected);
    }

    #[test_case(9_999, true ; "inside_window")]
    #[test_case(10_000, true ; "at_window_edge")]
    #[test_case(10_001, false ; "outside_window")]
    #[test_case(-5_000, true ; "confirmed_earlier_than_local_clock")]
    fn test_time_window(offset_ms: i64, expected: bool) {
        let policy = DedupPolicy::default();
        let pending = optimistic("temp_1", "me", "hi", 100_000);
        let server = confirmed("srv_1", "me", "hi", 100_000 + offset_ms);
        assert_eq!(policy.matches(&pending, &server), expected);
    }

    #[test]
    fn test_strict_policy_respects_case() {
        let policy = DedupPolicy::default().with_case_insensitive(false).with_trim(false);
        let pending = optimistic("temp_1", "me", "Hi", 100);
        let server = confirmed("srv_1", "me", "hi", 100);
        assert!(!policy.matches(&pending, &server));
    }

    #[test]
    fn test_different_sender_never_matches() {
        let policy = DedupPolicy::default();
        let pending = optimistic("temp_1", "me", "hi", 100);
        let server = confirmed("srv_1", "someone", "hi", 100);
        assert!(!policy.matches(&pending, &server));
    }

    #[test]
    fn test_confirmed_candidate_is_not_a_match() {
        let policy = DedupPolicy::default();
        let existing = confirmed("srv_0", "me", "hi", 100);
        let server = confirmed("srv_1", "me", "hi", 100);
        assert!(!policy.matches(&existing, &server));
    }

    #[test]
    fn test_find_match_prefers_oldest_pending() {
        let policy = DedupPolicy::default();
        let messages = vec![
            optimistic("temp_2", "me", "ok", 2_000),
            optimistic("temp_1", "me", "ok", 1_000),
        ];
        let server = confirmed("srv_1", "me", "ok", 2_500);
        let found = policy.find_match(&messages, &server).unwrap();
        assert_eq!(found.id().as_str(), "temp_1");
    }
}
