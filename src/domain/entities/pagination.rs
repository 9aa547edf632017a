use serde::{Deserialize, Serialize};

use super::Message;

/// Position within a channel's history, newest page first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationCursor {
    /// Total number of messages the server reports for the channel.
    pub total: usize,
    /// Requested page size.
    pub limit: usize,
    /// Number of historical messages fetched so far.
    pub offset: usize,
}

impl PaginationCursor {
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self {
            total: 0,
            limit,
            offset: 0,
        }
    }

    /// Records a successful page of `received` messages.
    ///
    /// `received` is the page size actually returned, which may be short.
    pub const fn advance(&mut self, received: usize, total: usize) {
        self.offset += received;
        self.total = total;
    }

    /// Resets the cursor after a fresh initial page.
    pub const fn reset(&mut self, received: usize, total: usize) {
        self.offset = received;
        self.total = total;
    }

    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.total > self.offset
    }
}

/// Parameters of a history request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub limit: usize,
    pub offset: usize,
}

impl PageRequest {
    #[must_use]
    pub const fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }
}

/// One page of channel history as returned by the message service.
#[derive(Debug, Clone, Default)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub total: usize,
    pub has_more: bool,
}

impl MessagePage {
    #[must_use]
    pub const fn new(messages: Vec<Message>, total: usize, has_more: bool) -> Self {
        Self {
            messages,
            total,
            has_more,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_advances_by_received_count() {
        let mut cursor = PaginationCursor::new(50);
        cursor.reset(2, 5);
        assert!(cursor.has_more());

        cursor.advance(1, 5);
        assert_eq!(cursor.offset, 3);
        assert!(cursor.has_more());

        cursor.advance(2, 5);
        assert!(!cursor.has_more());
    }

    #[test]
    fn test_cursor_total_is_authoritative() {
        let mut cursor = PaginationCursor::new(2);
        cursor.reset(2, 2);
        assert!(!cursor.has_more());

        cursor.advance(0, 10);
        assert!(cursor.has_more());
    }
}
