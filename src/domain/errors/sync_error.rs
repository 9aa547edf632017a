//! Synchronization error types.

use thiserror::Error;

/// Errors surfaced by a channel session.
///
/// None of these are fatal: every variant leaves the session in a
/// retryable or ignorable state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum SyncError {
    #[error("failed to load messages: {message}")]
    LoadFailed { message: String },

    #[error("failed to send message: {message}")]
    SendFailed { message: String },

    #[error("failed to edit message: {message}")]
    EditFailed { message: String },

    #[error("failed to delete message: {message}")]
    DeleteFailed { message: String },

    #[error("failed to update reaction: {message}")]
    ReactionFailed { message: String },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("message {id} is not loaded")]
    NotFound { id: String },

    #[error("channel session is closed")]
    SessionClosed,

    #[error("unexpected error: {message}")]
    Unexpected { message: String },
}

impl SyncError {
    /// Creates load failure.
    #[must_use]
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed {
            message: message.into(),
        }
    }

    /// Creates send failure.
    #[must_use]
    pub fn send_failed(message: impl Into<String>) -> Self {
        Self::SendFailed {
            message: message.into(),
        }
    }

    /// Creates edit failure.
    #[must_use]
    pub fn edit_failed(message: impl Into<String>) -> Self {
        Self::EditFailed {
            message: message.into(),
        }
    }

    /// Creates delete failure.
    #[must_use]
    pub fn delete_failed(message: impl Into<String>) -> Self {
        Self::DeleteFailed {
            message: message.into(),
        }
    }

    /// Creates reaction failure.
    #[must_use]
    pub fn reaction_failed(message: impl Into<String>) -> Self {
        Self::ReactionFailed {
            message: message.into(),
        }
    }

    /// Creates network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Creates not-found error.
    #[must_use]
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    /// Creates unexpected error.
    #[must_use]
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected {
            message: message.into(),
        }
    }

    /// Returns whether retrying the same operation may succeed.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::LoadFailed { .. }
                | Self::SendFailed { .. }
                | Self::EditFailed { .. }
                | Self::DeleteFailed { .. }
                | Self::ReactionFailed { .. }
                | Self::Network { .. }
        )
    }

    /// Returns whether error came from a history load.
    #[must_use]
    pub const fn is_load_error(&self) -> bool {
        matches!(self, Self::LoadFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_recoverability() {
        assert!(SyncError::load_failed("timeout").is_recoverable());
        assert!(SyncError::send_failed("500").is_recoverable());
        assert!(SyncError::network("offline").is_recoverable());
        assert!(!SyncError::SessionClosed.is_recoverable());
        assert!(!SyncError::not_found("m1").is_recoverable());
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            SyncError::load_failed("timeout").to_string(),
            "failed to load messages: timeout"
        );
        assert_eq!(
            SyncError::not_found("m1").to_string(),
            "message m1 is not loaded"
        );
    }
}
