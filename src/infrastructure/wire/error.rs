use thiserror::Error;

pub type WireResult<T> = Result<T, WireError>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("serialization error: {message}")]
    Serialization { message: String },

    #[error("protocol error: {message}")]
    Protocol { message: String },

    #[error("unknown event: {name}")]
    UnknownEvent { name: String },
}

impl WireError {
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unknown_event(name: impl Into<String>) -> Self {
        Self::UnknownEvent { name: name.into() }
    }

    /// Returns whether the payload should simply be skipped.
    #[must_use]
    pub const fn is_ignorable(&self) -> bool {
        matches!(self, Self::UnknownEvent { .. })
    }
}
