use thiserror::Error;

use crate::domain::errors::SyncError;
use crate::infrastructure::wire::WireError;

pub type ReplayResult<T> = Result<T, ReplayError>;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid script: {message}")]
    Script { message: String },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

impl ReplayError {
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script {
            message: message.into(),
        }
    }
}
