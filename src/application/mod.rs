//! Application layer with the channel session, its use cases and services.

/// Channel session facade.
pub mod channel_session;
/// Pure state services.
pub mod services;
/// Shared session state.
pub mod session_state;
/// Use case implementations.
pub mod use_cases;

pub use channel_session::{
    ChannelSession, DEFAULT_PAGE_SIZE, OutgoingMessage, SessionConfig, SessionPorts,
};
pub use services::{ThreadNode, organize};
pub use use_cases::{ApplyOutcome, LoadOutcome, ReactionChange};
