//! Chatsync - real-time message synchronization for chat channel sessions.
//!
//! A [`ChannelSession`](application::ChannelSession) keeps one channel's
//! ordered message list consistent across paged history loads, optimistic
//! sends, and pushed events, and tracks who is typing.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing the channel session, use cases and services.
pub mod application;
/// Domain layer containing entities, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing configuration and adapters.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "chatsync";
