//! Domain layer with core entities, errors, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Port definitions.
pub mod ports;
/// Serde utilities.
pub mod serde_utils;

pub use entities::{ChannelId, Message, MessageId, Sender, UserId};
pub use errors::SyncError;
pub use ports::{ChannelEvent, ChannelTransportPort, MessageServicePort, NotificationPort};
