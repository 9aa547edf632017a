//! Infrastructure layer with configuration, wire format and adapters.

/// Engine configuration.
pub mod config;
/// Notification adapters.
pub mod notifications;
/// In-memory adapters and the replay driver.
pub mod replay;
/// Channel protocol payloads.
pub mod wire;

pub use config::{CliArgs, ConfigStore, LogLevel, SyncConfig};
pub use notifications::{LogNotificationService, RecordingNotificationService};
pub use replay::{InMemoryMessageService, LoopbackTransport, ReplayRunner, ReplayScript};
pub use wire::{EventParser, WireError};
