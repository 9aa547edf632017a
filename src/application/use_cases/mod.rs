//! Use case implementations.

mod event_applier;
mod message_actions;
mod optimistic_send;
mod pagination;

pub use event_applier::{ApplyOutcome, EventApplier, IgnoreReason};
pub use message_actions::{MessageActions, ReactionChange};
pub use optimistic_send::{OptimisticWriteCoordinator, PendingSend};
pub use pagination::{LoadOutcome, PaginationController};
