pub mod message_store;
pub mod reconciliation;
pub mod thread_organizer;
pub mod typing_signal;
pub mod typing_tracker;

pub use message_store::{MessageStore, StoreMutation, canonicalize};
pub use reconciliation::{DEFAULT_DEDUP_WINDOW, DedupPolicy};
pub use thread_organizer::{ThreadNode, organize};
pub use typing_signal::{LOCAL_TYPING_STOP_AFTER, TypingSignaler};
pub use typing_tracker::{REMOTE_TYPING_TIMEOUT, TypingTracker};
