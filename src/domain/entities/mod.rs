//! Domain entity definitions.

mod channel;
mod message;
mod pagination;
mod reaction;
mod typing;
mod user;

pub use channel::ChannelId;
pub use message::{
    Attachment, InlineReply, Message, MessageId, MessageKind, TEMP_ID_PREFIX,
};
pub use pagination::{MessagePage, PageRequest, PaginationCursor};
pub use reaction::{Reaction, with_reaction_added, with_reaction_removed};
pub use typing::TypingEntry;
pub use user::{Sender, SenderRole, UserId};
