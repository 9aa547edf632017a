use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ChannelId, Reaction, Sender};

/// Prefix marking locally generated, unconfirmed message ids.
///
/// Server ids never carry this prefix.
pub const TEMP_ID_PREFIX: &str = "temp_";

static LAST_TEMP_NANOS: AtomicI64 = AtomicI64::new(0);

/// Unique identifier for a message within a channel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generates a fresh temporary id from a strictly increasing nanosecond clock.
    #[must_use]
    pub fn temporary() -> Self {
        let now = Utc::now().timestamp_nanos_opt().unwrap_or(0);
        let mut last = LAST_TEMP_NANOS.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match LAST_TEMP_NANOS.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => return Self(format!("{TEMP_ID_PREFIX}{next}")),
                Err(current) => last = current,
            }
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this id was generated locally.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Message content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum MessageKind {
    #[default]
    Text,
    Voice,
    File,
    Image,
    System,
}

impl MessageKind {
    /// Parses a wire type name, falling back to [`MessageKind::Text`].
    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "voice" | "audio" => Self::Voice,
            "file" => Self::File,
            "image" => Self::Image,
            "system" => Self::System,
            _ => Self::Text,
        }
    }

    #[must_use]
    pub const fn is_system(self) -> bool {
        matches!(self, Self::System)
    }

    #[must_use]
    pub const fn has_media(self) -> bool {
        matches!(self, Self::Voice | Self::File | Self::Image)
    }
}

/// Reference to an uploaded attachment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Attachment {
    id: String,
    filename: String,
    url: String,
    content_type: Option<String>,
}

#[allow(missing_docs)]
impl Attachment {
    #[must_use]
    pub fn new(id: impl Into<String>, filename: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            url: url.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Shallow reply summary kept on the parent message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct InlineReply {
    pub id: MessageId,
    pub sender_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl InlineReply {
    /// Summarizes `message` as an inline reply.
    #[must_use]
    pub fn of(message: &Message) -> Self {
        Self {
            id: message.id.clone(),
            sender_name: message.sender.display_name().to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

/// A single chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[allow(missing_docs)]
pub struct Message {
    id: MessageId,
    channel_id: ChannelId,
    kind: MessageKind,
    content: String,
    transcript: Option<String>,
    attachment: Option<Attachment>,
    sender: Sender,
    timestamp: DateTime<Utc>,
    edited: bool,
    edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    reactions: Vec<Reaction>,
    #[serde(default)]
    replies: Vec<InlineReply>,
    #[serde(default)]
    reply_count: u32,
    #[serde(default)]
    mentions: Vec<String>,
    connected_to: Option<MessageId>,
    thread_root: Option<MessageId>,
    #[serde(default)]
    optimistic: bool,
}

#[allow(missing_docs)]
impl Message {
    #[must_use]
    pub fn new(
        id: impl Into<MessageId>,
        channel_id: impl Into<ChannelId>,
        sender: Sender,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            channel_id: channel_id.into(),
            kind: MessageKind::Text,
            content: content.into(),
            transcript: None,
            attachment: None,
            sender,
            timestamp,
            edited: false,
            edited_at: None,
            reactions: Vec::new(),
            replies: Vec::new(),
            reply_count: 0,
            mentions: Vec::new(),
            connected_to: None,
            thread_root: None,
            optimistic: false,
        }
    }

    #[must_use]
    pub const fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    #[must_use]
    pub fn with_transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    #[must_use]
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }

    #[must_use]
    pub fn with_reactions(mut self, reactions: Vec<Reaction>) -> Self {
        self.reactions = reactions;
        self
    }

    #[must_use]
    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = mentions;
        self
    }

    /// Marks this message as a reply to `connected_to` inside the thread anchored at `thread_root`.
    #[must_use]
    pub fn with_thread(mut self, connected_to: MessageId, thread_root: MessageId) -> Self {
        self.connected_to = Some(connected_to);
        self.thread_root = Some(thread_root);
        self
    }

    #[must_use]
    pub fn with_replies(mut self, replies: Vec<InlineReply>, reply_count: u32) -> Self {
        self.replies = replies;
        self.reply_count = reply_count;
        self
    }

    #[must_use]
    pub const fn with_optimistic(mut self, optimistic: bool) -> Self {
        self.optimistic = optimistic;
        self
    }

    /// Returns a copy carrying new content, flagged as edited.
    #[must_use]
    pub fn edited(mut self, content: impl Into<String>, edited_at: Option<DateTime<Utc>>) -> Self {
        self.content = content.into();
        self.edited = true;
        if edited_at.is_some() {
            self.edited_at = edited_at;
        }
        self
    }

    /// Returns a copy with `reply` appended to the inline replies, bumping the count.
    ///
    /// A reply whose id is already listed leaves the message unchanged.
    #[must_use]
    pub fn with_reply_added(mut self, reply: InlineReply) -> Self {
        if self.replies.iter().any(|r| r.id == reply.id) {
            return self;
        }
        self.replies.push(reply);
        self.reply_count = self.reply_count.saturating_add(1);
        self
    }

    /// Returns a copy with the inline reply `id` removed, decrementing the count.
    #[must_use]
    pub fn with_reply_removed(mut self, id: &MessageId) -> Self {
        let before = self.replies.len();
        self.replies.retain(|r| &r.id != id);
        if self.replies.len() != before {
            self.reply_count = self.reply_count.saturating_sub(1);
        }
        self
    }

    /// Returns a copy with the inline reply `from` renamed to `to`.
    #[must_use]
    pub fn with_reply_renamed(mut self, from: &MessageId, to: &MessageId) -> Self {
        if self.replies.iter().any(|r| &r.id == to) {
            return self.with_reply_removed(from);
        }
        if let Some(reply) = self.replies.iter_mut().find(|r| &r.id == from) {
            reply.id = to.clone();
        }
        self
    }

    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub const fn channel_id(&self) -> &ChannelId {
        &self.channel_id
    }

    #[must_use]
    pub const fn kind(&self) -> MessageKind {
        self.kind
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    #[must_use]
    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    #[must_use]
    pub const fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    #[must_use]
    pub const fn sender(&self) -> &Sender {
        &self.sender
    }

    #[must_use]
    pub const fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    #[must_use]
    pub const fn is_edited(&self) -> bool {
        self.edited
    }

    #[must_use]
    pub const fn edited_at(&self) -> Option<DateTime<Utc>> {
        self.edited_at
    }

    #[must_use]
    pub fn reactions(&self) -> &[Reaction] {
        &self.reactions
    }

    #[must_use]
    pub fn replies(&self) -> &[InlineReply] {
        &self.replies
    }

    #[must_use]
    pub const fn reply_count(&self) -> u32 {
        self.reply_count
    }

    #[must_use]
    pub fn mentions(&self) -> &[String] {
        &self.mentions
    }

    #[must_use]
    pub const fn connected_to(&self) -> Option<&MessageId> {
        self.connected_to.as_ref()
    }

    #[must_use]
    pub const fn thread_root(&self) -> Option<&MessageId> {
        self.thread_root.as_ref()
    }

    #[must_use]
    pub const fn is_optimistic(&self) -> bool {
        self.optimistic
    }

    /// Returns true if this message carries both thread pointers.
    #[must_use]
    pub const fn is_thread_reply(&self) -> bool {
        self.connected_to.is_some() && self.thread_root.is_some()
    }

    #[must_use]
    pub fn formatted_timestamp(&self) -> String {
        self.timestamp.format("%H:%M").to_string()
    }
}
