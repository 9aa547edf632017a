//! JSON payloads of the channel push events and history pages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::serde_utils::{id_string, timestamp};

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderPayload {
    #[serde(with = "id_string")]
    pub id: String,
    #[serde(alias = "displayName", alias = "username")]
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentPayload {
    #[serde(with = "id_string")]
    pub id: String,
    #[serde(alias = "name")]
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload {
    pub emoji: String,
    #[serde(default)]
    pub users: Vec<UserRef>,
}

/// A user id inside a list; accepts strings or numbers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserRef(#[serde(with = "id_string")] pub String);

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineReplyPayload {
    #[serde(with = "id_string")]
    pub id: String,
    #[serde(default)]
    pub sender_name: String,
    #[serde(default)]
    pub content: String,
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePayload {
    #[serde(with = "id_string", alias = "_id")]
    pub id: String,
    #[serde(default, with = "id_string::option")]
    pub channel_id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub attachment: Option<AttachmentPayload>,
    pub sender: SenderPayload,
    #[serde(with = "timestamp", alias = "createdAt")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, alias = "isEdited")]
    pub edited: bool,
    #[serde(default, with = "timestamp::option")]
    pub edited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reactions: Vec<ReactionPayload>,
    #[serde(default)]
    pub replies: Vec<InlineReplyPayload>,
    #[serde(default)]
    pub reply_count: Option<u32>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default, with = "id_string::option")]
    pub connected_to: Option<String>,
    #[serde(default, with = "id_string::option")]
    pub thread_root: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSentPayload {
    #[serde(default, with = "id_string::option")]
    pub channel_id: Option<String>,
    pub message: MessagePayload,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageUpdatedPayload {
    #[serde(with = "id_string")]
    pub channel_id: String,
    #[serde(with = "id_string", alias = "id")]
    pub message_id: String,
    pub content: String,
    #[serde(default, with = "timestamp::option", alias = "updatedAt")]
    pub edited_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDeletedPayload {
    #[serde(with = "id_string")]
    pub channel_id: String,
    #[serde(with = "id_string", alias = "id")]
    pub message_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionEventPayload {
    #[serde(with = "id_string")]
    pub channel_id: String,
    #[serde(with = "id_string")]
    pub message_id: String,
    #[serde(with = "id_string")]
    pub user_id: String,
    pub emoji: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingPayload {
    #[serde(with = "id_string")]
    pub channel_id: String,
    #[serde(with = "id_string")]
    pub user_id: String,
    #[serde(default, alias = "username")]
    pub user_name: Option<String>,
}

/// One page of history as served by the message API.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePagePayload {
    #[serde(default)]
    pub messages: Vec<MessagePayload>,
    #[serde(default)]
    pub pagination: Option<PaginationPayload>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationPayload {
    pub total: usize,
    #[serde(default)]
    pub has_more: Option<bool>,
}
