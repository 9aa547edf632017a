use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::{WireError, WireResult};
use super::payloads::{
    MessageDeletedPayload, MessagePagePayload, MessagePayload, MessageSentPayload,
    MessageUpdatedPayload, ReactionEventPayload, TypingPayload,
};

use crate::domain::entities::{
    Attachment, ChannelId, InlineReply, Message, MessageKind, MessagePage, Reaction, Sender,
    SenderRole, UserId,
};
use crate::domain::ports::ChannelEvent;

pub const MESSAGE_SENT: &str = "message_sent";
pub const MESSAGE_UPDATED: &str = "message_updated";
pub const MESSAGE_DELETED: &str = "message_deleted";
pub const REACTION_ADDED: &str = "message_reaction_added";
pub const REACTION_REMOVED: &str = "message_reaction_removed";
pub const TYPING_START: &str = "channel_typing_start";
pub const TYPING_STOP: &str = "channel_typing_stop";

pub struct EventParser;

impl EventParser {
    /// Parses a named push event from its JSON text.
    ///
    /// # Errors
    ///
    /// Returns `WireError::UnknownEvent` for names outside the channel
    /// protocol and `WireError::Serialization` for malformed payloads.
    pub fn parse_event(name: &str, json: &str) -> WireResult<ChannelEvent> {
        let data: Value = serde_json::from_str(json)
            .map_err(|e| WireError::serialization(format!("Failed to parse {name}: {e}")))?;
        Self::parse_value(name, data)
    }

    /// Parses a named push event from an already decoded JSON value.
    ///
    /// # Errors
    ///
    /// See [`EventParser::parse_event`].
    pub fn parse_value(name: &str, data: Value) -> WireResult<ChannelEvent> {
        match name {
            MESSAGE_SENT => Self::parse_message_sent(data),
            MESSAGE_UPDATED => Self::parse_message_updated(data),
            MESSAGE_DELETED => Self::parse_message_deleted(data),
            REACTION_ADDED => Self::parse_reaction(data, true),
            REACTION_REMOVED => Self::parse_reaction(data, false),
            TYPING_START => Self::parse_typing(data, true),
            TYPING_STOP => Self::parse_typing(data, false),
            _ => Err(WireError::unknown_event(name)),
        }
    }

    /// Parses one history page. Messages lacking a channel id are assigned to `channel_id`.
    ///
    /// # Errors
    ///
    /// Returns `WireError` if the page or any message in it is malformed.
    pub fn parse_page(data: Value, channel_id: &ChannelId) -> WireResult<MessagePage> {
        let payload: MessagePagePayload = decode(data, "MessagePage")?;
        let received = payload.messages.len();

        let messages = payload
            .messages
            .into_iter()
            .map(|m| Self::convert_message(m, Some(channel_id)))
            .collect::<WireResult<Vec<_>>>()?;

        let (total, has_more) = payload
            .pagination
            .map_or((received, false), |p| (p.total, p.has_more.unwrap_or(false)));

        Ok(MessagePage::new(messages, total, has_more))
    }

    /// Parses a single message object.
    ///
    /// # Errors
    ///
    /// Returns `WireError` if the message is malformed or carries no channel id.
    pub fn parse_message(data: Value, fallback_channel: Option<&ChannelId>) -> WireResult<Message> {
        let payload: MessagePayload = decode(data, "Message")?;
        Self::convert_message(payload, fallback_channel)
    }

    fn parse_message_sent(data: Value) -> WireResult<ChannelEvent> {
        // Servers send either `{channelId, message}` or the bare message.
        let message = if data.get("message").is_some() {
            let envelope: MessageSentPayload = decode(data, "MessageSent")?;
            let channel = envelope.channel_id.map(ChannelId::from);
            Self::convert_message(envelope.message, channel.as_ref())?
        } else {
            Self::parse_message(data, None)?
        };

        Ok(ChannelEvent::MessageCreated { message })
    }

    fn parse_message_updated(data: Value) -> WireResult<ChannelEvent> {
        let payload: MessageUpdatedPayload = decode(data, "MessageUpdated")?;

        Ok(ChannelEvent::MessageUpdated {
            channel_id: payload.channel_id.into(),
            message_id: payload.message_id.into(),
            content: payload.content,
            edited_at: payload.edited_at,
        })
    }

    fn parse_message_deleted(data: Value) -> WireResult<ChannelEvent> {
        let payload: MessageDeletedPayload = decode(data, "MessageDeleted")?;

        Ok(ChannelEvent::MessageDeleted {
            channel_id: payload.channel_id.into(),
            message_id: payload.message_id.into(),
        })
    }

    fn parse_reaction(data: Value, added: bool) -> WireResult<ChannelEvent> {
        let payload: ReactionEventPayload = decode(data, "Reaction")?;
        if payload.emoji.is_empty() {
            return Err(WireError::protocol("Reaction without emoji"));
        }

        let channel_id = ChannelId::from(payload.channel_id);
        let message_id = payload.message_id.into();
        let user_id = UserId::from(payload.user_id);
        let emoji = payload.emoji;

        Ok(if added {
            ChannelEvent::ReactionAdded {
                channel_id,
                message_id,
                user_id,
                emoji,
            }
        } else {
            ChannelEvent::ReactionRemoved {
                channel_id,
                message_id,
                user_id,
                emoji,
            }
        })
    }

    fn parse_typing(data: Value, started: bool) -> WireResult<ChannelEvent> {
        let payload: TypingPayload = decode(data, "Typing")?;
        let channel_id = ChannelId::from(payload.channel_id);
        let user_id = UserId::from(payload.user_id);

        Ok(if started {
            ChannelEvent::TypingStarted {
                channel_id,
                user_id,
                user_name: payload.user_name.filter(|name| !name.trim().is_empty()),
            }
        } else {
            ChannelEvent::TypingStopped {
                channel_id,
                user_id,
            }
        })
    }

    fn convert_message(
        payload: MessagePayload,
        fallback_channel: Option<&ChannelId>,
    ) -> WireResult<Message> {
        let channel_id = payload
            .channel_id
            .map(ChannelId::from)
            .or_else(|| fallback_channel.cloned())
            .ok_or_else(|| WireError::protocol(format!("Message {} has no channel", payload.id)))?;

        let mut sender = Sender::new(payload.sender.id, payload.sender.name);
        if let Some(avatar) = payload.sender.avatar {
            sender = sender.with_avatar(avatar);
        }
        if let Some(role) = payload.sender.role {
            sender = sender.with_role(SenderRole::parse(&role));
        }

        let kind = payload
            .kind
            .as_deref()
            .map_or(MessageKind::Text, MessageKind::parse);

        let content = payload.content;
        let mut message = Message::new(
            payload.id,
            channel_id,
            sender,
            content.clone(),
            payload.timestamp,
        )
        .with_kind(kind)
        .with_mentions(payload.mentions);

        if let Some(transcript) = payload.transcript
            && !transcript.is_empty()
        {
            message = message.with_transcript(transcript);
        }

        if let Some(a) = payload.attachment {
            let mut attachment = Attachment::new(a.id, a.filename, a.url);
            if let Some(ct) = a.content_type {
                attachment = attachment.with_content_type(ct);
            }
            message = message.with_attachment(attachment);
        }

        if !payload.reactions.is_empty() {
            let reactions = payload
                .reactions
                .into_iter()
                .map(|r| Reaction::from_users(r.emoji, r.users.into_iter().map(|u| UserId(u.0))))
                .filter(|r| !r.is_empty())
                .collect();
            message = message.with_reactions(reactions);
        }

        if !payload.replies.is_empty() || payload.reply_count.is_some() {
            let count = payload
                .reply_count
                .unwrap_or_else(|| u32::try_from(payload.replies.len()).unwrap_or(u32::MAX));
            let replies = payload
                .replies
                .into_iter()
                .map(|r| InlineReply {
                    id: r.id.into(),
                    sender_name: r.sender_name,
                    content: r.content,
                    timestamp: r.timestamp,
                })
                .collect();
            message = message.with_replies(replies, count);
        }

        // A reply to a root message may omit the root pointer.
        if let Some(parent) = payload.connected_to {
            let root = payload.thread_root.unwrap_or_else(|| parent.clone());
            message = message.with_thread(parent.into(), root.into());
        }

        if payload.edited || payload.edited_at.is_some() {
            message = message.edited(content, payload.edited_at);
        }

        Ok(message)
    }
}

fn decode<T: DeserializeOwned>(data: Value, what: &str) -> WireResult<T> {
    serde_json::from_value(data)
        .map_err(|e| WireError::serialization(format!("Failed to parse {what}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message_json() -> Value {
        json!({
            "id": 42,
            "channelId": "c1",
            "type": "voice",
            "content": "",
            "transcript": "hello from the car",
            "attachment": {"id": "a1", "name": "clip.ogg", "url": "https://x/clip.ogg", "contentType": "audio/ogg"},
            "sender": {"id": "u2", "displayName": "Bob", "role": "admin"},
            "timestamp": "2024-01-01T00:00:00Z",
            "reactions": [{"emoji": "👍", "users": ["u1", 7, "u1"]}],
            "mentions": ["u1"],
            "connectedTo": "p1",
            "threadRoot": "r1"
        })
    }

    #[test]
    fn test_unknown_event_is_ignorable() {
        let err = EventParser::parse_event("presence_update", "{}").unwrap_err();
        assert_eq!(err, WireError::unknown_event("presence_update"));
        assert!(err.is_ignorable());
    }

    #[test]
    fn test_malformed_json_is_serialization_error() {
        let err = EventParser::parse_event(MESSAGE_DELETED, "{not json").unwrap_err();
        assert!(matches!(err, WireError::Serialization { .. }));
        assert!(!err.is_ignorable());
    }

    #[test]
    fn test_parse_message_sent_envelope() {
        let mut message = message_json();
        message.as_object_mut().unwrap().remove("channelId");
        let data = json!({"channelId": "c1", "message": message});

        let event = EventParser::parse_value(MESSAGE_SENT, data).unwrap();
        let ChannelEvent::MessageCreated { message } = event else {
            panic!("Expected MessageCreated event");
        };

        assert_eq!(message.id().as_str(), "42");
        assert_eq!(message.channel_id().as_str(), "c1");
        assert_eq!(message.kind(), MessageKind::Voice);
        assert_eq!(message.transcript(), Some("hello from the car"));
        assert_eq!(message.attachment().unwrap().filename(), "clip.ogg");
        assert_eq!(message.attachment().unwrap().content_type(), Some("audio/ogg"));
        assert_eq!(message.sender().display_name(), "Bob");
        assert_eq!(message.sender().role(), SenderRole::Admin);
        assert_eq!(message.reactions().len(), 1);
        assert_eq!(message.reactions()[0].count(), 2);
        assert_eq!(message.mentions(), ["u1".to_string()]);
        assert_eq!(message.connected_to().unwrap().as_str(), "p1");
        assert_eq!(message.thread_root().unwrap().as_str(), "r1");
        assert!(!message.is_edited());
        assert!(!message.is_optimistic());
    }

    #[test]
    fn test_parse_bare_message_sent() {
        let event = EventParser::parse_value(MESSAGE_SENT, message_json()).unwrap();
        assert_eq!(event.channel_id().as_str(), "c1");
    }

    #[test]
    fn test_message_without_channel_is_rejected() {
        let mut message = message_json();
        message.as_object_mut().unwrap().remove("channelId");

        let err = EventParser::parse_value(MESSAGE_SENT, message).unwrap_err();
        assert!(matches!(err, WireError::Protocol { .. }));
    }

    #[test]
    fn test_reply_without_root_uses_parent() {
        let message = EventParser::parse_message(
            json!({
                "id": "m2",
                "content": "re",
                "sender": {"id": "u1", "name": "Ann"},
                "createdAt": 1_700_000_000_000_i64,
                "connectedTo": "m1"
            }),
            Some(&ChannelId::from("c1")),
        )
        .unwrap();

        assert_eq!(message.connected_to().unwrap().as_str(), "m1");
        assert_eq!(message.thread_root().unwrap().as_str(), "m1");
        assert_eq!(message.timestamp().timestamp_millis(), 1_700_000_000_000);
    }

    #[test]
    fn test_edited_flag_keeps_content() {
        let message = EventParser::parse_message(
            json!({
                "id": "m1",
                "channelId": "c1",
                "content": "fixed",
                "sender": {"id": "u1", "name": "Ann"},
                "timestamp": "2024-01-01T00:00:00Z",
                "editedAt": "2024-01-01T00:05:00Z"
            }),
            None,
        )
        .unwrap();

        assert!(message.is_edited());
        assert_eq!(message.content(), "fixed");
        assert!(message.edited_at().is_some());
    }

    #[test]
    fn test_parse_message_updated() {
        let event = EventParser::parse_event(
            MESSAGE_UPDATED,
            r#"{"channelId": "c1", "messageId": "m1", "content": "new"}"#,
        )
        .unwrap();

        assert_eq!(
            event,
            ChannelEvent::MessageUpdated {
                channel_id: ChannelId::from("c1"),
                message_id: "m1".into(),
                content: "new".to_string(),
                edited_at: None,
            }
        );
    }

    #[test]
    fn test_parse_message_deleted_accepts_id_alias() {
        let event =
            EventParser::parse_event(MESSAGE_DELETED, r#"{"channelId": 5, "id": 9}"#).unwrap();

        assert_eq!(
            event,
            ChannelEvent::MessageDeleted {
                channel_id: ChannelId::from("5"),
                message_id: "9".into(),
            }
        );
    }

    #[test]
    fn test_parse_reactions() {
        let data = r#"{"channelId": "c1", "messageId": "m1", "userId": "u2", "emoji": "🎉"}"#;

        let added = EventParser::parse_event(REACTION_ADDED, data).unwrap();
        let removed = EventParser::parse_event(REACTION_REMOVED, data).unwrap();

        assert!(matches!(added, ChannelEvent::ReactionAdded { ref emoji, .. } if emoji == "🎉"));
        assert!(matches!(removed, ChannelEvent::ReactionRemoved { ref user_id, .. } if user_id.as_str() == "u2"));
    }

    #[test]
    fn test_reaction_without_emoji_is_protocol_error() {
        let data = r#"{"channelId": "c1", "messageId": "m1", "userId": "u2", "emoji": ""}"#;
        let err = EventParser::parse_event(REACTION_ADDED, data).unwrap_err();
        assert!(matches!(err, WireError::Protocol { .. }));
    }

    #[test]
    fn test_parse_typing_events() {
        let start = EventParser::parse_event(
            TYPING_START,
            r#"{"channelId": "c1", "userId": "u2", "userName": "Bob"}"#,
        )
        .unwrap();
        let blank_name = EventParser::parse_event(
            TYPING_START,
            r#"{"channelId": "c1", "userId": "u2", "userName": "  "}"#,
        )
        .unwrap();
        let stop =
            EventParser::parse_event(TYPING_STOP, r#"{"channelId": "c1", "userId": "u2"}"#).unwrap();

        assert!(matches!(start, ChannelEvent::TypingStarted { user_name: Some(ref n), .. } if n == "Bob"));
        assert!(matches!(blank_name, ChannelEvent::TypingStarted { user_name: None, .. }));
        assert!(matches!(stop, ChannelEvent::TypingStopped { .. }));
    }

    #[test]
    fn test_parse_page_defaults_total_to_received() {
        let page = EventParser::parse_page(
            json!({"messages": [message_json()]}),
            &ChannelId::from("c1"),
        )
        .unwrap();

        assert_eq!(page.len(), 1);
        assert_eq!(page.total, 1);
        assert!(!page.has_more);
    }

    #[test]
    fn test_parse_page_with_pagination() {
        let page = EventParser::parse_page(
            json!({"messages": [], "pagination": {"total": 12, "hasMore": true}}),
            &ChannelId::from("c1"),
        )
        .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total, 12);
        assert!(page.has_more);
    }
}
