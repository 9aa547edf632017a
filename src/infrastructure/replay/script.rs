//! Replay script format.
//!
//! ```json
//! {
//!   "channel_id": "general",
//!   "local_user": {"id": "me", "name": "Me"},
//!   "history": [{"id": "m1", "content": "hi", "sender": {"id": "u2", "name": "Bob"}, "timestamp": 10}],
//!   "steps": [
//!     {"action": "send", "content": "hello"},
//!     {"action": "event", "event": "channel_typing_start", "data": {"channelId": "general", "userId": "u2"}},
//!     {"action": "wait", "ms": 6000}
//!   ]
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

use super::error::{ReplayError, ReplayResult};
use super::message_service::Operation;
use crate::domain::entities::{ChannelId, Message, Sender};
use crate::domain::serde_utils::id_string;
use crate::infrastructure::wire::EventParser;

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptUser {
    #[serde(with = "id_string")]
    pub id: String,
    pub name: String,
}

impl ScriptUser {
    #[must_use]
    pub fn to_sender(&self) -> Sender {
        Sender::new(self.id.as_str(), self.name.as_str())
    }
}

/// One scripted interaction.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReplayStep {
    /// A push event as received from the server.
    Event { event: String, data: Value },
    Send {
        content: String,
        #[serde(default, with = "id_string::option")]
        reply_to: Option<String>,
    },
    Edit {
        #[serde(with = "id_string")]
        message_id: String,
        content: String,
    },
    Delete {
        #[serde(with = "id_string")]
        message_id: String,
    },
    React {
        #[serde(with = "id_string")]
        message_id: String,
        emoji: String,
    },
    LoadMore,
    Retry,
    /// Draft text change in the input box.
    Typing { draft: String },
    StopTyping,
    /// Makes the next request of that kind fail.
    FailNext { operation: Operation },
    Wait { ms: u64 },
}

impl ReplayStep {
    #[must_use]
    pub const fn action(&self) -> &'static str {
        match self {
            Self::Event { .. } => "event",
            Self::Send { .. } => "send",
            Self::Edit { .. } => "edit",
            Self::Delete { .. } => "delete",
            Self::React { .. } => "react",
            Self::LoadMore => "load_more",
            Self::Retry => "retry",
            Self::Typing { .. } => "typing",
            Self::StopTyping => "stop_typing",
            Self::FailNext { .. } => "fail_next",
            Self::Wait { .. } => "wait",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReplayScript {
    #[serde(with = "id_string")]
    pub channel_id: String,
    pub local_user: ScriptUser,
    #[serde(default)]
    pub history: Vec<Value>,
    #[serde(default)]
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    /// Parses a script from JSON text.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::Script` if the text is not a valid script.
    pub fn from_json(json: &str) -> ReplayResult<Self> {
        serde_json::from_str(json).map_err(|e| ReplayError::script(e.to_string()))
    }

    /// Reads and parses a script file.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError` if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> ReplayResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    #[must_use]
    pub fn channel(&self) -> ChannelId {
        ChannelId::from(self.channel_id.as_str())
    }

    /// Decodes the seeded history.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError::Wire` if a history entry is malformed.
    pub fn history_messages(&self) -> ReplayResult<Vec<Message>> {
        let channel = self.channel();
        self.history
            .iter()
            .map(|value| {
                EventParser::parse_message(value.clone(), Some(&channel)).map_err(ReplayError::from)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"{
        "channel_id": 7,
        "local_user": {"id": "me", "name": "Me"},
        "history": [
            {"id": "m1", "content": "first", "sender": {"id": "u2", "name": "Bob"}, "timestamp": 10}
        ],
        "steps": [
            {"action": "send", "content": "hello", "reply_to": "m1"},
            {"action": "fail_next", "operation": "send"},
            {"action": "load_more"},
            {"action": "wait", "ms": 250}
        ]
    }"#;

    #[test]
    fn test_parse_script() {
        let script = ReplayScript::from_json(SCRIPT).unwrap();

        assert_eq!(script.channel().as_str(), "7");
        assert_eq!(script.local_user.to_sender().display_name(), "Me");
        assert_eq!(script.steps.len(), 4);
        assert!(matches!(
            &script.steps[0],
            ReplayStep::Send { reply_to: Some(id), .. } if id == "m1"
        ));
        assert!(matches!(
            script.steps[1],
            ReplayStep::FailNext {
                operation: Operation::Send
            }
        ));
        assert_eq!(script.steps[2].action(), "load_more");
    }

    #[test]
    fn test_history_gets_script_channel() {
        let script = ReplayScript::from_json(SCRIPT).unwrap();
        let history = script.history_messages().unwrap();

        assert_eq!(history.len(), 1);
        assert_eq!(history[0].channel_id().as_str(), "7");
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let result = ReplayScript::from_json(
            r#"{"channel_id": "c", "local_user": {"id": "me", "name": "Me"}, "steps": [{"action": "dance"}]}"#,
        );
        assert!(matches!(result, Err(ReplayError::Script { .. })));
    }
}
