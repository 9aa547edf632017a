//! Drives a channel session through a replay script.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::error::ReplayResult;
use super::message_service::InMemoryMessageService;
use super::script::{ReplayScript, ReplayStep};
use super::transport::LoopbackTransport;
use crate::application::{
    ChannelSession, LoadOutcome, OutgoingMessage, ReactionChange, SessionConfig, SessionPorts,
    ThreadNode,
};
use crate::domain::entities::{ChannelId, Message, MessageId};
use crate::domain::errors::SyncError;
use crate::infrastructure::notifications::{LogNotificationService, RecordingNotificationService};
use crate::infrastructure::wire::EventParser;
use crate::infrastructure::wire::codec::MESSAGE_SENT;

/// Scheduler turns granted to the event pump after each step.
const SETTLE_YIELDS: usize = 16;

/// Outcome of one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub index: usize,
    pub action: &'static str,
    pub outcome: String,
}

/// Session state captured after the last step.
#[derive(Debug, Clone, Serialize)]
pub struct ReplayReport {
    pub channel_id: ChannelId,
    pub messages: Vec<Message>,
    pub threads: Vec<ThreadNode>,
    pub typing: Option<String>,
    pub has_more: bool,
    pub error: Option<String>,
    pub notifications: Vec<(String, String)>,
    pub steps: Vec<StepRecord>,
}

/// Runs a [`ReplayScript`] against in-memory adapters.
///
/// Steps execute on the calling task. Push events are handed to the
/// session's event pump, which gets a few scheduler turns after each step;
/// on a current-thread runtime this applies them before the next step.
pub struct ReplayRunner {
    script: ReplayScript,
    config: SessionConfig,
    echo: bool,
}

struct Harness {
    session: ChannelSession,
    service: Arc<InMemoryMessageService>,
    transport: Arc<LoopbackTransport>,
}

impl ReplayRunner {
    #[must_use]
    pub fn new(script: ReplayScript, config: SessionConfig) -> Self {
        Self {
            script,
            config,
            echo: true,
        }
    }

    /// Controls whether the service broadcasts accepted writes back to the session.
    #[must_use]
    pub const fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    /// Executes every step and returns the final state.
    ///
    /// Step failures are recorded in the report rather than aborting the run.
    ///
    /// # Errors
    ///
    /// Returns `ReplayError` if the seeded history is malformed or the
    /// session cannot be opened.
    pub async fn run(self) -> ReplayResult<ReplayReport> {
        let channel_id = self.script.channel();
        let local_user = self.script.local_user.to_sender();
        let history = self.script.history_messages()?;

        info!(
            channel_id = %channel_id,
            history = history.len(),
            steps = self.script.steps.len(),
            "Starting replay"
        );

        let transport = Arc::new(LoopbackTransport::new());
        let mut service =
            InMemoryMessageService::new(channel_id.clone(), local_user.clone(), history);
        if self.echo {
            service = service.with_echo(Arc::clone(&transport));
        }
        let service = Arc::new(service);
        let notifications = Arc::new(
            RecordingNotificationService::new()
                .forwarding_to(Arc::new(LogNotificationService::new())),
        );

        let ports = SessionPorts {
            messages: service.clone(),
            transport: transport.clone(),
            notifier: Some(notifications.clone()),
        };
        let session = ChannelSession::open(channel_id.clone(), local_user, ports, self.config).await?;
        settle().await;

        let harness = Harness {
            session,
            service,
            transport,
        };

        let mut steps = Vec::with_capacity(self.script.steps.len());
        for (index, step) in self.script.steps.into_iter().enumerate() {
            let action = step.action();
            let outcome = harness.apply(step).await;
            settle().await;
            debug!(index, action, outcome = %outcome, "Replay step done");
            steps.push(StepRecord {
                index,
                action,
                outcome,
            });
        }

        let session = &harness.session;
        let report = ReplayReport {
            channel_id,
            messages: session.messages(),
            threads: session.threads(),
            typing: session.typing_indicator(),
            has_more: session.has_more(),
            error: session.error().map(|e| e.to_string()),
            notifications: notifications.sent(),
            steps,
        };
        session.close().await;

        info!(messages = report.messages.len(), "Replay finished");
        Ok(report)
    }
}

impl Harness {
    async fn apply(&self, step: ReplayStep) -> String {
        match step {
            ReplayStep::Event { event, mut data } => self.deliver(&event, &mut data),
            ReplayStep::Send { content, reply_to } => {
                let mut outgoing = OutgoingMessage::new(content);
                if let Some(parent) = reply_to {
                    outgoing = outgoing.replying_to(MessageId::from(parent));
                }
                describe(
                    self.session.send_message(outgoing).await,
                    |m| format!("sent {}", m.id()),
                )
            }
            ReplayStep::Edit {
                message_id,
                content,
            } => describe(
                self.session
                    .edit_message(&MessageId::from(message_id), &content)
                    .await,
                |()| "edited".to_string(),
            ),
            ReplayStep::Delete { message_id } => describe(
                self.session.delete_message(&MessageId::from(message_id)).await,
                |()| "deleted".to_string(),
            ),
            ReplayStep::React { message_id, emoji } => describe(
                self.session.react(&MessageId::from(message_id), &emoji).await,
                |change| match change {
                    ReactionChange::Added => "reaction added".to_string(),
                    ReactionChange::Removed => "reaction removed".to_string(),
                },
            ),
            ReplayStep::LoadMore => describe(self.session.load_more().await, describe_load),
            ReplayStep::Retry => describe(self.session.retry().await, describe_load),
            ReplayStep::Typing { draft } => {
                self.session.start_typing(&draft);
                "typing".to_string()
            }
            ReplayStep::StopTyping => {
                self.session.stop_typing();
                "stopped typing".to_string()
            }
            ReplayStep::FailNext { operation } => {
                self.service.fail_next(operation);
                format!("next {operation:?} fails")
            }
            ReplayStep::Wait { ms } => {
                tokio::time::sleep(Duration::from_millis(ms)).await;
                format!("waited {ms}ms")
            }
        }
    }

    fn deliver(&self, name: &str, data: &mut Value) -> String {
        if name == MESSAGE_SENT {
            stamp_missing_timestamp(data);
        }

        match EventParser::parse_value(name, data.take()) {
            Ok(event) => {
                if self.transport.emit(event) {
                    "delivered".to_string()
                } else {
                    "no subscriber".to_string()
                }
            }
            Err(e) if e.is_ignorable() => {
                debug!(event = name, "Ignoring unknown event");
                format!("ignored: {e}")
            }
            Err(e) => {
                warn!(event = name, error = %e, "Dropping malformed event");
                format!("dropped: {e}")
            }
        }
    }
}

fn describe<T>(result: Result<T, SyncError>, ok: impl FnOnce(T) -> String) -> String {
    match result {
        Ok(value) => ok(value),
        Err(e) => format!("failed: {e}"),
    }
}

fn describe_load(outcome: LoadOutcome) -> String {
    match outcome {
        LoadOutcome::Loaded { received } => format!("loaded {received}"),
        LoadOutcome::Skipped => "skipped".to_string(),
        LoadOutcome::Dropped => "dropped".to_string(),
    }
}

/// Scripts cannot know the wall clock at send time, so a pushed message
/// without a timestamp is stamped on delivery.
fn stamp_missing_timestamp(data: &mut Value) {
    let target = if data.get("message").is_some() {
        data.get_mut("message")
    } else {
        Some(data)
    };

    if let Some(Value::Object(map)) = target
        && !map.contains_key("timestamp")
        && !map.contains_key("createdAt")
    {
        map.insert(
            "timestamp".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }
}

async fn settle() {
    for _ in 0..SETTLE_YIELDS {
        tokio::task::yield_now().await;
    }
}
