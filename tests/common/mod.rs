#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::Notify;

use chatsync::application::{ChannelSession, SessionConfig, SessionPorts};
use chatsync::domain::entities::{
    ChannelId, Message, MessageId, MessagePage, PageRequest, Sender,
};
use chatsync::domain::errors::SyncError;
use chatsync::domain::ports::{MessageServicePort, SendMessageRequest};
use chatsync::infrastructure::LoopbackTransport;

pub const CHANNEL: &str = "c1";

pub fn at(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap()
}

pub fn msg(id: &str, sender: &str, millis: i64) -> Message {
    Message::new(id, CHANNEL, Sender::new(sender, sender), format!("body {id}"), at(millis))
}

pub fn me() -> Sender {
    Sender::new("me", "Me")
}

pub fn ids(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.id().to_string()).collect()
}

/// Lets the session's event pump drain what was emitted.
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

/// Message service answering from a queue of pages, with optional gates.
#[derive(Default)]
pub struct ScriptedService {
    pages: Mutex<VecDeque<Result<MessagePage, SyncError>>>,
    pub requests: Mutex<Vec<PageRequest>>,
    list_calls: AtomicUsize,
    list_gate: Option<(usize, Arc<Notify>)>,
    send_gate: Option<Arc<Notify>>,
    send_reply: Mutex<Option<Message>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    /// List calls from the `from`-th (zero based) on wait for `gate`.
    pub fn gate_lists_from(mut self, from: usize, gate: Arc<Notify>) -> Self {
        self.list_gate = Some((from, gate));
        self
    }

    pub fn gate_sends(mut self, gate: Arc<Notify>) -> Self {
        self.send_gate = Some(gate);
        self
    }

    pub fn push_page(&self, messages: Vec<Message>, total: usize) {
        let has_more = total > messages.len();
        self.pages
            .lock()
            .push_back(Ok(MessagePage::new(messages, total, has_more)));
    }

    pub fn push_error(&self, error: SyncError) {
        self.pages.lock().push_back(Err(error));
    }

    pub fn reply_to_send_with(&self, message: Message) {
        *self.send_reply.lock() = Some(message);
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageServicePort for ScriptedService {
    async fn list_messages(
        &self,
        _channel_id: &ChannelId,
        request: PageRequest,
    ) -> Result<MessagePage, SyncError> {
        let call = self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request);
        if let Some((from, gate)) = &self.list_gate
            && call >= *from
        {
            gate.notified().await;
        }
        self.pages
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(MessagePage::default()))
    }

    async fn send_message(
        &self,
        _channel_id: &ChannelId,
        _request: SendMessageRequest,
    ) -> Result<Message, SyncError> {
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        self.send_reply
            .lock()
            .clone()
            .ok_or_else(|| SyncError::send_failed("no reply scripted"))
    }

    async fn edit_message(
        &self,
        _channel_id: &ChannelId,
        _message_id: &MessageId,
        _content: &str,
    ) -> Result<Message, SyncError> {
        Err(SyncError::edit_failed("not scripted"))
    }

    async fn delete_message(
        &self,
        _channel_id: &ChannelId,
        _message_id: &MessageId,
    ) -> Result<(), SyncError> {
        Err(SyncError::delete_failed("not scripted"))
    }

    async fn add_reaction(
        &self,
        _channel_id: &ChannelId,
        _message_id: &MessageId,
        _emoji: &str,
    ) -> Result<(), SyncError> {
        Ok(())
    }

    async fn remove_reaction(
        &self,
        _channel_id: &ChannelId,
        _message_id: &MessageId,
        _emoji: &str,
    ) -> Result<(), SyncError> {
        Ok(())
    }
}

pub async fn open_session(
    service: Arc<dyn MessageServicePort>,
    transport: &Arc<LoopbackTransport>,
) -> ChannelSession {
    let ports = SessionPorts {
        messages: service,
        transport: transport.clone(),
        notifier: None,
    };
    let session = ChannelSession::open(ChannelId::from(CHANNEL), me(), ports, SessionConfig::default())
        .await
        .unwrap();
    settle().await;
    session
}
