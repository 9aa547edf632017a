//! Notification adapters.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::info;

use crate::domain::ports::NotificationPort;

/// Writes notifications to the log.
#[derive(Debug, Clone, Default)]
pub struct LogNotificationService;

impl LogNotificationService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl NotificationPort for LogNotificationService {
    fn send(&self, title: &str, body: &str) {
        info!(title, body, "Notification");
    }
}

/// Keeps notifications in memory, for replays and inspection.
#[derive(Default)]
pub struct RecordingNotificationService {
    sent: Mutex<Vec<(String, String)>>,
    forward: Option<Arc<dyn NotificationPort>>,
}

impl RecordingNotificationService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Also passes every notification on to `port`.
    #[must_use]
    pub fn forwarding_to(mut self, port: Arc<dyn NotificationPort>) -> Self {
        self.forward = Some(port);
        self
    }

    /// Returns the `(title, body)` pairs received so far.
    #[must_use]
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().clone()
    }
}

impl NotificationPort for RecordingNotificationService {
    fn send(&self, title: &str, body: &str) {
        self.sent.lock().push((title.to_string(), body.to_string()));
        if let Some(port) = &self.forward {
            port.send(title, body);
        }
    }
}
