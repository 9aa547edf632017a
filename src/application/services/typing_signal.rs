//! Local typing detection.
//!
//! Keystrokes are debounced into start/stop signals for the channel. Signals
//! go through a single worker task so the transport sees them in the order
//! they were produced.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::entities::ChannelId;
use crate::domain::ports::{ChannelTransportPort, TypingSignal};

/// Quiet period after the last keystroke before "stop" is sent.
pub const LOCAL_TYPING_STOP_AFTER: Duration = Duration::from_secs(2);

#[derive(Default)]
struct SignalerState {
    started: bool,
    generation: u64,
    stop_timer: Option<JoinHandle<()>>,
}

impl SignalerState {
    fn cancel_timer(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(timer) = self.stop_timer.take() {
            timer.abort();
        }
    }
}

/// Debounces local keystrokes into typing signals.
pub struct TypingSignaler {
    state: Arc<Mutex<SignalerState>>,
    signal_tx: Mutex<Option<mpsc::UnboundedSender<TypingSignal>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop_after: Duration,
}

impl TypingSignaler {
    /// Creates a signaler for `channel_id` and spawns its delivery worker.
    ///
    /// Must be called inside a Tokio runtime.
    #[must_use]
    pub fn new(
        transport: Arc<dyn ChannelTransportPort>,
        channel_id: ChannelId,
        stop_after: Duration,
    ) -> Self {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(deliver(transport, channel_id, signal_rx));

        Self {
            state: Arc::new(Mutex::new(SignalerState::default())),
            signal_tx: Mutex::new(Some(signal_tx)),
            worker: Mutex::new(Some(worker)),
            stop_after,
        }
    }

    /// Returns true while a "start" is outstanding.
    #[must_use]
    pub fn is_typing(&self) -> bool {
        self.state.lock().started
    }

    /// Handles a change of the input text.
    ///
    /// Non-empty text sends "start" once and re-arms the stop timer; empty
    /// text stops immediately.
    pub fn on_input(&self, text: &str) {
        if text.trim().is_empty() {
            self.stop();
            return;
        }

        let Some(tx) = self.signal_tx.lock().clone() else {
            return;
        };

        let mut state = self.state.lock();
        if !state.started {
            state.started = true;
            let _ = tx.send(TypingSignal::Start);
        }

        state.cancel_timer();
        let generation = state.generation;
        let shared = Arc::clone(&self.state);
        let stop_after = self.stop_after;
        state.stop_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(stop_after).await;
            let mut state = shared.lock();
            if state.generation == generation && state.started {
                state.started = false;
                state.stop_timer = None;
                debug!("Typing went quiet");
                let _ = tx.send(TypingSignal::Stop);
            }
        }));
    }

    /// Cancels the pending timer and sends "stop" if a "start" is outstanding.
    pub fn stop(&self) {
        let mut state = self.state.lock();
        state.cancel_timer();
        if state.started {
            state.started = false;
            if let Some(tx) = self.signal_tx.lock().as_ref() {
                let _ = tx.send(TypingSignal::Stop);
            }
        }
    }

    /// Flushes any outstanding "stop" and waits for the worker to deliver it.
    pub async fn shutdown(&self) {
        self.stop();
        self.signal_tx.lock().take();
        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && let Err(e) = worker.await
        {
            warn!(error = %e, "Typing worker ended abnormally");
        }
    }
}

impl Drop for TypingSignaler {
    fn drop(&mut self) {
        self.state.lock().cancel_timer();
    }
}

async fn deliver(
    transport: Arc<dyn ChannelTransportPort>,
    channel_id: ChannelId,
    mut signal_rx: mpsc::UnboundedReceiver<TypingSignal>,
) {
    while let Some(signal) = signal_rx.recv().await {
        if let Err(e) = transport.send_typing(&channel_id, signal).await {
            warn!(channel_id = %channel_id, ?signal, error = %e, "Failed to send typing signal");
        }
    }
    debug!(channel_id = %channel_id, "Typing worker stopped");
}
