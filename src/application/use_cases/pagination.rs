//! History pagination for a channel session.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::session_state::{SessionState, SharedSessionState};
use crate::domain::entities::{Message, MessagePage, PageRequest};
use crate::domain::errors::SyncError;
use crate::domain::ports::MessageServicePort;

/// Result of a pagination call that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and merged.
    Loaded { received: usize },
    /// Another load was in flight or there was nothing to load.
    Skipped,
    /// The session was torn down before the page arrived.
    Dropped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Initial,
    More,
}

/// Loads channel history in pages and merges it into the store.
#[derive(Clone)]
pub struct PaginationController {
    service: Arc<dyn MessageServicePort>,
    state: SharedSessionState,
}

impl PaginationController {
    #[must_use]
    pub const fn new(service: Arc<dyn MessageServicePort>, state: SharedSessionState) -> Self {
        Self { service, state }
    }

    /// Fetches the newest page and replaces the loaded history with it.
    ///
    /// Unconfirmed sends and anything pushed while the page was in flight
    /// survive the replacement.
    ///
    /// # Errors
    /// Returns `SyncError` if the page could not be fetched. The cursor is
    /// left untouched and the error is kept on the session for display.
    pub async fn load_initial(&self) -> Result<LoadOutcome, SyncError> {
        self.load(LoadKind::Initial).await
    }

    /// Fetches the next older page.
    ///
    /// A no-op while any load is in flight, before the first page has been
    /// loaded, or once the server reports no more history.
    ///
    /// # Errors
    /// Returns `SyncError` if the page could not be fetched. The cursor is
    /// left untouched.
    pub async fn load_more(&self) -> Result<LoadOutcome, SyncError> {
        self.load(LoadKind::More).await
    }

    async fn load(&self, kind: LoadKind) -> Result<LoadOutcome, SyncError> {
        let (channel_id, request) = {
            let mut state = self.state.lock();
            let Some(request) = begin(&mut state, kind) else {
                return Ok(LoadOutcome::Skipped);
            };
            state.touch();
            (state.channel_id.clone(), request)
        };

        debug!(channel_id = %channel_id, ?kind, limit = request.limit, offset = request.offset, "Fetching history page");
        let result = self.service.list_messages(&channel_id, request).await;

        let mut state = self.state.lock();
        match kind {
            LoadKind::Initial => state.loading_initial = false,
            LoadKind::More => state.loading_more = false,
        }

        if !state.mounted {
            state.store.abort_reload();
            debug!(channel_id = %channel_id, "Session closed while loading, dropping page");
            return Ok(LoadOutcome::Dropped);
        }

        let outcome = match result {
            Ok(page) => {
                let received = apply_page(&mut state, kind, page);
                info!(
                    channel_id = %channel_id,
                    ?kind,
                    received,
                    offset = state.cursor.offset,
                    has_more = state.cursor.has_more(),
                    "History page loaded"
                );
                Ok(LoadOutcome::Loaded { received })
            }
            Err(e) => {
                if kind == LoadKind::Initial {
                    state.store.abort_reload();
                }
                warn!(channel_id = %channel_id, ?kind, error = %e, "Failed to load history page");
                state.error = Some(e.clone());
                Err(e)
            }
        };
        state.touch();
        outcome
    }
}

/// Checks the guards and marks the load as in flight.
fn begin(state: &mut SessionState, kind: LoadKind) -> Option<PageRequest> {
    if !state.mounted || state.loading_initial {
        return None;
    }
    match kind {
        LoadKind::Initial => {
            state.loading_initial = true;
            state.error = None;
            state.store.begin_reload();
            Some(PageRequest::new(state.cursor.limit, 0))
        }
        LoadKind::More => {
            if state.loading_more || !state.loaded || !state.cursor.has_more() {
                return None;
            }
            state.loading_more = true;
            state.error = None;
            Some(PageRequest::new(state.cursor.limit, state.cursor.offset))
        }
    }
}

fn apply_page(state: &mut SessionState, kind: LoadKind, page: MessagePage) -> usize {
    let received = page.len();
    let mut messages = page.messages;
    messages.sort_by_key(Message::timestamp);

    match kind {
        LoadKind::Initial => {
            let total = if received == 0 { 0 } else { page.total };
            state.store.replace_history(messages);
            state.cursor.reset(received, total);
            state.loaded = true;
        }
        LoadKind::More => {
            // An empty page means the history is exhausted whatever total says.
            let total = if received == 0 {
                state.cursor.offset
            } else {
                page.total
            };
            state.store.merge(messages);
            state.cursor.advance(received, total);
        }
    }
    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::TypingTracker;
    use crate::domain::entities::{ChannelId, Sender};
    use crate::domain::ports::mocks::MockMessageService;
    use chrono::DateTime;
    use std::sync::atomic::Ordering;
    use tokio::sync::Notify;

    fn msg(id: &str, millis: i64) -> Message {
        Message::new(
            id,
            "c1",
            Sender::new("u2", "Bob"),
            id,
            DateTime::from_timestamp_millis(millis).unwrap(),
        )
    }

    fn page(messages: Vec<Message>, total: usize) -> MessagePage {
        let has_more = total > messages.len();
        MessagePage::new(messages, total, has_more)
    }

    fn setup(service: MockMessageService) -> (Arc<MockMessageService>, PaginationController) {
        let service = Arc::new(service);
        let state = SessionState::new(
            ChannelId::from("c1"),
            Sender::new("me", "Me"),
            2,
            TypingTracker::new(),
        )
        .shared();
        let controller = PaginationController::new(service.clone(), state);
        (service, controller)
    }

    fn ids(controller: &PaginationController) -> Vec<String> {
        controller
            .state
            .lock()
            .store
            .messages()
            .iter()
            .map(|m| m.id().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_initial_then_more_merges_older_page() {
        let (service, controller) = setup(MockMessageService::new());
        service.push_page(Ok(page(vec![msg("m2", 20), msg("m1", 10)], 5)));
        service.push_page(Ok(page(vec![msg("m0", 5)], 5)));

        let first = controller.load_initial().await.unwrap();
        assert_eq!(first, LoadOutcome::Loaded { received: 2 });
        let more = controller.load_more().await.unwrap();
        assert_eq!(more, LoadOutcome::Loaded { received: 1 });

        assert_eq!(ids(&controller), vec!["m0", "m1", "m2"]);
        let state = controller.state.lock();
        assert_eq!(state.cursor.offset, 3);
        assert!(state.cursor.has_more());
        drop(state);

        let requests = service.requests.lock().clone();
        assert_eq!(requests, vec![PageRequest::new(2, 0), PageRequest::new(2, 2)]);
    }

    #[tokio::test]
    async fn test_load_more_skipped_when_exhausted() {
        let (service, controller) = setup(MockMessageService::new());
        service.push_page(Ok(page(vec![msg("m1", 10)], 1)));

        controller.load_initial().await.unwrap();
        let outcome = controller.load_more().await.unwrap();

        assert_eq!(outcome, LoadOutcome::Skipped);
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_more_before_initial_is_skipped() {
        let (service, controller) = setup(MockMessageService::new());
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Skipped);
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_keeps_cursor_and_sets_error() {
        let (service, controller) = setup(MockMessageService::new());
        service.push_page(Ok(page(vec![msg("m2", 20), msg("m1", 10)], 5)));
        service.push_page(Err(SyncError::load_failed("timeout")));
        service.push_page(Ok(page(vec![msg("m0", 5)], 5)));

        controller.load_initial().await.unwrap();
        let err = controller.load_more().await.unwrap_err();
        assert!(err.is_load_error());
        {
            let state = controller.state.lock();
            assert_eq!(state.cursor.offset, 2);
            assert!(state.cursor.has_more());
            assert_eq!(state.error, Some(SyncError::load_failed("timeout")));
            assert!(!state.loading_more);
        }

        controller.load_more().await.unwrap();
        assert_eq!(ids(&controller), vec!["m0", "m1", "m2"]);
        assert!(controller.state.lock().error.is_none());
    }

    #[tokio::test]
    async fn test_partial_page_advances_by_received_count() {
        let (service, controller) = setup(MockMessageService::new());
        service.push_page(Ok(page(vec![msg("m4", 40), msg("m3", 30)], 10)));
        service.push_page(Ok(page(vec![msg("m2", 20)], 10)));
        service.push_page(Ok(page(vec![], 10)));

        controller.load_initial().await.unwrap();
        controller.load_more().await.unwrap();
        assert_eq!(controller.state.lock().cursor.offset, 3);

        controller.load_more().await.unwrap();
        let state = controller.state.lock();
        assert_eq!(state.cursor.offset, 3);
        assert!(!state.cursor.has_more());
    }

    #[tokio::test]
    async fn test_concurrent_load_more_issues_one_request() {
        let gate = Arc::new(Notify::new());
        let (service, controller) = setup(MockMessageService::gated(gate.clone()));
        {
            let mut state = controller.state.lock();
            state.loaded = true;
            state.cursor.reset(2, 5);
        }
        service.push_page(Ok(page(vec![msg("m0", 5)], 5)));

        let first = tokio::spawn({
            let controller = controller.clone();
            async move { controller.load_more().await }
        });
        while service.list_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let second = controller.load_more().await.unwrap();
        assert_eq!(second, LoadOutcome::Skipped);

        gate.notify_one();
        let first = first.await.unwrap().unwrap();
        assert_eq!(first, LoadOutcome::Loaded { received: 1 });
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_initial_load_in_flight_blocks_second_call() {
        let gate = Arc::new(Notify::new());
        let (service, controller) = setup(MockMessageService::gated(gate.clone()));
        service.push_page(Ok(page(vec![msg("m1", 10)], 1)));

        let mut first = tokio_test::task::spawn(controller.load_initial());
        tokio_test::assert_pending!(first.poll());
        assert!(controller.state.lock().loading_initial);

        assert_eq!(controller.load_initial().await.unwrap(), LoadOutcome::Skipped);
        assert_eq!(controller.load_more().await.unwrap(), LoadOutcome::Skipped);

        gate.notify_one();
        assert!(first.is_woken());
        let outcome = tokio_test::assert_ready!(first.poll()).unwrap();
        assert_eq!(outcome, LoadOutcome::Loaded { received: 1 });
        assert_eq!(service.list_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_result_dropped_after_unmount() {
        let gate = Arc::new(Notify::new());
        let (service, controller) = setup(MockMessageService::gated(gate.clone()));
        service.push_page(Ok(page(vec![msg("m1", 10)], 1)));

        let pending = tokio::spawn({
            let controller = controller.clone();
            async move { controller.load_initial().await }
        });
        while service.list_calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        controller.state.lock().unmount();
        gate.notify_one();

        assert_eq!(pending.await.unwrap().unwrap(), LoadOutcome::Dropped);
        assert!(controller.state.lock().store.is_empty());
        assert!(!controller.state.lock().loaded);
    }

    #[tokio::test]
    async fn test_initial_reload_keeps_optimistic_entries() {
        let (service, controller) = setup(MockMessageService::new());
        service.push_page(Ok(page(vec![msg("m1", 10)], 1)));
        controller
            .state
            .lock()
            .store
            .merge(vec![msg("temp_1", 50).with_optimistic(true)]);

        controller.load_initial().await.unwrap();
        assert_eq!(ids(&controller), vec!["m1", "temp_1"]);
    }
}
