//! Session event adapter.
//!
//! Translates [`SessionEvent`]s into registry operations: responses resolve
//! pending requests, lifecycle events update the observed session state.

use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::codec;
use crate::domain::{PendingRegistry, SessionEvent, SessionState};
use crate::session::Session;

/// Feeds session events into a [`PendingRegistry`].
#[derive(Debug)]
pub struct SessionEventAdapter {
    registry: Arc<PendingRegistry>,
    session: Arc<dyn Session>,
}

impl SessionEventAdapter {
    /// Creates an adapter feeding `session`'s events into `registry`.
    #[must_use]
    pub fn new(registry: Arc<PendingRegistry>, session: Arc<dyn Session>) -> Self {
        Self { registry, session }
    }

    /// Applies one event.
    pub async fn handle_event(&self, event: SessionEvent) {
        match event {
            SessionEvent::InboundResponse {
                correlation_id,
                payload,
            } => {
                let result = codec::decode(&payload);
                if let Err(e) = &result {
                    tracing::debug!(%correlation_id, error = %e, "response carries an error");
                }
                self.registry.resolve(correlation_id, result).await;
            }
            lifecycle => {
                if let Some(state) = lifecycle.state() {
                    self.registry.set_session_state(state).await;
                }
            }
        }
    }

    /// Recovers after the receiver fell behind the session's bus.
    ///
    /// Skipped events may have included a disconnect, so every in-flight
    /// request is failed as lost before the state is re-read from the
    /// session.
    pub async fn resync(&self) -> usize {
        let swept = self
            .registry
            .set_session_state(SessionState::Disconnected)
            .await;
        let current = self.session.state();
        self.registry.set_session_state(current).await;
        swept
    }

    /// Consumes events until the session's bus closes.
    ///
    /// A closed bus means the session is gone, so it is treated as a
    /// disconnect.
    pub async fn run(self, mut events: broadcast::Receiver<SessionEvent>) {
        loop {
            match events.recv().await {
                Ok(event) => self.handle_event(event).await,
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    let swept = self.resync().await;
                    tracing::warn!(
                        lagged = n,
                        swept,
                        state = %self.session.state(),
                        "event adapter lagged behind session events, resynced"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("session event stream closed");
                    self.registry
                        .set_session_state(SessionState::Disconnected)
                        .await;
                    break;
                }
            }
        }
    }

    /// Runs the adapter on a background task.
    #[must_use]
    pub fn spawn(self, events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
        tokio::spawn(self.run(events))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::domain::codec::ResponseFrame;
    use crate::domain::{Action, Command, CorrelationId, Direction, EventBus};
    use crate::error::ChannelError;
    use crate::session::LoopbackSession;

    fn loopback() -> Arc<dyn Session> {
        Arc::new(LoopbackSession::new("robot-1", 16))
    }

    fn make_registry() -> Arc<PendingRegistry> {
        Arc::new(PendingRegistry::new(
            SessionState::Connected,
            EventBus::new(16),
        ))
    }

    fn make_command() -> Command {
        let Ok(cmd) = Command::from_action(Action::Direction(Direction::Up), "robot-1") else {
            panic!("valid command");
        };
        cmd
    }

    #[tokio::test]
    async fn response_resolves_matching_request() {
        let registry = make_registry();
        let adapter = SessionEventAdapter::new(Arc::clone(&registry), loopback());
        let id = CorrelationId::new();
        let Ok(rx) = registry
            .register(id, make_command(), Duration::from_secs(5))
            .await
        else {
            panic!("register failed");
        };

        adapter
            .handle_event(SessionEvent::InboundResponse {
                correlation_id: id,
                payload: ResponseFrame::ok("moving").to_bytes(),
            })
            .await;

        let Ok(result) = rx.await else {
            panic!("sender dropped");
        };
        assert_eq!(result, Ok(b"moving".to_vec()));
    }

    #[tokio::test]
    async fn unknown_correlation_id_is_ignored() {
        let registry = make_registry();
        let adapter = SessionEventAdapter::new(Arc::clone(&registry), loopback());
        let id = CorrelationId::new();
        let _ = registry
            .register(id, make_command(), Duration::from_secs(5))
            .await;

        adapter
            .handle_event(SessionEvent::InboundResponse {
                correlation_id: CorrelationId::new(),
                payload: ResponseFrame::ok("").to_bytes(),
            })
            .await;
        assert!(registry.contains(id).await);
    }

    #[tokio::test]
    async fn malformed_payload_fails_request() {
        let registry = make_registry();
        let adapter = SessionEventAdapter::new(Arc::clone(&registry), loopback());
        let id = CorrelationId::new();
        let Ok(rx) = registry
            .register(id, make_command(), Duration::from_secs(5))
            .await
        else {
            panic!("register failed");
        };

        adapter
            .handle_event(SessionEvent::InboundResponse {
                correlation_id: id,
                payload: Vec::new(),
            })
            .await;

        let Ok(result) = rx.await else {
            panic!("sender dropped");
        };
        assert!(matches!(result, Err(ChannelError::MalformedResponse(_))));
    }

    #[tokio::test]
    async fn closed_stream_counts_as_disconnect() {
        let registry = make_registry();
        let bus: EventBus<SessionEvent> = EventBus::new(16);
        let rx = bus.subscribe();
        let Ok(pending) = registry
            .register(CorrelationId::new(), make_command(), Duration::from_secs(30))
            .await
        else {
            panic!("register failed");
        };

        let task = SessionEventAdapter::new(Arc::clone(&registry), loopback()).spawn(rx);
        drop(bus);
        let Ok(()) = task.await else {
            panic!("adapter task failed");
        };

        assert_eq!(registry.session_state().await, SessionState::Disconnected);
        let Ok(result) = pending.await else {
            panic!("sender dropped");
        };
        assert_eq!(result, Err(ChannelError::SessionLost));
    }

    #[tokio::test]
    async fn lifecycle_events_update_state() {
        let registry = make_registry();
        let adapter = SessionEventAdapter::new(Arc::clone(&registry), loopback());

        adapter.handle_event(SessionEvent::Reconnecting).await;
        assert_eq!(registry.session_state().await, SessionState::Reconnecting);
        adapter.handle_event(SessionEvent::Connected).await;
        assert_eq!(registry.session_state().await, SessionState::Connected);
    }

    #[tokio::test]
    async fn resync_sweeps_and_adopts_current_session_state() {
        let registry = make_registry();
        let session = Arc::new(LoopbackSession::new("robot-1", 16));
        let Ok(()) = session.connect("loopback://", "").await else {
            panic!("loopback connect failed");
        };
        let adapter = SessionEventAdapter::new(
            Arc::clone(&registry),
            Arc::clone(&session) as Arc<dyn Session>,
        );
        let Ok(pending) = registry
            .register(CorrelationId::new(), make_command(), Duration::from_secs(30))
            .await
        else {
            panic!("register failed");
        };

        assert_eq!(adapter.resync().await, 1);
        assert_eq!(registry.session_state().await, SessionState::Connected);
        let Ok(result) = pending.await else {
            panic!("sender dropped");
        };
        assert_eq!(result, Err(ChannelError::SessionLost));
    }
}
