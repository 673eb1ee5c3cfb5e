//! Registry of in-flight acknowledged requests.
//!
//! [`PendingRegistry`] owns every [`PendingRequest`] together with the
//! observed [`SessionState`]. Both live behind a single
//! [`tokio::sync::Mutex`], so the three resolution paths (response, timer,
//! disconnect sweep) and new registrations are serialized: whichever path
//! removes an entry first resolves it, later ones find nothing and no-op.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, oneshot};
use tokio::task::AbortHandle;

use super::channel_event::{ChannelEvent, RequestState};
use super::command::Command;
use super::{CorrelationId, EventBus, SessionState};
use crate::error::ChannelError;

/// Result delivered to the issuer of an acknowledged request.
pub type ResponseResult = Result<Vec<u8>, ChannelError>;

/// An acknowledged request waiting for its response.
#[derive(Debug)]
pub struct PendingRequest {
    /// Correlation ID (unique among in-flight requests).
    pub correlation_id: CorrelationId,
    /// The command that was sent.
    pub command: Command,
    /// When the request was registered.
    pub issued_at: DateTime<Utc>,
    /// Current state; always `InFlight` while stored in the registry.
    pub state: RequestState,
    responder: oneshot::Sender<ResponseResult>,
    timer: Option<AbortHandle>,
}

impl PendingRequest {
    /// Moves the request to its terminal state and hands the result to the
    /// issuer. `cancel_timer` is false when the timer itself is resolving.
    fn finish(mut self, result: ResponseResult, cancel_timer: bool) -> ChannelEvent {
        self.state = match &result {
            Ok(_) => RequestState::Acked,
            Err(ChannelError::Timeout) => RequestState::TimedOut,
            Err(_) => RequestState::Failed,
        };
        if cancel_timer && let Some(timer) = self.timer.take() {
            timer.abort();
        }

        let now = Utc::now();
        let event = ChannelEvent::CommandResolved {
            correlation_id: self.correlation_id,
            method: self.command.action().method(),
            target: self.command.target().to_string(),
            state: self.state,
            error: result.as_ref().err().map(ToString::to_string),
            latency_ms: (now - self.issued_at).num_milliseconds(),
            timestamp: now,
        };

        // The issuer may have dropped its handle; nothing to deliver then.
        let _ = self.responder.send(result);
        event
    }
}

/// Lightweight view of an in-flight request.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSummary {
    /// Correlation ID.
    pub correlation_id: CorrelationId,
    /// Wire method of the command.
    pub method: &'static str,
    /// Target identity.
    pub target: String,
    /// Registration timestamp.
    pub issued_at: DateTime<Utc>,
}

impl From<&PendingRequest> for PendingSummary {
    fn from(req: &PendingRequest) -> Self {
        Self {
            correlation_id: req.correlation_id,
            method: req.command.action().method(),
            target: req.command.target().to_string(),
            issued_at: req.issued_at,
        }
    }
}

#[derive(Debug)]
struct RegistryInner {
    session_state: SessionState,
    entries: HashMap<CorrelationId, PendingRequest>,
}

/// Central store for in-flight acknowledged requests.
///
/// # Concurrency
///
/// - All reads and writes go through one mutex.
/// - A registration checks the session state under the same lock the
///   disconnect sweep holds, so nothing registers against a session already
///   marked disconnected.
/// - Each entry carries the abort handle of its timeout task; resolving the
///   entry early aborts the timer.
#[derive(Debug)]
pub struct PendingRegistry {
    inner: Mutex<RegistryInner>,
    events: EventBus<ChannelEvent>,
}

impl PendingRegistry {
    /// Creates an empty registry seeded with the session's current state.
    #[must_use]
    pub fn new(session_state: SessionState, events: EventBus<ChannelEvent>) -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                session_state,
                entries: HashMap::new(),
            }),
            events,
        }
    }

    /// Returns the last observed session state.
    pub async fn session_state(&self) -> SessionState {
        self.inner.lock().await.session_state
    }

    /// Fails fast unless the session is connected.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::SessionUnavailable`] if the observed state is
    /// not `Connected`.
    pub async fn ensure_connected(&self) -> Result<(), ChannelError> {
        if self.session_state().await.is_connected() {
            Ok(())
        } else {
            Err(ChannelError::SessionUnavailable)
        }
    }

    /// Registers a new in-flight request and arms its timeout.
    ///
    /// The returned receiver yields exactly one result.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::SessionUnavailable`] if the session is not
    /// connected, or [`ChannelError::DuplicateCorrelationId`] if the ID is
    /// already in flight.
    pub async fn register(
        self: &Arc<Self>,
        correlation_id: CorrelationId,
        command: Command,
        timeout: Duration,
    ) -> Result<oneshot::Receiver<ResponseResult>, ChannelError> {
        let mut inner = self.inner.lock().await;
        if !inner.session_state.is_connected() {
            return Err(ChannelError::SessionUnavailable);
        }
        if inner.entries.contains_key(&correlation_id) {
            tracing::error!(%correlation_id, "correlation id reused while in flight");
            return Err(ChannelError::DuplicateCorrelationId(
                *correlation_id.as_uuid(),
            ));
        }

        // The timer needs the lock to expire the entry, so it cannot observe
        // the map before this insert completes.
        let registry = Arc::clone(self);
        let timer = tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            registry.expire(correlation_id).await;
        });

        let (responder, receiver) = oneshot::channel();
        inner.entries.insert(
            correlation_id,
            PendingRequest {
                correlation_id,
                command,
                issued_at: Utc::now(),
                state: RequestState::InFlight,
                responder,
                timer: Some(timer.abort_handle()),
            },
        );
        Ok(receiver)
    }

    /// Resolves a request with the given result.
    ///
    /// Returns `false` if no such request is in flight (already resolved,
    /// timed out, or never issued).
    pub async fn resolve(&self, correlation_id: CorrelationId, result: ResponseResult) -> bool {
        let removed = self.inner.lock().await.entries.remove(&correlation_id);
        let Some(request) = removed else {
            tracing::debug!(%correlation_id, "no pending request for response, ignoring");
            return false;
        };
        let event = request.finish(result, true);
        let _ = self.events.publish(event);
        true
    }

    /// Timer path: resolves a request as [`ChannelError::Timeout`].
    async fn expire(&self, correlation_id: CorrelationId) -> bool {
        let removed = self.inner.lock().await.entries.remove(&correlation_id);
        let Some(request) = removed else {
            return false;
        };
        tracing::warn!(
            %correlation_id,
            method = request.command.action().method(),
            target = request.command.target(),
            "command timed out"
        );
        let event = request.finish(Err(ChannelError::Timeout), false);
        let _ = self.events.publish(event);
        true
    }

    /// Records a session state transition.
    ///
    /// Moving to `Disconnected` fails every in-flight request with
    /// [`ChannelError::SessionLost`] while still holding the lock. Returns
    /// the number of requests swept.
    pub async fn set_session_state(&self, state: SessionState) -> usize {
        let (previous, swept) = {
            let mut inner = self.inner.lock().await;
            let previous = std::mem::replace(&mut inner.session_state, state);
            let swept: Vec<PendingRequest> = if state == SessionState::Disconnected {
                inner.entries.drain().map(|(_, req)| req).collect()
            } else {
                Vec::new()
            };
            (previous, swept)
        };

        let count = swept.len();
        for request in swept {
            let event = request.finish(Err(ChannelError::SessionLost), true);
            let _ = self.events.publish(event);
        }

        if previous != state {
            tracing::info!(from = %previous, to = %state, swept = count, "session state changed");
            let _ = self.events.publish(ChannelEvent::SessionStateChanged {
                from: previous,
                to: state,
                swept: count,
                timestamp: Utc::now(),
            });
        }
        count
    }

    /// Returns summaries of all in-flight requests.
    pub async fn snapshot(&self) -> Vec<PendingSummary> {
        let inner = self.inner.lock().await;
        inner.entries.values().map(PendingSummary::from).collect()
    }

    /// Returns `true` if the given request is still in flight.
    pub async fn contains(&self, correlation_id: CorrelationId) -> bool {
        self.inner.lock().await.entries.contains_key(&correlation_id)
    }

    /// Returns the number of in-flight requests.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Returns `true` if nothing is in flight.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.entries.is_empty()
    }
}
