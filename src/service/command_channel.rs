//! Command channel: issues commands over a session and tracks their
//! acknowledgements.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

use super::event_adapter::SessionEventAdapter;
use crate::domain::pending_registry::ResponseResult;
use crate::domain::{
    ChannelEvent, Command, CommandKind, CorrelationId, EventBus, PendingRegistry, PendingSummary,
    SessionState,
};
use crate::error::ChannelError;
use crate::session::{OutboundMessage, Session};

/// Delivery guarantee requested for a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Succeed once the transport accepted the message.
    FireAndForget,
    /// Wait for the responder's answer, up to the given deadline.
    Acknowledged(Duration),
}

#[derive(Debug)]
enum PendingInner {
    Ready(Option<ResponseResult>),
    Waiting(oneshot::Receiver<ResponseResult>),
}

/// Handle to a submitted command; resolves to its outcome.
///
/// Fire-and-forget commands are already resolved. Acknowledged commands
/// resolve exactly once: with the response data, [`ChannelError::Timeout`],
/// [`ChannelError::SessionLost`], or a decode/rejection error. Dropping the
/// handle does not cancel the request; its timeout still bounds it.
#[derive(Debug)]
#[must_use = "a pending command does nothing unless awaited"]
pub struct PendingCommand {
    correlation_id: Option<CorrelationId>,
    inner: PendingInner,
}

impl PendingCommand {
    fn ready(result: ResponseResult) -> Self {
        Self {
            correlation_id: None,
            inner: PendingInner::Ready(Some(result)),
        }
    }

    fn waiting(correlation_id: CorrelationId, receiver: oneshot::Receiver<ResponseResult>) -> Self {
        Self {
            correlation_id: Some(correlation_id),
            inner: PendingInner::Waiting(receiver),
        }
    }

    /// Correlation ID of an acknowledged command; `None` for
    /// fire-and-forget.
    #[must_use]
    pub const fn correlation_id(&self) -> Option<CorrelationId> {
        self.correlation_id
    }
}

impl Future for PendingCommand {
    type Output = ResponseResult;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match &mut self.get_mut().inner {
            PendingInner::Ready(result) => Poll::Ready(result.take().unwrap_or(Ok(Vec::new()))),
            // A dropped sender means the registry went away with the request.
            PendingInner::Waiting(receiver) => Pin::new(receiver)
                .poll(cx)
                .map(|r| r.unwrap_or(Err(ChannelError::SessionLost))),
        }
    }
}

/// Sends commands to target identities over an injected [`Session`].
///
/// Creating a channel subscribes to the session's events and spawns the
/// [`SessionEventAdapter`] that resolves pending requests. The adapter is
/// stopped when the channel is dropped.
#[derive(Debug)]
pub struct CommandChannel {
    session: Arc<dyn Session>,
    registry: Arc<PendingRegistry>,
    events: EventBus<ChannelEvent>,
    adapter: JoinHandle<()>,
}

impl CommandChannel {
    /// Creates a channel over `session`. Must be called within a tokio
    /// runtime.
    #[must_use]
    pub fn new(session: Arc<dyn Session>, event_bus_capacity: usize) -> Self {
        let events = EventBus::new(event_bus_capacity);
        // Subscribe before reading the state so no transition is missed.
        let session_events = session.events();
        let registry = Arc::new(PendingRegistry::new(session.state(), events.clone()));
        let adapter = SessionEventAdapter::new(Arc::clone(&registry), Arc::clone(&session))
            .spawn(session_events);
        Self {
            session,
            registry,
            events,
            adapter,
        }
    }

    /// Builds a command from its parts and dispatches it.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::InvalidCommand`] for a bad value or target,
    /// plus every error [`Self::dispatch`] can return.
    pub async fn issue(
        &self,
        kind: CommandKind,
        value: &str,
        target: &str,
        mode: DeliveryMode,
    ) -> ResponseResult {
        let command = Command::new(kind, value, target)?;
        self.dispatch(command, mode).await
    }

    /// Submits a command and waits for its outcome.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::SessionUnavailable`] if the session is not
    /// connected, [`ChannelError::Transport`] if the session refused the
    /// message, and for acknowledged commands [`ChannelError::Timeout`],
    /// [`ChannelError::SessionLost`], [`ChannelError::MalformedResponse`] or
    /// [`ChannelError::Rejected`].
    pub async fn dispatch(&self, command: Command, mode: DeliveryMode) -> ResponseResult {
        self.submit(command, mode).await?.await
    }

    /// Sends a command and returns a handle to its outcome without waiting
    /// for the response.
    ///
    /// The message has been handed to the session when this returns, so
    /// commands submitted one after another leave in submission order.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::SessionUnavailable`] if the session is not
    /// connected. A fire-and-forget command also fails with
    /// [`ChannelError::Transport`] if the session refused it; for an
    /// acknowledged command that failure is delivered through the handle.
    pub async fn submit(
        &self,
        command: Command,
        mode: DeliveryMode,
    ) -> Result<PendingCommand, ChannelError> {
        match mode {
            DeliveryMode::FireAndForget => {
                self.registry.ensure_connected().await?;
                let message = OutboundMessage::from_command(&command, None);
                self.session.send(message).await?;
                tracing::debug!(command = %command, "command sent");
                Ok(PendingCommand::ready(Ok(Vec::new())))
            }
            DeliveryMode::Acknowledged(timeout) => {
                let correlation_id = CorrelationId::new();
                let receiver = self
                    .registry
                    .register(correlation_id, command.clone(), timeout)
                    .await?;
                let message = OutboundMessage::from_command(&command, Some(correlation_id));
                if let Err(e) = self.session.send(message).await {
                    let err = ChannelError::from(e);
                    tracing::warn!(%correlation_id, command = %command, error = %err, "send failed");
                    self.registry.resolve(correlation_id, Err(err)).await;
                } else {
                    tracing::debug!(
                        %correlation_id,
                        command = %command,
                        timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                        "command sent, awaiting ack"
                    );
                }
                Ok(PendingCommand::waiting(correlation_id, receiver))
            }
        }
    }

    /// Subscribes to resolution and session-state notifications.
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    /// Returns the session state as last observed by the channel.
    pub async fn session_state(&self) -> SessionState {
        self.registry.session_state().await
    }

    /// Returns summaries of all requests still waiting for a response.
    pub async fn in_flight(&self) -> Vec<PendingSummary> {
        self.registry.snapshot().await
    }

    /// Returns the underlying session.
    #[must_use]
    pub fn session(&self) -> &Arc<dyn Session> {
        &self.session
    }
}

impl Drop for CommandChannel {
    fn drop(&mut self) {
        self.adapter.abort();
    }
}
