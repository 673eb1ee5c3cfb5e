//! Robot service: applies received commands to the simulated robot.

use chrono::Utc;
use tokio::sync::RwLock;

use crate::domain::codec::ResponseFrame;
use crate::domain::{Action, CorrelationId, EventBus, RobotEvent, RobotState};
use crate::ws::messages::CommandPayload;

/// Error code for a command addressed to another participant.
pub const CODE_UNKNOWN_PARTICIPANT: u32 = 404;
/// Error code for a method the robot does not implement.
pub const CODE_UNKNOWN_METHOD: u32 = 400;

/// Responder-side coordinator.
///
/// Owns the [`RobotState`] behind a lock and publishes a [`RobotEvent`] for
/// every command it applies or refuses.
#[derive(Debug)]
pub struct RobotService {
    identity: String,
    state: RwLock<RobotState>,
    event_bus: EventBus<RobotEvent>,
}

impl RobotService {
    /// Creates a service answering as `identity`.
    #[must_use]
    pub fn new(identity: impl Into<String>, event_bus: EventBus<RobotEvent>) -> Self {
        let identity = identity.into();
        Self {
            state: RwLock::new(RobotState::new(identity.clone())),
            identity,
            event_bus,
        }
    }

    /// Returns the identity commands must be addressed to.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub const fn event_bus(&self) -> &EventBus<RobotEvent> {
        &self.event_bus
    }

    /// Returns a copy of the current robot state.
    pub async fn snapshot(&self) -> RobotState {
        self.state.read().await.clone()
    }

    /// Applies one received command and builds the response frame.
    ///
    /// A command for another identity is refused with
    /// [`CODE_UNKNOWN_PARTICIPANT`], an unknown method or a body that does
    /// not match it with [`CODE_UNKNOWN_METHOD`].
    pub async fn apply(
        &self,
        command: &CommandPayload,
        correlation_id: Option<CorrelationId>,
    ) -> ResponseFrame {
        if command.target != self.identity {
            return self
                .reject(
                    command,
                    correlation_id,
                    CODE_UNKNOWN_PARTICIPANT,
                    format!("participant {} not found", command.target),
                )
                .await;
        }
        let Some(action) = Action::from_method(&command.method) else {
            return self
                .reject(
                    command,
                    correlation_id,
                    CODE_UNKNOWN_METHOD,
                    format!("unknown method {}", command.method),
                )
                .await;
        };
        if !command.body.is_empty() && !command.body.eq_ignore_ascii_case(action.value()) {
            return self
                .reject(
                    command,
                    correlation_id,
                    CODE_UNKNOWN_METHOD,
                    format!("body {:?} does not match method {}", command.body, command.method),
                )
                .await;
        }

        let mut state = self.state.write().await;
        let data = state.apply(action);
        let _ = self.event_bus.publish(RobotEvent::CommandApplied {
            correlation_id,
            action,
            motion: state.motion,
            neck: state.neck,
            muted: state.muted,
            timestamp: Utc::now(),
        });
        tracing::info!(
            method = action.method(),
            motion = ?state.motion,
            pan = state.neck.pan,
            tilt = state.neck.tilt,
            muted = state.muted,
            "command applied"
        );
        ResponseFrame::ok(data)
    }

    async fn reject(
        &self,
        command: &CommandPayload,
        correlation_id: Option<CorrelationId>,
        code: u32,
        message: String,
    ) -> ResponseFrame {
        {
            let mut state = self.state.write().await;
            state.commands_rejected = state.commands_rejected.saturating_add(1);
        }
        let _ = self.event_bus.publish(RobotEvent::CommandRejected {
            correlation_id,
            method: command.method.clone(),
            code,
            timestamp: Utc::now(),
        });
        tracing::warn!(method = %command.method, code, %message, "command rejected");
        ResponseFrame::error(code, message)
    }
}
