//! WebSocket connection loop on the responder.
//!
//! Applies incoming commands to the robot, answers acknowledged ones with a
//! response frame, and forwards the robot's events to the controller.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::broadcast;

use super::messages::{CommandPayload, WsMessage, WsMessageType};
use crate::domain::RobotEvent;
use crate::service::RobotService;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Sends a `ready` event announcing the robot identity.
/// - Reads commands from the controller and applies them.
/// - Forwards [`RobotEvent`]s from the [`broadcast::Receiver`].
pub async fn run_connection(
    socket: WebSocket,
    mut event_rx: broadcast::Receiver<RobotEvent>,
    robot: Arc<RobotService>,
) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let ready = WsMessage::event(serde_json::json!({
        "event_type": "ready",
        "identity": robot.identity(),
    }));
    if ws_tx.send(Message::text(ready.to_json())).await.is_err() {
        return;
    }
    tracing::info!(identity = robot.identity(), "controller connected");

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = handle_text_message(text.as_str(), &robot).await;
                        if let Some(reply) = reply
                            && ws_tx.send(Message::text(reply.to_json())).await.is_err() {
                                break;
                            }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(error = %e, "ws read failed");
                        break;
                    }
                    _ => {}
                }
            }
            event = event_rx.recv() => {
                match event {
                    Ok(robot_event) => {
                        let payload = serde_json::to_value(&robot_event).unwrap_or_default();
                        if ws_tx.send(Message::text(WsMessage::event(payload).to_json())).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        tracing::warn!(lagged = n, "ws client lagged behind event bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    tracing::info!(identity = robot.identity(), "controller disconnected");
}

/// Handles a text frame from the controller, returning the envelope to send
/// back, if any.
async fn handle_text_message(text: &str, robot: &RobotService) -> Option<WsMessage> {
    let Ok(msg) = serde_json::from_str::<WsMessage>(text) else {
        return Some(WsMessage::error("", 400, "malformed JSON"));
    };
    if msg.msg_type != WsMessageType::Command {
        return Some(WsMessage::error(msg.id, 400, "expected a command"));
    }
    let Ok(command) = serde_json::from_value::<CommandPayload>(msg.payload.clone()) else {
        return Some(WsMessage::error(msg.id, 400, "malformed command payload"));
    };

    let correlation_id = if command.ack {
        msg.correlation_id()
    } else {
        None
    };
    let frame = robot.apply(&command, correlation_id).await;
    command
        .ack
        .then(|| WsMessage::response(msg.id, &frame))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::codec::ResponseFrame;
    use crate::domain::{Action, Command, CorrelationId, Direction, EventBus};
    use crate::session::OutboundMessage;

    fn make_robot() -> RobotService {
        RobotService::new("robot-1", EventBus::new(16))
    }

    fn command_text(target: &str, correlation_id: Option<CorrelationId>) -> String {
        let Ok(cmd) = Command::from_action(Action::Direction(Direction::Up), target) else {
            panic!("valid command");
        };
        WsMessage::command(&OutboundMessage::from_command(&cmd, correlation_id)).to_json()
    }

    #[tokio::test]
    async fn acknowledged_command_gets_response() {
        let robot = make_robot();
        let id = CorrelationId::new();

        let Some(reply) = handle_text_message(&command_text("robot-1", Some(id)), &robot).await
        else {
            panic!("expected a reply");
        };
        assert_eq!(reply.msg_type, WsMessageType::Response);
        assert_eq!(reply.correlation_id(), Some(id));
        let Ok(frame) = serde_json::from_value::<ResponseFrame>(reply.payload) else {
            panic!("response payload should be a frame");
        };
        assert_eq!(frame, ResponseFrame::ok("up"));
    }

    #[tokio::test]
    async fn fire_and_forget_command_is_applied_silently() {
        let robot = make_robot();
        let reply = handle_text_message(&command_text("robot-1", None), &robot).await;
        assert!(reply.is_none());
        assert_eq!(robot.snapshot().await.commands_applied, 1);
    }

    #[tokio::test]
    async fn malformed_json_gets_error() {
        let robot = make_robot();
        let Some(reply) = handle_text_message("{not json", &robot).await else {
            panic!("expected a reply");
        };
        assert_eq!(reply.msg_type, WsMessageType::Error);
        assert!(reply.id.is_empty());
    }

    #[tokio::test]
    async fn wrong_target_is_answered_with_error_frame() {
        let robot = make_robot();
        let id = CorrelationId::new();
        let Some(reply) = handle_text_message(&command_text("robot-7", Some(id)), &robot).await
        else {
            panic!("expected a reply");
        };
        let Ok(ResponseFrame::Error { code, .. }) =
            serde_json::from_value::<ResponseFrame>(reply.payload)
        else {
            panic!("expected error frame");
        };
        assert_eq!(code, 404);
    }
}
