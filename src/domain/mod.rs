//! Domain layer: commands, wire codec, events, and the pending-request
//! registry.
//!
//! This module contains the controller-side domain model: the closed set of
//! commands a robot understands, how they are encoded, the events sessions
//! and the channel emit, and the registry that tracks acknowledged requests
//! until they resolve. The responder's simulated robot lives in [`robot`].

pub mod channel_event;
pub mod codec;
pub mod command;
pub mod correlation_id;
pub mod event_bus;
pub mod pending_registry;
pub mod robot;
pub mod session_event;

pub use channel_event::{ChannelEvent, RequestState};
pub use command::{Action, Command, CommandKind, Direction, MuteState, NeckMove};
pub use correlation_id::CorrelationId;
pub use event_bus::EventBus;
pub use pending_registry::{PendingRegistry, PendingRequest, PendingSummary};
pub use robot::{NeckPose, RobotEvent, RobotState};
pub use session_event::{SessionEvent, SessionState};
