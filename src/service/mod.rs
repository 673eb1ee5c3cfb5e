//! Service layer: command dispatch on the controller, command application
//! on the responder.
//!
//! [`CommandChannel`] issues commands over a [`crate::session::Session`] and
//! tracks acknowledgements; [`SessionEventAdapter`] feeds it session events;
//! [`ControlPad`] debounces button input on top of it. [`RobotService`] is
//! the responder's counterpart that applies received commands.

pub mod command_channel;
pub mod control_pad;
pub mod event_adapter;
pub mod robot_service;

pub use command_channel::{CommandChannel, DeliveryMode, PendingCommand};
pub use control_pad::{ControlPad, PadState};
pub use event_adapter::SessionEventAdapter;
pub use robot_service::RobotService;
