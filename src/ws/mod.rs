//! WebSocket layer: wire envelope and the responder's `/ws` endpoint.
//!
//! [`messages`] defines the JSON envelope both ends speak. The responder
//! upgrades `/ws` in [`handler`] and runs one [`connection`] loop per
//! controller.

pub mod connection;
pub mod handler;
pub mod messages;
