//! Configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`). [`ChannelConfig`] configures the
//! controller, [`ResponderConfig`] the responder binary.

use std::net::SocketAddr;
use std::time::Duration;

use crate::service::DeliveryMode;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but its value cannot be used.
    #[error("invalid value {value:?} for {key}")]
    InvalidValue {
        /// Variable name.
        key: &'static str,
        /// Value found.
        value: String,
    },
}

/// Controller configuration.
///
/// Loaded once at startup via [`ChannelConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// WebSocket URL of the responder (e.g. `ws://127.0.0.1:7880/ws`).
    pub session_url: String,

    /// Access token appended to the session URL.
    pub session_token: String,

    /// Identity of the robot commands are addressed to.
    pub target_identity: String,

    /// Deadline for acknowledged commands.
    pub ack_timeout: Duration,

    /// Whether pad commands wait for an acknowledgement.
    pub acknowledged: bool,

    /// Capacity of the event bus broadcast channels.
    pub event_bus_capacity: usize,
}

impl ChannelConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    /// Missing or unparsable values fall back to defaults.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let session_url =
            lookup("SESSION_URL").unwrap_or_else(|| "ws://127.0.0.1:7880/ws".to_string());
        let session_token = lookup("SESSION_TOKEN").unwrap_or_default();
        let target_identity = lookup("TARGET_IDENTITY")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "robot-1".to_string());
        let ack_timeout = Duration::from_millis(parse_env(&lookup, "ACK_TIMEOUT_MS", 2000));
        let acknowledged = !matches!(
            lookup("CONTROL_MODE")
                .map(|v| v.to_ascii_lowercase())
                .as_deref(),
            Some("fire" | "fire_and_forget")
        );
        let event_bus_capacity = parse_env(&lookup, "EVENT_BUS_CAPACITY", 1024);

        Self {
            session_url,
            session_token,
            target_identity,
            ack_timeout,
            acknowledged,
            event_bus_capacity,
        }
    }

    /// Returns the delivery mode pad commands use.
    #[must_use]
    pub const fn delivery_mode(&self) -> DeliveryMode {
        if self.acknowledged {
            DeliveryMode::Acknowledged(self.ack_timeout)
        } else {
            DeliveryMode::FireAndForget
        }
    }
}

/// Responder configuration.
///
/// Loaded once at startup via [`ResponderConfig::from_env`].
#[derive(Debug, Clone)]
pub struct ResponderConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:7880`).
    pub listen_addr: SocketAddr,

    /// Identity this responder answers as.
    pub identity: String,

    /// Token controllers must present on `/ws`; `None` disables the check.
    pub token: Option<String>,

    /// Capacity of the event bus broadcast channel.
    pub event_bus_capacity: usize,
}

impl ResponderConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` cannot be parsed.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw_addr = lookup("LISTEN_ADDR").unwrap_or_else(|| "0.0.0.0:7880".to_string());
        let listen_addr: SocketAddr = raw_addr
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "LISTEN_ADDR",
                value: raw_addr.clone(),
            })?;
        let identity = lookup("RESPONDER_IDENTITY")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "robot-1".to_string());
        let token = lookup("RESPONDER_TOKEN").filter(|v| !v.is_empty());
        let event_bus_capacity = parse_env(&lookup, "EVENT_BUS_CAPACITY", 1024);

        Ok(Self {
            listen_addr,
            identity,
            token,
            event_bus_capacity,
        })
    }
}

/// Parses a variable as `T`, returning `default` on missing or invalid
/// values.
fn parse_env<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn channel_defaults() {
        let config = ChannelConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config.session_url, "ws://127.0.0.1:7880/ws");
        assert_eq!(config.target_identity, "robot-1");
        assert!(config.session_token.is_empty());
        assert_eq!(config.event_bus_capacity, 1024);
        assert_eq!(
            config.delivery_mode(),
            DeliveryMode::Acknowledged(Duration::from_millis(2000))
        );
    }

    #[test]
    fn channel_overrides() {
        let config = ChannelConfig::from_lookup(lookup_from(&[
            ("SESSION_URL", "ws://robot.local/ws"),
            ("TARGET_IDENTITY", "rover"),
            ("ACK_TIMEOUT_MS", "500"),
            ("CONTROL_MODE", "FIRE"),
            ("EVENT_BUS_CAPACITY", "not-a-number"),
        ]));
        assert_eq!(config.session_url, "ws://robot.local/ws");
        assert_eq!(config.target_identity, "rover");
        assert_eq!(config.ack_timeout, Duration::from_millis(500));
        assert_eq!(config.delivery_mode(), DeliveryMode::FireAndForget);
        assert_eq!(config.event_bus_capacity, 1024);
    }

    #[test]
    fn responder_defaults() {
        let Ok(config) = ResponderConfig::from_lookup(lookup_from(&[])) else {
            panic!("defaults should load");
        };
        assert_eq!(config.listen_addr.port(), 7880);
        assert_eq!(config.identity, "robot-1");
        assert_eq!(config.token, None);
    }

    #[test]
    fn responder_rejects_bad_listen_addr() {
        let result = ResponderConfig::from_lookup(lookup_from(&[("LISTEN_ADDR", "nowhere")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue {
                key: "LISTEN_ADDR",
                ..
            })
        ));
    }

    #[test]
    fn empty_token_disables_check() {
        let Ok(config) = ResponderConfig::from_lookup(lookup_from(&[("RESPONDER_TOKEN", "")]))
        else {
            panic!("config should load");
        };
        assert_eq!(config.token, None);
    }
}
