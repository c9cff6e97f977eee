//! Connection state machine owned by the connection manager.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use crate::error::BridgeError;

// ── ConnectionState ──────────────────────────────────────────────

/// The current phase of the bridge connection.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected
///       ▲               │              │
///       └───────────────┴──────────────┘
///          (dial failure, read/write failure, close)
/// ```
///
/// There is no terminal state: the bridge may reconnect for as long as
/// the process lives.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No active connection. Initial state.
    #[default]
    Disconnected,

    /// Dial in progress.
    Connecting,

    /// A connection is established and its reader task is running.
    Connected {
        /// When the connection entered the `Connected` state.
        since: Instant,
        /// Generation of the dial that produced this connection.
        generation: u64,
    },
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { generation, .. } => write!(f, "Connected (generation {generation})"),
        }
    }
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected { .. })
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    /// Generation of the live connection, if any.
    pub fn generation(&self) -> Option<u64> {
        match self {
            Self::Connected { generation, .. } => Some(*generation),
            _ => None,
        }
    }

    /// How long the connection has been up.
    ///
    /// Returns `None` for any other state.
    pub fn connected_duration(&self) -> Option<std::time::Duration> {
        match self {
            Self::Connected { since, .. } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Connecting`.
    ///
    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), BridgeError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(BridgeError::Transport(format!(
                "cannot connect: state is {self}"
            ))),
        }
    }

    /// Transition to `Connected`.
    ///
    /// Valid from: `Connecting`.
    pub fn complete_connect(&mut self, generation: u64) -> Result<(), BridgeError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                    generation,
                };
                Ok(())
            }
            _ => Err(BridgeError::Transport(format!(
                "cannot complete connect: state is {self}"
            ))),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn force_disconnect(&mut self) {
        *self = Self::Disconnected;
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut state = ConnectionState::Disconnected;

        state.begin_connect().unwrap();
        assert_eq!(state, ConnectionState::Connecting);

        state.complete_connect(1).unwrap();
        assert!(state.is_connected());
        assert_eq!(state.generation(), Some(1));
        assert!(state.connected_duration().is_some());

        state.force_disconnect();
        assert!(state.is_disconnected());
        assert_eq!(state.generation(), None);
    }

    #[test]
    fn connect_twice_is_rejected() {
        let mut state = ConnectionState::Connected {
            since: Instant::now(),
            generation: 3,
        };
        assert!(state.begin_connect().is_err());
    }

    #[test]
    fn complete_requires_connecting() {
        let mut state = ConnectionState::Disconnected;
        assert!(state.complete_connect(1).is_err());
    }

    #[test]
    fn dial_failure_returns_to_disconnected() {
        let mut state = ConnectionState::Disconnected;
        state.begin_connect().unwrap();
        state.force_disconnect();
        assert!(state.is_disconnected());
        assert!(state.begin_connect().is_ok());
    }

    #[test]
    fn display_format() {
        assert_eq!(ConnectionState::Disconnected.to_string(), "Disconnected");
        assert_eq!(ConnectionState::Connecting.to_string(), "Connecting");
        assert_eq!(
            ConnectionState::Connected {
                since: Instant::now(),
                generation: 7
            }
            .to_string(),
            "Connected (generation 7)"
        );
    }

    #[test]
    fn default_state_is_disconnected() {
        assert!(ConnectionState::default().is_disconnected());
    }
}
