//! Connection lifecycle states

use std::fmt;

/// Where a connection manager is in its lifecycle.
///
/// `Idle → Connecting → Open → (Closed | Errored) → Reconnecting → Connecting …`
/// `Stopped` is only entered through an explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// Never started
    #[default]
    Idle,
    Connecting,
    Open,
    /// The server or peer closed the connection
    Closed,
    /// The transport failed
    Errored,
    /// Waiting for the backoff timer
    Reconnecting,
    Stopped,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::Errored => "errored",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Stopped => "stopped",
        };
        write!(f, "{}", name)
    }
}
