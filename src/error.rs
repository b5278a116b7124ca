//! Error types for the realtime synchronization layer
//!
//! Transport and decode errors are recovered inside the connection manager;
//! cache errors are swallowed by the dispatcher. Only configuration loading
//! surfaces an error to the caller.

use thiserror::Error;

/// Errors raised by the connection manager and configuration loading.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The transport failed to connect or the live connection broke.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server rejected the WebSocket upgrade.
    #[error("websocket handshake rejected with HTTP {status}")]
    Handshake { status: u16 },

    /// The connection attempt did not complete in time.
    #[error("connection timed out after {0}ms")]
    Timeout(u64),

    /// An inbound frame could not be decoded into an event.
    #[error("failed to decode event: {0}")]
    Decode(#[from] serde_json::Error),

    /// Configuration was missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors reported by a cache collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    /// The cache cannot accept operations right now.
    #[error("cache unavailable")]
    Unavailable,

    /// The operation itself failed.
    #[error("cache operation failed: {0}")]
    Operation(String),
}

/// Result type for realtime sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_display() {
        let err = SyncError::Handshake { status: 401 };
        assert_eq!(err.to_string(), "websocket handshake rejected with HTTP 401");
    }

    #[test]
    fn test_decode_from_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad").unwrap_err();
        let err: SyncError = json_err.into();
        assert!(matches!(err, SyncError::Decode(_)));
        assert!(err.to_string().starts_with("failed to decode event"));
    }

    #[test]
    fn test_cache_error_display() {
        let err = CacheError::Operation("queue full".to_string());
        assert_eq!(err.to_string(), "cache operation failed: queue full");
    }
}
