//! Realtime Sync
//!
//! Keeps a client-side query cache consistent with server-side changes by
//! listening to a realtime event stream over WebSocket.
//!
//! # Features
//!
//! - **Self-healing connection**: exponential reconnect backoff from 1s up to 15s,
//!   reset on every successful open, no retry limit
//! - **Endpoint resolution**: explicit ws/http base, bare host, REST base or page origin
//! - **Event routing**: feature, pending-change and fallback rules mapped to
//!   prefix invalidations and refetches
//! - **Injected cache**: any [`QueryCache`] implementation, installable after start
//! - **Observability**: `tracing` events plus [`SyncStats`] counters
//!
//! # Modules
//!
//! - `types`: Event payload and typed cache keys
//! - `cache`: Cache trait, operations, in-memory implementation
//! - `connection`: Endpoint resolution, backoff and the connection manager
//! - `dispatcher`: Event classification and invalidation plans
//! - `session`: Manager and dispatcher wired together with a status surface
//! - `config`: Runtime configuration loading
//! - `stats`: Activity counters
//! - `error`: Error types
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use realtime_sync::{InMemoryCache, QueryCache, RealtimeSession, SyncConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut config = SyncConfig::new("P1", 3);
//!     config.api_url = Some("https://api.example.com".to_string());
//!
//!     let cache: Arc<dyn QueryCache> = Arc::new(InMemoryCache::new());
//!     let session = RealtimeSession::new(config, Some(cache));
//!     session.start();
//!
//!     tokio::signal::ctrl_c().await.unwrap();
//!     session.shutdown().await;
//! }
//! ```

pub mod cache;
pub mod config;
pub mod connection;
pub mod dispatcher;
pub mod error;
pub mod session;
pub mod stats;
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CacheOp, InMemoryCache, QueryCache};
pub use config::{BackoffConfig, SyncConfig};
pub use connection::{ConnectionManager, ConnectionState, EventHandlers};
pub use dispatcher::EventDispatcher;
pub use error::{CacheError, Result, SyncError};
pub use session::{RealtimeSession, SessionStatus};
pub use stats::{StatsSnapshot, SyncStats};
pub use types::{CacheKey, KeySegment, RealtimeEvent};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
