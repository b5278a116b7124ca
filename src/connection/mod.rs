//! Connection manager for the realtime event stream
//!
//! Provides one persistent WebSocket connection per manager with:
//! - Endpoint resolution from runtime configuration
//! - Exponential reconnect backoff (1s doubling to 15s, reset on open)
//! - Lifecycle callbacks (`on_open`, `on_close`, `on_error`, `on_message`)
//! - Cooperative stop that suppresses any scheduled reconnect

pub mod backoff;
pub mod endpoint;
pub mod handlers;
pub mod manager;
pub mod state;
pub mod transport;

pub use backoff::BackoffPolicy;
pub use endpoint::{connection_url, resolve_base, BaseSource, ResolvedBase};
pub use handlers::{CloseInfo, EventHandlers};
pub use manager::{ConnectionManager, ConnectionManagerBuilder};
pub use state::ConnectionState;
pub use transport::{Frame, FrameStream, Transport, WsTransport};
