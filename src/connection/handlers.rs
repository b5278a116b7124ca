//! Lifecycle callbacks for the connection manager
//!
//! - `on_open`: the connection is established (backoff already reset)
//! - `on_close`: the connection closed, cleanly or not
//! - `on_error`: the transport failed; the close that follows schedules the reconnect
//! - `on_message`: one decoded [`RealtimeEvent`]
//!
//! All callbacks run inline on the manager's task and must not block.

use std::fmt;
use std::sync::Arc;

use crate::error::SyncError;
use crate::types::RealtimeEvent;

/// Normal closure code
pub const CLOSE_NORMAL: u16 = 1000;

/// Closed without a close frame
pub const CLOSE_ABNORMAL: u16 = 1006;

/// Metadata about a closed connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    /// WebSocket close code, if one is known
    pub code: Option<u16>,
    pub reason: String,
    /// Whether a close handshake took place
    pub was_clean: bool,
}

impl CloseInfo {
    /// A close frame received from the peer
    pub fn clean(code: u16, reason: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            reason: reason.into(),
            was_clean: true,
        }
    }

    /// The connection dropped or never opened
    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: Some(CLOSE_ABNORMAL),
            reason: reason.into(),
            was_clean: false,
        }
    }
}

impl fmt::Display for CloseInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code: {})", self.reason, code),
            None => write!(f, "{}", self.reason),
        }
    }
}

pub type OnOpenCallback = Arc<dyn Fn() + Send + Sync>;
pub type OnCloseCallback = Arc<dyn Fn(&CloseInfo) + Send + Sync>;
pub type OnErrorCallback = Arc<dyn Fn(&SyncError) + Send + Sync>;
pub type OnMessageCallback = Arc<dyn Fn(RealtimeEvent) + Send + Sync>;

/// Optional callbacks, registered builder style
#[derive(Clone, Default)]
pub struct EventHandlers {
    on_open: Option<OnOpenCallback>,
    on_close: Option<OnCloseCallback>,
    on_error: Option<OnErrorCallback>,
    on_message: Option<OnMessageCallback>,
}

impl fmt::Debug for EventHandlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandlers")
            .field("on_open", &self.on_open.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_message", &self.on_message.is_some())
            .finish()
    }
}

impl EventHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    pub fn on_close(mut self, f: impl Fn(&CloseInfo) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    pub fn on_error(mut self, f: impl Fn(&SyncError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn on_message(mut self, f: impl Fn(RealtimeEvent) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    pub(crate) fn emit_open(&self) {
        if let Some(cb) = &self.on_open {
            cb();
        }
    }

    pub(crate) fn emit_close(&self, info: &CloseInfo) {
        if let Some(cb) = &self.on_close {
            cb(info);
        }
    }

    pub(crate) fn emit_error(&self, error: &SyncError) {
        if let Some(cb) = &self.on_error {
            cb(error);
        }
    }

    pub(crate) fn emit_message(&self, event: RealtimeEvent) {
        if let Some(cb) = &self.on_message {
            cb(event);
        }
    }
}
