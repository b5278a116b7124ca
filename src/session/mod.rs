//! Realtime session
//!
//! Wires one [`ConnectionManager`] to one [`EventDispatcher`] and exposes a
//! coarse status for the embedding application. Sessions are explicit values:
//! create one per project/environment, start it, stop it when done.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::cache::QueryCache;
use crate::config::SyncConfig;
use crate::connection::manager::redact_token;
use crate::connection::{ConnectionManager, ConnectionState, EventHandlers, Transport};
use crate::dispatcher::EventDispatcher;
use crate::stats::SyncStats;

/// Status surface shown to users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Connected,
    #[default]
    Disconnected,
    Error,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Connected => write!(f, "connected"),
            SessionStatus::Disconnected => write!(f, "disconnected"),
            SessionStatus::Error => write!(f, "error"),
        }
    }
}

type StatusCallback = Arc<dyn Fn(SessionStatus) + Send + Sync>;

/// Publishes status changes to the watch channel and the optional callback
#[derive(Clone)]
struct StatusPublisher {
    tx: Arc<watch::Sender<SessionStatus>>,
    callback: Option<StatusCallback>,
}

impl StatusPublisher {
    fn publish(&self, status: SessionStatus) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            info!(status = %status, "realtime status changed");
            if let Some(callback) = &self.callback {
                callback(status);
            }
        }
    }
}

/// Builder for [`RealtimeSession`]
pub struct SessionBuilder {
    config: SyncConfig,
    cache: Option<Arc<dyn QueryCache>>,
    transport: Option<Arc<dyn Transport>>,
    on_status: Option<StatusCallback>,
}

impl SessionBuilder {
    /// Cache the dispatcher writes to
    pub fn cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Replace the WebSocket transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Called on every status change
    pub fn on_status(mut self, f: impl Fn(SessionStatus) + Send + Sync + 'static) -> Self {
        self.on_status = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> RealtimeSession {
        let stats = Arc::new(SyncStats::new());
        let dispatcher = Arc::new(EventDispatcher::with_stats(self.cache, stats.clone()));
        let (tx, status_rx) = watch::channel(SessionStatus::Disconnected);
        let publisher = StatusPublisher {
            tx: Arc::new(tx),
            callback: self.on_status,
        };

        let handlers = {
            let on_open = publisher.clone();
            let on_close = publisher.clone();
            let on_error = publisher.clone();
            let sink = dispatcher.clone();
            EventHandlers::new()
                .on_open(move || on_open.publish(SessionStatus::Connected))
                .on_close(move |_| on_close.publish(SessionStatus::Disconnected))
                .on_error(move |_| on_error.publish(SessionStatus::Error))
                .on_message(move |event| {
                    sink.handle_event(&event);
                })
        };

        let mut builder = ConnectionManager::builder(&self.config)
            .handlers(handlers)
            .stats(stats.clone());
        if let Some(transport) = self.transport {
            builder = builder.transport(transport);
        }

        RealtimeSession {
            manager: builder.build(),
            dispatcher,
            publisher,
            status_rx,
            stats,
        }
    }
}

/// A running link between the realtime endpoint and a query cache
pub struct RealtimeSession {
    manager: ConnectionManager,
    dispatcher: Arc<EventDispatcher>,
    publisher: StatusPublisher,
    status_rx: watch::Receiver<SessionStatus>,
    stats: Arc<SyncStats>,
}

impl RealtimeSession {
    pub fn builder(config: SyncConfig) -> SessionBuilder {
        SessionBuilder {
            config,
            cache: None,
            transport: None,
            on_status: None,
        }
    }

    /// Session over the WebSocket transport with an optional cache
    pub fn new(config: SyncConfig, cache: Option<Arc<dyn QueryCache>>) -> Self {
        let mut builder = Self::builder(config);
        if let Some(cache) = cache {
            builder = builder.cache(cache);
        }
        builder.build()
    }

    /// Begin connecting; must be called within a tokio runtime
    pub fn start(&self) {
        info!(url = %redact_token(self.manager.url()), "starting realtime session");
        self.manager.start();
    }

    /// Close the connection and stop reconnecting
    pub fn stop(&self) {
        self.manager.stop();
        self.publisher.publish(SessionStatus::Disconnected);
    }

    /// Stop and wait for the connection task to exit
    pub async fn shutdown(&self) {
        self.manager.shutdown().await;
        self.publisher.publish(SessionStatus::Disconnected);
    }

    /// Install or replace the cache handle
    pub fn set_cache(&self, cache: Arc<dyn QueryCache>) {
        self.dispatcher.set_cache(cache);
    }

    pub fn status(&self) -> SessionStatus {
        *self.status_rx.borrow()
    }

    /// Receiver notified on every status change
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.status_rx.clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn url(&self) -> &str {
        self.manager.url()
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }
}

impl fmt::Debug for RealtimeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeSession")
            .field("status", &self.status())
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheOp, InMemoryCache};
    use crate::cache_key;
    use crate::connection::{Frame, FrameStream};
    use crate::error::{Result, SyncError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Opens once with the given frames and then stays silent
    struct OneShotTransport {
        frames: Mutex<Option<Vec<Frame>>>,
    }

    struct SilentStream {
        frames: VecDeque<Frame>,
    }

    #[async_trait]
    impl Transport for OneShotTransport {
        async fn connect(&self, _url: &str) -> Result<Box<dyn FrameStream>> {
            match self.frames.lock().take() {
                Some(frames) => Ok(Box::new(SilentStream {
                    frames: frames.into(),
                })),
                None => Err(SyncError::Transport("connection refused".to_string())),
            }
        }
    }

    #[async_trait]
    impl FrameStream for SilentStream {
        async fn next_frame(&mut self) -> Option<Result<Frame>> {
            if let Some(frame) = self.frames.pop_front() {
                return Some(Ok(frame));
            }
            std::future::pending::<()>().await;
            None
        }

        async fn close(&mut self) {}
    }

    fn transport(frames: Option<Vec<Frame>>) -> Arc<OneShotTransport> {
        Arc::new(OneShotTransport {
            frames: Mutex::new(frames),
        })
    }

    const PENDING_EVENT: &str = r#"{"type":"change_requested","entity":"pending_change","entity_id":"C1","project_id":"P1","environment":"E1"}"#;

    #[test]
    fn test_status_display_and_serde() {
        assert_eq!(SessionStatus::Connected.to_string(), "connected");
        assert_eq!(serde_json::to_string(&SessionStatus::Error).unwrap(), "\"error\"");
        assert_eq!(SessionStatus::default(), SessionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_events_reach_injected_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let session = RealtimeSession::builder(SyncConfig::new("P1", 1))
            .cache(cache.clone())
            .transport(transport(Some(vec![Frame::Text(PENDING_EVENT.to_string())])))
            .build();

        session.start();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(session.status(), SessionStatus::Connected);
        assert_eq!(
            cache.ops().last(),
            Some(&CacheOp::Refetch(cache_key!["pending-changes-count", "P1", "pending"]))
        );
        assert_eq!(session.stats().snapshot().events_dispatched, 1);
        session.shutdown().await;
        assert_eq!(session.status(), SessionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_status_callback_sees_error_then_disconnect() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let session = RealtimeSession::builder(SyncConfig::new("P1", 1))
            .transport(transport(None))
            .on_status(move |status| sink.lock().push(status))
            .build();
        let mut rx = session.subscribe();

        session.start();
        rx.changed().await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(
            *seen.lock(),
            vec![SessionStatus::Error, SessionStatus::Disconnected]
        );
        assert_eq!(session.state(), ConnectionState::Reconnecting);
        session.stop();
        assert_eq!(session.state(), ConnectionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_installed_after_start() {
        let session = RealtimeSession::builder(SyncConfig::new("P1", 1))
            .transport(transport(Some(vec![])))
            .build();
        session.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!session.dispatcher().has_cache());

        let cache = Arc::new(InMemoryCache::new());
        session.set_cache(cache.clone());
        assert!(session.dispatcher().has_cache());
        session.shutdown().await;
    }
}
