//! Reconnecting connection manager
//!
//! Owns one connection to the realtime endpoint. A background task connects,
//! decodes text frames into [`RealtimeEvent`]s for `on_message`, and after any
//! close that was not requested through [`ConnectionManager::stop`] schedules
//! the next attempt using [`BackoffPolicy`]. There is no retry limit.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backoff::BackoffPolicy;
use super::endpoint::connection_url;
use super::handlers::{CloseInfo, EventHandlers, CLOSE_NORMAL};
use super::state::ConnectionState;
use super::transport::{Frame, FrameStream, Transport, WsTransport};
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::stats::SyncStats;
use crate::types::RealtimeEvent;

/// State shared between the public handle and the background task
struct Shared {
    url: String,
    transport: Arc<dyn Transport>,
    handlers: EventHandlers,
    backoff: Mutex<BackoffPolicy>,
    state: Mutex<ConnectionState>,
    stopped: AtomicBool,
    /// Incremented by every `start`; a task only finalizes state for its own run
    run_id: AtomicU64,
    connect_timeout: Duration,
    stats: Arc<SyncStats>,
}

struct RunHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// How a live connection ended
enum ReadOutcome {
    Closed,
    Shutdown,
}

/// Builder for [`ConnectionManager`]
pub struct ConnectionManagerBuilder {
    url: String,
    connect_timeout: Duration,
    backoff: BackoffPolicy,
    handlers: EventHandlers,
    transport: Arc<dyn Transport>,
    stats: Arc<SyncStats>,
}

impl ConnectionManagerBuilder {
    pub fn handlers(mut self, handlers: EventHandlers) -> Self {
        self.handlers = handlers;
        self
    }

    /// Replace the WebSocket transport
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = transport;
        self
    }

    /// Share counters with other components
    pub fn stats(mut self, stats: Arc<SyncStats>) -> Self {
        self.stats = stats;
        self
    }

    pub fn build(self) -> ConnectionManager {
        ConnectionManager {
            shared: Arc::new(Shared {
                url: self.url,
                transport: self.transport,
                handlers: self.handlers,
                backoff: Mutex::new(self.backoff),
                state: Mutex::new(ConnectionState::Idle),
                stopped: AtomicBool::new(false),
                run_id: AtomicU64::new(0),
                connect_timeout: self.connect_timeout,
                stats: self.stats,
            }),
            run: Mutex::new(None),
        }
    }
}

/// One persistent, self-healing connection
pub struct ConnectionManager {
    shared: Arc<Shared>,
    run: Mutex<Option<RunHandle>>,
}

impl ConnectionManager {
    /// Start building a manager for the URL resolved from `config`
    pub fn builder(config: &SyncConfig) -> ConnectionManagerBuilder {
        ConnectionManagerBuilder {
            url: connection_url(config),
            connect_timeout: Duration::from_millis(config.connect_timeout_ms),
            backoff: BackoffPolicy::new(config.backoff),
            handlers: EventHandlers::default(),
            transport: Arc::new(WsTransport),
            stats: Arc::new(SyncStats::new()),
        }
    }

    /// Manager with the WebSocket transport and the given callbacks
    pub fn new(config: &SyncConfig, handlers: EventHandlers) -> Self {
        Self::builder(config).handlers(handlers).build()
    }

    /// Resolved connection URL, including query parameters
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Whether a background task is currently driving the connection
    pub fn is_running(&self) -> bool {
        self.run
            .lock()
            .as_ref()
            .map_or(false, |run| !run.task.is_finished() && !*run.shutdown.borrow())
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.shared.stats
    }

    /// Begin connecting and clear the stopped flag.
    ///
    /// Calling `start` on a running manager does nothing. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) {
        let mut run = self.run.lock();
        if let Some(previous) = run.take() {
            if !previous.task.is_finished() && !*previous.shutdown.borrow() {
                *run = Some(previous);
                return;
            }
            // A stopped run may still be closing its socket
            previous.task.abort();
        }

        self.shared.stopped.store(false, Ordering::SeqCst);
        let run_id = self.shared.run_id.fetch_add(1, Ordering::SeqCst) + 1;
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = self.shared.clone();
        let task = tokio::spawn(async move {
            shared.run(run_id, shutdown_rx).await;
        });

        debug!(url = %redact_token(&self.shared.url), "connection manager started");
        *run = Some(RunHandle {
            shutdown: shutdown_tx,
            task,
        });
    }

    /// Close any live connection and suppress every future reconnect.
    ///
    /// Idempotent. A reconnect that is already scheduled becomes a no-op.
    pub fn stop(&self) {
        if self.shared.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(run) = self.run.lock().as_ref() {
            let _ = run.shutdown.send(true);
        }
        *self.shared.state.lock() = ConnectionState::Stopped;
        info!("connection manager stopped");
    }

    /// Stop and wait for the background task to finish closing
    pub async fn shutdown(&self) {
        self.stop();
        let run = self.run.lock().take();
        if let Some(run) = run {
            let _ = run.task.await;
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(run) = self.run.get_mut().take() {
            let _ = run.shutdown.send(true);
        }
    }
}

/// Resolves once shutdown was requested or the handle was dropped
async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stopped| *stopped).await;
}

/// Hide the bearer token when logging URLs
pub(crate) fn redact_token(url: &str) -> String {
    match url.find("&token=") {
        Some(pos) => format!("{}&token=***", &url[..pos]),
        None => url.to_string(),
    }
}

impl Shared {
    fn set_state(&self, shutdown: &watch::Receiver<bool>, state: ConnectionState) {
        if *shutdown.borrow() {
            return;
        }
        *self.state.lock() = state;
    }

    async fn run(&self, run_id: u64, mut shutdown: watch::Receiver<bool>) {
        loop {
            if *shutdown.borrow() {
                break;
            }

            self.set_state(&shutdown, ConnectionState::Connecting);
            debug!(url = %redact_token(&self.url), "connecting");

            let attempt = tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                result = self.connect() => result,
            };

            match attempt {
                Ok(stream) => {
                    if let ReadOutcome::Shutdown = self.read_until_closed(stream, &mut shutdown).await {
                        break;
                    }
                }
                Err(err) => {
                    // A failed attempt is handled like a close
                    self.stats.record_connect_failure();
                    warn!(error = %err, "connection attempt failed");
                    self.set_state(&shutdown, ConnectionState::Errored);
                    self.handlers.emit_error(&err);
                    self.handlers.emit_close(&CloseInfo::abnormal(err.to_string()));
                    if let SyncError::Config(_) = err {
                        // Retrying cannot fix a build or config problem
                        tracing::error!(error = %err, "giving up on realtime connection");
                        break;
                    }
                }
            }

            if *shutdown.borrow() {
                break;
            }

            let delay = self.backoff.lock().delay();
            self.stats.record_reconnect_scheduled();
            self.set_state(&shutdown, ConnectionState::Reconnecting);
            info!(delay_ms = delay.as_millis() as u64, "reconnect scheduled");

            tokio::select! {
                biased;
                _ = wait_for_shutdown(&mut shutdown) => break,
                _ = tokio::time::sleep(delay) => {}
            }

            if *shutdown.borrow() {
                break;
            }
            self.backoff.lock().advance();
        }

        if self.run_id.load(Ordering::SeqCst) == run_id {
            *self.state.lock() = ConnectionState::Stopped;
        }
        debug!("connection task exited");
    }

    async fn connect(&self) -> Result<Box<dyn FrameStream>> {
        match tokio::time::timeout(self.connect_timeout, self.transport.connect(&self.url)).await {
            Ok(result) => result,
            Err(_) => Err(SyncError::Timeout(self.connect_timeout.as_millis() as u64)),
        }
    }

    async fn read_until_closed(
        &self,
        mut stream: Box<dyn FrameStream>,
        shutdown: &mut watch::Receiver<bool>,
    ) -> ReadOutcome {
        self.backoff.lock().reset();
        self.stats.record_connect();
        self.set_state(shutdown, ConnectionState::Open);
        info!("realtime connection open");
        self.handlers.emit_open();

        loop {
            let next = tokio::select! {
                biased;
                _ = wait_for_shutdown(shutdown) => None,
                frame = stream.next_frame() => Some(frame),
            };

            let Some(frame) = next else {
                stream.close().await;
                self.stats.record_disconnect();
                self.handlers.emit_close(&CloseInfo::clean(CLOSE_NORMAL, "stopped"));
                return ReadOutcome::Shutdown;
            };

            match frame {
                Some(Ok(Frame::Text(text))) => self.handle_text(&text),
                Some(Ok(Frame::Ignored)) => {}
                Some(Ok(Frame::Close(info))) => {
                    info!(close = %info, "realtime connection closed by server");
                    self.closed(shutdown, ConnectionState::Closed, &info);
                    return ReadOutcome::Closed;
                }
                Some(Err(err)) => {
                    warn!(error = %err, "realtime connection failed");
                    self.handlers.emit_error(&err);
                    let info = CloseInfo::abnormal(err.to_string());
                    self.closed(shutdown, ConnectionState::Errored, &info);
                    return ReadOutcome::Closed;
                }
                None => {
                    info!("realtime connection lost");
                    let info = CloseInfo::abnormal("connection lost");
                    self.closed(shutdown, ConnectionState::Closed, &info);
                    return ReadOutcome::Closed;
                }
            }
        }
    }

    fn closed(&self, shutdown: &watch::Receiver<bool>, state: ConnectionState, info: &CloseInfo) {
        self.stats.record_disconnect();
        self.set_state(shutdown, state);
        self.handlers.emit_close(info);
    }

    /// Decode one text frame; malformed frames are dropped
    fn handle_text(&self, text: &str) {
        self.stats.record_message();
        match RealtimeEvent::from_json(text) {
            Ok(event) => {
                debug!(
                    event_type = %event.event_type,
                    entity = %event.entity,
                    project_id = %event.project_id,
                    "event received"
                );
                self.handlers.emit_message(event);
            }
            Err(err) => {
                self.stats.record_parse_error();
                let err = SyncError::from(err);
                warn!(error = %err, bytes = text.len(), "dropping malformed frame");
            }
        }
    }
}
