//! Counters for the realtime synchronization layer
//!
//! One [`SyncStats`] is shared by a session's connection manager and
//! dispatcher. Counters only ever increase; take a [`StatsSnapshot`] to read
//! them consistently enough for tests and status output.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters, safe to share across tasks
#[derive(Debug, Default)]
pub struct SyncStats {
    connects: AtomicU64,
    disconnects: AtomicU64,
    connect_failures: AtomicU64,
    reconnects_scheduled: AtomicU64,
    messages_received: AtomicU64,
    parse_errors: AtomicU64,
    events_dispatched: AtomicU64,
    invalidations: AtomicU64,
    refetches: AtomicU64,
    cache_failures: AtomicU64,
}

/// Point-in-time copy of [`SyncStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub connects: u64,
    pub disconnects: u64,
    pub connect_failures: u64,
    pub reconnects_scheduled: u64,
    pub messages_received: u64,
    pub parse_errors: u64,
    pub events_dispatched: u64,
    pub invalidations: u64,
    pub refetches: u64,
    pub cache_failures: u64,
}

impl SyncStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_connect(&self) {
        self.connects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_connect_failure(&self) {
        self.connect_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reconnect_scheduled(&self) {
        self.reconnects_scheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_parse_error(&self) {
        self.parse_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self) {
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalidation(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_refetch(&self) {
        self.refetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_failure(&self) {
        self.cache_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            connects: self.connects.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            reconnects_scheduled: self.reconnects_scheduled.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
            parse_errors: self.parse_errors.load(Ordering::Relaxed),
            events_dispatched: self.events_dispatched.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            refetches: self.refetches.load(Ordering::Relaxed),
            cache_failures: self.cache_failures.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_recorded_counts() {
        let stats = SyncStats::new();
        stats.record_connect();
        stats.record_message();
        stats.record_message();
        stats.record_parse_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.connects, 1);
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.parse_errors, 1);
        assert_eq!(snapshot.invalidations, 0);
    }

    #[test]
    fn test_snapshot_serializes_all_counters() {
        let json = serde_json::to_value(SyncStats::new().snapshot()).unwrap();
        assert_eq!(json["reconnects_scheduled"], 0);
        assert_eq!(json["cache_failures"], 0);
    }
}
