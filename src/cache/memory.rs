//! In-memory query cache
//!
//! Reference [`QueryCache`] implementation. Entries hold JSON values written by
//! an external fetch engine; refetch requests are handed to that engine over an
//! unbounded channel. The most recent operations are kept in a bounded log so
//! callers can inspect what the dispatcher did.

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{CacheOp, QueryCache};
use crate::error::CacheError;
use crate::types::CacheKey;

/// A cached value and its freshness
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub value: Value,
    /// Set by invalidate/refetch, cleared when fresh data is stored
    pub stale: bool,
    pub updated_at: DateTime<Utc>,
    pub invalidated_at: Option<DateTime<Utc>>,
}

/// Operations kept by default
pub const DEFAULT_OP_LOG_CAPACITY: usize = 1024;

/// Thread-safe in-memory cache
pub struct InMemoryCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    ops: Mutex<VecDeque<CacheOp>>,
    op_log_capacity: usize,
    refetch_tx: Option<mpsc::UnboundedSender<CacheKey>>,
}

impl InMemoryCache {
    /// Create a cache with no fetch engine attached
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ops: Mutex::new(VecDeque::new()),
            op_log_capacity: DEFAULT_OP_LOG_CAPACITY,
            refetch_tx: None,
        }
    }

    /// Create a cache that forwards refetch requests to the returned receiver
    pub fn with_refetch_channel() -> (Self, mpsc::UnboundedReceiver<CacheKey>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let cache = Self {
            refetch_tx: Some(tx),
            ..Self::new()
        };
        (cache, rx)
    }

    /// Keep at most `capacity` recent operations; 0 disables the log
    pub fn with_op_log(mut self, capacity: usize) -> Self {
        self.op_log_capacity = capacity;
        self.ops.get_mut().truncate(capacity);
        self
    }

    /// Store fresh data for an exact key
    pub fn insert(&self, key: CacheKey, value: Value) {
        let entry = CacheEntry {
            value,
            stale: false,
            updated_at: Utc::now(),
            invalidated_at: None,
        };
        self.entries.lock().insert(key, entry);
    }

    /// Get a copy of the entry stored under an exact key
    pub fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.lock().get(key).cloned()
    }

    /// Staleness of an exact key, `None` if nothing is cached
    pub fn is_stale(&self, key: &CacheKey) -> Option<bool> {
        self.entries.lock().get(key).map(|entry| entry.stale)
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Most recent operations, oldest first
    pub fn ops(&self) -> Vec<CacheOp> {
        self.ops.lock().iter().cloned().collect()
    }

    /// Drain the operation log
    pub fn take_ops(&self) -> Vec<CacheOp> {
        self.ops.lock().drain(..).collect()
    }

    fn record(&self, op: CacheOp) {
        if self.op_log_capacity == 0 {
            return;
        }
        let mut ops = self.ops.lock();
        if ops.len() == self.op_log_capacity {
            ops.pop_front();
        }
        ops.push_back(op);
    }

    /// Mark all entries under `prefix` stale, returning how many matched
    fn mark_stale(&self, prefix: &CacheKey) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.lock();
        let mut matched = 0;
        for (key, entry) in entries.iter_mut() {
            if key.starts_with(prefix) {
                entry.stale = true;
                entry.invalidated_at = Some(now);
                matched += 1;
            }
        }
        matched
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryCache for InMemoryCache {
    fn invalidate(&self, prefix: &CacheKey) -> Result<(), CacheError> {
        self.record(CacheOp::Invalidate(prefix.clone()));
        let matched = self.mark_stale(prefix);
        tracing::trace!(key = %prefix, matched, "cache entries invalidated");
        Ok(())
    }

    fn refetch(&self, prefix: &CacheKey) -> Result<(), CacheError> {
        self.record(CacheOp::Refetch(prefix.clone()));
        self.mark_stale(prefix);
        if let Some(tx) = &self.refetch_tx {
            tx.send(prefix.clone()).map_err(|_| CacheError::Unavailable)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache_key;
    use serde_json::json;

    #[test]
    fn test_invalidate_marks_prefix_matches_stale() {
        let cache = InMemoryCache::new();
        cache.insert(cache_key!["project-features", "P1", "E1"], json!([]));
        cache.insert(cache_key!["project-features", "P1", "E2"], json!([]));
        cache.insert(cache_key!["project-features", "P2", "E1"], json!([]));

        cache.invalidate(&cache_key!["project-features", "P1"]).unwrap();

        assert_eq!(cache.is_stale(&cache_key!["project-features", "P1", "E1"]), Some(true));
        assert_eq!(cache.is_stale(&cache_key!["project-features", "P1", "E2"]), Some(true));
        assert_eq!(cache.is_stale(&cache_key!["project-features", "P2", "E1"]), Some(false));
        assert!(cache
            .get(&cache_key!["project-features", "P1", "E1"])
            .unwrap()
            .invalidated_at
            .is_some());
    }

    #[test]
    fn test_invalidate_without_matches_is_ok() {
        let cache = InMemoryCache::new();
        assert!(cache.invalidate(&cache_key!["timeline", "P9"]).is_ok());
        assert_eq!(cache.ops(), vec![CacheOp::Invalidate(cache_key!["timeline", "P9"])]);
    }

    #[test]
    fn test_insert_clears_staleness() {
        let cache = InMemoryCache::new();
        let key = cache_key!["dashboard", "P1", "E1"];
        cache.insert(key.clone(), json!({"flags": 3}));
        cache.invalidate(&key).unwrap();
        cache.insert(key.clone(), json!({"flags": 4}));

        let entry = cache.get(&key).unwrap();
        assert!(!entry.stale);
        assert_eq!(entry.value, json!({"flags": 4}));
    }

    #[tokio::test]
    async fn test_refetch_forwards_prefix_to_fetch_engine() {
        let (cache, mut rx) = InMemoryCache::with_refetch_channel();
        cache.refetch(&cache_key!["timeline", "P1", "E1"]).unwrap();

        assert_eq!(rx.recv().await.unwrap(), cache_key!["timeline", "P1", "E1"]);
    }

    #[test]
    fn test_refetch_without_engine_reports_unavailable() {
        let (cache, rx) = InMemoryCache::with_refetch_channel();
        drop(rx);
        assert_eq!(
            cache.refetch(&cache_key!["timeline", "P1"]),
            Err(CacheError::Unavailable)
        );
    }

    #[test]
    fn test_op_log_keeps_most_recent_entries() {
        let cache = InMemoryCache::new().with_op_log(3);
        for i in 0..100_000i64 {
            cache.invalidate(&cache_key!["project", i]).unwrap();
        }

        assert_eq!(
            cache.ops(),
            vec![
                CacheOp::Invalidate(cache_key!["project", 99_997i64]),
                CacheOp::Invalidate(cache_key!["project", 99_998i64]),
                CacheOp::Invalidate(cache_key!["project", 99_999i64]),
            ]
        );
    }

    #[test]
    fn test_default_op_log_is_bounded() {
        let cache = InMemoryCache::new();
        for _ in 0..DEFAULT_OP_LOG_CAPACITY + 10 {
            cache.invalidate(&cache_key!["timeline", "P1"]).unwrap();
        }
        assert_eq!(cache.ops().len(), DEFAULT_OP_LOG_CAPACITY);
    }

    #[test]
    fn test_disabled_op_log_still_marks_stale() {
        let cache = InMemoryCache::new().with_op_log(0);
        let key = cache_key!["dashboard", "P1", "E1"];
        cache.insert(key.clone(), json!({}));

        cache.invalidate(&key).unwrap();

        assert!(cache.ops().is_empty());
        assert_eq!(cache.is_stale(&key), Some(true));
    }

    #[test]
    fn test_take_ops_drains_log() {
        let cache = InMemoryCache::new();
        cache.invalidate(&cache_key!["project", "P1"]).unwrap();
        cache.refetch(&cache_key!["project", "P1"]).unwrap();

        assert_eq!(cache.take_ops().len(), 2);
        assert!(cache.ops().is_empty());
    }
}
