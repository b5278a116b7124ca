//! Event dispatcher
//!
//! Maps each realtime event to cache invalidations and refetches:
//! - Feature events refresh the feature list and the feature detail
//! - Feature-domain events on other entities refresh broad prefixes
//! - Pending-change events refresh the pending list and badge count
//! - Every feature-domain event also refreshes timeline, dashboard and pending data
//!
//! Without a cache handle the dispatcher issues nothing. A failing cache
//! operation is logged and the remaining operations still run.

pub mod keys;
pub mod rules;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheOp, QueryCache};
use crate::stats::SyncStats;
use crate::types::RealtimeEvent;

pub use rules::{classify, plan_for, EventClass, InvalidationPlan};

/// Applies invalidation plans to a query cache
pub struct EventDispatcher {
    cache: RwLock<Option<Arc<dyn QueryCache>>>,
    stats: Arc<SyncStats>,
}

impl EventDispatcher {
    pub fn new(cache: Option<Arc<dyn QueryCache>>) -> Self {
        Self::with_stats(cache, Arc::new(SyncStats::new()))
    }

    /// Create a dispatcher recording into shared counters
    pub fn with_stats(cache: Option<Arc<dyn QueryCache>>, stats: Arc<SyncStats>) -> Self {
        Self {
            cache: RwLock::new(cache),
            stats,
        }
    }

    /// Install the cache handle, replacing any previous one
    pub fn set_cache(&self, cache: Arc<dyn QueryCache>) {
        *self.cache.write() = Some(cache);
    }

    pub fn clear_cache(&self) {
        *self.cache.write() = None;
    }

    pub fn has_cache(&self) -> bool {
        self.cache.read().is_some()
    }

    pub fn stats(&self) -> &Arc<SyncStats> {
        &self.stats
    }

    /// Issue every operation the event requires.
    ///
    /// Returns the number of operations issued, including ones the cache
    /// rejected. Returns 0 when no cache is installed.
    pub fn handle_event(&self, event: &RealtimeEvent) -> usize {
        // Clone the handle so cache callbacks never run under the lock
        let cache = self.cache.read().clone();
        let Some(cache) = cache else {
            debug!(event_type = %event.event_type, "No cache installed, event ignored");
            return 0;
        };

        let class = classify(event);
        let plan = plan_for(event);
        debug!(
            event_type = %event.event_type,
            entity = %event.entity,
            class = %class,
            ops = plan.len(),
            "Dispatching realtime event"
        );

        let issued = apply_plan(cache.as_ref(), &plan, Some(&self.stats));
        self.stats.record_dispatch();
        issued
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("has_cache", &self.has_cache())
            .finish()
    }
}

/// Stateless entry point: dispatch one event against an optional cache
pub fn handle_event(cache: Option<&dyn QueryCache>, event: &RealtimeEvent) -> usize {
    match cache {
        Some(cache) => apply_plan(cache, &plan_for(event), None),
        None => 0,
    }
}

fn apply_plan(cache: &dyn QueryCache, plan: &InvalidationPlan, stats: Option<&SyncStats>) -> usize {
    for op in plan.ops() {
        if let Some(stats) = stats {
            match op {
                CacheOp::Invalidate(_) => stats.record_invalidation(),
                CacheOp::Refetch(_) => stats.record_refetch(),
            }
        }
        if let Err(e) = op.apply(cache) {
            warn!(op = %op, error = %e, "Cache operation failed");
            if let Some(stats) = stats {
                stats.record_cache_failure();
            }
        }
    }
    plan.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::InMemoryCache;
    use crate::cache_key;
    use crate::error::CacheError;
    use crate::types::CacheKey;
    use parking_lot::Mutex;
    use serde_json::json;

    /// Rejects refetches, records everything it sees
    #[derive(Default)]
    struct FlakyCache {
        seen: Mutex<Vec<CacheOp>>,
    }

    impl QueryCache for FlakyCache {
        fn invalidate(&self, key: &CacheKey) -> Result<(), CacheError> {
            self.seen.lock().push(CacheOp::Invalidate(key.clone()));
            Ok(())
        }

        fn refetch(&self, key: &CacheKey) -> Result<(), CacheError> {
            self.seen.lock().push(CacheOp::Refetch(key.clone()));
            Err(CacheError::Operation("network down".to_string()))
        }
    }

    fn feature_event(event_type: &str, feature_id: &str) -> RealtimeEvent {
        RealtimeEvent {
            event_type: event_type.to_string(),
            entity: "feature".to_string(),
            entity_id: feature_id.to_string(),
            project_id: "P1".to_string(),
            environment: "E1".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_no_cache_issues_nothing() {
        let dispatcher = EventDispatcher::new(None);
        assert_eq!(dispatcher.handle_event(&feature_event("feature_updated", "F1")), 0);
        assert_eq!(dispatcher.stats().snapshot().events_dispatched, 0);
        assert_eq!(handle_event(None, &feature_event("feature_updated", "F1")), 0);
    }

    #[test]
    fn test_set_cache_after_construction() {
        let dispatcher = EventDispatcher::new(None);
        let cache = Arc::new(InMemoryCache::new());
        dispatcher.set_cache(cache.clone());

        let issued = dispatcher.handle_event(&feature_event("feature_updated", "F1"));

        assert_eq!(issued, 12);
        assert_eq!(cache.ops().len(), 12);
        assert!(dispatcher.has_cache());
    }

    #[test]
    fn test_marks_cached_entries_stale() {
        let cache = Arc::new(InMemoryCache::new());
        cache.insert(cache_key!["feature-details", "F1", "E1"], json!({"name": "dark-mode"}));
        cache.insert(cache_key!["feature-details", "F9", "E1"], json!({"name": "other"}));
        let dispatcher = EventDispatcher::new(Some(cache.clone() as Arc<dyn QueryCache>));

        dispatcher.handle_event(&feature_event("feature_updated", "F1"));

        assert_eq!(cache.is_stale(&cache_key!["feature-details", "F1", "E1"]), Some(true));
        assert_eq!(cache.is_stale(&cache_key!["feature-details", "F9", "E1"]), Some(false));
    }

    #[test]
    fn test_failures_do_not_stop_remaining_ops() {
        let cache = Arc::new(FlakyCache::default());
        let dispatcher = EventDispatcher::new(Some(cache.clone() as Arc<dyn QueryCache>));

        let issued = dispatcher.handle_event(&feature_event("feature_updated", "F1"));

        assert_eq!(issued, 12);
        assert_eq!(cache.seen.lock().len(), 12);
        let stats = dispatcher.stats().snapshot();
        assert_eq!(stats.invalidations, 6);
        assert_eq!(stats.refetches, 6);
        assert_eq!(stats.cache_failures, 6);
        assert_eq!(stats.events_dispatched, 1);
    }

    #[test]
    fn test_clear_cache() {
        let cache = Arc::new(InMemoryCache::new());
        let dispatcher = EventDispatcher::new(Some(cache.clone() as Arc<dyn QueryCache>));
        dispatcher.clear_cache();

        assert_eq!(dispatcher.handle_event(&feature_event("feature_deleted", "F1")), 0);
        assert!(cache.ops().is_empty());
    }
}
