//! Event classification and invalidation rules
//!
//! Pure functions: an event goes in, an ordered list of cache operations comes
//! out. Nothing here touches a cache.

use std::fmt;

use super::keys;
use crate::cache::CacheOp;
use crate::types::{CacheKey, RealtimeEvent, PENDING_CHANGE_ENTITY};

/// How an event is routed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    /// `feature_update`, `feature_updated` or an unrecognized `feature_` type on a feature
    FeatureUpdated,
    /// `feature_pending` on a feature
    FeaturePending,
    /// `feature_deleted` on a feature
    FeatureDeleted,
    /// `feature_` type on another entity; the affected feature is not named
    FeatureRelated,
    /// Non-feature event on a pending change
    PendingChange,
    /// Anything else
    Other,
}

impl EventClass {
    pub fn is_feature_domain(self) -> bool {
        matches!(
            self,
            EventClass::FeatureUpdated
                | EventClass::FeaturePending
                | EventClass::FeatureDeleted
                | EventClass::FeatureRelated
        )
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventClass::FeatureUpdated => "feature_updated",
            EventClass::FeaturePending => "feature_pending",
            EventClass::FeatureDeleted => "feature_deleted",
            EventClass::FeatureRelated => "feature_related",
            EventClass::PendingChange => "pending_change",
            EventClass::Other => "other",
        };
        write!(f, "{}", name)
    }
}

/// Classify an event by its type prefix, then by entity
pub fn classify(event: &RealtimeEvent) -> EventClass {
    if event.is_feature_domain() {
        if !event.targets_feature() {
            return EventClass::FeatureRelated;
        }
        return match event.event_type.as_str() {
            "feature_pending" => EventClass::FeaturePending,
            "feature_deleted" => EventClass::FeatureDeleted,
            // feature_update, feature_updated and unknown types
            _ => EventClass::FeatureUpdated,
        };
    }

    if event.entity == PENDING_CHANGE_ENTITY {
        EventClass::PendingChange
    } else {
        EventClass::Other
    }
}

/// Ordered cache operations for one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    ops: Vec<CacheOp>,
}

impl InvalidationPlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidate(&mut self, key: CacheKey) -> &mut Self {
        self.ops.push(CacheOp::Invalidate(key));
        self
    }

    /// Mark stale, then force the reload
    pub fn invalidate_and_refetch(&mut self, key: CacheKey) -> &mut Self {
        self.ops.push(CacheOp::Invalidate(key.clone()));
        self.ops.push(CacheOp::Refetch(key));
        self
    }

    pub fn ops(&self) -> &[CacheOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether the plan invalidates exactly this prefix
    pub fn invalidates(&self, key: &CacheKey) -> bool {
        self.ops.contains(&CacheOp::Invalidate(key.clone()))
    }

    /// Whether the plan refetches exactly this prefix
    pub fn refetches(&self, key: &CacheKey) -> bool {
        self.ops.contains(&CacheOp::Refetch(key.clone()))
    }
}

/// Build the operations an event requires
pub fn plan_for(event: &RealtimeEvent) -> InvalidationPlan {
    let class = classify(event);
    let project = event.project_id.as_str();
    let env = event.environment.as_str();
    let mut plan = InvalidationPlan::new();

    match class {
        EventClass::FeatureUpdated | EventClass::FeaturePending => {
            plan.invalidate_and_refetch(keys::project_features(project, env))
                .invalidate_and_refetch(keys::feature_details(&event.entity_id, env));
        }
        EventClass::FeatureDeleted => {
            // The deleted detail is only marked stale, never reloaded
            plan.invalidate_and_refetch(keys::project_features(project, env))
                .invalidate(keys::feature_details(&event.entity_id, env))
                .invalidate(keys::feature_names(project, env));
        }
        EventClass::FeatureRelated => {
            plan.invalidate_and_refetch(keys::project_features_all(project))
                .invalidate_and_refetch(keys::feature_details_all())
                .invalidate_and_refetch(keys::feature_names_all(project));
        }
        EventClass::PendingChange => {
            plan.invalidate(keys::pending_changes(project, env))
                .invalidate(keys::pending_changes_all(project))
                .invalidate_and_refetch(keys::pending_count(project));
        }
        EventClass::Other => {
            plan.invalidate(keys::project(project))
                .invalidate(keys::project_features_all(project))
                .invalidate(keys::pending_changes(project, env))
                .invalidate(keys::pending_changes_all(project))
                .invalidate_and_refetch(keys::pending_count(project));
        }
    }

    if class.is_feature_domain() {
        plan.invalidate_and_refetch(keys::timeline(project, env))
            .invalidate_and_refetch(keys::dashboard(project, env))
            .invalidate_and_refetch(keys::pending_changes(project, env))
            .invalidate_and_refetch(keys::pending_count(project));
    }

    plan
}
