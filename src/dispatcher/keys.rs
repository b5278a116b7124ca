//! Cache key families touched by realtime events

use crate::cache_key;
use crate::types::CacheKey;

pub const PROJECT: &str = "project";
pub const PROJECT_FEATURES: &str = "project-features";
pub const FEATURE_DETAILS: &str = "feature-details";
pub const FEATURE_NAMES: &str = "feature-names";
pub const TIMELINE: &str = "timeline";
pub const DASHBOARD: &str = "dashboard";
pub const PENDING_CHANGES: &str = "pending-changes";
pub const PENDING_CHANGES_COUNT: &str = "pending-changes-count";

/// Scope segment of the pending-changes badge count
pub const PENDING_SCOPE: &str = "pending";

pub fn project(project_id: &str) -> CacheKey {
    cache_key![PROJECT, project_id]
}

pub fn project_features(project_id: &str, environment: &str) -> CacheKey {
    cache_key![PROJECT_FEATURES, project_id, environment]
}

/// Feature lists of a project in every environment
pub fn project_features_all(project_id: &str) -> CacheKey {
    cache_key![PROJECT_FEATURES, project_id]
}

pub fn feature_details(feature_id: &str, environment: &str) -> CacheKey {
    cache_key![FEATURE_DETAILS, feature_id, environment]
}

/// Every feature detail entry; detail keys carry no project segment
pub fn feature_details_all() -> CacheKey {
    CacheKey::family(FEATURE_DETAILS)
}

pub fn feature_names(project_id: &str, environment: &str) -> CacheKey {
    cache_key![FEATURE_NAMES, project_id, environment]
}

pub fn feature_names_all(project_id: &str) -> CacheKey {
    cache_key![FEATURE_NAMES, project_id]
}

pub fn timeline(project_id: &str, environment: &str) -> CacheKey {
    cache_key![TIMELINE, project_id, environment]
}

pub fn dashboard(project_id: &str, environment: &str) -> CacheKey {
    cache_key![DASHBOARD, project_id, environment]
}

pub fn pending_changes(project_id: &str, environment: &str) -> CacheKey {
    cache_key![PENDING_CHANGES, project_id, environment]
}

pub fn pending_changes_all(project_id: &str) -> CacheKey {
    cache_key![PENDING_CHANGES, project_id]
}

pub fn pending_count(project_id: &str) -> CacheKey {
    cache_key![PENDING_CHANGES_COUNT, project_id, PENDING_SCOPE]
}
