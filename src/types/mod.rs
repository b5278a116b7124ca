//! Data types for the realtime synchronization layer
//!
//! This module contains the wire event and the cache key model shared by the
//! connection manager, the dispatcher and cache implementations.

mod cache_key;
mod event;

pub use cache_key::{CacheKey, KeySegment};
pub use event::{RealtimeEvent, FEATURE_ENTITY, FEATURE_EVENT_PREFIX, PENDING_CHANGE_ENTITY};
