//! Cache collaborator interface
//!
//! The dispatcher never fetches data itself. It only tells a [`QueryCache`]
//! which key prefixes are stale and which must be reloaded right away; the
//! cache and its fetch engine do the rest.

mod memory;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CacheError;
use crate::types::CacheKey;

pub use memory::{CacheEntry, InMemoryCache, DEFAULT_OP_LOG_CAPACITY};

/// Client-side query cache keyed by hierarchical [`CacheKey`]s.
///
/// Both operations match by prefix and must be safe to call speculatively,
/// including for prefixes that match nothing. Implementations handle their
/// own locking.
pub trait QueryCache: Send + Sync {
    /// Mark every entry under `prefix` stale; reload happens on next read
    fn invalidate(&self, prefix: &CacheKey) -> Result<(), CacheError>;

    /// Force an immediate reload of every entry under `prefix`
    fn refetch(&self, prefix: &CacheKey) -> Result<(), CacheError>;
}

/// A single operation issued against the cache
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "op", content = "key", rename_all = "snake_case")]
pub enum CacheOp {
    Invalidate(CacheKey),
    Refetch(CacheKey),
}

impl CacheOp {
    pub fn key(&self) -> &CacheKey {
        match self {
            CacheOp::Invalidate(key) | CacheOp::Refetch(key) => key,
        }
    }

    /// Apply this operation to a cache
    pub fn apply(&self, cache: &dyn QueryCache) -> Result<(), CacheError> {
        match self {
            CacheOp::Invalidate(key) => cache.invalidate(key),
            CacheOp::Refetch(key) => cache.refetch(key),
        }
    }
}

impl fmt::Display for CacheOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheOp::Invalidate(key) => write!(f, "invalidate {}", key),
            CacheOp::Refetch(key) => write!(f, "refetch {}", key),
        }
    }
}
