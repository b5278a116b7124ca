//! Hierarchical cache keys with prefix matching

use std::fmt;

use serde::{Deserialize, Serialize};

/// One segment of a cache key
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KeySegment {
    /// Numeric identifier
    Id(i64),
    /// Name or opaque string identifier
    Text(String),
}

impl fmt::Display for KeySegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySegment::Id(id) => write!(f, "{}", id),
            KeySegment::Text(text) => write!(f, "{:?}", text),
        }
    }
}

impl From<&str> for KeySegment {
    fn from(value: &str) -> Self {
        KeySegment::Text(value.to_string())
    }
}

impl From<String> for KeySegment {
    fn from(value: String) -> Self {
        KeySegment::Text(value)
    }
}

impl From<&String> for KeySegment {
    fn from(value: &String) -> Self {
        KeySegment::Text(value.clone())
    }
}

impl From<i64> for KeySegment {
    fn from(value: i64) -> Self {
        KeySegment::Id(value)
    }
}

/// An ordered key identifying cached data.
///
/// Keys are compared by prefix: an operation on `["project-features", "P1"]`
/// applies to `["project-features", "P1", "E1"]` and every other key that
/// starts with the same segments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(Vec<KeySegment>);

impl CacheKey {
    /// Create a key from segments
    pub fn new(segments: Vec<KeySegment>) -> Self {
        Self(segments)
    }

    /// Create a key whose first segment is the query family name
    pub fn family(name: &str) -> Self {
        Self(vec![KeySegment::from(name)])
    }

    /// Append a segment (builder style)
    pub fn with(mut self, segment: impl Into<KeySegment>) -> Self {
        self.0.push(segment.into());
        self
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `self` begins with every segment of `prefix`
    ///
    /// The empty key is a prefix of every key.
    pub fn starts_with(&self, prefix: &CacheKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", segment)?;
        }
        write!(f, "]")
    }
}

/// Build a [`CacheKey`] from a list of segments
///
/// ```
/// use realtime_sync::cache_key;
///
/// let key = cache_key!["feature-details", "F1", "E1"];
/// assert_eq!(key.len(), 3);
/// ```
#[macro_export]
macro_rules! cache_key {
    ($($segment:expr),* $(,)?) => {
        $crate::types::CacheKey::new(vec![$($crate::types::KeySegment::from($segment)),*])
    };
}
