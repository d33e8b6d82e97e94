//! Compiled-artifact cache.
//!
//! Request path → compiled source text. Populated lazily on successful
//! generation. No TTL, no size bound, no LRU: the watcher is the sole
//! invalidation path, and with watching disabled entries are deliberately
//! permanent for the process lifetime.

use std::sync::Arc;

use dashmap::DashMap;

use crate::observability::metrics;

/// A thread-safe mapping from request path to compiled text.
///
/// Cloning shares the same underlying map.
#[derive(Clone, Default)]
pub struct ArtifactCache {
    inner: Arc<DashMap<String, Arc<str>>>,
}

impl ArtifactCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached text for a request path.
    pub fn get(&self, path: &str) -> Option<Arc<str>> {
        self.inner.get(path).map(|entry| entry.value().clone())
    }

    /// Store compiled text under a request path, replacing any prior entry.
    pub fn set(&self, path: &str, text: Arc<str>) {
        self.inner.insert(path.to_owned(), text);
        metrics::record_cache_size(self.inner.len());
    }

    /// Remove the entry for a request path. Returns whether one was present.
    pub fn evict(&self, path: &str) -> bool {
        let removed = self.inner.remove(path).is_some();
        if removed {
            metrics::record_cache_size(self.inner.len());
        }
        removed
    }

    /// Number of cached artifacts.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the cache holds no artifacts.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
