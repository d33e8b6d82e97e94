//! Dependency watching and cache invalidation.
//!
//! # State machine (per cached path)
//! ```text
//! Unwatched → Watching → (any file event) → Invalidating → Watching'
//!                                                        → Unwatched (regeneration failed)
//! ```
//!
//! # Design Decisions
//! - Subscription sets are edge-triggered and one-shot: the first event
//!   disarms the whole set; the set is rebuilt from the fresh dependency
//!   list once regeneration reports it. This naturally tracks dependency
//!   add/remove across edits.
//! - The cache entry is evicted synchronously in the event callback, so a
//!   stale artifact is never served while regeneration is in flight.
//! - Regeneration itself runs on the pipeline's invalidation task; the
//!   event callback only evicts and enqueues.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::observability::metrics;
use crate::pipeline::cache::ArtifactCache;

/// A request path whose cache entry was evicted and needs regeneration.
#[derive(Debug)]
pub(crate) struct Invalidation {
    pub path: String,
}

/// One live subscription set: a watch handle per dependency file plus a
/// one-shot armed flag. Dropping the set closes every handle.
struct WatchSet {
    armed: Arc<AtomicBool>,
    #[allow(dead_code)] // held for Drop, which closes the handles
    handles: Vec<RecommendedWatcher>,
}

/// Keeps at most one subscription set per cached path.
pub(crate) struct DependencyWatcher {
    cache: ArtifactCache,
    tx: mpsc::UnboundedSender<Invalidation>,
    sets: DashMap<String, WatchSet>,
}

impl DependencyWatcher {
    /// Create a watcher bound to the cache it evicts from.
    ///
    /// Returns the watcher and the receiver the pipeline's invalidation task
    /// consumes.
    pub fn new(cache: ArtifactCache) -> (Self, mpsc::UnboundedReceiver<Invalidation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                cache,
                tx,
                sets: DashMap::new(),
            },
            rx,
        )
    }

    /// Establish the subscription set for `req_path` over `dependencies`,
    /// replacing (and thereby closing) any prior set for the path.
    pub fn watch(&self, req_path: &str, dependencies: &[PathBuf]) {
        let armed = Arc::new(AtomicBool::new(true));
        let mut handles = Vec::with_capacity(dependencies.len());

        for file in dependencies {
            match self.watch_one(req_path, file, &armed) {
                Ok(handle) => handles.push(handle),
                Err(error) => {
                    // The artifact is already cached; losing invalidation
                    // coverage for one file beats failing the generation.
                    tracing::warn!(
                        path = req_path,
                        file = %file.display(),
                        %error,
                        "Failed to watch dependency"
                    );
                }
            }
        }

        tracing::debug!(path = req_path, files = handles.len(), "Watch set established");
        self.sets
            .insert(req_path.to_owned(), WatchSet { armed, handles });
    }

    fn watch_one(
        &self,
        req_path: &str,
        file: &Path,
        armed: &Arc<AtomicBool>,
    ) -> Result<RecommendedWatcher, notify::Error> {
        let armed = armed.clone();
        let tx = self.tx.clone();
        let cache = self.cache.clone();
        let key = req_path.to_owned();

        let mut handle = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let Ok(event) = res else { return };
                if !(event.kind.is_modify() || event.kind.is_create() || event.kind.is_remove()) {
                    return;
                }
                // First event wins the whole set. Evict here, synchronously
                // with the event, before regeneration is even queued.
                if armed.swap(false, Ordering::SeqCst) {
                    cache.evict(&key);
                    metrics::record_invalidation(&key);
                    let _ = tx.send(Invalidation { path: key.clone() });
                }
            },
            Config::default(),
        )?;
        handle.watch(file, RecursiveMode::NonRecursive)?;
        Ok(handle)
    }

    /// Tear down the subscription set for `req_path`, closing every handle
    /// including the one that fired.
    pub fn disarm(&self, req_path: &str) {
        if let Some((_, set)) = self.sets.remove(req_path) {
            set.armed.store(false, Ordering::SeqCst);
        }
    }

    /// Number of paths with a live subscription set.
    #[cfg(test)]
    pub fn watched_paths(&self) -> usize {
        self.sets.len()
    }
}
