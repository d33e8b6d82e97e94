//! Bundle generation.
//!
//! One generation pass is a linear async pipeline:
//! ```text
//! compile (engine, dependencies declared in the output)
//!     → minify (when compression is on; failure fails the pass)
//!     → cache store
//!     → watch attach (when watching is on)
//! ```
//! Nothing is cached and no watch is established when any stage fails.
//!
//! Concurrent generations for the same path are deduplicated: the first
//! caller becomes the leader and runs the pass, late arrivals subscribe to a
//! per-path broadcast and receive the leader's result.

use std::sync::Arc;
use std::time::Instant;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::engine::{BundleHandle, BundleOptions, EngineError, Minifier, MinifyError};
use crate::observability::metrics;
use crate::pipeline::cache::ArtifactCache;
use crate::pipeline::watcher::DependencyWatcher;

/// Failure of one generation pass.
///
/// `Clone` so a single failure can fan out to every deduplicated caller.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Minify(#[from] MinifyError),
}

type GenerationResult = Result<Arc<str>, PipelineError>;

pub(crate) struct Generator {
    cache: ArtifactCache,
    watcher: Arc<DependencyWatcher>,
    minifier: Option<Arc<dyn Minifier>>,
    pending: DashMap<String, broadcast::Sender<GenerationResult>>,
    compress: bool,
    debug: bool,
    watch: bool,
}

impl Generator {
    pub fn new(
        cache: ArtifactCache,
        watcher: Arc<DependencyWatcher>,
        minifier: Option<Arc<dyn Minifier>>,
        compress: bool,
        debug: bool,
        watch: bool,
    ) -> Self {
        Self {
            cache,
            watcher,
            minifier,
            pending: DashMap::new(),
            compress,
            debug,
            watch,
        }
    }

    /// Run one generation pass for `req_path`, deduplicating concurrent
    /// callers per path.
    pub async fn generate(
        &self,
        handle: &Arc<dyn BundleHandle>,
        req_path: &str,
    ) -> GenerationResult {
        loop {
            let subscription = match self.pending.entry(req_path.to_owned()) {
                Entry::Occupied(entry) => Some(entry.get().subscribe()),
                Entry::Vacant(entry) => {
                    let (tx, _) = broadcast::channel(1);
                    entry.insert(tx);
                    None
                }
            };

            let Some(mut rx) = subscription else { break };
            match rx.recv().await {
                Ok(result) => return result,
                // The leader went away without settling; take over.
                Err(_) => continue,
            }
        }

        // If the leader future is dropped mid-pass (the client disconnected
        // and the response future was cancelled), the guard removes the
        // pending marker. Dropping the marker closes the channel, so a
        // waiting subscriber observes the closure and takes over as the
        // next leader.
        let guard = PendingGuard {
            pending: &self.pending,
            path: req_path,
            armed: true,
        };
        let result = self.generate_inner(handle, req_path).await;
        guard.settle(&result);
        result
    }

    async fn generate_inner(
        &self,
        handle: &Arc<dyn BundleHandle>,
        req_path: &str,
    ) -> GenerationResult {
        let started = Instant::now();
        let options = BundleOptions {
            debug: self.debug,
            collect_dependencies: self.watch,
        };

        let output = match handle.bundle(&options).await {
            Ok(output) => output,
            Err(error) => {
                metrics::record_generation("compile_error", started);
                tracing::warn!(path = req_path, %error, "Bundle compilation failed");
                return Err(error.into());
            }
        };

        let source = match (self.compress, &self.minifier) {
            (true, Some(minifier)) => match minifier.minify(&output.source) {
                Ok(minified) => minified,
                Err(error) => {
                    metrics::record_generation("minify_error", started);
                    tracing::warn!(path = req_path, %error, "Minification failed");
                    return Err(error.into());
                }
            },
            _ => output.source,
        };

        let text: Arc<str> = source.into();
        self.cache.set(req_path, text.clone());
        if self.watch {
            self.watcher.watch(req_path, &output.dependencies);
        }

        metrics::record_generation("success", started);
        tracing::debug!(
            path = req_path,
            bytes = text.len(),
            dependencies = output.dependencies.len(),
            "Bundle generated"
        );
        Ok(text)
    }
}

/// Removes the leader's pending marker when the leader unwinds or is
/// cancelled before settling.
struct PendingGuard<'a> {
    pending: &'a DashMap<String, broadcast::Sender<GenerationResult>>,
    path: &'a str,
    armed: bool,
}

impl PendingGuard<'_> {
    /// Remove the pending marker and fan the result out to subscribers.
    ///
    /// Removal happens before the broadcast: a caller arriving in between
    /// simply becomes the next leader.
    fn settle(mut self, result: &GenerationResult) {
        self.armed = false;
        if let Some((_, tx)) = self.pending.remove(self.path) {
            let _ = tx.send(result.clone());
        }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pending.remove(self.path);
        }
    }
}
