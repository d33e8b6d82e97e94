//! The request-to-bundle pipeline.
//!
//! # Data Flow
//! ```text
//! request path
//!     → classify.rs (extension, mime, route table, public-root containment)
//!     → cache.rs (hit → serve)
//!     → generator.rs (compile → minify → cache store → watch attach)
//!     → watcher.rs (edge-triggered invalidation → regeneration)
//! ```
//!
//! # Design Decisions
//! - All mutable state (cache, pending generations, watch sets, retained
//!   handles) is owned by one pipeline instance, one per middleware mount;
//!   nothing is process-global
//! - Route bundle handles are built once at construction and reused for the
//!   process lifetime; filesystem handles are built per first request and
//!   retained for their watch cycle
//! - No cancellation: a started generation runs to completion or failure

pub mod cache;
pub mod classify;
pub mod generator;
pub(crate) mod watcher;

pub use cache::ArtifactCache;
pub use classify::{Classification, Classifier};
pub use generator::PipelineError;

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::config::{validate_config, BundlerConfig, ConfigError};
use crate::engine::{BundleEngine, BundleHandle, ExternModule, Minifier, Transform};
use crate::observability::metrics;
use generator::Generator;
use watcher::{DependencyWatcher, Invalidation};

/// Observer invoked after each watch-triggered regeneration settles.
pub type WatchCallback = Arc<dyn Fn(Option<&PipelineError>, &str) + Send + Sync>;

/// One middleware mount: owns the artifact cache, the watch state and the
/// route table. Cloning shares the same instance.
#[derive(Clone)]
pub struct BundlePipeline {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for BundlePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundlePipeline").finish_non_exhaustive()
    }
}

struct Inner {
    classifier: Classifier,
    cache: ArtifactCache,
    generator: Generator,
    watcher: Arc<DependencyWatcher>,
    engine: Arc<dyn BundleEngine>,
    transforms: Vec<Transform>,
    externals: Vec<ExternModule>,
    routes: HashMap<String, Arc<dyn BundleHandle>>,
    /// Last handle used per path, retained so watch-triggered regeneration
    /// reuses the same compiled-graph definition.
    handles: DashMap<String, Arc<dyn BundleHandle>>,
    watch_callback: Option<WatchCallback>,
}

/// Builder wiring the declarative config to its functional collaborators.
pub struct BundlePipelineBuilder {
    config: BundlerConfig,
    engine: Option<Arc<dyn BundleEngine>>,
    minifier: Option<Arc<dyn Minifier>>,
    transforms: Vec<Transform>,
    watch_callback: Option<WatchCallback>,
}

impl BundlePipelineBuilder {
    pub fn engine(mut self, engine: Arc<dyn BundleEngine>) -> Self {
        self.engine = Some(engine);
        self
    }

    pub fn minifier(mut self, minifier: Arc<dyn Minifier>) -> Self {
        self.minifier = Some(minifier);
        self
    }

    /// Register a source transform, applied by the engine to every bundle in
    /// registration order.
    pub fn transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }

    pub fn watch_callback(mut self, callback: WatchCallback) -> Self {
        self.watch_callback = Some(callback);
        self
    }

    /// Validate the configuration and assemble the pipeline.
    ///
    /// Must be called within a Tokio runtime when watching is enabled, since
    /// the invalidation task is spawned here.
    pub fn build(self) -> Result<BundlePipeline, ConfigError> {
        validate_config(&self.config).map_err(ConfigError::Validation)?;
        let engine = self.engine.ok_or(ConfigError::MissingEngine)?;
        if self.config.compress && self.minifier.is_none() {
            return Err(ConfigError::CompressWithoutMinifier);
        }

        let config = self.config;
        let watch = config.watch_enabled();

        // Route handles are built once and never rebuilt structurally; only
        // their compiled output is cached and invalidated.
        let mut routes = HashMap::new();
        let mut externals = Vec::new();
        for (route_id, module) in &config.routes {
            let handle = engine.module_bundle(module, &config.src, &self.transforms);
            externals.push(ExternModule {
                name: module.clone(),
            });
            routes.insert(route_id.clone(), handle);
        }

        let cache = ArtifactCache::new();
        let (watcher, invalidations) = DependencyWatcher::new(cache.clone());
        let watcher = Arc::new(watcher);
        let generator = Generator::new(
            cache.clone(),
            watcher.clone(),
            self.minifier,
            config.compress,
            config.debug,
            watch,
        );

        let inner = Arc::new(Inner {
            classifier: Classifier::new(&config.src, routes.keys().cloned()),
            cache,
            generator,
            watcher,
            engine,
            transforms: self.transforms,
            externals,
            routes,
            handles: DashMap::new(),
            watch_callback: self.watch_callback,
        });

        if watch {
            // Weak: the task must not keep the pipeline alive once every
            // mount has dropped it.
            tokio::spawn(run_invalidations(Arc::downgrade(&inner), invalidations));
        }

        Ok(BundlePipeline { inner })
    }
}

impl BundlePipeline {
    pub fn builder(config: BundlerConfig) -> BundlePipelineBuilder {
        BundlePipelineBuilder {
            config,
            engine: None,
            minifier: None,
            transforms: Vec::new(),
            watch_callback: None,
        }
    }

    /// Assemble a pipeline with no minifier, transforms or watch callback.
    pub fn new(
        config: BundlerConfig,
        engine: Arc<dyn BundleEngine>,
    ) -> Result<Self, ConfigError> {
        Self::builder(config).engine(engine).build()
    }

    /// Decide and perform handling for one request path.
    ///
    /// `Ok(None)` means the path is not applicable and the caller should
    /// forward the request unchanged. `Ok(Some(text))` is the compiled
    /// artifact. `Err` is a generation failure.
    pub async fn handle(&self, req_path: &str) -> Result<Option<Arc<str>>, PipelineError> {
        let inner = &self.inner;

        let Some(classification) = inner.classifier.classify(req_path) else {
            return Ok(None);
        };

        if let Some(text) = inner.cache.get(req_path) {
            metrics::record_cache_hit(req_path);
            return Ok(Some(text));
        }
        metrics::record_cache_miss(req_path);

        let handle = match classification {
            Classification::Route(route_id) => match inner.routes.get(&route_id) {
                Some(handle) => handle.clone(),
                None => return Ok(None),
            },
            Classification::LocalFile(file) => {
                if !tokio::fs::try_exists(&file).await.unwrap_or(false) {
                    return Ok(None);
                }
                inner
                    .engine
                    .entry_bundle(&file, &inner.transforms, &inner.externals)
            }
        };

        // Retain the handle before generating so a watch event arriving
        // right after the compile can already find it.
        inner.handles.insert(req_path.to_owned(), handle.clone());
        let text = inner.generator.generate(&handle, req_path).await?;
        Ok(Some(text))
    }

    /// The artifact cache owned by this pipeline.
    pub fn cache(&self) -> &ArtifactCache {
        &self.inner.cache
    }
}

/// Consumes watch invalidations: the cache entry was already evicted in the
/// watch event callback; here the spent subscription set is torn down, the
/// bundle regenerated and the outcome reported.
async fn run_invalidations(
    inner: Weak<Inner>,
    mut invalidations: mpsc::UnboundedReceiver<Invalidation>,
) {
    while let Some(Invalidation { path }) = invalidations.recv().await {
        let Some(inner) = inner.upgrade() else { break };

        inner.watcher.disarm(&path);

        let Some(handle) = inner.handles.get(&path).map(|entry| entry.value().clone()) else {
            tracing::warn!(path = %path, "No bundle handle retained for invalidated path");
            continue;
        };

        tracing::info!(path = %path, "Dependency changed, regenerating bundle");
        let result = inner.generator.generate(&handle, &path).await;
        if let Err(ref error) = result {
            // The cache stays evicted; the next request retries from scratch.
            tracing::warn!(path = %path, %error, "Watch-triggered regeneration failed");
        }
        if let Some(callback) = inner.watch_callback.as_deref() {
            callback(result.as_ref().err(), &path);
        }
    }
}
