//! Shared test fixtures: an in-memory bundle engine, a stub minifier and a
//! small axum app mounting the middleware.

// Each test binary uses a different subset of these fixtures.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use axum::Router;
use bundle_serve::{
    BundleEngine, BundleHandle, BundleLayer, BundleOptions, BundleOutput, BundlePipeline,
    EngineError, ExternModule, Minifier, MinifyError, Transform,
};

/// Engine that resolves named modules from an in-memory map and entry files
/// from disk, inlining one level of `//= require <relative path>` directives.
/// A require naming an external emits a reference marker instead of the code.
pub struct StubEngine {
    modules: HashMap<String, String>,
    /// Total compile passes across all handles.
    pub compiles: Arc<AtomicUsize>,
    /// When set, every compile fails.
    pub fail: Arc<AtomicBool>,
    /// Artificial per-compile delay in milliseconds.
    pub delay_ms: Arc<AtomicU64>,
}

impl StubEngine {
    pub fn new() -> Arc<Self> {
        Self::with_modules(&[])
    }

    pub fn with_modules(modules: &[(&str, &str)]) -> Arc<Self> {
        Arc::new(Self {
            modules: modules
                .iter()
                .map(|(name, source)| (name.to_string(), source.to_string()))
                .collect(),
            compiles: Arc::new(AtomicUsize::new(0)),
            fail: Arc::new(AtomicBool::new(false)),
            delay_ms: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn compile_count(&self) -> usize {
        self.compiles.load(Ordering::SeqCst)
    }
}

impl BundleEngine for StubEngine {
    fn entry_bundle(
        &self,
        entry_file: &Path,
        transforms: &[Transform],
        externals: &[ExternModule],
    ) -> Arc<dyn BundleHandle> {
        Arc::new(EntryHandle {
            entry: entry_file.to_path_buf(),
            externals: externals.to_vec(),
            transforms: transforms.to_vec(),
            engine: self.clone_state(),
        })
    }

    fn module_bundle(
        &self,
        module: &str,
        _base_dir: &Path,
        transforms: &[Transform],
    ) -> Arc<dyn BundleHandle> {
        Arc::new(ModuleHandle {
            name: module.to_string(),
            source: self.modules.get(module).cloned(),
            transforms: transforms.to_vec(),
            engine: self.clone_state(),
        })
    }
}

/// Shared mutable engine state cloned into every handle.
#[derive(Clone)]
struct EngineState {
    compiles: Arc<AtomicUsize>,
    fail: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
}

impl StubEngine {
    fn clone_state(&self) -> EngineState {
        EngineState {
            compiles: self.compiles.clone(),
            fail: self.fail.clone(),
            delay_ms: self.delay_ms.clone(),
        }
    }
}

impl EngineState {
    async fn pass_begins(&self) -> Result<(), EngineError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }
        self.compiles.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(EngineError::Compile("injected failure".into()));
        }
        Ok(())
    }
}

struct ModuleHandle {
    name: String,
    source: Option<String>,
    transforms: Vec<Transform>,
    engine: EngineState,
}

#[async_trait]
impl BundleHandle for ModuleHandle {
    async fn bundle(&self, options: &BundleOptions) -> Result<BundleOutput, EngineError> {
        self.engine.pass_begins().await?;

        let body = self
            .source
            .clone()
            .ok_or_else(|| EngineError::Resolve(format!("unknown module `{}`", self.name)))?;
        let mut source = format!("// module: {}\n{}", self.name, body);
        for transform in &self.transforms {
            source = transform.as_ref()(source)?;
        }
        if options.debug {
            source.push_str("\n//# debug");
        }

        Ok(BundleOutput {
            source,
            dependencies: Vec::new(),
        })
    }
}

struct EntryHandle {
    entry: PathBuf,
    externals: Vec<ExternModule>,
    transforms: Vec<Transform>,
    engine: EngineState,
}

#[async_trait]
impl BundleHandle for EntryHandle {
    async fn bundle(&self, options: &BundleOptions) -> Result<BundleOutput, EngineError> {
        self.engine.pass_begins().await?;

        let mut dependencies = vec![self.entry.clone()];
        let text = read_source(&self.entry).await?;

        let mut source = String::new();
        for line in text.lines() {
            let Some(target) = line.strip_prefix("//= require ") else {
                source.push_str(line);
                source.push('\n');
                continue;
            };
            let target = target.trim();
            if self.externals.iter().any(|ext| ext.name == target) {
                source.push_str(&format!("/* extern: {} */\n", target));
                continue;
            }
            // One level of inlining is enough for these tests.
            let dep = self
                .entry
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(target);
            source.push_str(&read_source(&dep).await?);
            source.push('\n');
            dependencies.push(dep);
        }

        for transform in &self.transforms {
            source = transform.as_ref()(source)?;
        }
        if options.debug {
            source.push_str("\n//# debug");
        }
        if !options.collect_dependencies {
            dependencies.clear();
        }

        Ok(BundleOutput {
            source,
            dependencies,
        })
    }
}

async fn read_source(path: &Path) -> Result<String, EngineError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| EngineError::Resolve(format!("{}: {}", path.display(), e)))
}

/// Minifier that collapses whitespace and tightens assignments, so minified
/// output is observably different from the literal source.
pub struct StubMinifier {
    pub fail: Arc<AtomicBool>,
}

impl StubMinifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: Arc::new(AtomicBool::new(false)),
        })
    }
}

impl Minifier for StubMinifier {
    fn minify(&self, source: &str) -> Result<String, MinifyError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MinifyError("injected failure".into()));
        }
        Ok(source
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace(" = ", "="))
    }
}

/// Wrap a pipeline in an axum app whose fallback marks forwarded requests.
pub fn app(pipeline: BundlePipeline) -> Router {
    Router::new()
        .fallback(|| async { (StatusCode::NOT_FOUND, "fallback") })
        .layer(BundleLayer::new(pipeline))
}

/// Issue a GET and collect (status, content-type, body).
pub async fn get(router: &Router, path: &str) -> (StatusCode, Option<String>, String) {
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    let response = router
        .clone()
        .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .map(|v| v.to_str().unwrap().to_string());
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, content_type, String::from_utf8(body.to_vec()).unwrap())
}
