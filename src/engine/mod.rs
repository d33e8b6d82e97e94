//! Compilation engine and minifier boundaries.
//!
//! # Responsibilities
//! - Define the contract the bundle pipeline consumes: build a compiled-graph
//!   handle from an entry file or an exposed module, compile it on demand
//! - Declare the dependency file list as an output of the compile call
//! - Define the minifier contract
//!
//! # Design Decisions
//! - Dependency collection is a declared engine capability, requested per
//!   compile via [`BundleOptions::collect_dependencies`]. An engine that
//!   cannot report dependencies natively is expected to wrap itself behind
//!   these traits once, keeping any interception on its side of the boundary.
//! - Handles are `Arc<dyn BundleHandle>`: route handles live for the process,
//!   filesystem handles are retained for their watch cycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

/// A source transform applied by the engine to every module it compiles,
/// in registration order.
pub type Transform = Arc<dyn Fn(String) -> Result<String, EngineError> + Send + Sync>;

/// A module exposed by a route bundle.
///
/// Declared as an external dependency of every filesystem bundle so code
/// already servable from a route bundle is never emitted twice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternModule {
    pub name: String,
}

/// Per-compile options.
#[derive(Debug, Clone, Copy, Default)]
pub struct BundleOptions {
    /// Include source maps / debug info in the output.
    pub debug: bool,

    /// Report the dependency files consulted during the compile.
    pub collect_dependencies: bool,
}

/// The product of one compile pass.
#[derive(Debug, Clone)]
pub struct BundleOutput {
    /// Compiled bundle source text.
    pub source: String,

    /// Absolute paths of every file consulted, in visitation order.
    /// Empty unless [`BundleOptions::collect_dependencies`] was set.
    pub dependencies: Vec<PathBuf>,
}

/// Error surfaced by the compilation engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("module resolution failed: {0}")]
    Resolve(String),

    #[error("compilation failed: {0}")]
    Compile(String),

    #[error("transform failed: {0}")]
    Transform(String),
}

/// A compiled-graph handle: one entry point plus its transform pipeline and
/// external-dependency wiring. Compilation happens lazily in [`bundle`];
/// a handle may be compiled any number of times as its inputs change on disk.
///
/// [`bundle`]: BundleHandle::bundle
#[async_trait]
pub trait BundleHandle: Send + Sync {
    async fn bundle(&self, options: &BundleOptions) -> Result<BundleOutput, EngineError>;
}

/// Factory for bundle handles.
pub trait BundleEngine: Send + Sync {
    /// Bundle rooted at a filesystem entry file, embedding the module-loader
    /// runtime. `externals` lists the modules served by route bundles; the
    /// engine must reference them instead of re-embedding their code.
    fn entry_bundle(
        &self,
        entry_file: &Path,
        transforms: &[Transform],
        externals: &[ExternModule],
    ) -> Arc<dyn BundleHandle>;

    /// Bundle exposing a named module resolved against `base_dir`, without
    /// the module-loader runtime (consumers load it as an external).
    fn module_bundle(
        &self,
        module: &str,
        base_dir: &Path,
        transforms: &[Transform],
    ) -> Arc<dyn BundleHandle>;
}

/// Error surfaced by the minifier.
#[derive(Debug, Clone, thiserror::Error)]
#[error("minification failed: {0}")]
pub struct MinifyError(pub String);

/// Minifier boundary. Synchronous CPU work; not assumed cheap.
pub trait Minifier: Send + Sync {
    fn minify(&self, source: &str) -> Result<String, MinifyError>;
}
