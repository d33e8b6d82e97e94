//! On-demand JavaScript bundle serving middleware.
//!
//! A request path is classified, resolved to a source module, compiled with
//! its dependency graph into a single bundle, optionally minified, cached and
//! served as `application/javascript`. Cached artifacts are invalidated by
//! watching the dependency files reported by the compile pass.
//!
//! The compilation engine and the minifier are consumed at trait boundaries
//! (see [`engine`]); this crate orchestrates them behind a caching and
//! invalidation policy, it does not implement them.

pub mod config;
pub mod engine;
pub mod http;
pub mod observability;
pub mod pipeline;

pub use config::{BundlerConfig, ConfigError};
pub use engine::{
    BundleEngine, BundleHandle, BundleOptions, BundleOutput, EngineError, ExternModule, Minifier,
    MinifyError, Transform,
};
pub use http::BundleLayer;
pub use pipeline::{BundlePipeline, PipelineError, WatchCallback};
