//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Declarative configuration for one bundle-serving middleware mount.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct BundlerConfig {
    /// Root directory for filesystem-served modules.
    pub src: PathBuf,

    /// Named routes: external request path → module name exposed as its own
    /// bundle, shared (not duplicated) across filesystem bundles.
    pub routes: BTreeMap<String, String>,

    /// Run compiled output through the minifier.
    pub compress: bool,

    /// Treat the cache as permanent: disables watch-based invalidation.
    pub cache: bool,

    /// Include source-map / debug info in compiled output.
    pub debug: bool,
}

impl BundlerConfig {
    /// A bare public root is a complete configuration.
    pub fn from_src(src: impl Into<PathBuf>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }

    /// Watch-based invalidation is on unless the cache is marked permanent.
    pub fn watch_enabled(&self) -> bool {
        !self.cache
    }
}
