//! Request-path classification.
//!
//! # Responsibilities
//! - Decide handling for a request path before any I/O or compile work
//! - Reject extensionless and non-JavaScript paths
//! - Resolve candidate paths under the public root and reject traversal
//!
//! # Design Decisions
//! - Classification is pure: no filesystem access, no cache mutation
//!   (existence checks and cache lookups belong to the pipeline)
//! - Normalization is lexical, so traversal is rejected before any I/O
//!   touches the target
//! - Traversal is rejected silently; the request just falls through to the
//!   inner service

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

/// Handling decision for one servable request path. `None` from
/// [`Classifier::classify`] means the request belongs to the inner service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Matches a configured route id.
    Route(String),

    /// Candidate file under the public root. Existence not yet checked.
    LocalFile(PathBuf),
}

/// Classifies request paths against the route table and the public root.
pub struct Classifier {
    public_root: PathBuf,
    route_ids: HashSet<String>,
}

impl Classifier {
    pub fn new(public_root: &Path, route_ids: impl IntoIterator<Item = String>) -> Self {
        Self {
            public_root: normalize(public_root),
            route_ids: route_ids.into_iter().collect(),
        }
    }

    /// Decide handling for a request path.
    pub fn classify(&self, req_path: &str) -> Option<Classification> {
        // Extensionless paths are directories or non-asset URLs.
        Path::new(req_path).extension()?;

        let mime = mime_guess::from_path(req_path).first()?;
        if !is_javascript(&mime) {
            return None;
        }

        if self.route_ids.contains(req_path) {
            return Some(Classification::Route(req_path.to_owned()));
        }

        let joined = self.public_root.join(req_path.trim_start_matches('/'));
        let resolved = normalize(&joined);
        if !resolved.starts_with(&self.public_root) {
            return None;
        }

        Some(Classification::LocalFile(resolved))
    }
}

/// Both registrations of JavaScript are accepted; the mime db has moved
/// between them across revisions.
fn is_javascript(mime: &mime_guess::Mime) -> bool {
    let essence = mime.essence_str();
    essence == "application/javascript" || essence == "text/javascript"
}

/// Lexical path normalization: resolves `.` and `..` components without
/// touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}
