//! HTTP integration subsystem.
//!
//! # Data Flow
//! ```text
//! incoming request
//!     → layer.rs (BundleService: pipeline decides applicability)
//!     → applicable: respond with compiled text, application/javascript
//!     → not applicable: call the inner service unchanged
//!     → generation failure: 500 text response, logged
//! ```

pub mod layer;

pub use layer::{BundleLayer, BundleService};
