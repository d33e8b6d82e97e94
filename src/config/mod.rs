//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → BundlerConfig (validated, immutable)
//!     → consumed once by BundlePipeline construction
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; one pipeline instance per config
//! - All fields have defaults so a bare public root is a complete config
//! - Functional collaborators (engine, minifier, transforms, watch callback)
//!   are not part of the declarative config; they are supplied through the
//!   pipeline builder

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::BundlerConfig;
pub use validation::{validate_config, ValidationError};
