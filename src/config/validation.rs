//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check route ids are absolute virtual paths with a file extension,
//!   since the classifier never reaches an extensionless path
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Pure function: BundlerConfig → Result<(), Vec<ValidationError>>
//! - Runs before a pipeline accepts the config

use std::path::Path;

use crate::config::schema::BundlerConfig;

/// A single semantic problem found in a [`BundlerConfig`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ValidationError {
    #[error("src directory must not be empty")]
    EmptySrc,

    #[error("route id `{0}` must start with '/'")]
    RouteIdNotAbsolute(String),

    #[error("route id `{0}` must carry a file extension")]
    RouteIdWithoutExtension(String),

    #[error("route `{0}` maps to an empty module name")]
    EmptyModuleName(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &BundlerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.src.as_os_str().is_empty() {
        errors.push(ValidationError::EmptySrc);
    }

    for (route_id, module) in &config.routes {
        if !route_id.starts_with('/') {
            errors.push(ValidationError::RouteIdNotAbsolute(route_id.clone()));
        }
        if Path::new(route_id).extension().is_none() {
            errors.push(ValidationError::RouteIdWithoutExtension(route_id.clone()));
        }
        if module.is_empty() {
            errors.push(ValidationError::EmptyModuleName(route_id.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
