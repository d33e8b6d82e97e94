//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::BundlerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error raised while loading or accepting a configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", joined(.0))]
    Validation(Vec<ValidationError>),

    #[error("no bundle engine configured")]
    MissingEngine,

    #[error("compress enabled but no minifier configured")]
    CompressWithoutMinifier,
}

fn joined(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate a configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<BundlerConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: BundlerConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_toml_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
src = "/pub"
compress = true

[routes]
"/vendor.js" = "jquery"
"#
        )
        .unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.src, std::path::PathBuf::from("/pub"));
        assert!(config.compress);
        assert_eq!(config.routes["/vendor.js"], "jquery");
    }

    #[test]
    fn rejects_invalid_routes() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
src = "/pub"

[routes]
"vendor" = "jquery"
"#
        )
        .unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }
}
