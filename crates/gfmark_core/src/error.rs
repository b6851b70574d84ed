//! Engine error types.

use std::path::PathBuf;

use gfmark_parser::{ExtensionError, ParseError};
use gfmark_render::RenderError;
use thiserror::Error;

/// Errors from loading an engine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Not valid JSON or JSONC.
    #[error("Invalid JSON: {0}")]
    Syntax(String),

    /// Rejected by the configuration schema.
    #[error("Config validation failed: {0}")]
    Validation(String),

    /// Valid against the schema but not deserializable.
    #[error("Invalid config: {0}")]
    Invalid(String),

    /// The embedded schema itself failed to compile.
    #[error("Invalid embedded config schema: {0}")]
    Schema(String),
}

impl ConfigError {
    pub fn syntax(message: impl Into<String>) -> Self {
        Self::Syntax(message.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Errors from the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Extension(#[from] ExtensionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Render(#[from] RenderError),

    /// Tree serialization failed.
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        assert_eq!(
            ConfigError::validation("\"x\" is not a boolean at /strict").to_string(),
            "Config validation failed: \"x\" is not a boolean at /strict"
        );
        let io = ConfigError::Io {
            path: PathBuf::from("a.json"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(io.to_string(), "Failed to read config a.json: missing");
    }

    #[test]
    fn test_engine_error_is_transparent() {
        let err = EngineError::from(ExtensionError::not_found("emoji"));
        assert_eq!(err.to_string(), "Extension not found: emoji");
    }
}
