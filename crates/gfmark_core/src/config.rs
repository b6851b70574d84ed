//! Engine configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use gfmark_extensions::CORE_EXTENSIONS;
use gfmark_parser::{ParseOptions, RenderOptions};
use jsonschema::Validator;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Result<Validator, String>> = OnceLock::new();

/// Configuration for an [`Engine`](crate::Engine).
///
/// ```jsonc
/// {
///   // comments are allowed
///   "parse": { "smart": true, "footnotes": true },
///   "render": { "unsafe": false },
///   "extensions": ["table", { "name": "tagfilter", "options": { "allow": ["style"] } }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub parse: ParseOptions,

    #[serde(default)]
    pub render: RenderOptions,

    /// Extensions to register, in registration order.
    #[serde(default)]
    pub extensions: Vec<ExtensionEntry>,

    /// Fail HTML rendering when an extension render callback fails instead
    /// of falling back to the default output.
    #[serde(default)]
    pub strict: bool,
}

/// An extension to enable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtensionEntry {
    /// String shorthand: the extension name with default options.
    Name(String),
    /// Name plus options object.
    Detail(ExtensionDetail),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionDetail {
    pub name: String,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub options: serde_json::Value,
}

impl ExtensionEntry {
    pub fn name(&self) -> &str {
        match self {
            ExtensionEntry::Name(name) => name,
            ExtensionEntry::Detail(detail) => &detail.name,
        }
    }

    /// Options for the extension factory; `null` for defaults.
    pub fn options(&self) -> &serde_json::Value {
        static NULL: serde_json::Value = serde_json::Value::Null;
        match self {
            ExtensionEntry::Name(_) => &NULL,
            ExtensionEntry::Detail(detail) => &detail.options,
        }
    }
}

impl From<&str> for ExtensionEntry {
    fn from(name: &str) -> Self {
        ExtensionEntry::Name(name.to_string())
    }
}

fn schema() -> Result<&'static Validator, ConfigError> {
    let compiled = CONFIG_SCHEMA.get_or_init(|| {
        let schema_json: serde_json::Value =
            serde_json::from_str(SCHEMA_JSON).map_err(|e| e.to_string())?;
        Validator::new(&schema_json).map_err(|e| e.to_string())
    });
    compiled
        .as_ref()
        .map_err(|e| ConfigError::Schema(e.clone()))
}

impl EngineConfig {
    /// Config file names looked up by [`EngineConfig::find`], in order.
    pub const CONFIG_FILES: &'static [&'static str] = &[".gfmark.jsonc", ".gfmark.json"];

    /// Creates a configuration with no extensions and default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration with every GFM extension enabled.
    pub fn gfm() -> Self {
        Self {
            extensions: CORE_EXTENSIONS.iter().map(|&name| name.into()).collect(),
            ..Self::default()
        }
    }

    /// Loads configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content)
    }

    /// Parses configuration from JSON or JSONC text with schema validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let value = jsonc_parser::parse_to_serde_value(json, &Default::default())
            .map_err(|e| ConfigError::syntax(e.to_string()))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        if let Err(e) = schema()?.validate(&value) {
            return Err(ConfigError::validation(format!(
                "{} at {}",
                e,
                e.instance_path()
            )));
        }

        serde_json::from_value(value).map_err(|e| ConfigError::invalid(e.to_string()))
    }

    /// Returns the first config file in `dir`, if any.
    pub fn find(dir: impl AsRef<Path>) -> Option<PathBuf> {
        let dir = dir.as_ref();
        Self::CONFIG_FILES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_config_new() {
        let config = EngineConfig::new();
        assert!(config.extensions.is_empty());
        assert!(!config.strict);
        assert_eq!(config.parse, ParseOptions::default());
    }

    #[test]
    fn test_config_gfm() {
        let config = EngineConfig::gfm();
        let names: Vec<&str> = config.extensions.iter().map(ExtensionEntry::name).collect();
        assert_eq!(names, CORE_EXTENSIONS);
    }

    #[test]
    fn test_config_from_jsonc() {
        let json = r#"{
            // smart punctuation everywhere
            "parse": { "smart": true, "maxNesting": 10 },
            "render": { "unsafe": true },
            "extensions": [
                "table",
                { "name": "tagfilter", "options": { "allow": ["style"] } },
                { "name": "tasklist" }
            ]
        }"#;

        let config = EngineConfig::from_json(json).unwrap();
        assert!(config.parse.smart);
        assert_eq!(config.parse.max_nesting, 10);
        assert!(config.render.unsafe_html);
        assert_eq!(config.extensions.len(), 3);
        assert_eq!(config.extensions[0], ExtensionEntry::Name("table".to_string()));
        assert_eq!(config.extensions[1].name(), "tagfilter");
        assert_eq!(config.extensions[1].options()["allow"][0], "style");
        assert!(config.extensions[2].options().is_null());
    }

    #[test]
    fn test_config_empty_document() {
        assert_eq!(EngineConfig::from_json("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_json("{}").unwrap(), EngineConfig::default());
    }

    #[rstest]
    #[case::unknown_property(r#"{ "extension": [] }"#, "Config validation failed")]
    #[case::type_mismatch(r#"{ "strict": "yes" }"#, "Config validation failed")]
    #[case::unknown_parse_option(r#"{ "parse": { "smrt": true } }"#, "Config validation failed")]
    #[case::entry_without_name(r#"{ "extensions": [{ "options": {} }] }"#, "Config validation failed")]
    #[case::syntax(r#"{ "strict": "#, "Invalid JSON")]
    fn test_config_errors(#[case] json: &str, #[case] expected: &str) {
        let err = EngineConfig::from_json(json).unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "Error message '{}' should contain '{}'",
            err,
            expected
        );
    }

    #[test]
    fn test_config_from_file_and_find() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(EngineConfig::find(dir.path()), None);

        let path = dir.path().join(".gfmark.json");
        fs::write(&path, r#"{ "extensions": ["strikethrough"] }"#).unwrap();
        assert_eq!(EngineConfig::find(dir.path()), Some(path.clone()));

        let jsonc = dir.path().join(".gfmark.jsonc");
        fs::write(&jsonc, "{ /* preferred */ \"strict\": true }").unwrap();
        assert_eq!(EngineConfig::find(dir.path()), Some(jsonc.clone()));

        assert_eq!(EngineConfig::from_file(&path).unwrap().extensions.len(), 1);
        assert!(EngineConfig::from_file(&jsonc).unwrap().strict);
    }

    #[test]
    fn test_config_from_missing_file() {
        let err = EngineConfig::from_file("/nonexistent/.gfmark.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = EngineConfig::gfm();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
