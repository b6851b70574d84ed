//! # gfmark_extensions
//!
//! GitHub Flavored Markdown extensions for gfmark.
//!
//! This crate provides:
//! - `table`: pipe tables with column alignment
//! - `strikethrough`: `~` and `~~` deletions
//! - `autolink`: bare `www.`, URL and email links
//! - `tagfilter`: neutralizing dangerous raw HTML tags
//! - `tasklist`: `[ ]` and `[x]` list items
//!
//! Extensions are created by name with free-form JSON options, the same
//! shape they take in an engine configuration file.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gfmark_extensions::register_core;
//! use gfmark_parser::{ExtensionRegistry, MarkdownParser, ParseOptions, Parser};
//! use std::sync::Arc;
//!
//! let mut registry = ExtensionRegistry::new();
//! register_core(&mut registry)?;
//! let parser = MarkdownParser::with_registry(ParseOptions::default(), Arc::new(registry));
//! let doc = parser.parse("~~gone~~ www.example.com")?;
//! ```

mod autolink;
mod strikethrough;
mod table;
mod tagfilter;
mod tasklist;

use std::sync::Arc;

use gfmark_parser::{Extension, ExtensionError, ExtensionRegistry};
use serde::de::DeserializeOwned;
use tracing::debug;

pub use autolink::{Autolink, AutolinkOptions};
pub use strikethrough::{Strikethrough, StrikethroughOptions};
pub use table::{Table, TableOptions};
pub use tagfilter::{Tagfilter, TagfilterOptions};
pub use tasklist::Tasklist;

/// Names of the extensions this crate provides, in registration order.
pub const CORE_EXTENSIONS: &[&str] = &[
    table::EXTENSION_NAME,
    strikethrough::EXTENSION_NAME,
    autolink::EXTENSION_NAME,
    tagfilter::EXTENSION_NAME,
    tasklist::EXTENSION_NAME,
];

/// Deserializes extension options. `null` means all defaults.
fn options<T: DeserializeOwned + Default>(
    name: &str,
    value: &serde_json::Value,
) -> Result<T, ExtensionError> {
    if value.is_null() {
        return Ok(T::default());
    }
    serde_json::from_value(value.clone())
        .map_err(|e| ExtensionError::invalid_options(name, e.to_string()))
}

/// Creates an extension by name.
///
/// # Errors
///
/// Returns [`ExtensionError::NotFound`] for unknown names and
/// [`ExtensionError::InvalidOptions`] when the options do not fit the
/// extension.
pub fn create(name: &str, value: &serde_json::Value) -> Result<Arc<dyn Extension>, ExtensionError> {
    let extension: Arc<dyn Extension> = match name {
        table::EXTENSION_NAME => Arc::new(Table::new(options(name, value)?)),
        strikethrough::EXTENSION_NAME => Arc::new(Strikethrough::new(options(name, value)?)),
        autolink::EXTENSION_NAME => Arc::new(Autolink::new(options(name, value)?)),
        tagfilter::EXTENSION_NAME => Arc::new(Tagfilter::new(options(name, value)?)),
        tasklist::EXTENSION_NAME => {
            if !value.is_null() && value.as_object().is_none_or(|o| !o.is_empty()) {
                return Err(ExtensionError::invalid_options(name, "takes no options"));
            }
            Arc::new(Tasklist)
        }
        _ => return Err(ExtensionError::not_found(name)),
    };
    debug!("Created extension '{}'", name);
    Ok(extension)
}

/// Registers every extension in [`CORE_EXTENSIONS`] with default options.
pub fn register_core(registry: &mut ExtensionRegistry) -> Result<(), ExtensionError> {
    for name in CORE_EXTENSIONS {
        registry.register(create(name, &serde_json::Value::Null)?)?;
    }
    Ok(())
}
