//! # gfmark_core
//!
//! Markdown engine for gfmark.
//!
//! This crate provides:
//! - [`EngineConfig`], loaded from `.gfmark.jsonc` / `.gfmark.json` and
//!   validated against an embedded JSON schema
//! - [`Engine`], which owns the parser and the extension registry and
//!   renders HTML, XML, plain text or a JSON tree
//! - Parallel batch rendering of independent documents
//!
//! ## Example
//!
//! ```rust,ignore
//! use gfmark_core::{Engine, EngineConfig};
//!
//! let config = EngineConfig::from_file(".gfmark.jsonc")?;
//! let engine = Engine::new(config)?;
//!
//! let doc = engine.parse("| a |\n|---|\n| b |")?;
//! println!("{}", engine.render_html(&doc)?);
//! ```

mod config;
mod engine;
mod error;

pub use config::{EngineConfig, ExtensionDetail, ExtensionEntry};
pub use engine::{Engine, gfm_to_html, markdown_to_html};
pub use error::{ConfigError, EngineError};

pub use gfmark_ast::Document;
pub use gfmark_parser::{ParseOptions, RenderOptions};
pub use gfmark_render::{CallbackFailure, RenderReport};
