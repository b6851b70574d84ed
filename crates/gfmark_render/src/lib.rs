//! # gfmark_render
//!
//! Renderers for gfmark documents.
//!
//! This crate provides:
//! - [`HtmlRenderer`], cmark-gfm compatible HTML with extension render hooks
//! - [`XmlRenderer`], CommonMark DTD-shaped XML
//! - [`PlainTextRenderer`], text with all markup stripped
//!
//! Every renderer can start at any node, so a subtree can be re-rendered
//! without touching the rest of the document.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gfmark_parser::{ExtensionRegistry, MarkdownParser, Parser, RenderOptions};
//! use gfmark_render::HtmlRenderer;
//!
//! let doc = MarkdownParser::new().parse("Hello *world*").unwrap();
//! let registry = ExtensionRegistry::new();
//! let options = RenderOptions::default();
//!
//! let html = HtmlRenderer::new(&options, &registry).render(&doc).unwrap();
//! assert_eq!(html, "<p>Hello <em>world</em></p>\n");
//! ```

mod error;
mod html;
mod plaintext;
mod url;
mod xml;

pub use error::{CallbackFailure, RenderError};
pub use html::{HtmlRenderer, RenderReport};
pub use plaintext::PlainTextRenderer;
pub use url::is_dangerous_url;
pub use xml::XmlRenderer;
