//! # gfmark_parser
//!
//! CommonMark parser for gfmark.
//!
//! This crate provides:
//! - A `Parser` trait for anything that turns source into a [`gfmark_ast::Document`]
//! - The built-in [`MarkdownParser`], whole-input or streaming
//! - The [`Extension`] trait and [`ExtensionRegistry`] through which GFM
//!   syntax (tables, strikethrough, ...) plugs into parsing and rendering
//! - Parse and render options shared with the renderers
//!
//! ## Architecture
//!
//! Parsing runs in phases. The block phase consumes input line by line and
//! builds the container tree, collecting link reference definitions. The
//! inline phase then parses the raw content of every leaf that holds
//! inlines. Footnotes are numbered next, and finally each extension's
//! postprocess hook may rewrite the tree.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gfmark_parser::{MarkdownParser, Parser};
//!
//! let parser = MarkdownParser::new();
//! let source = "# Hello\n\nThis is a paragraph.";
//!
//! let doc = parser.parse(source).unwrap();
//! ```

mod blocks;
mod error;
mod extension;
mod inlines;
mod markdown;
mod options;
mod refmap;
pub mod scanners;
mod strings;
mod traits;

pub use error::{ExtensionError, ParseError};
pub use extension::{
    BlockContext, BlockContinue, BlockStart, Extension, ExtensionRegistry, HtmlContext,
    InlineContext, RenderFlow,
};
pub use markdown::{MarkdownParser, StreamParser};
pub use options::{DEFAULT_MAX_NESTING, ParseOptions, RenderOptions};
pub use refmap::{FootnoteMap, MAX_LINK_LABEL_LENGTH, Reference, ReferenceMap};
pub use traits::Parser;
