//! # gfmark_text
//!
//! Byte-level building blocks shared by the gfmark parser and renderers:
//! a generation-checked [`Buffer`]/[`Chunk`] pair, CommonMark character
//! classes, character reference decoding, HTML and URL escaping, label
//! normalization and the [`HtmlWriter`] output sink.

mod buffer;
pub mod ctype;
mod entity;
mod error;
mod escape;
mod label;
mod writer;

pub use buffer::{Buffer, Chunk, Lines, validate_utf8};
pub use entity::{decode_entity, unescape};
pub use error::TextError;
pub use escape::{escape_href, escape_html, escape_html_str};
pub use label::normalize_label;
pub use writer::HtmlWriter;
