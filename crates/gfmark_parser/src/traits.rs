//! Parser trait definition.

use gfmark_ast::Document;

use crate::ParseError;

/// Turns Markdown source into a [`Document`].
///
/// Implementations own their options and extension registry, so the same
/// parser value can be reused for any number of documents.
pub trait Parser {
    /// Short name used in logs.
    fn name(&self) -> &str;

    /// Parses a complete document.
    fn parse(&self, source: &str) -> Result<Document, ParseError>;
}
