//! Syntax extensions and the registry that dispatches to them.
//!
//! An [`Extension`] is a bundle of optional hooks: block starts and
//! continuations, inline matchers, extra emphasis-like delimiters, a
//! postprocessing pass over the finished tree, and HTML/XML render
//! callbacks for the node kinds it owns. Every hook has a no-op default, so
//! an extension only implements what it contributes.
//!
//! The [`ExtensionRegistry`] is passed explicitly into parsers and
//! renderers. It is read-only while documents are processed and can be
//! shared between threads behind an `Arc`.

use std::borrow::Cow;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;

use gfmark_ast::{Document, NodeId, NodeValue, Position, SourcePos};
use gfmark_text::HtmlWriter;
use tracing::debug;

use crate::blocks::BlockParser;
use crate::inlines::Subject;
use crate::{ExtensionError, ParseError, ParseOptions, RenderOptions};

/// What an extension did when it claimed a line in [`Extension::try_open_block`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockStart {
    /// A container block was opened; more block starts may follow on the
    /// same line inside it.
    Container,
    /// A leaf block was opened; the rest of the line becomes its content.
    Leaf,
    /// The whole line was consumed.
    Consumed,
}

/// Answer of [`Extension::continue_block`] for an open block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockContinue {
    /// The extension does not own this block.
    Unhandled,
    /// The line continues the block.
    Matched,
    /// The line does not continue the block; it will be closed.
    NotMatched,
}

/// Whether the renderer should descend into a node after a render callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFlow {
    Continue,
    SkipChildren,
}

/// A pluggable syntax extension.
///
/// Implementations must be `Send + Sync`; a registry is shared read-only
/// across threads when rendering batches.
pub trait Extension: Send + Sync {
    /// Unique name, used for registration and lookup.
    fn name(&self) -> &str;

    /// Dispatch priority. Higher runs first; ties keep registration order.
    fn priority(&self) -> i32 {
        0
    }

    /// Tries to open a block at the current line position.
    ///
    /// Called after the core block starts failed. Returning `Some` claims
    /// the position; no other extension is asked.
    fn try_open_block(&self, _ctx: &mut BlockContext<'_, '_>) -> Option<BlockStart> {
        None
    }

    /// Decides whether the current line continues an open block this
    /// extension created.
    fn continue_block(&self, _ctx: &mut BlockContext<'_, '_>, _node: NodeId) -> BlockContinue {
        BlockContinue::Unhandled
    }

    /// Bytes at which [`Extension::match_inline`] should be consulted.
    fn special_inline_chars(&self) -> &[u8] {
        &[]
    }

    /// Tries to parse an inline construct at the current position.
    ///
    /// On success the matcher advances the position past the construct and
    /// returns a detached node, which the parser appends.
    fn match_inline(&self, _ctx: &mut InlineContext<'_, '_>) -> Option<NodeId> {
        None
    }

    /// Delimiter characters handled like `*` and `_` on the delimiter stack.
    fn delimiter_chars(&self) -> &[u8] {
        &[]
    }

    /// Resolves a matched opener/closer pair of one of
    /// [`Extension::delimiter_chars`].
    ///
    /// Returns the node to wrap the enclosed inlines in and the number of
    /// delimiter characters to consume from each side, or `None` to leave
    /// both runs as literal text.
    fn resolve_delimiters(
        &self,
        _delim: u8,
        _opener_len: usize,
        _closer_len: usize,
    ) -> Option<(NodeValue, usize)> {
        None
    }

    /// Rewrites the tree after inline parsing.
    fn postprocess(
        &self,
        _doc: &mut Document,
        _options: &ParseOptions,
    ) -> Result<(), ExtensionError> {
        Ok(())
    }

    /// Whether this extension renders nodes with this value.
    fn renders(&self, _value: &NodeValue) -> bool {
        false
    }

    /// Renders a node this extension claimed through [`Extension::renders`].
    fn render_html(
        &self,
        _ctx: &mut HtmlContext<'_>,
        _node: NodeId,
        _entering: bool,
    ) -> Result<RenderFlow, ExtensionError> {
        Ok(RenderFlow::Continue)
    }

    /// Extra attributes for the XML element of a node.
    fn render_xml_attrs(&self, _value: &NodeValue) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Filters raw HTML before it is written out.
    fn filter_raw_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        Cow::Borrowed(html)
    }

    /// Overrides the containment rules for a parent/child pair.
    fn can_contain(&self, _parent: &NodeValue, _child: &NodeValue) -> Option<bool> {
        None
    }
}

/// View of the block parser handed to block hooks.
pub struct BlockContext<'c, 'r> {
    parser: &'c mut BlockParser<'r>,
    line: &'c str,
    container: NodeId,
}

impl<'c, 'r> BlockContext<'c, 'r> {
    pub(crate) fn new(parser: &'c mut BlockParser<'r>, line: &'c str, container: NodeId) -> Self {
        Self {
            parser,
            line,
            container,
        }
    }

    /// The current line, terminated by `\n`.
    pub fn line(&self) -> &str {
        self.line
    }

    /// The current line from the parse position on.
    pub fn rest(&self) -> &str {
        self.line.get(self.parser.offset()..).unwrap_or("")
    }

    /// The current line from the first non-space character on.
    pub fn rest_from_nonspace(&self) -> &str {
        self.line.get(self.parser.first_nonspace()..).unwrap_or("")
    }

    /// 1-based number of the current line.
    pub fn line_number(&self) -> u32 {
        self.parser.line_number()
    }

    /// Byte offset of the parse position within the line.
    pub fn offset(&self) -> usize {
        self.parser.offset()
    }

    /// Byte offset of the first non-space character at or after the parse
    /// position.
    pub fn first_nonspace(&self) -> usize {
        self.parser.first_nonspace()
    }

    /// Columns of indentation before the first non-space character.
    pub fn indent(&self) -> usize {
        self.parser.indent()
    }

    /// Whether the rest of the line is blank.
    pub fn is_blank(&self) -> bool {
        self.parser.is_blank()
    }

    /// The innermost block the line has reached so far.
    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn document(&self) -> &Document {
        self.parser.document()
    }

    pub fn document_mut(&mut self) -> &mut Document {
        self.parser.document_mut()
    }

    pub fn options(&self) -> &ParseOptions {
        self.parser.options()
    }

    /// Opens a block under the current container and makes it the new
    /// container. Open blocks that cannot hold it are closed first.
    pub fn add_block(&mut self, value: NodeValue, start_column: usize) -> NodeId {
        self.container = self.parser.add_child(self.container, value, start_column);
        self.container
    }

    /// Moves the parse position `count` bytes forward.
    pub fn advance(&mut self, count: usize) {
        self.parser.advance_offset(self.line.as_bytes(), count, false);
    }

    /// Closes an open block and returns its parent.
    pub fn finalize(&mut self, node: NodeId) -> Option<NodeId> {
        self.parser.finalize(node)
    }

    /// Removes the last line from the content of an open leaf block.
    ///
    /// Returns the line, without its terminator, and where it started.
    pub fn take_last_line(&mut self, node: NodeId) -> Option<(String, Position)> {
        let ast = &mut self.parser.document_mut().arena[node];
        let (start, line, column) = ast.line_offsets.pop()?;
        let text = ast.content.split_off(start);
        let text = text.trim_end_matches(['\n', '\r']).to_string();
        Some((text, Position::new(line, column)))
    }

    /// Source position covering the current line from `start_column` to
    /// the end of the line.
    pub fn line_span(&self, start_column: usize) -> SourcePos {
        let line = self.line_number();
        let end = self.line.trim_end_matches(['\n', '\r']).len().max(1);
        SourcePos::new(
            Position::new(line, start_column as u32),
            Position::new(line, end as u32),
        )
    }
}

/// View of the inline parser handed to inline matchers.
pub struct InlineContext<'c, 'a> {
    subject: &'c mut Subject<'a>,
}

impl<'c, 'a> InlineContext<'c, 'a> {
    pub(crate) fn new(subject: &'c mut Subject<'a>) -> Self {
        Self { subject }
    }

    /// The whole text being parsed.
    pub fn input(&self) -> &str {
        self.subject.input()
    }

    /// Byte offset of the parse position.
    pub fn pos(&self) -> usize {
        self.subject.pos()
    }

    /// The input from the parse position on.
    pub fn rest(&self) -> &str {
        self.subject.input().get(self.subject.pos()..).unwrap_or("")
    }

    /// The character before the parse position, if any.
    pub fn preceding_char(&self) -> Option<char> {
        self.subject.input()[..self.subject.pos()].chars().next_back()
    }

    /// Moves the parse position `count` bytes forward.
    pub fn advance(&mut self, count: usize) {
        self.subject.advance(count);
    }

    /// Whether the position is inside the text of an unclosed link or image.
    pub fn in_bracket(&self) -> bool {
        self.subject.in_bracket()
    }

    pub fn options(&self) -> &ParseOptions {
        self.subject.options()
    }

    /// Allocates a detached node covering input bytes `start..end`.
    pub fn make_node(&mut self, value: NodeValue, start: usize, end: usize) -> NodeId {
        self.subject.make_node(value, start, end)
    }

    /// Appends `child` to `parent`.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.subject.arena_mut().append_child(parent, child);
    }
}

/// State handed to HTML render callbacks.
pub struct HtmlContext<'a> {
    pub doc: &'a Document,
    pub options: &'a RenderOptions,
    pub out: &'a mut HtmlWriter,
}

impl<'a> HtmlContext<'a> {
    pub fn new(doc: &'a Document, options: &'a RenderOptions, out: &'a mut HtmlWriter) -> Self {
        Self { doc, options, out }
    }

    /// Writes a ` data-sourcepos="..."` attribute when enabled.
    pub fn sourcepos(&mut self, node: NodeId) {
        if self.options.sourcepos {
            let pos = self.doc.arena[node].sourcepos;
            self.out.raw(&format!(" data-sourcepos=\"{pos}\""));
        }
    }

    pub fn cr(&mut self) {
        self.out.cr();
    }

    pub fn raw(&mut self, s: &str) {
        self.out.raw(s);
    }

    pub fn text(&mut self, s: &str) {
        self.out.text(s);
    }
}

/// Registered extensions in dispatch order.
#[derive(Clone, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<Arc<dyn Extension>>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an extension.
    ///
    /// Names are unique; registering a second extension with the same name
    /// fails and leaves the registry unchanged.
    pub fn register(&mut self, extension: Arc<dyn Extension>) -> Result<(), ExtensionError> {
        let name = extension.name().to_string();
        if self.get(&name).is_some() {
            return Err(ExtensionError::duplicate(name));
        }
        debug!(
            "Registered extension '{}' (priority {})",
            name,
            extension.priority()
        );
        self.extensions.push(extension);
        self.extensions.sort_by_key(|ext| Reverse(ext.priority()));
        Ok(())
    }

    /// Removes an extension by name.
    pub fn unregister(&mut self, name: &str) -> Result<Arc<dyn Extension>, ExtensionError> {
        let index = self
            .extensions
            .iter()
            .position(|ext| ext.name() == name)
            .ok_or_else(|| ExtensionError::not_found(name))?;
        Ok(self.extensions.remove(index))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Extension>> {
        self.extensions.iter().find(|ext| ext.name() == name)
    }

    /// Names in dispatch order.
    pub fn names(&self) -> Vec<&str> {
        self.extensions.iter().map(|ext| ext.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Iterates in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Extension>> {
        self.extensions.iter()
    }

    /// The first extension that renders nodes with this value.
    pub fn renderer_for(&self, value: &NodeValue) -> Option<&Arc<dyn Extension>> {
        self.extensions.iter().find(|ext| ext.renders(value))
    }

    /// All bytes some extension wants to match inlines at.
    pub fn inline_special_chars(&self) -> Vec<u8> {
        let mut chars: Vec<u8> = self
            .extensions
            .iter()
            .flat_map(|ext| ext.special_inline_chars().iter().copied())
            .collect();
        chars.sort_unstable();
        chars.dedup();
        chars
    }

    /// All extension delimiter characters.
    pub fn delimiter_chars(&self) -> Vec<u8> {
        let mut chars: Vec<u8> = self
            .extensions
            .iter()
            .flat_map(|ext| ext.delimiter_chars().iter().copied())
            .collect();
        chars.sort_unstable();
        chars.dedup();
        chars
    }

    /// The first extension owning a delimiter character.
    pub fn delimiter_owner(&self, delim: u8) -> Option<&Arc<dyn Extension>> {
        self.extensions
            .iter()
            .find(|ext| ext.delimiter_chars().contains(&delim))
    }

    /// Containment check with extension overrides applied.
    pub fn can_contain(&self, parent: &NodeValue, child: &NodeValue) -> bool {
        self.extensions
            .iter()
            .find_map(|ext| ext.can_contain(parent, child))
            .unwrap_or_else(|| parent.can_contain(child))
    }

    /// Runs every raw HTML filter in dispatch order.
    pub fn filter_raw_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
        let mut current = Cow::Borrowed(html);
        for ext in &self.extensions {
            let filtered = match ext.filter_raw_html(&current) {
                Cow::Owned(filtered) => Some(filtered),
                Cow::Borrowed(_) => None,
            };
            if let Some(filtered) = filtered {
                current = Cow::Owned(filtered);
            }
        }
        current
    }

    /// Runs every postprocess hook in dispatch order. The first failure
    /// aborts.
    pub fn postprocess(&self, doc: &mut Document, options: &ParseOptions) -> Result<(), ParseError> {
        for ext in &self.extensions {
            ext.postprocess(doc, options)?;
        }
        Ok(())
    }
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("extensions", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct Named {
        name: &'static str,
        priority: i32,
    }

    impl Extension for Named {
        fn name(&self) -> &str {
            self.name
        }

        fn priority(&self) -> i32 {
            self.priority
        }

        fn special_inline_chars(&self) -> &[u8] {
            b"@"
        }
    }

    struct Upper;

    impl Extension for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        fn filter_raw_html<'a>(&self, html: &'a str) -> Cow<'a, str> {
            Cow::Owned(html.to_uppercase())
        }

        fn postprocess(
            &self,
            _doc: &mut Document,
            _options: &ParseOptions,
        ) -> Result<(), ExtensionError> {
            Err(ExtensionError::callback("upper", "refused"))
        }
    }

    fn named(name: &'static str, priority: i32) -> Arc<dyn Extension> {
        Arc::new(Named { name, priority })
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = ExtensionRegistry::new();
        registry.register(named("table", 0)).unwrap();
        let err = registry.register(named("table", 5)).unwrap_err();
        assert_eq!(err, ExtensionError::duplicate("table"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_dispatch_order() {
        let mut registry = ExtensionRegistry::new();
        registry.register(named("a", 0)).unwrap();
        registry.register(named("b", 10)).unwrap();
        registry.register(named("c", 0)).unwrap();
        registry.register(named("d", -1)).unwrap();
        assert_eq!(registry.names(), vec!["b", "a", "c", "d"]);
    }

    #[test]
    fn test_unregister() {
        let mut registry = ExtensionRegistry::new();
        registry.register(named("a", 0)).unwrap();
        assert!(registry.unregister("a").is_ok());
        assert!(registry.is_empty());
        assert_eq!(
            registry.unregister("a").err().unwrap(),
            ExtensionError::not_found("a")
        );
    }

    #[test]
    fn test_special_chars_are_deduplicated() {
        let mut registry = ExtensionRegistry::new();
        registry.register(named("a", 0)).unwrap();
        registry.register(named("b", 0)).unwrap();
        assert_eq!(registry.inline_special_chars(), b"@".to_vec());
    }

    #[test]
    fn test_filters_and_postprocess() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(Upper)).unwrap();
        assert_eq!(registry.filter_raw_html("<b>"), "<B>");

        let mut doc = Document::new();
        let err = registry
            .postprocess(&mut doc, &ParseOptions::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "Extension 'upper' failed: refused");
    }

    #[test]
    fn test_core_containment_without_overrides() {
        let registry = ExtensionRegistry::new();
        assert!(registry.can_contain(&NodeValue::Document, &NodeValue::Paragraph));
        assert!(!registry.can_contain(&NodeValue::Paragraph, &NodeValue::Paragraph));
    }
}
