//! Markdown parser: block structure, inlines, footnotes, extension hooks.

use std::sync::Arc;
use std::time::Instant;

use gfmark_ast::Document;
use tracing::debug;

use crate::blocks::BlockParser;
use crate::inlines::parse_inlines;
use crate::refmap::FootnoteMap;
use crate::{ExtensionRegistry, ParseError, ParseOptions, Parser};

/// Markdown parser implementation.
///
/// Parses CommonMark, plus whatever syntax the registered extensions add:
/// - Block structure, line by line
/// - Inline content of paragraphs, headings and extension leaves
/// - Footnotes (with [`ParseOptions::footnotes`])
///
/// The parser itself is immutable and cheap to share. Each call to
/// [`MarkdownParser::parse`] or [`MarkdownParser::stream`] builds its own
/// document.
#[derive(Debug, Clone, Default)]
pub struct MarkdownParser {
    options: ParseOptions,
    registry: Arc<ExtensionRegistry>,
}

impl MarkdownParser {
    /// Creates a parser with default options and no extensions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a parser with the given options and no extensions.
    pub fn with_options(options: ParseOptions) -> Self {
        Self {
            options,
            registry: Arc::default(),
        }
    }

    /// Creates a parser with options and a shared extension registry.
    pub fn with_registry(options: ParseOptions, registry: Arc<ExtensionRegistry>) -> Self {
        Self { options, registry }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Parses raw bytes. Invalid UTF-8 is reported with its byte offset.
    pub fn parse_bytes(&self, input: &[u8]) -> Result<Document, ParseError> {
        let mut stream = self.stream();
        stream.feed(input)?;
        stream.finish()
    }

    /// Starts an incremental parse.
    pub fn stream(&self) -> StreamParser<'_> {
        StreamParser {
            parser: self,
            blocks: Some(BlockParser::new(&self.options, &self.registry)),
            started: Instant::now(),
        }
    }
}

impl Parser for MarkdownParser {
    fn name(&self) -> &str {
        "markdown"
    }

    fn parse(&self, source: &str) -> Result<Document, ParseError> {
        self.parse_bytes(source.as_bytes())
    }
}

/// Incremental parse fed with arbitrary fragments.
///
/// Only complete lines are processed while feeding; the final partial line
/// is handled by [`StreamParser::finish`]. Feeding the same input in any
/// split produces the same document as a single [`MarkdownParser::parse`].
pub struct StreamParser<'p> {
    parser: &'p MarkdownParser,
    blocks: Option<BlockParser<'p>>,
    started: Instant,
}

impl StreamParser<'_> {
    /// Feeds the next fragment of input.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        self.blocks.as_mut().ok_or(ParseError::Finished)?.feed(bytes)
    }

    /// Finishes the parse and returns the document.
    ///
    /// Fails with [`ParseError::Finished`] when called twice.
    pub fn finish(&mut self) -> Result<Document, ParseError> {
        let blocks = self.blocks.take().ok_or(ParseError::Finished)?;
        let options = &self.parser.options;
        let registry = &*self.parser.registry;

        let (mut doc, mut refmap) = blocks.finish()?;
        let block_time = self.started.elapsed();

        parse_inlines(&mut doc, options, registry, &mut refmap);
        if options.footnotes {
            FootnoteMap::collect(&mut doc).resolve(&mut doc);
        }
        registry.postprocess(&mut doc, options)?;

        debug!(
            "[{}] Parsed {} nodes ({} references) in {:?} (blocks {:?})",
            self.parser.name(),
            doc.arena.len(),
            refmap.len(),
            self.started.elapsed(),
            block_time
        );
        Ok(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Extension, ExtensionError};
    use gfmark_ast::{NodeType, NodeValue};
    use pretty_assertions::assert_eq;

    fn child_types(doc: &Document) -> Vec<NodeType> {
        doc.arena
            .children(doc.root)
            .map(|id| doc.value(id).node_type())
            .collect()
    }

    #[test]
    fn test_parse_simple_markdown() {
        let parser = MarkdownParser::new();
        let doc = parser.parse("# Hello\n\nThis is a paragraph.").unwrap();

        assert_eq!(doc.value(doc.root).node_type(), NodeType::Document);
        assert_eq!(
            child_types(&doc),
            vec![NodeType::Heading, NodeType::Paragraph]
        );
        doc.validate().unwrap();
    }

    #[test]
    fn test_parse_empty_document() {
        let doc = MarkdownParser::new().parse("").unwrap();

        assert_eq!(doc.value(doc.root).node_type(), NodeType::Document);
        assert!(doc.arena.first_child(doc.root).is_none());
    }

    #[test]
    fn test_parse_link() {
        let doc = MarkdownParser::new()
            .parse("[Example](https://example.com)")
            .unwrap();

        // Document > Paragraph > Link
        let paragraph = doc.arena.first_child(doc.root).unwrap();
        let link = doc.arena.first_child(paragraph).unwrap();
        match doc.value(link) {
            NodeValue::Link(link) => assert_eq!(link.url, "https://example.com"),
            other => panic!("expected link, got {other:?}"),
        }
        assert_eq!(doc.text_content(link), "Example");
    }

    #[test]
    fn test_name() {
        assert_eq!(MarkdownParser::new().name(), "markdown");
    }

    #[test]
    fn test_stream_matches_single_parse() {
        let input = "> quote\r\n> more\r\n\r\n- a\n- b\n\n```\ncode\n```\n";
        let parser = MarkdownParser::new();
        let whole = parser.parse(input).unwrap();

        for split in 1..input.len() {
            let mut stream = parser.stream();
            stream.feed(&input.as_bytes()[..split]).unwrap();
            stream.feed(&input.as_bytes()[split..]).unwrap();
            let doc = stream.finish().unwrap();
            assert_eq!(child_types(&doc), child_types(&whole), "split at {split}");
            assert_eq!(doc.line_starts, whole.line_starts, "split at {split}");
        }
    }

    #[test]
    fn test_stream_after_finish() {
        let parser = MarkdownParser::new();
        let mut stream = parser.stream();
        stream.feed(b"text").unwrap();
        stream.finish().unwrap();

        assert!(matches!(stream.feed(b"more"), Err(ParseError::Finished)));
        assert!(matches!(stream.finish(), Err(ParseError::Finished)));
    }

    #[test]
    fn test_malformed_input() {
        let err = MarkdownParser::new()
            .parse_bytes(b"ok\n\xff\n")
            .unwrap_err();
        assert!(matches!(err, ParseError::MalformedInput { offset: 3 }));
    }

    #[test]
    fn test_footnotes_resolved() {
        let parser = MarkdownParser::with_options(ParseOptions {
            footnotes: true,
            ..Default::default()
        });
        let doc = parser
            .parse("[^b] and [^a]\n\n[^a]: first\n\n[^b]: second\n\n[^c]: unused\n")
            .unwrap();

        let names: Vec<String> = doc
            .arena
            .children(doc.root)
            .filter_map(|id| match doc.value(id) {
                NodeValue::FootnoteDefinition(def) => Some(def.name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["b".to_string(), "a".to_string()]);
    }

    struct FailingPostprocess;

    impl Extension for FailingPostprocess {
        fn name(&self) -> &str {
            "failing"
        }

        fn postprocess(
            &self,
            _doc: &mut Document,
            _options: &ParseOptions,
        ) -> Result<(), ExtensionError> {
            Err(ExtensionError::callback("failing", "boom"))
        }
    }

    #[test]
    fn test_postprocess_failure_aborts() {
        let mut registry = ExtensionRegistry::new();
        registry.register(Arc::new(FailingPostprocess)).unwrap();
        let parser = MarkdownParser::with_registry(ParseOptions::default(), Arc::new(registry));

        let err = parser.parse("hello").unwrap_err();
        match err {
            ParseError::Extension(err) => assert_eq!(err.extension_name(), "failing"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
