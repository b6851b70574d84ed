//! Plain text renderer.
//!
//! Strips all markup and keeps the text. Blocks are separated by blank
//! lines, list items keep a `-` or `N.` marker with hanging indentation,
//! table cells are separated by ` | `. Raw HTML is dropped.

use std::ops::ControlFlow;

use gfmark_ast::visitor::{VisitResult, Visitor, walk_node};
use gfmark_ast::{Document, ListDelimType, ListType, NodeId, NodeValue};
use gfmark_parser::RenderOptions;

/// Renders documents as plain text.
#[derive(Debug, Clone, Copy)]
pub struct PlainTextRenderer<'a> {
    options: &'a RenderOptions,
}

impl<'a> PlainTextRenderer<'a> {
    pub fn new(options: &'a RenderOptions) -> Self {
        Self { options }
    }

    pub fn render(&self, doc: &Document) -> String {
        self.render_node(doc, doc.root)
    }

    /// Renders the subtree rooted at `node`.
    pub fn render_node(&self, doc: &Document, node: NodeId) -> String {
        let mut state = PlainState {
            options: self.options,
            out: String::new(),
            prefix: String::new(),
            markers: Vec::new(),
            ordinals: Vec::new(),
            begin_line: true,
            need_newlines: 0,
            footnotes: 0,
        };
        let _ = walk_node(&mut state, doc, node);
        if !state.out.is_empty() && !state.out.ends_with('\n') {
            state.out.push('\n');
        }
        state.out
    }
}

struct PlainState<'a> {
    options: &'a RenderOptions,
    out: String,
    /// Indentation of the enclosing list items.
    prefix: String,
    /// Widths pushed onto `prefix` by open items.
    markers: Vec<usize>,
    /// Index of the next item in each open list.
    ordinals: Vec<usize>,
    begin_line: bool,
    /// Pending line breaks: 1 ends the line, 2 also leaves a blank line.
    need_newlines: u8,
    footnotes: u32,
}

impl PlainState<'_> {
    fn cr(&mut self) {
        self.need_newlines = self.need_newlines.max(1);
    }

    fn blank_line(&mut self) {
        self.need_newlines = 2;
    }

    fn flush_newlines(&mut self) {
        if self.need_newlines == 0 {
            return;
        }
        if !self.out.is_empty() {
            if !self.begin_line {
                self.out.push('\n');
            }
            if self.need_newlines > 1 {
                self.out.push('\n');
            }
            self.begin_line = true;
        }
        self.need_newlines = 0;
    }

    /// Writes text, starting continuation lines with the current prefix.
    fn lit(&mut self, text: &str) {
        for (i, piece) in text.split('\n').enumerate() {
            if i > 0 {
                self.out.push('\n');
                self.begin_line = true;
            }
            if piece.is_empty() {
                continue;
            }
            self.flush_newlines();
            if self.begin_line {
                self.out.push_str(&self.prefix);
                self.begin_line = false;
            }
            self.out.push_str(piece);
        }
    }

    /// Position of `item` in its list, counted as items are entered.
    fn item_index(&mut self, doc: &Document, item: NodeId) -> usize {
        match self.ordinals.last_mut() {
            Some(next) => {
                *next += 1;
                *next - 1
            }
            None => std::iter::successors(doc.arena.previous_sibling(item), |&id| {
                doc.arena.previous_sibling(id)
            })
            .count(),
        }
    }

    fn item_marker(doc: &Document, item: NodeId, index: usize) -> String {
        let Some(list) = doc.arena.parent(item) else {
            return "- ".to_string();
        };
        match doc.value(list) {
            NodeValue::List(list_data) if list_data.list_type == ListType::Ordered => {
                let delim = match list_data.delimiter {
                    ListDelimType::Period => '.',
                    ListDelimType::Paren => ')',
                };
                format!("{}{} ", list_data.start + index, delim)
            }
            _ => "- ".to_string(),
        }
    }
}

impl Visitor for PlainState<'_> {
    fn enter_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
        match doc.value(node) {
            NodeValue::List(_) => self.ordinals.push(0),
            NodeValue::Item(_) | NodeValue::TaskItem(_) => {
                self.cr();
                let index = self.item_index(doc, node);
                let marker = match doc.value(node) {
                    NodeValue::TaskItem(task) if task.checked => {
                        format!("{}[x] ", Self::item_marker(doc, node, index))
                    }
                    NodeValue::TaskItem(_) => {
                        format!("{}[ ] ", Self::item_marker(doc, node, index))
                    }
                    _ => Self::item_marker(doc, node, index),
                };
                self.lit(&marker);
                self.prefix.extend(std::iter::repeat_n(' ', marker.len()));
                self.markers.push(marker.len());
            }
            NodeValue::TableRow(_) => self.cr(),
            NodeValue::TableCell => {
                if doc.arena.previous_sibling(node).is_some() {
                    self.lit(" | ");
                }
            }
            NodeValue::CodeBlock(block) => {
                self.blank_line();
                self.lit(block.literal.trim_end_matches('\n'));
                self.blank_line();
            }
            NodeValue::ThematicBreak => self.blank_line(),
            NodeValue::Text(text) => self.lit(text),
            NodeValue::Code(code) => self.lit(&code.literal),
            NodeValue::SoftBreak => {
                if self.options.nobreaks {
                    self.lit(" ");
                } else {
                    self.cr();
                }
            }
            NodeValue::LineBreak => self.cr(),
            NodeValue::FootnoteReference(reference) => {
                self.lit(&format!("[{}]", reference.ref_num));
            }
            NodeValue::FootnoteDefinition(_) => {
                self.footnotes += 1;
                self.blank_line();
                self.lit(&format!("[{}] ", self.footnotes));
            }
            NodeValue::Custom(custom) => {
                if let Some(literal) = &custom.literal {
                    self.lit(literal);
                }
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }

    fn exit_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
        match doc.value(node) {
            NodeValue::Paragraph => {
                let in_tight_list = doc
                    .arena
                    .parent(node)
                    .and_then(|item| doc.arena.parent(item))
                    .is_some_and(|list| matches!(doc.value(list), NodeValue::List(l) if l.tight));
                if in_tight_list {
                    self.cr();
                } else {
                    self.blank_line();
                }
            }
            NodeValue::List(_) => {
                self.ordinals.pop();
                let nested = doc
                    .arena
                    .parent(node)
                    .is_some_and(|parent| doc.value(parent).is_item());
                if nested {
                    self.cr();
                } else {
                    self.blank_line();
                }
            }
            NodeValue::Heading(_) | NodeValue::BlockQuote | NodeValue::Table(_) => {
                self.blank_line()
            }
            NodeValue::Item(_) | NodeValue::TaskItem(_) => {
                let width = self.markers.pop().unwrap_or(0);
                self.prefix.truncate(self.prefix.len().saturating_sub(width));
                self.cr();
            }
            _ => {}
        }
        ControlFlow::Continue(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfmark_parser::{MarkdownParser, ParseOptions, Parser};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn render(input: &str) -> String {
        let doc = MarkdownParser::new().parse(input).unwrap();
        PlainTextRenderer::new(&RenderOptions::default()).render(&doc)
    }

    #[rstest]
    #[case::paragraphs("a *b*\n\nc", "a b\n\nc\n")]
    #[case::heading_and_link("# T\n\n[x](/u) y", "T\n\nx y\n")]
    #[case::tight_list("- a\n- b\n\nafter", "- a\n- b\n\nafter\n")]
    #[case::ordered_list("3. a\n4. b", "3. a\n4. b\n")]
    #[case::nested_list("- a\n  - b\n- c", "- a\n  - b\n- c\n")]
    #[case::soft_break("a\nb", "a\nb\n")]
    #[case::code_block("```\nx\n```\n\ny", "x\n\ny\n")]
    #[case::raw_html_dropped("a <b>c</b>", "a c\n")]
    #[case::empty("", "")]
    fn test_render_plaintext(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(render(input), expected);
    }

    #[test]
    fn test_render_single_ordered_item() {
        let doc = MarkdownParser::new().parse("3. a\n4. b\n5. c").unwrap();
        let list = doc.arena.first_child(doc.root).unwrap();
        let second = doc.arena.children(list).nth(1).unwrap();
        let options = RenderOptions::default();
        assert_eq!(PlainTextRenderer::new(&options).render_node(&doc, second), "4. b\n");
    }

    #[test]
    fn test_nested_ordered_lists_count_separately() {
        assert_eq!(
            render("1. a\n   1. x\n   2. y\n2. b"),
            "1. a\n   1. x\n   2. y\n2. b\n"
        );
    }

    #[test]
    fn test_item_continuation_is_indented() {
        assert_eq!(render("- a\n\n  b\n- c"), "- a\n\n  b\n\n- c\n");
    }

    #[test]
    fn test_nobreaks() {
        let doc = MarkdownParser::with_options(ParseOptions::default())
            .parse("a\nb")
            .unwrap();
        let options = RenderOptions {
            nobreaks: true,
            ..Default::default()
        };
        assert_eq!(PlainTextRenderer::new(&options).render(&doc), "a b\n");
    }
}
