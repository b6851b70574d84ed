//! Block structure.
//!
//! Input is split into lines. For every line the parser walks the chain of
//! open blocks from the document down and checks which of them the line
//! continues, then tries to open new blocks where matching stopped, and
//! finally adds what is left of the line to the innermost block. Blocks
//! are finalized when a line no longer continues them or at the end of
//! input.
//!
//! Indentation is measured in columns with tab stops of 4; a tab that is
//! only partly used up by a block prefix is remembered so the remaining
//! columns still count as content.

use std::mem;

use gfmark_ast::{
    Ast, Document, NodeCodeBlock, NodeFootnoteDefinition, NodeHeading, NodeHtmlBlock, NodeId,
    NodeList, NodeType, NodeValue, Position, SourcePos,
};
use gfmark_text::ctype::{is_line_end, is_space_or_tab};
use gfmark_text::{Buffer, Chunk, TextError, unescape, validate_utf8};
use tracing::debug;

use crate::extension::{BlockContext, BlockContinue, BlockStart, ExtensionRegistry};
use crate::inlines::parse_reference_definition;
use crate::refmap::ReferenceMap;
use crate::strings::{chop_trailing_hashes, is_blank, remove_trailing_blank_lines};
use crate::{ParseError, ParseOptions, scanners};

const TAB_STOP: usize = 4;
const CODE_INDENT: usize = 4;

/// How an open block decides whether a line continues it.
enum Continuation {
    Always,
    Never,
    BlockQuote,
    Item { width: usize },
    IndentedCode,
    FencedCode {
        fence_char: u8,
        fence_length: usize,
        fence_offset: usize,
    },
    Html(u8),
    Paragraph,
    Footnote,
    Extension,
}

/// Line-oriented block parser.
pub(crate) struct BlockParser<'r> {
    doc: Document,
    options: &'r ParseOptions,
    registry: &'r ExtensionRegistry,
    refmap: ReferenceMap,
    /// Innermost open block.
    current: NodeId,
    line_number: u32,
    offset: usize,
    column: usize,
    first_nonspace: usize,
    first_nonspace_column: usize,
    indent: usize,
    blank: bool,
    partially_consumed_tab: bool,
    thematic_break_kill_pos: usize,
    curline_len: usize,
    curline_end_col: usize,
    last_line_length: usize,
    /// Bytes of the incomplete last line.
    pending: Buffer,
    /// Absolute input offset of the first pending byte.
    pending_start: usize,
    last_buffer_ended_with_cr: bool,
    total_size: usize,
}

impl<'r> BlockParser<'r> {
    pub(crate) fn new(options: &'r ParseOptions, registry: &'r ExtensionRegistry) -> Self {
        let doc = Document::new();
        let root = doc.root;
        Self {
            doc,
            options,
            registry,
            refmap: ReferenceMap::new(),
            current: root,
            line_number: 0,
            offset: 0,
            column: 0,
            first_nonspace: 0,
            first_nonspace_column: 0,
            indent: 0,
            blank: false,
            partially_consumed_tab: false,
            thematic_break_kill_pos: 0,
            curline_len: 0,
            curline_end_col: 0,
            last_line_length: 0,
            pending: Buffer::new(),
            pending_start: 0,
            last_buffer_ended_with_cr: false,
            total_size: 0,
        }
    }

    /// Feeds a fragment of input. Only complete lines are processed; the
    /// rest waits for the next fragment or [`BlockParser::finish`].
    pub(crate) fn feed(&mut self, bytes: &[u8]) -> Result<(), ParseError> {
        self.total_size = self.total_size.saturating_add(bytes.len());
        let mut bytes = bytes;
        if self.last_buffer_ended_with_cr && bytes.first() == Some(&b'\n') {
            bytes = &bytes[1..];
            self.pending_start += 1;
            if let Some(start) = self.doc.line_starts.last_mut() {
                *start += 1;
            }
        }
        self.last_buffer_ended_with_cr = false;
        self.pending.append(bytes);
        self.process_pending(false)
    }

    /// Processes the remaining input and closes every open block.
    pub(crate) fn finish(mut self) -> Result<(Document, ReferenceMap), ParseError> {
        self.process_pending(true)?;
        let root = self.doc.root;
        while self.current != root {
            self.current = self.finalize(self.current).unwrap_or(root);
        }
        self.finalize(root);
        self.refmap.set_input_size(self.total_size);
        Ok((self.doc, self.refmap))
    }

    fn process_pending(&mut self, eof: bool) -> Result<(), ParseError> {
        let chunks: Vec<Chunk> = self.pending.lines().collect();
        let total = self.pending.len();
        let mut used = 0;
        for chunk in chunks {
            let (line, terminated, ends_with_cr) = {
                let raw = self.pending.slice(&chunk)?;
                let content_len = raw
                    .iter()
                    .position(|&b| is_line_end(b))
                    .unwrap_or(raw.len());
                let terminated = content_len < raw.len();
                if !terminated && !eof {
                    break;
                }
                let text = validate_utf8(&raw[..content_len]).map_err(|err| match err {
                    TextError::MalformedInput { offset } => {
                        ParseError::malformed_input(self.pending_start + chunk.offset() + offset)
                    }
                    other => other.into(),
                })?;
                (
                    text.replace('\0', "\u{fffd}"),
                    terminated,
                    raw.last() == Some(&b'\r'),
                )
            };
            self.process_line(&line);
            used = chunk.end();
            if terminated {
                self.doc.line_starts.push(self.pending_start + used);
            }
            if ends_with_cr && used == total {
                self.last_buffer_ended_with_cr = true;
            }
        }
        if used > 0 {
            self.pending.drain_front(used)?;
            self.pending_start += used;
        }
        Ok(())
    }

    fn process_line(&mut self, text: &str) {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');

        self.curline_len = line.len();
        self.curline_end_col = text.len();
        self.offset = 0;
        self.column = 0;
        self.first_nonspace = 0;
        self.first_nonspace_column = 0;
        self.indent = 0;
        self.thematic_break_kill_pos = 0;
        self.blank = false;
        self.partially_consumed_tab = false;

        if self.line_number == 0 && line.starts_with('\u{feff}') {
            self.offset = '\u{feff}'.len_utf8();
        }
        self.line_number += 1;

        if let Some((last_matched, all_matched)) = self.check_open_blocks(&line) {
            let mut container = last_matched;
            if self.open_new_blocks(&mut container, &line, all_matched) {
                self.close_unmatched_blocks(last_matched);
                self.current = container;
            } else {
                self.add_text_to_container(container, last_matched, &line);
            }
        }

        self.last_line_length = self.curline_end_col;
        self.curline_len = 0;
        self.curline_end_col = 0;
    }

    /// Walks the open blocks and returns the last one the line continues.
    ///
    /// Returns `None` when the line was fully consumed, as by a closing
    /// code fence.
    fn check_open_blocks(&mut self, line: &str) -> Option<(NodeId, bool)> {
        let bytes = line.as_bytes();
        let mut container = self.doc.root;
        let mut all_matched = true;

        while let Some(last) = self
            .doc
            .arena
            .last_child(container)
            .filter(|&id| self.doc.arena[id].open)
        {
            container = last;
            self.find_first_nonspace(bytes);

            let matched = match self.continuation(container) {
                Continuation::Always => true,
                Continuation::Never => false,
                Continuation::BlockQuote => self.continue_block_quote(bytes),
                Continuation::Item { width } => self.continue_item(bytes, container, width),
                Continuation::IndentedCode => {
                    if self.indent >= CODE_INDENT {
                        self.advance_offset(bytes, CODE_INDENT, true);
                        true
                    } else if self.blank {
                        let count = self.first_nonspace - self.offset;
                        self.advance_offset(bytes, count, false);
                        true
                    } else {
                        false
                    }
                }
                Continuation::FencedCode {
                    fence_char,
                    fence_length,
                    fence_offset,
                } => {
                    let closing = if self.indent <= 3
                        && bytes.get(self.first_nonspace) == Some(&fence_char)
                    {
                        scanners::close_code_fence(&bytes[self.first_nonspace..]).unwrap_or(0)
                    } else {
                        0
                    };
                    if closing >= fence_length {
                        let count = self.first_nonspace + closing - self.offset;
                        self.advance_offset(bytes, count, false);
                        self.current = self.finalize(container).unwrap_or(self.doc.root);
                        return None;
                    }
                    let mut remaining = fence_offset;
                    while remaining > 0
                        && bytes
                            .get(self.offset)
                            .is_some_and(|&b| is_space_or_tab(b))
                    {
                        self.advance_offset(bytes, 1, true);
                        remaining -= 1;
                    }
                    true
                }
                Continuation::Html(kind) => matches!(kind, 1..=5) || !self.blank,
                Continuation::Paragraph => !self.blank,
                Continuation::Footnote => {
                    if self.indent >= CODE_INDENT {
                        self.advance_offset(bytes, CODE_INDENT, true);
                        true
                    } else {
                        self.blank
                    }
                }
                Continuation::Extension => self.continue_extension_block(line, container),
            };

            if !matched {
                all_matched = false;
                break;
            }
        }

        if !all_matched {
            container = self.doc.arena.parent(container).unwrap_or(self.doc.root);
        }
        Some((container, all_matched))
    }

    fn continuation(&self, node: NodeId) -> Continuation {
        match &self.doc.arena[node].value {
            NodeValue::BlockQuote => Continuation::BlockQuote,
            NodeValue::Item(list) => Continuation::Item {
                width: list.marker_offset + list.padding,
            },
            NodeValue::CodeBlock(code) if code.fenced => Continuation::FencedCode {
                fence_char: code.fence_char,
                fence_length: code.fence_length,
                fence_offset: code.fence_offset,
            },
            NodeValue::CodeBlock(_) => Continuation::IndentedCode,
            NodeValue::HtmlBlock(html) => Continuation::Html(html.block_type),
            NodeValue::Paragraph => Continuation::Paragraph,
            NodeValue::FootnoteDefinition(_) => Continuation::Footnote,
            NodeValue::Heading(_)
            | NodeValue::ThematicBreak
            | NodeValue::TableRow(_)
            | NodeValue::TableCell => Continuation::Never,
            NodeValue::Table(_) | NodeValue::Custom(_) => Continuation::Extension,
            _ => Continuation::Always,
        }
    }

    fn continue_block_quote(&mut self, bytes: &[u8]) -> bool {
        if self.indent <= 3 && bytes.get(self.first_nonspace) == Some(&b'>') {
            self.advance_offset(bytes, self.indent + 1, true);
            if bytes.get(self.offset).is_some_and(|&b| is_space_or_tab(b)) {
                self.advance_offset(bytes, 1, true);
            }
            return true;
        }
        false
    }

    fn continue_item(&mut self, bytes: &[u8], item: NodeId, width: usize) -> bool {
        if self.indent >= width {
            self.advance_offset(bytes, width, true);
            true
        } else if self.blank && self.doc.arena.first_child(item).is_some() {
            let count = self.first_nonspace - self.offset;
            self.advance_offset(bytes, count, false);
            true
        } else {
            false
        }
    }

    fn continue_extension_block(&mut self, line: &str, node: NodeId) -> bool {
        let registry = self.registry;
        for ext in registry.iter() {
            let mut ctx = BlockContext::new(self, line, node);
            match ext.continue_block(&mut ctx, node) {
                BlockContinue::Unhandled => continue,
                BlockContinue::Matched => return true,
                BlockContinue::NotMatched => return false,
            }
        }
        false
    }

    /// Opens new blocks at the position where continuation checks stopped.
    ///
    /// Returns true if an extension consumed the rest of the line.
    fn open_new_blocks(&mut self, container: &mut NodeId, line: &str, all_matched: bool) -> bool {
        let bytes = line.as_bytes();
        let max_nesting = self.options.max_nesting;
        let mut maybe_lazy = matches!(self.doc.arena[self.current].value, NodeValue::Paragraph);
        let mut depth = self.doc.arena.ancestors(*container).count();

        loop {
            if matches!(
                self.doc.arena[*container].value,
                NodeValue::CodeBlock(_) | NodeValue::HtmlBlock(_)
            ) {
                break;
            }
            self.find_first_nonspace(bytes);
            let indented = self.indent >= CODE_INDENT;
            let fns = self.first_nonspace;
            let rest = &bytes[fns..];
            let in_paragraph = matches!(self.doc.arena[*container].value, NodeValue::Paragraph);

            if !indented && rest.first() == Some(&b'>') && depth < max_nesting {
                self.advance_offset(bytes, fns + 1 - self.offset, false);
                if bytes.get(self.offset).is_some_and(|&b| is_space_or_tab(b)) {
                    self.advance_offset(bytes, 1, true);
                }
                *container = self.add_child(*container, NodeValue::BlockQuote, fns + 1);
                depth += 1;
            } else if let Some(matched) = (!indented)
                .then(|| scanners::atx_heading_start(rest))
                .flatten()
            {
                let level = rest.iter().take_while(|&&b| b == b'#').count() as u8;
                self.advance_offset(bytes, fns + matched - self.offset, false);
                let heading = NodeHeading {
                    level,
                    setext: false,
                };
                *container = self.add_child(*container, NodeValue::Heading(heading), fns + 1);
            } else if let Some(matched) = (!indented)
                .then(|| scanners::open_code_fence(rest))
                .flatten()
            {
                let code = NodeCodeBlock {
                    fenced: true,
                    fence_char: rest[0],
                    fence_length: matched,
                    fence_offset: fns - self.offset,
                    ..NodeCodeBlock::default()
                };
                *container = self.add_child(*container, NodeValue::CodeBlock(code), fns + 1);
                self.advance_offset(bytes, fns + matched - self.offset, false);
            } else if let Some(kind) = (!indented)
                .then(|| {
                    scanners::html_block_start(rest).or_else(|| {
                        (!in_paragraph)
                            .then(|| scanners::html_block_start_7(rest))
                            .flatten()
                    })
                })
                .flatten()
            {
                let html = NodeHtmlBlock {
                    block_type: kind,
                    literal: String::new(),
                };
                *container = self.add_child(*container, NodeValue::HtmlBlock(html), fns + 1);
            } else if let Some(underline) = (!indented && in_paragraph)
                .then(|| scanners::setext_heading_line(rest))
                .flatten()
            {
                if self.resolve_reference_definitions(*container) {
                    self.doc.arena[*container].value = NodeValue::Heading(NodeHeading {
                        level: underline.level(),
                        setext: true,
                    });
                    let count = bytes.len() - 1 - self.offset;
                    self.advance_offset(bytes, count, false);
                }
            } else if !indented
                && !(in_paragraph && !all_matched)
                && self.scan_thematic_break(bytes).is_some()
            {
                *container = self.add_child(*container, NodeValue::ThematicBreak, fns + 1);
                self.doc.arena[*container].sourcepos.end =
                    Position::new(self.line_number, self.curline_end_col as u32);
                let count = bytes.len() - 1 - self.offset;
                self.advance_offset(bytes, count, false);
            } else if let Some(matched) = (!indented && self.options.footnotes && depth < max_nesting)
                .then(|| scanners::footnote_definition(rest))
                .flatten()
            {
                let label_end = rest[2..]
                    .iter()
                    .position(|&b| b == b']')
                    .map_or(2, |i| i + 2);
                let definition = NodeFootnoteDefinition {
                    name: String::from_utf8_lossy(&rest[2..label_end]).into_owned(),
                    total_references: 0,
                };
                self.advance_offset(bytes, fns + matched - self.offset, false);
                *container = self.add_child(
                    *container,
                    NodeValue::FootnoteDefinition(definition),
                    fns + 1,
                );
                depth += 1;
            } else if let Some((matched, data)) = (self.indent < CODE_INDENT && depth < max_nesting)
                .then(|| scanners::list_marker(rest, in_paragraph))
                .flatten()
            {
                self.open_list_item(container, bytes, matched, data);
                depth += 2;
            } else if indented && !maybe_lazy && !self.blank {
                self.advance_offset(bytes, CODE_INDENT, true);
                let code = NodeValue::CodeBlock(NodeCodeBlock::default());
                *container = self.add_child(*container, code, self.offset + 1);
            } else {
                match self.try_extension_blocks(container, line) {
                    Some(BlockStart::Container) => depth += 1,
                    Some(BlockStart::Leaf) | None => break,
                    Some(BlockStart::Consumed) => return true,
                }
            }

            if self.accepts_lines(*container) {
                break;
            }
            maybe_lazy = false;
        }
        false
    }

    fn open_list_item(
        &mut self,
        container: &mut NodeId,
        bytes: &[u8],
        matched: usize,
        mut data: NodeList,
    ) {
        let fns = self.first_nonspace;
        self.advance_offset(bytes, fns + matched - self.offset, false);

        let saved = (self.partially_consumed_tab, self.offset, self.column);
        while self.column - saved.2 <= 5
            && bytes
                .get(self.offset)
                .is_some_and(|&b| is_space_or_tab(b))
        {
            self.advance_offset(bytes, 1, true);
        }
        let spaces = self.column - saved.2;
        if !(1..5).contains(&spaces) || bytes.get(self.offset).is_none_or(|&b| is_line_end(b)) {
            data.padding = matched + 1;
            (self.partially_consumed_tab, self.offset, self.column) = saved;
            if spaces > 0 {
                self.advance_offset(bytes, 1, true);
            }
        } else {
            data.padding = matched + spaces;
        }
        data.marker_offset = self.indent;

        let continues_list = matches!(
            &self.doc.arena[*container].value,
            NodeValue::List(list) if lists_match(list, &data)
        );
        if !continues_list {
            *container = self.add_child(*container, NodeValue::List(data), fns + 1);
        }
        *container = self.add_child(*container, NodeValue::Item(data), fns + 1);
    }

    fn try_extension_blocks(&mut self, container: &mut NodeId, line: &str) -> Option<BlockStart> {
        let registry = self.registry;
        for ext in registry.iter() {
            let mut ctx = BlockContext::new(self, line, *container);
            if let Some(start) = ext.try_open_block(&mut ctx) {
                *container = ctx.container();
                debug!(
                    "Extension '{}' opened a block at line {}",
                    ext.name(),
                    self.line_number
                );
                return Some(start);
            }
        }
        None
    }

    fn scan_thematic_break(&mut self, bytes: &[u8]) -> Option<usize> {
        let start = self.first_nonspace;
        if self.thematic_break_kill_pos > start {
            return None;
        }
        let rest = &bytes[start..];
        let found = scanners::thematic_break(rest);
        if found.is_none() {
            // No break can start before the first byte that broke this one.
            let c = rest.first().copied().unwrap_or(0);
            let stop = rest
                .iter()
                .position(|&b| is_line_end(b) || (b != c && !is_space_or_tab(b)))
                .unwrap_or(rest.len());
            self.thematic_break_kill_pos = start + stop.max(1);
        }
        found
    }

    fn add_text_to_container(&mut self, mut container: NodeId, last_matched: NodeId, line: &str) {
        let bytes = line.as_bytes();
        self.find_first_nonspace(bytes);

        if self.blank {
            if let Some(last) = self.doc.arena.last_child(container) {
                self.doc.arena[last].last_line_blank = true;
            }
        }
        let line_blank = self.blank
            && match &self.doc.arena[container].value {
                NodeValue::BlockQuote | NodeValue::Heading(_) | NodeValue::ThematicBreak => false,
                NodeValue::CodeBlock(code) => !code.fenced,
                NodeValue::Item(_) => {
                    self.doc.arena.first_child(container).is_some()
                        || self.doc.arena[container].sourcepos.start.line != self.line_number
                }
                _ => true,
            };
        self.doc.arena[container].last_line_blank = line_blank;
        let ancestors: Vec<NodeId> = self.doc.arena.ancestors(container).collect();
        for id in ancestors {
            self.doc.arena[id].last_line_blank = false;
        }

        let current_is_paragraph =
            matches!(self.doc.arena[self.current].value, NodeValue::Paragraph);
        if self.current != last_matched
            && container == last_matched
            && !self.blank
            && current_is_paragraph
        {
            // Lazy continuation.
            self.add_line(self.current, line);
            return;
        }

        self.close_unmatched_blocks(last_matched);

        let html_kind = match &self.doc.arena[container].value {
            NodeValue::HtmlBlock(html) => Some(html.block_type),
            _ => None,
        };
        let atx_heading = matches!(
            &self.doc.arena[container].value,
            NodeValue::Heading(heading) if !heading.setext
        );

        if matches!(self.doc.arena[container].value, NodeValue::CodeBlock(_)) {
            self.add_line(container, line);
        } else if let Some(kind) = html_kind {
            self.add_line(container, line);
            if scanners::html_block_end(kind, &bytes[self.first_nonspace..]) {
                if let Some(parent) = self.finalize(container) {
                    container = parent;
                }
            }
        } else if self.blank {
            // Nothing to add.
        } else if self.accepts_lines(container) {
            let text = if atx_heading {
                chop_trailing_hashes(line)
            } else {
                line
            };
            let count = self.first_nonspace - self.offset;
            self.advance_offset(bytes, count, false);
            self.add_line(container, text);
        } else {
            let fns = self.first_nonspace;
            container = self.add_child(container, NodeValue::Paragraph, fns + 1);
            let count = fns - self.offset;
            self.advance_offset(bytes, count, false);
            self.add_line(container, line);
        }
        self.current = container;
    }

    fn close_unmatched_blocks(&mut self, last_matched: NodeId) {
        while self.current != last_matched {
            match self.finalize(self.current) {
                Some(parent) => self.current = parent,
                None => break,
            }
        }
    }

    fn accepts_lines(&self, node: NodeId) -> bool {
        match &self.doc.arena[node].value {
            NodeValue::Paragraph | NodeValue::Heading(_) | NodeValue::CodeBlock(_) => true,
            NodeValue::Custom(custom) => custom.leaf,
            _ => false,
        }
    }

    fn find_first_nonspace(&mut self, bytes: &[u8]) {
        let mut chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
        if self.first_nonspace <= self.offset {
            self.first_nonspace = self.offset;
            self.first_nonspace_column = self.column;
            while let Some(&b) = bytes.get(self.first_nonspace) {
                match b {
                    b' ' => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += 1;
                        chars_to_tab -= 1;
                        if chars_to_tab == 0 {
                            chars_to_tab = TAB_STOP;
                        }
                    }
                    b'\t' => {
                        self.first_nonspace += 1;
                        self.first_nonspace_column += chars_to_tab;
                        chars_to_tab = TAB_STOP;
                    }
                    _ => break,
                }
            }
        }
        self.indent = self.first_nonspace_column - self.column;
        self.blank = bytes
            .get(self.first_nonspace)
            .is_some_and(|&b| is_line_end(b));
    }

    /// Moves `count` bytes forward, or `count` columns when `columns` is
    /// set, in which case a tab may be consumed partially.
    pub(crate) fn advance_offset(&mut self, bytes: &[u8], mut count: usize, columns: bool) {
        while count > 0 {
            let Some(&b) = bytes.get(self.offset) else {
                break;
            };
            if b == b'\t' {
                let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
                if columns {
                    self.partially_consumed_tab = chars_to_tab > count;
                    let advance = count.min(chars_to_tab);
                    self.column += advance;
                    if !self.partially_consumed_tab {
                        self.offset += 1;
                    }
                    count -= advance;
                } else {
                    self.partially_consumed_tab = false;
                    self.column += chars_to_tab;
                    self.offset += 1;
                    count -= 1;
                }
            } else {
                self.partially_consumed_tab = false;
                self.offset += 1;
                self.column += 1;
                count -= 1;
            }
        }
    }

    fn add_line(&mut self, node: NodeId, line: &str) {
        let ast = &mut self.doc.arena[node];
        if self.partially_consumed_tab {
            self.offset += 1;
            let chars_to_tab = TAB_STOP - (self.column % TAB_STOP);
            ast.content.extend(std::iter::repeat_n(' ', chars_to_tab));
        }
        if let Some(rest) = line.get(self.offset..).filter(|rest| !rest.is_empty()) {
            ast.line_offsets
                .push((ast.content.len(), self.line_number, (self.offset + 1) as u32));
            ast.content.push_str(rest);
        }
    }

    /// Appends a new open block, closing open blocks that cannot hold it.
    pub(crate) fn add_child(
        &mut self,
        mut parent: NodeId,
        value: NodeValue,
        start_column: usize,
    ) -> NodeId {
        while parent != self.doc.root && !self.can_contain(parent, &value) {
            parent = self.finalize(parent).unwrap_or(self.doc.root);
        }
        let start = Position::new(self.line_number, start_column as u32);
        let node = self
            .doc
            .arena
            .alloc(Ast::with_pos(value, SourcePos::new(start, start)));
        self.doc.arena.append_child(parent, node);
        node
    }

    fn can_contain(&self, parent: NodeId, child: &NodeValue) -> bool {
        self.registry
            .can_contain(&self.doc.arena[parent].value, child)
    }

    /// Closes a block and returns its parent.
    pub(crate) fn finalize(&mut self, node: NodeId) -> Option<NodeId> {
        let parent = self.doc.arena.parent(node);
        if !self.doc.arena[node].open {
            return parent;
        }
        self.doc.arena[node].open = false;

        let line_number = self.line_number;
        let end = match &self.doc.arena[node].value {
            NodeValue::ThematicBreak => None,
            _ if self.curline_len == 0 => Some((line_number, self.last_line_length)),
            NodeValue::Document => Some((line_number, self.curline_end_col)),
            NodeValue::CodeBlock(code) if code.fenced => Some((line_number, self.curline_end_col)),
            _ => Some((line_number.saturating_sub(1), self.last_line_length)),
        };
        if let Some((line, column)) = end {
            self.doc.arena[node].sourcepos.end = Position::new(line, column as u32);
        }

        match self.doc.arena[node].value.node_type() {
            NodeType::Paragraph => {
                if !self.resolve_reference_definitions(node) {
                    self.doc.arena.detach(node);
                }
            }
            NodeType::CodeBlock => self.finalize_code_block(node),
            NodeType::HtmlBlock => {
                let ast = &mut self.doc.arena[node];
                let content = mem::take(&mut ast.content);
                if let NodeValue::HtmlBlock(html) = &mut ast.value {
                    html.literal = content;
                }
            }
            NodeType::List => {
                let tight = self.list_is_tight(node);
                if let NodeValue::List(list) = &mut self.doc.arena[node].value {
                    list.tight = tight;
                }
            }
            NodeType::Custom => {
                let ast = &mut self.doc.arena[node];
                if let NodeValue::Custom(custom) = &mut ast.value {
                    if custom.leaf && !custom.contains_inlines && custom.literal.is_none() {
                        custom.literal = Some(mem::take(&mut ast.content));
                    }
                }
            }
            _ => {}
        }
        parent
    }

    fn finalize_code_block(&mut self, node: NodeId) {
        let default_info = self.options.default_info_string.as_deref();
        let ast = &mut self.doc.arena[node];
        let mut content = mem::take(&mut ast.content);
        let NodeValue::CodeBlock(code) = &mut ast.value else {
            return;
        };
        if code.fenced {
            let first_end = content.find(['\n', '\r']).unwrap_or(content.len());
            let info = unescape(content[..first_end].trim_matches(|c: char| c.is_ascii_whitespace()));
            code.info = if info.is_empty() {
                default_info.unwrap_or_default().to_string()
            } else {
                info
            };
            let mut body_start = first_end;
            if content[body_start..].starts_with("\r\n") {
                body_start += 2;
            } else if content[body_start..].starts_with(['\n', '\r']) {
                body_start += 1;
            }
            content.drain(..body_start);
        } else {
            remove_trailing_blank_lines(&mut content);
            content.push('\n');
        }
        code.literal = content;
    }

    fn list_is_tight(&self, list: NodeId) -> bool {
        let arena = &self.doc.arena;
        for item in arena.children(list) {
            let has_next = arena.next_sibling(item).is_some();
            if arena[item].last_line_blank && has_next {
                return false;
            }
            for child in arena.children(item) {
                if (has_next || arena.next_sibling(child).is_some())
                    && self.ends_with_blank_line(child)
                {
                    return false;
                }
            }
        }
        true
    }

    fn ends_with_blank_line(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if self.doc.arena[id].last_line_blank {
                return true;
            }
            current = match self.doc.arena[id].value {
                NodeValue::List(_) | NodeValue::Item(_) => self.doc.arena.last_child(id),
                _ => None,
            };
        }
        false
    }

    /// Pulls link reference definitions off the start of a paragraph.
    ///
    /// Returns whether anything other than whitespace is left.
    fn resolve_reference_definitions(&mut self, node: NodeId) -> bool {
        let content = mem::take(&mut self.doc.arena[node].content);
        let mut consumed = 0;
        while content[consumed..].starts_with('[') {
            match parse_reference_definition(&content[consumed..], &mut self.refmap) {
                Some(len) if len > 0 => consumed += len,
                _ => break,
            }
        }

        let ast = &mut self.doc.arena[node];
        if consumed > 0 {
            ast.content = content[consumed..].to_string();
            shift_line_offsets(&mut ast.line_offsets, consumed);
            if let Some(&(_, line, column)) = ast.line_offsets.first() {
                ast.sourcepos.start = Position::new(line, column);
            }
        } else {
            ast.content = content;
        }
        !is_blank(&ast.content)
    }

    pub(crate) fn line_number(&self) -> u32 {
        self.line_number
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn first_nonspace(&self) -> usize {
        self.first_nonspace
    }

    pub(crate) fn indent(&self) -> usize {
        self.indent
    }

    pub(crate) fn is_blank(&self) -> bool {
        self.blank
    }

    pub(crate) fn document(&self) -> &Document {
        &self.doc
    }

    pub(crate) fn document_mut(&mut self) -> &mut Document {
        &mut self.doc
    }

    pub(crate) fn options(&self) -> &ParseOptions {
        self.options
    }
}

fn lists_match(a: &NodeList, b: &NodeList) -> bool {
    a.list_type == b.list_type && a.delimiter == b.delimiter && a.bullet_char == b.bullet_char
}

/// Drops the line offsets of the first `consumed` content bytes and
/// rebases the rest.
fn shift_line_offsets(offsets: &mut Vec<(usize, u32, u32)>, consumed: usize) {
    let old = mem::take(offsets);
    for (i, &(start, line, column)) in old.iter().enumerate() {
        let next = old.get(i + 1).map_or(usize::MAX, |entry| entry.0);
        if next <= consumed {
            continue;
        }
        if start >= consumed {
            offsets.push((start - consumed, line, column));
        } else {
            offsets.push((0, line, column + (consumed - start) as u32));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfmark_ast::ListType;
    use pretty_assertions::assert_eq;

    fn parse_with(input: &[u8], options: &ParseOptions) -> (Document, ReferenceMap) {
        let registry = ExtensionRegistry::new();
        let mut parser = BlockParser::new(options, &registry);
        parser.feed(input).unwrap();
        parser.finish().unwrap()
    }

    fn parse(input: &str) -> Document {
        parse_with(input.as_bytes(), &ParseOptions::default()).0
    }

    /// Block kinds in pre-order, indented by depth.
    fn outline(doc: &Document) -> Vec<String> {
        doc.arena
            .descendants(doc.root)
            .map(|id| {
                let depth = doc.arena.ancestors(id).count();
                format!("{}{}", "  ".repeat(depth), doc.arena[id].value.node_type())
            })
            .collect()
    }

    fn first_of(doc: &Document, kind: NodeType) -> NodeId {
        doc.arena
            .descendants(doc.root)
            .find(|&id| doc.arena[id].value.node_type() == kind)
            .unwrap()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let doc = parse("# Hi #\n\npara\n");
        assert_eq!(outline(&doc), ["document", "  heading", "  paragraph"]);
        let heading = first_of(&doc, NodeType::Heading);
        assert_eq!(doc.arena[heading].content, "Hi");
        assert_eq!(
            doc.arena[heading].value,
            NodeValue::Heading(NodeHeading {
                level: 1,
                setext: false
            })
        );
    }

    #[test]
    fn test_lazy_continuation() {
        let doc = parse("> a\nb\n");
        assert_eq!(
            outline(&doc),
            ["document", "  block_quote", "    paragraph"]
        );
        let para = first_of(&doc, NodeType::Paragraph);
        assert_eq!(doc.arena[para].content, "a\nb\n");
        assert_eq!(doc.arena[para].sourcepos.to_string(), "1:3-2:1");
    }

    #[test]
    fn test_list_tightness() {
        let doc = parse("- a\n- b\n");
        let list = first_of(&doc, NodeType::List);
        match &doc.arena[list].value {
            NodeValue::List(list) => {
                assert!(list.tight);
                assert_eq!(list.list_type, ListType::Bullet);
            }
            other => panic!("unexpected {other:?}"),
        }

        let doc = parse("- a\n- b\n\n- c\n");
        let list = first_of(&doc, NodeType::List);
        assert_eq!(doc.arena.children(list).count(), 3);
        assert!(matches!(&doc.arena[list].value, NodeValue::List(list) if !list.tight));
    }

    #[test]
    fn test_ordered_list_start_and_padding() {
        let doc = parse("3. a\n   b\n");
        let item = first_of(&doc, NodeType::Item);
        match &doc.arena[item].value {
            NodeValue::Item(data) => {
                assert_eq!(data.start, 3);
                assert_eq!(data.padding, 3);
                assert_eq!(data.marker_offset, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
        let para = first_of(&doc, NodeType::Paragraph);
        assert_eq!(doc.arena[para].content, "a\nb\n");
    }

    #[test]
    fn test_fenced_code() {
        let doc = parse("``` rust extra\nfn x\n  y\n```\n");
        let code = first_of(&doc, NodeType::CodeBlock);
        match &doc.arena[code].value {
            NodeValue::CodeBlock(code) => {
                assert!(code.fenced);
                assert_eq!(code.info, "rust extra");
                assert_eq!(code.literal, "fn x\n  y\n");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(doc.arena[code].sourcepos.to_string(), "1:1-4:3");
    }

    #[test]
    fn test_unclosed_fence_runs_to_end() {
        let doc = parse("~~~\na\n\nb");
        let code = first_of(&doc, NodeType::CodeBlock);
        assert_eq!(doc.value(code).literal(), Some("a\n\nb\n"));
    }

    #[test]
    fn test_default_info_string() {
        let options = ParseOptions {
            default_info_string: Some("text".into()),
            ..ParseOptions::default()
        };
        let (doc, _) = parse_with(b"```\nx\n```\n", &options);
        let code = first_of(&doc, NodeType::CodeBlock);
        assert!(matches!(&doc.arena[code].value, NodeValue::CodeBlock(c) if c.info == "text"));
    }

    #[test]
    fn test_indented_code_strips_trailing_blank_lines() {
        let doc = parse("    code\n\n    more\n\n\n");
        let code = first_of(&doc, NodeType::CodeBlock);
        assert_eq!(doc.value(code).literal(), Some("code\n\nmore\n"));
    }

    #[test]
    fn test_tab_indented_code() {
        let doc = parse("\tfoo\tbar\n");
        let code = first_of(&doc, NodeType::CodeBlock);
        assert_eq!(doc.value(code).literal(), Some("foo\tbar\n"));
    }

    #[test]
    fn test_reference_definitions_are_removed() {
        let (doc, refmap) = parse_with(
            b"[foo]: /url \"title\"\n[bar]: <x y>\ntext\n",
            &ParseOptions::default(),
        );
        assert!(refmap.contains("FOO"));
        assert!(refmap.contains("bar"));
        let para = first_of(&doc, NodeType::Paragraph);
        assert_eq!(doc.arena[para].content, "text\n");
        assert_eq!(doc.arena[para].sourcepos.start, Position::new(3, 1));
    }

    #[test]
    fn test_definition_only_paragraph_disappears() {
        let doc = parse("[foo]: /url\n");
        assert_eq!(outline(&doc), ["document"]);
    }

    #[test]
    fn test_setext_heading() {
        let doc = parse("Foo\nbar\n---\n");
        let heading = first_of(&doc, NodeType::Heading);
        assert_eq!(
            doc.arena[heading].value,
            NodeValue::Heading(NodeHeading {
                level: 2,
                setext: true
            })
        );
        assert_eq!(doc.arena[heading].content, "Foo\nbar\n");
    }

    #[test]
    fn test_thematic_break_interrupts_paragraph() {
        let doc = parse("a\n***\nb\n");
        assert_eq!(
            outline(&doc),
            ["document", "  paragraph", "  thematic_break", "  paragraph"]
        );
    }

    #[test]
    fn test_html_block_ends_at_blank_line() {
        let doc = parse("<div>\nhi\n\nafter\n");
        assert_eq!(outline(&doc), ["document", "  html_block", "  paragraph"]);
        let html = first_of(&doc, NodeType::HtmlBlock);
        assert_eq!(doc.value(html).literal(), Some("<div>\nhi\n"));
    }

    #[test]
    fn test_html_comment_block_ends_at_terminator() {
        let doc = parse("<!-- a\nb -->\ntext\n");
        assert_eq!(outline(&doc), ["document", "  html_block", "  paragraph"]);
    }

    #[test]
    fn test_streaming_fragments() {
        let options = ParseOptions::default();
        let registry = ExtensionRegistry::new();
        let mut parser = BlockParser::new(&options, &registry);
        parser.feed(b"# He").unwrap();
        parser.feed(b"llo\r").unwrap();
        parser.feed(b"\nworld").unwrap();
        let (doc, _) = parser.finish().unwrap();

        assert_eq!(outline(&doc), ["document", "  heading", "  paragraph"]);
        let para = first_of(&doc, NodeType::Paragraph);
        assert_eq!(doc.arena[para].content, "world\n");
        assert_eq!(doc.line_starts, vec![0, 9]);
    }

    #[test]
    fn test_nul_becomes_replacement_character() {
        let doc = parse("a\0b\n");
        let para = first_of(&doc, NodeType::Paragraph);
        assert_eq!(doc.arena[para].content, "a\u{fffd}b\n");
    }

    #[test]
    fn test_invalid_utf8_is_fatal() {
        let options = ParseOptions::default();
        let registry = ExtensionRegistry::new();
        let mut parser = BlockParser::new(&options, &registry);
        let err = parser.feed(b"ok\n\xffno\n").unwrap_err();
        assert!(matches!(err, ParseError::MalformedInput { offset: 3 }));
    }

    #[test]
    fn test_nesting_limit() {
        let options = ParseOptions {
            max_nesting: 10,
            ..ParseOptions::default()
        };
        let input = format!("{} a\n", ">".repeat(30));
        let (doc, _) = parse_with(input.as_bytes(), &options);
        let quotes = doc
            .arena
            .descendants(doc.root)
            .filter(|&id| doc.arena[id].value == NodeValue::BlockQuote)
            .count();
        assert_eq!(quotes, 10);
    }

    #[test]
    fn test_footnote_definition_block() {
        let options = ParseOptions {
            footnotes: true,
            ..ParseOptions::default()
        };
        let (doc, _) = parse_with(b"[^note]: First\n    second\n", &options);
        let def = first_of(&doc, NodeType::FootnoteDefinition);
        match &doc.arena[def].value {
            NodeValue::FootnoteDefinition(def) => assert_eq!(def.name, "note"),
            other => panic!("unexpected {other:?}"),
        }
        let para = first_of(&doc, NodeType::Paragraph);
        assert_eq!(doc.arena[para].content, "First\nsecond\n");
    }

    #[test]
    fn test_bom_is_skipped() {
        let doc = parse("\u{feff}# x\n");
        assert_eq!(outline(&doc), ["document", "  heading"]);
    }
}
