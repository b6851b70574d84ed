//! Inline parsing.
//!
//! Runs over the raw content of every block that holds inlines. Code
//! spans, autolinks, raw HTML, entities and escapes are resolved as they
//! are met. Emphasis delimiters and link brackets are pushed on two stacks
//! and resolved when a closing bracket or the end of the block is reached.

use std::collections::HashMap;
use std::mem;

use gfmark_ast::{
    Arena, Ast, Document, NodeCode, NodeFootnoteReference, NodeId, NodeLink, NodeValue, Position,
    SourcePos,
};
use gfmark_text::ctype::{is_line_end, is_punct_char, is_space, is_whitespace_char};
use gfmark_text::{decode_entity, normalize_label};
use tracing::debug;

use crate::extension::{ExtensionRegistry, InlineContext};
use crate::refmap::{MAX_LINK_LABEL_LENGTH, Reference, ReferenceMap};
use crate::strings::{clean_autolink, clean_title, clean_url, decode_entities, normalize_code};
use crate::{ParseOptions, scanners};

const MAX_BACKTICKS: usize = 1000;
const MAX_LINK_PARENS: usize = 32;

const LEFT_DOUBLE_QUOTE: &str = "\u{201c}";
const RIGHT_DOUBLE_QUOTE: &str = "\u{201d}";
const LEFT_SINGLE_QUOTE: &str = "\u{2018}";
const RIGHT_SINGLE_QUOTE: &str = "\u{2019}";

/// Byte classes that interrupt a text run.
pub(crate) struct CharTables {
    special: [bool; 256],
    delimiter: [bool; 256],
    extension: [bool; 256],
}

impl CharTables {
    pub(crate) fn new(options: &ParseOptions, registry: &ExtensionRegistry) -> Self {
        let mut tables = Self {
            special: [false; 256],
            delimiter: [false; 256],
            extension: [false; 256],
        };
        for &b in b"\n\r_*`\\&<[]!" {
            tables.special[usize::from(b)] = true;
        }
        if options.smart {
            for &b in b"\"'.-" {
                tables.special[usize::from(b)] = true;
            }
        }
        for b in registry.inline_special_chars() {
            tables.special[usize::from(b)] = true;
            tables.extension[usize::from(b)] = true;
        }
        for b in registry.delimiter_chars() {
            tables.special[usize::from(b)] = true;
            tables.delimiter[usize::from(b)] = true;
        }
        tables
    }
}

#[derive(Debug, Clone, Copy)]
struct Delimiter {
    node: NodeId,
    /// Input offset of the first unconsumed delimiter byte.
    position: usize,
    orig_len: usize,
    remaining: usize,
    delim_char: u8,
    can_open: bool,
    can_close: bool,
    removed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Bracket {
    node: NodeId,
    /// Input offset of `[` or `!`.
    position: usize,
    /// Input offset right after the bracket.
    text_start: usize,
    delim_bottom: usize,
    image: bool,
    active: bool,
    bracket_after: bool,
}

/// Inline parser state for the content of one block.
pub(crate) struct Subject<'a> {
    arena: &'a mut Arena,
    options: &'a ParseOptions,
    registry: &'a ExtensionRegistry,
    refmap: &'a mut ReferenceMap,
    tables: &'a CharTables,
    input: &'a str,
    line_offsets: &'a [(usize, u32, u32)],
    block_start: Position,
    pos: usize,
    delimiters: Vec<Delimiter>,
    brackets: Vec<Bracket>,
    backticks: Box<[usize; MAX_BACKTICKS + 1]>,
    scanned_for_backticks: bool,
    no_comment_end: bool,
    no_pi_end: bool,
    no_declaration_end: bool,
    no_cdata_end: bool,
}

/// Parses inlines for every block of the document that holds them, then
/// merges adjacent text nodes.
pub(crate) fn parse_inlines(
    doc: &mut Document,
    options: &ParseOptions,
    registry: &ExtensionRegistry,
    refmap: &mut ReferenceMap,
) {
    let tables = CharTables::new(options, registry);
    let blocks: Vec<NodeId> = doc
        .arena
        .descendants(doc.root)
        .filter(|&id| doc.arena[id].value.contains_inlines())
        .collect();

    for block in blocks {
        let ast = &mut doc.arena[block];
        let content = mem::take(&mut ast.content);
        let line_offsets = mem::take(&mut ast.line_offsets);
        let block_start = ast.sourcepos.start;
        let input = content.trim_end_matches(|c: char| c.is_ascii_whitespace());

        let mut subject = Subject {
            arena: &mut doc.arena,
            options,
            registry,
            refmap: &mut *refmap,
            tables: &tables,
            input,
            line_offsets: &line_offsets,
            block_start,
            pos: 0,
            delimiters: Vec::new(),
            brackets: Vec::new(),
            backticks: Box::new([0; MAX_BACKTICKS + 1]),
            scanned_for_backticks: false,
            no_comment_end: false,
            no_pi_end: false,
            no_declaration_end: false,
            no_cdata_end: false,
        };
        while subject.parse_inline(block) {}
        subject.process_emphasis(0);
    }

    merge_adjacent_text(doc);
}

/// Joins runs of sibling text nodes into one node.
pub(crate) fn merge_adjacent_text(doc: &mut Document) {
    let ids: Vec<NodeId> = doc.arena.descendants(doc.root).collect();
    for id in ids {
        if doc.arena.parent(id).is_none() || !matches!(doc.arena[id].value, NodeValue::Text(_)) {
            continue;
        }
        while let Some(next) = doc.arena.next_sibling(id) {
            let NodeValue::Text(extra) = &mut doc.arena[next].value else {
                break;
            };
            let extra = mem::take(extra);
            let end = doc.arena[next].sourcepos.end;
            doc.arena.detach(next);
            if let NodeValue::Text(text) = &mut doc.arena[id].value {
                text.push_str(&extra);
            }
            doc.arena[id].sourcepos.end = end;
        }
    }
}

impl<'a> Subject<'a> {
    pub(crate) fn input(&self) -> &str {
        self.input
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn advance(&mut self, count: usize) {
        self.pos = (self.pos + count).min(self.input.len());
    }

    pub(crate) fn in_bracket(&self) -> bool {
        self.brackets.iter().any(|b| b.active && !b.image)
    }

    pub(crate) fn options(&self) -> &ParseOptions {
        self.options
    }

    pub(crate) fn arena_mut(&mut self) -> &mut Arena {
        self.arena
    }

    /// Allocates a closed, detached node covering `start..end`.
    pub(crate) fn make_node(&mut self, value: NodeValue, start: usize, end: usize) -> NodeId {
        let last = end.max(start + 1) - 1;
        let sourcepos = SourcePos::new(self.position_at(start), self.position_at(last));
        let mut ast = Ast::with_pos(value, sourcepos);
        ast.open = false;
        self.arena.alloc(ast)
    }

    fn position_at(&self, offset: usize) -> Position {
        let ix = self
            .line_offsets
            .partition_point(|&(start, _, _)| start <= offset);
        match ix.checked_sub(1).and_then(|i| self.line_offsets.get(i)) {
            Some(&(start, line, column)) => Position::new(line, column + (offset - start) as u32),
            None => self.block_start,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn text_node(&mut self, text: &str, start: usize) -> Option<NodeId> {
        Some(self.make_node(NodeValue::Text(text.to_string()), start, start + text.len()))
    }

    fn skip_spaces(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t')) {
            self.pos += 1;
        }
    }

    /// Parses one inline at the current position and appends it to
    /// `parent`. Returns false at the end of the input.
    fn parse_inline(&mut self, parent: NodeId) -> bool {
        let Some(c) = self.peek() else {
            return false;
        };
        let smart = self.options.smart;
        let node = match c {
            b'\n' | b'\r' => self.handle_newline(),
            b'`' => self.handle_backticks(),
            b'\\' => self.handle_backslash(),
            b'&' => self.handle_entity(),
            b'<' => self.handle_pointy_brace(),
            b'*' | b'_' => self.handle_delim(c),
            b'\'' | b'"' if smart => self.handle_delim(c),
            b'-' if smart => self.handle_hyphen(),
            b'.' if smart => self.handle_period(),
            b'[' => self.handle_open_bracket(false),
            b'!' => self.handle_bang(),
            b']' => self.handle_close_bracket(),
            c if self.tables.delimiter[usize::from(c)] => self.handle_delim(c),
            c if self.tables.extension[usize::from(c)] => {
                self.try_extensions().or_else(|| self.handle_text())
            }
            _ => self.handle_text(),
        };
        if let Some(node) = node {
            self.arena.append_child(parent, node);
        }
        true
    }

    fn handle_text(&mut self) -> Option<NodeId> {
        let input = self.input;
        let bytes = input.as_bytes();
        let start = self.pos;
        let end = bytes
            .iter()
            .skip(start + 1)
            .position(|&b| self.tables.special[usize::from(b)])
            .map_or(bytes.len(), |i| start + 1 + i);
        self.pos = end;

        let mut text = &input[start..end];
        if bytes.get(end).is_some_and(|&b| is_line_end(b)) {
            text = text.trim_end_matches([' ', '\t']);
        }
        if text.is_empty() {
            return None;
        }
        self.text_node(text, start)
    }

    fn handle_newline(&mut self) -> Option<NodeId> {
        let bytes = self.input.as_bytes();
        let nlpos = self.pos;
        if self.peek() == Some(b'\r') {
            self.pos += 1;
        }
        if self.peek() == Some(b'\n') {
            self.pos += 1;
        }
        let hard = nlpos >= 2 && bytes[nlpos - 1] == b' ' && bytes[nlpos - 2] == b' ';
        self.skip_spaces();
        let value = if hard {
            NodeValue::LineBreak
        } else {
            NodeValue::SoftBreak
        };
        Some(self.make_node(value, nlpos, nlpos + 1))
    }

    fn handle_backslash(&mut self) -> Option<NodeId> {
        let start = self.pos;
        self.pos += 1;
        match self.peek() {
            Some(b) if b.is_ascii_punctuation() => {
                self.pos += 1;
                let escaped = char::from(b).to_string();
                Some(self.make_node(NodeValue::Text(escaped), start, self.pos))
            }
            Some(b) if is_line_end(b) => {
                if b == b'\r' {
                    self.pos += 1;
                }
                if self.peek() == Some(b'\n') {
                    self.pos += 1;
                }
                self.skip_spaces();
                Some(self.make_node(NodeValue::LineBreak, start, start + 2))
            }
            _ => self.text_node("\\", start),
        }
    }

    fn handle_entity(&mut self) -> Option<NodeId> {
        let start = self.pos;
        self.pos += 1;
        match decode_entity(&self.input[self.pos..]) {
            Some((decoded, used)) => {
                self.pos += used;
                Some(self.make_node(NodeValue::Text(decoded), start, self.pos))
            }
            None => self.text_node("&", start),
        }
    }

    fn handle_backticks(&mut self) -> Option<NodeId> {
        let input = self.input;
        let start = self.pos;
        let openticks = input.as_bytes()[start..]
            .iter()
            .take_while(|&&b| b == b'`')
            .count();
        self.pos += openticks;
        let content_start = self.pos;

        match self.scan_to_closing_backticks(openticks) {
            Some(end) => {
                let literal = normalize_code(&input[content_start..end - openticks]);
                let code = NodeCode {
                    num_backticks: openticks,
                    literal,
                };
                Some(self.make_node(NodeValue::Code(code), start, end))
            }
            None => {
                self.pos = content_start;
                let ticks = &input[start..content_start];
                self.text_node(ticks, start)
            }
        }
    }

    /// Finds a backtick run of exactly `openticks` and returns the offset
    /// after it.
    fn scan_to_closing_backticks(&mut self, openticks: usize) -> Option<usize> {
        if openticks > MAX_BACKTICKS
            || (self.scanned_for_backticks && self.backticks[openticks] <= self.pos)
        {
            return None;
        }
        let bytes = self.input.as_bytes();
        loop {
            while self.pos < bytes.len() && bytes[self.pos] != b'`' {
                self.pos += 1;
            }
            if self.pos >= bytes.len() {
                self.scanned_for_backticks = true;
                return None;
            }
            let run_start = self.pos;
            let run = bytes[run_start..].iter().take_while(|&&b| b == b'`').count();
            self.pos += run;
            if run <= MAX_BACKTICKS {
                self.backticks[run] = run_start;
            }
            if run == openticks {
                return Some(self.pos);
            }
        }
    }

    fn handle_pointy_brace(&mut self) -> Option<NodeId> {
        let input = self.input;
        let start = self.pos;
        self.pos += 1;
        let rest = &input.as_bytes()[self.pos..];

        if let Some(len) = scanners::autolink_uri(rest) {
            return Some(self.make_autolink(start, len, false));
        }
        if let Some(len) = scanners::autolink_email(rest) {
            return Some(self.make_autolink(start, len, true));
        }
        if let Some(len) = self.scan_raw_html(rest) {
            self.pos += len;
            let html = input[start..self.pos].to_string();
            return Some(self.make_node(NodeValue::HtmlInline(html), start, self.pos));
        }
        self.text_node("<", start)
    }

    fn make_autolink(&mut self, start: usize, len: usize, email: bool) -> NodeId {
        let input = self.input;
        let url = &input[self.pos..self.pos + len - 1];
        self.pos += len;
        let link = NodeLink {
            url: clean_autolink(url, email),
            title: String::new(),
        };
        let node = self.make_node(NodeValue::Link(link), start, self.pos);
        let text = self.make_node(NodeValue::Text(decode_entities(url)), start + 1, self.pos - 1);
        self.arena.append_child(node, text);
        node
    }

    fn scan_raw_html(&mut self, rest: &[u8]) -> Option<usize> {
        match rest.first() {
            Some(b'!') if rest.starts_with(b"!--") => {
                if self.no_comment_end {
                    return None;
                }
                let found = scanners::html_comment(rest);
                self.no_comment_end = found.is_none();
                found
            }
            Some(b'!') if rest.starts_with(b"![CDATA[") => {
                if self.no_cdata_end {
                    return None;
                }
                let found = scanners::html_cdata(rest);
                self.no_cdata_end = found.is_none();
                found
            }
            Some(b'!') => {
                if self.no_declaration_end {
                    return None;
                }
                let found = scanners::html_declaration(rest);
                if found.is_none() && rest.get(1).is_some_and(u8::is_ascii_alphabetic) {
                    self.no_declaration_end = true;
                }
                found
            }
            Some(b'?') => {
                if self.no_pi_end {
                    return None;
                }
                let found = scanners::html_processing_instruction(rest);
                self.no_pi_end = found.is_none();
                found
            }
            _ => scanners::html_tag(rest).or_else(|| {
                self.options
                    .liberal_html_tag
                    .then(|| liberal_html_tag(rest))
                    .flatten()
            }),
        }
    }

    fn handle_hyphen(&mut self) -> Option<NodeId> {
        let start = self.pos;
        let count = self.input.as_bytes()[start..]
            .iter()
            .take_while(|&&b| b == b'-')
            .count();
        self.pos += count;
        if count == 1 {
            return self.text_node("-", start);
        }
        let (em, en) = if count % 3 == 0 {
            (count / 3, 0)
        } else if count % 2 == 0 {
            (0, count / 2)
        } else if count % 3 == 2 {
            ((count - 2) / 3, 1)
        } else {
            ((count - 4) / 3, 2)
        };
        let text = "\u{2014}".repeat(em) + &"\u{2013}".repeat(en);
        Some(self.make_node(NodeValue::Text(text), start, self.pos))
    }

    fn handle_period(&mut self) -> Option<NodeId> {
        let start = self.pos;
        if self.input[start..].starts_with("...") {
            self.pos += 3;
            Some(self.make_node(NodeValue::Text("\u{2026}".into()), start, self.pos))
        } else {
            self.pos += 1;
            self.text_node(".", start)
        }
    }

    fn handle_bang(&mut self) -> Option<NodeId> {
        let rest = &self.input.as_bytes()[self.pos..];
        let footnote_like = self.options.footnotes && rest.starts_with(b"![^");
        if rest.starts_with(b"![") && !footnote_like {
            return self.handle_open_bracket(true);
        }
        let start = self.pos;
        self.pos += 1;
        self.text_node("!", start)
    }

    fn handle_open_bracket(&mut self, image: bool) -> Option<NodeId> {
        let start = self.pos;
        let text = if image { "![" } else { "[" };
        self.pos += text.len();
        let node = self.make_node(NodeValue::Text(text.to_string()), start, self.pos);
        if let Some(last) = self.brackets.last_mut() {
            last.bracket_after = true;
        }
        self.brackets.push(Bracket {
            node,
            position: start,
            text_start: self.pos,
            delim_bottom: self.delimiters.len(),
            image,
            active: true,
            bracket_after: false,
        });
        Some(node)
    }

    /// Resolves a `]` against the innermost bracket. Returns a node to
    /// append, or `None` when a link was inserted in place of the opener.
    fn handle_close_bracket(&mut self) -> Option<NodeId> {
        let input = self.input;
        let close_start = self.pos;
        self.pos += 1;
        let Some(opener) = self.brackets.last().copied() else {
            return self.text_node("]", close_start);
        };
        if !opener.active {
            self.brackets.pop();
            return self.text_node("]", close_start);
        }
        let after_close = self.pos;

        if let Some((url, title, end)) = self.scan_inline_link(after_close) {
            self.pos = end;
            return self.close_link(opener, url, title);
        }

        let explicit = match link_label(&input[after_close..]) {
            Some((len, label)) => {
                self.pos = after_close + len;
                (!label.is_empty()).then_some(label)
            }
            None => None,
        };
        let label = match explicit {
            Some(label) => Some(label),
            None if !opener.bracket_after => Some(&input[opener.text_start..close_start]),
            None => None,
        };
        if let Some(label) = label.filter(|label| label.len() <= MAX_LINK_LABEL_LENGTH) {
            if let Some(Reference { url, title }) = self.refmap.lookup(label) {
                return self.close_link(opener, url, title);
            }
        }

        self.pos = after_close;
        if self.options.footnotes && !opener.image {
            if let Some(node) = self.close_footnote(opener, close_start) {
                return Some(node);
            }
        }
        self.brackets.pop();
        self.text_node("]", close_start)
    }

    /// Scans `(destination "title")` after a closing bracket.
    fn scan_inline_link(&self, after_close: usize) -> Option<(String, String, usize)> {
        let input = self.input;
        let bytes = input.as_bytes();
        if bytes.get(after_close) != Some(&b'(') {
            return None;
        }
        let mut n = after_close + 1;
        n += scanners::spacechars(&bytes[n..]).unwrap_or(0);
        let (url_len, url) = manual_scan_link_url(input, n)?;
        let end_url = n + url_len;
        let start_title = end_url + scanners::spacechars(&bytes[end_url..]).unwrap_or(0);
        let end_title = if start_title == end_url {
            start_title
        } else {
            start_title + scanners::link_title(&bytes[start_title..]).unwrap_or(0)
        };
        let end_all = end_title + scanners::spacechars(&bytes[end_title..]).unwrap_or(0);
        (bytes.get(end_all) == Some(&b')')).then(|| {
            (
                clean_url(url),
                clean_title(&input[start_title..end_title]),
                end_all + 1,
            )
        })
    }

    fn close_link(&mut self, opener: Bracket, url: String, title: String) -> Option<NodeId> {
        let link = NodeLink { url, title };
        let value = if opener.image {
            NodeValue::Image(link)
        } else {
            NodeValue::Link(link)
        };
        let node = self.make_node(value, opener.position, self.pos);
        let mut child = self.arena.next_sibling(opener.node);
        while let Some(current) = child {
            child = self.arena.next_sibling(current);
            self.arena.append_child(node, current);
        }
        self.arena.insert_after(opener.node, node);
        self.process_emphasis(opener.delim_bottom);
        self.arena.detach(opener.node);
        self.brackets.pop();

        // Links may not contain other links.
        if !opener.image {
            for bracket in self.brackets.iter_mut().rev().filter(|b| !b.image) {
                if !bracket.active {
                    break;
                }
                bracket.active = false;
            }
        }
        None
    }

    fn close_footnote(&mut self, opener: Bracket, close_start: usize) -> Option<NodeId> {
        let label = &self.input[opener.text_start..close_start];
        let name = label.strip_prefix('^')?;
        if name.is_empty() || name.len() > MAX_LINK_LABEL_LENGTH || name.chars().any(char::is_whitespace)
        {
            return None;
        }
        let reference = NodeFootnoteReference {
            name: name.to_string(),
            ref_num: 0,
            ix: 0,
        };
        let node = self.make_node(
            NodeValue::FootnoteReference(reference),
            opener.position,
            self.pos,
        );
        let mut child = Some(opener.node);
        while let Some(current) = child {
            child = self.arena.next_sibling(current);
            self.arena.detach(current);
        }
        self.delimiters.truncate(opener.delim_bottom);
        self.brackets.pop();
        Some(node)
    }

    fn try_extensions(&mut self) -> Option<NodeId> {
        let c = self.peek()?;
        let registry = self.registry;
        for ext in registry.iter() {
            if !ext.special_inline_chars().contains(&c) {
                continue;
            }
            let start = self.pos;
            let matched = ext.match_inline(&mut InlineContext::new(self));
            match matched {
                Some(node) if self.pos > start => return Some(node),
                Some(_) => {
                    debug!("Extension '{}' matched without consuming input", ext.name());
                    self.pos = start;
                }
                None => self.pos = start,
            }
        }
        None
    }

    /// Scans a delimiter run and reports whether it can open or close.
    fn scan_delims(&mut self, c: u8) -> (usize, bool, bool) {
        let input = self.input;
        let start = self.pos;
        let before = input[..start].chars().next_back().unwrap_or('\n');
        let count = if c == b'\'' || c == b'"' {
            1
        } else {
            input.as_bytes()[start..]
                .iter()
                .take_while(|&&b| b == c)
                .count()
        };
        self.pos += count;
        let after = input[self.pos..].chars().next().unwrap_or('\n');

        let left_flanking = !is_whitespace_char(after)
            && (!is_punct_char(after) || is_whitespace_char(before) || is_punct_char(before));
        let right_flanking = !is_whitespace_char(before)
            && (!is_punct_char(before) || is_whitespace_char(after) || is_punct_char(after));

        let (can_open, can_close) = match c {
            b'_' => (
                left_flanking && (!right_flanking || is_punct_char(before)),
                right_flanking && (!left_flanking || is_punct_char(after)),
            ),
            b'\'' | b'"' => (
                left_flanking && !right_flanking && before != ']' && before != ')',
                right_flanking,
            ),
            _ => (left_flanking, right_flanking),
        };
        (count, can_open, can_close)
    }

    fn handle_delim(&mut self, c: u8) -> Option<NodeId> {
        let start = self.pos;
        let (count, can_open, can_close) = self.scan_delims(c);
        let text = match c {
            b'\'' => RIGHT_SINGLE_QUOTE.to_string(),
            b'"' if can_close => RIGHT_DOUBLE_QUOTE.to_string(),
            b'"' => LEFT_DOUBLE_QUOTE.to_string(),
            _ => self.input[start..self.pos].to_string(),
        };
        let node = self.make_node(NodeValue::Text(text), start, self.pos);
        if can_open || can_close {
            self.delimiters.push(Delimiter {
                node,
                position: start,
                orig_len: count,
                remaining: count,
                delim_char: c,
                can_open,
                can_close,
                removed: false,
            });
        }
        Some(node)
    }

    fn next_delimiter(&self, from: usize) -> Option<usize> {
        (from..self.delimiters.len()).find(|&ix| !self.delimiters[ix].removed)
    }

    /// Matches openers and closers above `bottom` on the delimiter stack,
    /// then drops everything above it.
    fn process_emphasis(&mut self, bottom: usize) {
        let mut openers_bottom: HashMap<(u8, usize), usize> = HashMap::new();
        let mut closer = self.next_delimiter(bottom);

        while let Some(closer_ix) = closer {
            let c = self.delimiters[closer_ix];
            if !c.can_close {
                closer = self.next_delimiter(closer_ix + 1);
                continue;
            }
            let key = match c.delim_char {
                b'*' | b'_' => (c.delim_char, usize::from(c.can_open) * 3 + c.orig_len % 3),
                other => (other, 0),
            };
            let lowest = openers_bottom.get(&key).copied().unwrap_or(bottom).max(bottom);

            let mut opener = None;
            let mut ix = closer_ix;
            while ix > lowest {
                ix -= 1;
                let o = self.delimiters[ix];
                if o.removed || !o.can_open || o.delim_char != c.delim_char {
                    continue;
                }
                let odd_match = (c.can_open || o.can_close)
                    && (o.orig_len + c.orig_len) % 3 == 0
                    && !(o.orig_len % 3 == 0 && c.orig_len % 3 == 0);
                if !odd_match {
                    opener = Some(ix);
                    break;
                }
            }

            closer = match (c.delim_char, opener) {
                (b'*' | b'_', Some(opener_ix)) => {
                    let o = self.delimiters[opener_ix];
                    let used = if c.remaining >= 2 && o.remaining >= 2 { 2 } else { 1 };
                    let value = if used == 2 {
                        NodeValue::Strong
                    } else {
                        NodeValue::Emph
                    };
                    self.wrap_delimited(opener_ix, closer_ix, value, used)
                }
                (b'\'' | b'"', Some(opener_ix)) => {
                    let quote = if c.delim_char == b'\'' {
                        LEFT_SINGLE_QUOTE
                    } else {
                        LEFT_DOUBLE_QUOTE
                    };
                    let opener_node = self.delimiters[opener_ix].node;
                    if let Some(text) = self.arena[opener_node].value.text_mut() {
                        *text = quote.to_string();
                    }
                    self.delimiters[opener_ix].removed = true;
                    self.delimiters[closer_ix].removed = true;
                    self.next_delimiter(closer_ix + 1)
                }
                (b'*' | b'_' | b'\'' | b'"', None) => self.next_delimiter(closer_ix + 1),
                (ch, Some(opener_ix)) => {
                    let o = self.delimiters[opener_ix];
                    let resolved = self
                        .registry
                        .delimiter_owner(ch)
                        .and_then(|ext| ext.resolve_delimiters(ch, o.remaining, c.remaining));
                    match resolved {
                        Some((value, used)) => {
                            let used = used.clamp(1, o.remaining.min(c.remaining));
                            self.wrap_delimited(opener_ix, closer_ix, value, used)
                        }
                        None => {
                            self.delimiters[opener_ix].removed = true;
                            self.delimiters[closer_ix].removed = true;
                            self.next_delimiter(closer_ix + 1)
                        }
                    }
                }
                (_, None) => self.next_delimiter(closer_ix + 1),
            };

            if opener.is_none() {
                openers_bottom.insert(key, closer_ix);
                if !c.can_open {
                    self.delimiters[closer_ix].removed = true;
                }
            }
        }

        self.delimiters.truncate(bottom);
    }

    /// Wraps the inlines between an opener and a closer in a new node,
    /// consuming `used` delimiter bytes from each. Returns the next closer
    /// to look at.
    fn wrap_delimited(
        &mut self,
        opener_ix: usize,
        closer_ix: usize,
        value: NodeValue,
        used: usize,
    ) -> Option<usize> {
        let opener = {
            let d = &mut self.delimiters[opener_ix];
            d.remaining -= used;
            *d
        };
        let closer = {
            let d = &mut self.delimiters[closer_ix];
            d.remaining -= used;
            d.position += used;
            *d
        };
        for d in &mut self.delimiters[opener_ix + 1..closer_ix] {
            d.removed = true;
        }

        let delim = char::from(opener.delim_char);
        if let Some(text) = self.arena[opener.node].value.text_mut() {
            *text = delim.to_string().repeat(opener.remaining);
        }
        if let Some(text) = self.arena[closer.node].value.text_mut() {
            *text = delim.to_string().repeat(closer.remaining);
        }

        let start = opener.position + opener.remaining;
        let node = self.make_node(value, start, closer.position);
        let mut child = self.arena.next_sibling(opener.node);
        while let Some(current) = child {
            if current == closer.node {
                break;
            }
            child = self.arena.next_sibling(current);
            self.arena.append_child(node, current);
        }
        self.arena.insert_after(opener.node, node);

        if opener.remaining == 0 {
            self.arena.detach(opener.node);
            self.delimiters[opener_ix].removed = true;
        } else {
            let end = self.position_at(start - 1);
            self.arena[opener.node].sourcepos.end = end;
        }

        if closer.remaining == 0 {
            self.arena.detach(closer.node);
            self.delimiters[closer_ix].removed = true;
            self.next_delimiter(closer_ix + 1)
        } else {
            let begin = self.position_at(closer.position);
            self.arena[closer.node].sourcepos.start = begin;
            Some(closer_ix)
        }
    }
}

/// `<` followed by a tag name and anything up to the next `>`.
fn liberal_html_tag(rest: &[u8]) -> Option<usize> {
    let name_start = usize::from(rest.first() == Some(&b'/'));
    if !rest.get(name_start).is_some_and(u8::is_ascii_alphabetic) {
        return None;
    }
    let end = rest.iter().position(|&b| b == b'>')?;
    (!rest[..end].contains(&b'<')).then_some(end + 1)
}

/// A link label `[...]` at the start of `s`. Returns the length including
/// both brackets and the raw text between them.
pub(crate) fn link_label(s: &str) -> Option<(usize, &str)> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'[') {
        return None;
    }
    let mut i = 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
            b'[' => return None,
            b']' => return Some((i + 1, &s[1..i])),
            _ => i += 1,
        }
        if i - 1 > MAX_LINK_LABEL_LENGTH {
            return None;
        }
    }
    None
}

/// A link destination starting at `start`, either `<...>` or a run
/// without spaces and with balanced parentheses. Returns the matched
/// length and the destination text without angle brackets.
pub(crate) fn manual_scan_link_url(input: &str, start: usize) -> Option<(usize, &str)> {
    let bytes = input.as_bytes();
    if bytes.get(start) == Some(&b'<') {
        let mut i = start + 1;
        while i < bytes.len() {
            match bytes[i] {
                b'>' => return Some((i + 1 - start, &input[start + 1..i])),
                b'\\' if i + 1 < bytes.len() => i += 2,
                b'\n' | b'\r' | b'<' => return None,
                _ => i += 1,
            }
        }
        return None;
    }

    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' if bytes.get(i + 1).is_some_and(u8::is_ascii_punctuation) => i += 2,
            b'(' => {
                depth += 1;
                if depth > MAX_LINK_PARENS {
                    return None;
                }
                i += 1;
            }
            b')' => {
                if depth == 0 {
                    break;
                }
                depth -= 1;
                i += 1;
            }
            b if is_space(b) || b.is_ascii_control() => {
                if i == start {
                    return None;
                }
                break;
            }
            _ => i += 1,
        }
    }
    if i >= bytes.len() || depth != 0 {
        return None;
    }
    Some((i - start, &input[start..i]))
}

/// Skips spaces and tabs with at most one line ending among them.
fn spnl(bytes: &[u8], mut pos: usize) -> usize {
    let skip = |pos: &mut usize| {
        while matches!(bytes.get(*pos), Some(b' ' | b'\t')) {
            *pos += 1;
        }
    };
    skip(&mut pos);
    if bytes.get(pos) == Some(&b'\r') {
        pos += 1;
        if bytes.get(pos) == Some(&b'\n') {
            pos += 1;
        }
    } else if bytes.get(pos) == Some(&b'\n') {
        pos += 1;
    }
    skip(&mut pos);
    pos
}

/// Position after the line ending if only spaces and tabs are left on the
/// line starting at `pos`.
fn rest_of_line_blank(bytes: &[u8], mut pos: usize) -> Option<usize> {
    while matches!(bytes.get(pos), Some(b' ' | b'\t')) {
        pos += 1;
    }
    match bytes.get(pos) {
        None => Some(pos),
        Some(b'\r') if bytes.get(pos + 1) == Some(&b'\n') => Some(pos + 2),
        Some(b'\n' | b'\r') => Some(pos + 1),
        Some(_) => None,
    }
}

/// Parses a link reference definition at the start of `content` and adds
/// it to `refmap`. Returns the number of bytes consumed.
pub(crate) fn parse_reference_definition(
    content: &str,
    refmap: &mut ReferenceMap,
) -> Option<usize> {
    let bytes = content.as_bytes();
    let (label_len, label) = link_label(content)?;
    if normalize_label(label).is_empty() || bytes.get(label_len) != Some(&b':') {
        return None;
    }
    let dest_start = spnl(bytes, label_len + 1);
    let (url_len, url) = manual_scan_link_url(content, dest_start)?;
    let before_title = dest_start + url_len;

    let title_start = spnl(bytes, before_title);
    let title_len = if title_start == before_title {
        None
    } else {
        scanners::link_title(&bytes[title_start..])
    };

    let (title, end) = match title_len
        .and_then(|len| rest_of_line_blank(bytes, title_start + len).map(|end| (len, end)))
    {
        Some((len, end)) => (&content[title_start..title_start + len], end),
        None => ("", rest_of_line_blank(bytes, before_title)?),
    };

    refmap.insert(
        label,
        Reference {
            url: clean_url(url),
            title: clean_title(title),
        },
    );
    Some(end)
}
