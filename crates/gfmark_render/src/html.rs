//! HTML renderer.
//!
//! Output follows the cmark-gfm conventions: block tags are followed by a
//! newline, tight lists drop paragraph tags, raw HTML is replaced by a
//! comment unless unsafe output is enabled, and footnotes are collected in
//! a `<section class="footnotes">` at the end of the document.
//!
//! Extensions that claim a node kind through [`Extension::renders`] are
//! called first. When a callback fails its partial output is discarded, the
//! failure is recorded in the [`RenderReport`] and the node is rendered by
//! the default handler instead.
//!
//! [`Extension::renders`]: gfmark_parser::Extension::renders

use std::collections::HashSet;
use std::fmt::Write as _;
use std::time::Instant;

use gfmark_ast::{Document, EventType, ListType, NodeId, NodeValue};
use gfmark_parser::{ExtensionRegistry, HtmlContext, RenderFlow, RenderOptions};
use gfmark_text::HtmlWriter;
use tracing::{debug, warn};

use crate::url::is_dangerous_url;
use crate::{CallbackFailure, RenderError};

const RAW_HTML_OMITTED: &str = "<!-- raw HTML omitted -->";

/// Rendered HTML plus the extension callbacks that failed on the way.
#[derive(Debug, Clone, Default)]
pub struct RenderReport {
    pub html: String,
    pub errors: Vec<CallbackFailure>,
}

impl RenderReport {
    /// Returns true if no callback failed.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Renders documents to HTML.
///
/// The renderer keeps no state between calls, so the same document always
/// renders to the same bytes.
#[derive(Debug, Clone, Copy)]
pub struct HtmlRenderer<'a> {
    options: &'a RenderOptions,
    registry: &'a ExtensionRegistry,
    strict: bool,
}

impl<'a> HtmlRenderer<'a> {
    pub fn new(options: &'a RenderOptions, registry: &'a ExtensionRegistry) -> Self {
        Self {
            options,
            registry,
            strict: false,
        }
    }

    /// In strict mode [`HtmlRenderer::render`] fails with
    /// [`RenderError::Callbacks`] if any extension callback failed.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Renders the whole document.
    pub fn render(&self, doc: &Document) -> Result<String, RenderError> {
        self.render_node(doc, doc.root)
    }

    /// Renders the subtree rooted at `node`.
    pub fn render_node(&self, doc: &Document, node: NodeId) -> Result<String, RenderError> {
        let report = self.render_node_report(doc, node)?;
        if self.strict && !report.errors.is_empty() {
            return Err(RenderError::callbacks(report.errors));
        }
        Ok(report.html)
    }

    /// Renders the whole document and collects callback failures instead of
    /// failing.
    pub fn render_report(&self, doc: &Document) -> Result<RenderReport, RenderError> {
        self.render_node_report(doc, doc.root)
    }

    /// Like [`HtmlRenderer::render_report`], for the subtree at `node`.
    pub fn render_node_report(
        &self,
        doc: &Document,
        node: NodeId,
    ) -> Result<RenderReport, RenderError> {
        let started = Instant::now();
        let mut state = HtmlState {
            doc,
            options: self.options,
            registry: self.registry,
            out: HtmlWriter::with_capacity(doc.arena.len() * 16),
            footnote_ix: 0,
            written_footnote_ix: 0,
            in_tbody: false,
            cell_ix: 0,
            failed: HashSet::new(),
            errors: Vec::new(),
        };
        state.run(node)?;
        debug!(
            "Rendered {} bytes of HTML in {:?} ({} callback failures)",
            state.out.len(),
            started.elapsed(),
            state.errors.len()
        );
        Ok(RenderReport {
            html: state.out.into_string(),
            errors: state.errors,
        })
    }
}

struct HtmlState<'a> {
    doc: &'a Document,
    options: &'a RenderOptions,
    registry: &'a ExtensionRegistry,
    out: HtmlWriter,
    /// Number of footnote definitions entered so far.
    footnote_ix: u32,
    /// Footnote whose back references were already written.
    written_footnote_ix: u32,
    in_tbody: bool,
    /// Column of the next cell in the current row.
    cell_ix: usize,
    failed: HashSet<NodeId>,
    errors: Vec<CallbackFailure>,
}

impl<'a> HtmlState<'a> {
    fn run(&mut self, root: NodeId) -> Result<(), RenderError> {
        let doc = self.doc;
        if matches!(doc.value(root), NodeValue::TableCell) {
            self.cell_ix = std::iter::successors(doc.arena.previous_sibling(root), |&id| {
                doc.arena.previous_sibling(id)
            })
            .count();
        }
        let mut iter = doc.traverse(root);
        while let Some((node, event)) = iter.next() {
            let entering = event == EventType::Enter;
            let flow = self.dispatch(node, entering)?;
            if entering && flow == RenderFlow::SkipChildren && !doc.value(node).is_leaf() {
                iter.skip_children(node);
            }
        }
        if self.footnote_ix > 0 {
            self.out.raw("</ol>\n</section>\n");
        }
        Ok(())
    }

    fn dispatch(&mut self, node: NodeId, entering: bool) -> Result<RenderFlow, RenderError> {
        let doc = self.doc;
        let registry = self.registry;
        let value = doc.value(node);
        if !self.failed.contains(&node)
            && let Some(ext) = registry.renderer_for(value)
        {
            let mark = self.out.len();
            let result = {
                let mut ctx = HtmlContext::new(doc, self.options, &mut self.out);
                ext.render_html(&mut ctx, node, entering)
            };
            match result {
                Ok(flow) => return Ok(flow),
                Err(error) => {
                    self.out.truncate(mark);
                    warn!(
                        "Extension '{}' failed to render {} node: {}",
                        ext.name(),
                        value.node_type(),
                        error
                    );
                    self.failed.insert(node);
                    self.errors.push(CallbackFailure {
                        node,
                        node_type: value.node_type(),
                        error,
                    });
                }
            }
        }
        self.render_default(node, entering)
    }

    fn sourcepos(&mut self, node: NodeId) -> Result<(), RenderError> {
        if self.options.sourcepos {
            write!(
                self.out,
                " data-sourcepos=\"{}\"",
                self.doc.arena[node].sourcepos
            )?;
        }
        Ok(())
    }

    fn raw_html(&mut self, literal: &str) {
        if self.options.unsafe_html {
            let filtered = self.registry.filter_raw_html(literal);
            self.out.raw(&filtered);
        } else {
            self.out.raw(RAW_HTML_OMITTED);
        }
    }

    fn url(&mut self, url: &str) {
        if self.options.unsafe_html || !is_dangerous_url(url) {
            self.out.href(url);
        }
    }

    fn render_default(&mut self, node: NodeId, entering: bool) -> Result<RenderFlow, RenderError> {
        let doc = self.doc;
        match doc.value(node) {
            NodeValue::Document => {}

            NodeValue::BlockQuote => {
                self.out.cr();
                if entering {
                    self.out.raw("<blockquote");
                    self.sourcepos(node)?;
                    self.out.raw(">\n");
                } else {
                    self.out.raw("</blockquote>\n");
                }
            }

            NodeValue::List(list) => {
                self.out.cr();
                match (list.list_type, entering) {
                    (ListType::Bullet, true) => {
                        self.out.raw("<ul");
                        self.sourcepos(node)?;
                        self.out.raw(">\n");
                    }
                    (ListType::Ordered, true) => {
                        self.out.raw("<ol");
                        if list.start != 1 {
                            write!(self.out, " start=\"{}\"", list.start)?;
                        }
                        self.sourcepos(node)?;
                        self.out.raw(">\n");
                    }
                    (ListType::Bullet, false) => self.out.raw("</ul>\n"),
                    (ListType::Ordered, false) => self.out.raw("</ol>\n"),
                }
            }

            NodeValue::Item(_) => {
                if entering {
                    self.out.cr();
                    self.out.raw("<li");
                    self.sourcepos(node)?;
                    self.out.raw(">");
                } else {
                    self.out.raw("</li>\n");
                }
            }

            NodeValue::TaskItem(task) => {
                if entering {
                    self.out.cr();
                    self.out.raw("<li");
                    self.sourcepos(node)?;
                    self.out.raw(">");
                    if task.checked {
                        self.out
                            .raw("<input type=\"checkbox\" checked=\"\" disabled=\"\" /> ");
                    } else {
                        self.out.raw("<input type=\"checkbox\" disabled=\"\" /> ");
                    }
                } else {
                    self.out.raw("</li>\n");
                }
            }

            NodeValue::FootnoteDefinition(def) => {
                if entering {
                    if self.footnote_ix == 0 {
                        self.out.cr();
                        self.out
                            .raw("<section class=\"footnotes\" data-footnotes>\n<ol>\n");
                    }
                    self.footnote_ix += 1;
                    self.out.raw("<li id=\"fn-");
                    self.out.href(&def.name);
                    self.out.raw("\">\n");
                } else {
                    if self.put_footnote_backref(node)? {
                        self.out.raw("\n");
                    }
                    self.out.raw("</li>\n");
                }
            }

            NodeValue::Heading(heading) => {
                if entering {
                    self.out.cr();
                    write!(self.out, "<h{}", heading.level)?;
                    self.sourcepos(node)?;
                    self.out.raw(">");
                } else {
                    write!(self.out, "</h{}>\n", heading.level)?;
                }
            }

            NodeValue::CodeBlock(block) => {
                self.out.cr();
                self.code_block_open(node, &block.info)?;
                self.out.text(&block.literal);
                self.out.raw("</code></pre>\n");
            }

            NodeValue::HtmlBlock(block) => {
                self.out.cr();
                self.raw_html(&block.literal);
                self.out.cr();
            }

            NodeValue::ThematicBreak => {
                self.out.cr();
                self.out.raw("<hr");
                self.sourcepos(node)?;
                self.out.raw(" />\n");
            }

            NodeValue::Paragraph => {
                let parent = doc.arena.parent(node);
                let tight = parent
                    .and_then(|p| doc.arena.parent(p))
                    .is_some_and(|gp| matches!(doc.value(gp), NodeValue::List(list) if list.tight));
                if !tight {
                    if entering {
                        self.out.cr();
                        self.out.raw("<p");
                        self.sourcepos(node)?;
                        self.out.raw(">");
                    } else {
                        if let Some(parent) = parent
                            && matches!(doc.value(parent), NodeValue::FootnoteDefinition(_))
                            && doc.arena.next_sibling(node).is_none()
                        {
                            self.out.raw(" ");
                            self.put_footnote_backref(parent)?;
                        }
                        self.out.raw("</p>\n");
                    }
                }
            }

            NodeValue::Table(_) => {
                if entering {
                    self.out.cr();
                    self.out.raw("<table");
                    self.sourcepos(node)?;
                    self.out.raw(">\n");
                    self.in_tbody = false;
                } else {
                    if self.in_tbody {
                        self.out.cr();
                        self.out.raw("</tbody>\n");
                    }
                    self.out.cr();
                    self.out.raw("</table>\n");
                    self.in_tbody = false;
                }
            }

            NodeValue::TableRow(header) => {
                self.out.cr();
                if entering {
                    if *header {
                        self.out.raw("<thead>\n");
                    } else if !self.in_tbody {
                        self.out.raw("<tbody>\n");
                        self.in_tbody = true;
                    }
                    self.cell_ix = 0;
                    self.out.raw("<tr");
                    self.sourcepos(node)?;
                    self.out.raw(">\n");
                } else {
                    self.out.raw("</tr>\n");
                    if *header {
                        self.out.cr();
                        self.out.raw("</thead>\n");
                    }
                }
            }

            NodeValue::TableCell => {
                let header = doc
                    .arena
                    .parent(node)
                    .is_some_and(|row| matches!(doc.value(row), NodeValue::TableRow(true)));
                if entering {
                    self.out.cr();
                    self.out.raw(if header { "<th" } else { "<td" });
                    let column = self.cell_ix;
                    self.cell_ix += 1;
                    if let Some(align) = self.cell_alignment(node, column) {
                        if self.options.table_prefer_style_attributes {
                            write!(self.out, " style=\"text-align: {align}\"")?;
                        } else {
                            write!(self.out, " align=\"{align}\"")?;
                        }
                    }
                    self.sourcepos(node)?;
                    self.out.raw(">");
                } else {
                    self.out.raw(if header { "</th>" } else { "</td>" });
                    self.out.cr();
                }
            }

            NodeValue::Text(text) => self.out.text(text),

            NodeValue::SoftBreak => {
                if self.options.hardbreaks {
                    self.out.raw("<br />\n");
                } else if self.options.nobreaks {
                    self.out.raw(" ");
                } else {
                    self.out.raw("\n");
                }
            }

            NodeValue::LineBreak => self.out.raw("<br />\n"),

            NodeValue::Code(code) => {
                self.out.raw("<code>");
                self.out.text(&code.literal);
                self.out.raw("</code>");
            }

            NodeValue::HtmlInline(literal) => self.raw_html(literal),

            NodeValue::Emph => self.out.raw(if entering { "<em>" } else { "</em>" }),
            NodeValue::Strong => {
                self.out
                    .raw(if entering { "<strong>" } else { "</strong>" })
            }
            NodeValue::Strikethrough => self.out.raw(if entering { "<del>" } else { "</del>" }),

            NodeValue::Link(link) => {
                if entering {
                    self.out.raw("<a href=\"");
                    self.url(&link.url);
                    self.out.raw("\"");
                    if !link.title.is_empty() {
                        self.out.raw(" title=\"");
                        self.out.text(&link.title);
                        self.out.raw("\"");
                    }
                    self.out.raw(">");
                } else {
                    self.out.raw("</a>");
                }
            }

            NodeValue::Image(link) => {
                if !entering {
                    return Ok(RenderFlow::Continue);
                }
                self.out.raw("<img src=\"");
                self.url(&link.url);
                self.out.raw("\" alt=\"");
                self.alt_text(node);
                self.out.raw("\"");
                if !link.title.is_empty() {
                    self.out.raw(" title=\"");
                    self.out.text(&link.title);
                    self.out.raw("\"");
                }
                self.out.raw(" />");
                return Ok(RenderFlow::SkipChildren);
            }

            NodeValue::FootnoteReference(reference) => {
                self.out.raw("<sup class=\"footnote-ref\"><a href=\"#fn-");
                self.out.href(&reference.name);
                self.out.raw("\" id=\"fnref-");
                self.out.href(&reference.name);
                if reference.ix > 1 {
                    write!(self.out, "-{}", reference.ix)?;
                }
                write!(
                    self.out,
                    "\" data-footnote-ref>{}</a></sup>",
                    reference.ref_num
                )?;
            }

            NodeValue::Custom(custom) => {
                if custom.block {
                    self.out.cr();
                }
                if entering && let Some(literal) = &custom.literal {
                    self.out.text(literal);
                }
            }
        }
        Ok(RenderFlow::Continue)
    }

    fn code_block_open(&mut self, node: NodeId, info: &str) -> Result<(), RenderError> {
        if info.is_empty() {
            self.out.raw("<pre");
            self.sourcepos(node)?;
            self.out.raw("><code>");
            return Ok(());
        }

        let (lang, meta) = match info.find(|c: char| c.is_ascii_whitespace()) {
            Some(i) => (&info[..i], Some(&info[i + 1..])),
            None => (info, None),
        };
        let meta = meta.filter(|_| self.options.full_info_string);

        self.out.raw("<pre");
        self.sourcepos(node)?;
        if self.options.github_pre_lang {
            self.out.raw(" lang=\"");
            self.out.text(lang);
            if let Some(meta) = meta {
                self.out.raw("\" data-meta=\"");
                self.out.text(meta);
            }
            self.out.raw("\"><code>");
        } else {
            self.out.raw("><code class=\"language-");
            self.out.text(lang);
            if let Some(meta) = meta {
                self.out.raw("\" data-meta=\"");
                self.out.text(meta);
            }
            self.out.raw("\">");
        }
        Ok(())
    }

    /// Writes the back references of a footnote definition, once.
    fn put_footnote_backref(&mut self, def_node: NodeId) -> Result<bool, RenderError> {
        if self.written_footnote_ix >= self.footnote_ix {
            return Ok(false);
        }
        let NodeValue::FootnoteDefinition(def) = self.doc.value(def_node) else {
            return Ok(false);
        };
        self.written_footnote_ix = self.footnote_ix;
        let m = self.written_footnote_ix;

        self.out.raw("<a href=\"#fnref-");
        self.out.href(&def.name);
        write!(
            self.out,
            "\" class=\"footnote-backref\" data-footnote-backref data-footnote-backref-idx=\"{m}\" aria-label=\"Back to reference {m}\">\u{21a9}</a>"
        )?;

        for n in 2..=def.total_references {
            self.out.raw("<a href=\"#fnref-");
            self.out.href(&def.name);
            write!(
                self.out,
                "-{n}\" class=\"footnote-backref\" data-footnote-backref data-footnote-backref-idx=\"{m}-{n}\" aria-label=\"Back to reference {m}-{n}\">\u{21a9}<sup class=\"footnote-ref\">{n}</sup></a>"
            )?;
        }
        Ok(true)
    }

    fn cell_alignment(&self, cell: NodeId, column: usize) -> Option<&'static str> {
        let arena = &self.doc.arena;
        let table = arena.parent(arena.parent(cell)?)?;
        let NodeValue::Table(table) = self.doc.value(table) else {
            return None;
        };
        table.alignments.get(column)?.as_str()
    }

    /// Writes the escaped plain text of an image description.
    fn alt_text(&mut self, image: NodeId) {
        let doc = self.doc;
        for id in doc.arena.descendants(image).skip(1) {
            match doc.value(id) {
                NodeValue::SoftBreak | NodeValue::LineBreak => self.out.raw(" "),
                value => {
                    if let Some(literal) = value.literal() {
                        self.out.text(literal);
                    }
                }
            }
        }
    }
}
