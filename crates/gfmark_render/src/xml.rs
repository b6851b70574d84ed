//! XML renderer producing CommonMark DTD-shaped output.

use std::fmt::Write as _;

use gfmark_ast::{Document, EventType, ListDelimType, ListType, NodeId, NodeValue};
use gfmark_parser::{ExtensionRegistry, RenderOptions};
use gfmark_text::escape_html;

use crate::RenderError;

const XML_HEADER: &str =
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!DOCTYPE document SYSTEM \"CommonMark.dtd\">\n";

/// Renders documents as XML.
#[derive(Debug, Clone, Copy)]
pub struct XmlRenderer<'a> {
    options: &'a RenderOptions,
    registry: &'a ExtensionRegistry,
}

impl<'a> XmlRenderer<'a> {
    pub fn new(options: &'a RenderOptions, registry: &'a ExtensionRegistry) -> Self {
        Self { options, registry }
    }

    /// Renders the whole document, including the XML declaration.
    pub fn render(&self, doc: &Document) -> Result<String, RenderError> {
        self.render_node(doc, doc.root)
    }

    /// Renders the subtree rooted at `node`.
    pub fn render_node(&self, doc: &Document, node: NodeId) -> Result<String, RenderError> {
        let mut out = String::from(XML_HEADER);
        let mut indent = 0;
        let mut column = match doc.value(node) {
            NodeValue::TableCell => {
                std::iter::successors(doc.arena.previous_sibling(node), |&id| {
                    doc.arena.previous_sibling(id)
                })
                .count()
            }
            _ => 0,
        };
        for (id, event) in doc.traverse(node) {
            let value = doc.value(id);
            let has_children = doc.arena.first_child(id).is_some();
            let name = element_name(value);
            match event {
                EventType::Enter => {
                    push_indent(&mut out, indent);
                    write!(out, "<{name}")?;
                    if self.options.sourcepos {
                        write!(out, " sourcepos=\"{}\"", doc.arena[id].sourcepos)?;
                    }
                    match value {
                        NodeValue::TableRow(_) => column = 0,
                        NodeValue::TableCell => {
                            cell_alignment(&mut out, doc, id, column)?;
                            column += 1;
                        }
                        _ => {}
                    }
                    self.attributes(&mut out, doc, id)?;

                    if let Some(literal) = literal_of(value) {
                        out.push_str(" xml:space=\"preserve\">");
                        escape_html(&mut out, literal);
                        write!(out, "</{name}>\n")?;
                        continue;
                    }
                    if has_children {
                        indent += 2;
                    } else {
                        out.push_str(" /");
                    }
                    out.push_str(">\n");
                }
                EventType::Exit => {
                    if has_children {
                        indent -= 2;
                        push_indent(&mut out, indent);
                        write!(out, "</{name}>\n")?;
                    }
                }
            }
        }
        Ok(out)
    }

    fn attributes(&self, out: &mut String, doc: &Document, id: NodeId) -> Result<(), RenderError> {
        let value = doc.value(id);
        match value {
            NodeValue::Document => out.push_str(" xmlns=\"http://commonmark.org/xml/1.0\""),
            NodeValue::List(list) => {
                match list.list_type {
                    ListType::Bullet => out.push_str(" type=\"bullet\""),
                    ListType::Ordered => {
                        write!(out, " type=\"ordered\" start=\"{}\"", list.start)?;
                        out.push_str(match list.delimiter {
                            ListDelimType::Period => " delim=\"period\"",
                            ListDelimType::Paren => " delim=\"paren\"",
                        });
                    }
                }
                write!(out, " tight=\"{}\"", list.tight)?;
            }
            NodeValue::TaskItem(task) => write!(out, " checked=\"{}\"", task.checked)?,
            NodeValue::Heading(heading) => write!(out, " level=\"{}\"", heading.level)?,
            NodeValue::CodeBlock(block) if !block.info.is_empty() => {
                out.push_str(" info=\"");
                escape_html(out, &block.info);
                out.push('"');
            }
            NodeValue::Link(link) | NodeValue::Image(link) => {
                out.push_str(" destination=\"");
                escape_html(out, &link.url);
                out.push_str("\" title=\"");
                escape_html(out, &link.title);
                out.push('"');
            }
            NodeValue::FootnoteDefinition(def) => {
                out.push_str(" label=\"");
                escape_html(out, &def.name);
                out.push('"');
            }
            NodeValue::FootnoteReference(reference) => {
                out.push_str(" label=\"");
                escape_html(out, &reference.name);
                write!(out, "\" num=\"{}\"", reference.ref_num)?;
            }
            NodeValue::Custom(custom) => {
                out.push_str(" name=\"");
                escape_html(out, &custom.name);
                out.push('"');
            }
            _ => {}
        }

        for ext in self.registry.iter() {
            for (key, val) in ext.render_xml_attrs(value) {
                write!(out, " {key}=\"")?;
                escape_html(out, &val);
                out.push('"');
            }
        }
        Ok(())
    }
}

fn element_name(value: &NodeValue) -> &'static str {
    match value {
        NodeValue::TableRow(true) => "table_header",
        NodeValue::Custom(custom) if custom.block => "custom_block",
        NodeValue::Custom(_) => "custom_inline",
        other => other.node_type().as_str(),
    }
}

/// Literal content written as element text.
fn literal_of(value: &NodeValue) -> Option<&str> {
    match value {
        NodeValue::Text(_)
        | NodeValue::Code(_)
        | NodeValue::HtmlBlock(_)
        | NodeValue::HtmlInline(_)
        | NodeValue::CodeBlock(_) => value.literal(),
        NodeValue::Custom(custom) if custom.leaf => custom.literal.as_deref(),
        _ => None,
    }
}

/// Writes the `align` attribute of the cell in `column`.
fn cell_alignment(
    out: &mut String,
    doc: &Document,
    cell: NodeId,
    column: usize,
) -> Result<(), RenderError> {
    let table = doc
        .arena
        .parent(cell)
        .and_then(|row| doc.arena.parent(row));
    if let Some(NodeValue::Table(table)) = table.map(|id| doc.value(id))
        && let Some(align) = table.alignments.get(column).and_then(|a| a.as_str())
    {
        write!(out, " align=\"{align}\"")?;
    }
    Ok(())
}

fn push_indent(out: &mut String, indent: usize) {
    out.extend(std::iter::repeat_n(' ', indent));
}
