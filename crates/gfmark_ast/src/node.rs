//! Node values.
//!
//! [`NodeValue`] is the tagged variant stored in every arena slot. Literal
//! content lives in the variants that need it (text, code, raw HTML); the
//! payload structs carry the per-kind metadata.

use serde::Serialize;

use crate::NodeType;

/// The kind and payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeValue {
    Document,
    BlockQuote,
    List(NodeList),
    Item(NodeList),
    TaskItem(NodeTaskItem),
    FootnoteDefinition(NodeFootnoteDefinition),
    Table(NodeTable),
    /// Table row; `true` for the header row.
    TableRow(bool),
    TableCell,
    CodeBlock(NodeCodeBlock),
    HtmlBlock(NodeHtmlBlock),
    Paragraph,
    Heading(NodeHeading),
    ThematicBreak,
    Text(String),
    SoftBreak,
    LineBreak,
    Code(NodeCode),
    HtmlInline(String),
    Emph,
    Strong,
    Strikethrough,
    Link(NodeLink),
    Image(NodeLink),
    FootnoteReference(NodeFootnoteReference),
    Custom(NodeCustom),
}

/// Bullet or ordered list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListType {
    #[default]
    Bullet,
    Ordered,
}

/// Delimiter after an ordered list number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ListDelimType {
    #[default]
    Period,
    Paren,
}

/// List and list item metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct NodeList {
    pub list_type: ListType,
    /// Columns of indentation before the marker.
    #[serde(skip)]
    pub marker_offset: usize,
    /// Columns from the marker start to the item content.
    #[serde(skip)]
    pub padding: usize,
    /// First number of an ordered list.
    pub start: usize,
    pub delimiter: ListDelimType,
    /// `-`, `+` or `*` for bullet lists.
    pub bullet_char: u8,
    /// Tight lists render items without paragraph tags.
    pub tight: bool,
}

/// Task list item state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NodeTaskItem {
    pub checked: bool,
    /// The character between the brackets (` `, `x` or `X`).
    pub symbol: char,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeFootnoteDefinition {
    /// Normalized label.
    pub name: String,
    /// Number of references pointing at this definition.
    pub total_references: u32,
}

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TableAlignment {
    #[default]
    None,
    Left,
    Center,
    Right,
}

impl TableAlignment {
    /// Returns the CSS/HTML attribute value, if any.
    pub const fn as_str(&self) -> Option<&'static str> {
        match self {
            TableAlignment::None => None,
            TableAlignment::Left => Some("left"),
            TableAlignment::Center => Some("center"),
            TableAlignment::Right => Some("right"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeTable {
    pub alignments: Vec<TableAlignment>,
}

impl NodeTable {
    /// Number of columns, fixed by the delimiter row.
    pub fn num_columns(&self) -> usize {
        self.alignments.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeCodeBlock {
    pub fenced: bool,
    #[serde(skip)]
    pub fence_char: u8,
    #[serde(skip)]
    pub fence_length: usize,
    #[serde(skip)]
    pub fence_offset: usize,
    /// Info string after the opening fence, entities and escapes resolved.
    pub info: String,
    pub literal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeHtmlBlock {
    /// HTML block start condition (1-7).
    pub block_type: u8,
    pub literal: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct NodeHeading {
    pub level: u8,
    pub setext: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeCode {
    pub num_backticks: usize,
    pub literal: String,
}

/// Destination of a link or image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeLink {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeFootnoteReference {
    /// Normalized label of the definition.
    pub name: String,
    /// Footnote number assigned in order of first reference.
    pub ref_num: u32,
    /// Occurrence index of this reference for the same footnote (1-based).
    pub ix: u32,
}

/// Node kind contributed by an extension that has no dedicated variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
pub struct NodeCustom {
    /// Kind name, conventionally `<extension>.<kind>`.
    pub name: String,
    /// Literal content for leaf kinds.
    pub literal: Option<String>,
    pub block: bool,
    pub leaf: bool,
    pub contains_inlines: bool,
}

impl NodeValue {
    /// Returns the fieldless discriminant.
    pub const fn node_type(&self) -> NodeType {
        match self {
            NodeValue::Document => NodeType::Document,
            NodeValue::BlockQuote => NodeType::BlockQuote,
            NodeValue::List(_) => NodeType::List,
            NodeValue::Item(_) => NodeType::Item,
            NodeValue::TaskItem(_) => NodeType::TaskItem,
            NodeValue::FootnoteDefinition(_) => NodeType::FootnoteDefinition,
            NodeValue::Table(_) => NodeType::Table,
            NodeValue::TableRow(_) => NodeType::TableRow,
            NodeValue::TableCell => NodeType::TableCell,
            NodeValue::CodeBlock(_) => NodeType::CodeBlock,
            NodeValue::HtmlBlock(_) => NodeType::HtmlBlock,
            NodeValue::Paragraph => NodeType::Paragraph,
            NodeValue::Heading(_) => NodeType::Heading,
            NodeValue::ThematicBreak => NodeType::ThematicBreak,
            NodeValue::Text(_) => NodeType::Text,
            NodeValue::SoftBreak => NodeType::SoftBreak,
            NodeValue::LineBreak => NodeType::LineBreak,
            NodeValue::Code(_) => NodeType::Code,
            NodeValue::HtmlInline(_) => NodeType::HtmlInline,
            NodeValue::Emph => NodeType::Emph,
            NodeValue::Strong => NodeType::Strong,
            NodeValue::Strikethrough => NodeType::Strikethrough,
            NodeValue::Link(_) => NodeType::Link,
            NodeValue::Image(_) => NodeType::Image,
            NodeValue::FootnoteReference(_) => NodeType::FootnoteReference,
            NodeValue::Custom(_) => NodeType::Custom,
        }
    }

    /// Returns true if this is a block-level node.
    pub fn is_block(&self) -> bool {
        match self {
            NodeValue::Custom(custom) => custom.block,
            other => other.node_type().is_block(),
        }
    }

    /// Returns true if this is an inline node.
    pub fn is_inline(&self) -> bool {
        match self {
            NodeValue::Custom(custom) => !custom.block,
            other => other.node_type().is_inline(),
        }
    }

    /// Returns true if this node never has children.
    pub fn is_leaf(&self) -> bool {
        match self {
            NodeValue::Custom(custom) => custom.leaf,
            other => other.node_type().is_leaf(),
        }
    }

    /// Returns true if the raw content of this block is parsed into inlines.
    pub fn contains_inlines(&self) -> bool {
        match self {
            NodeValue::Custom(custom) => custom.contains_inlines,
            other => other.node_type().contains_inlines(),
        }
    }

    /// Returns true for list items, plain or task.
    pub const fn is_item(&self) -> bool {
        matches!(self, NodeValue::Item(_) | NodeValue::TaskItem(_))
    }

    /// Literal text carried by leaf nodes.
    pub fn literal(&self) -> Option<&str> {
        match self {
            NodeValue::Text(text) | NodeValue::HtmlInline(text) => Some(text),
            NodeValue::Code(code) => Some(&code.literal),
            NodeValue::CodeBlock(block) => Some(&block.literal),
            NodeValue::HtmlBlock(block) => Some(&block.literal),
            NodeValue::Custom(custom) => custom.literal.as_deref(),
            _ => None,
        }
    }

    /// Mutable access to the literal of leaf nodes.
    pub fn literal_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeValue::Text(text) | NodeValue::HtmlInline(text) => Some(text),
            NodeValue::Code(code) => Some(&mut code.literal),
            NodeValue::CodeBlock(block) => Some(&mut block.literal),
            NodeValue::HtmlBlock(block) => Some(&mut block.literal),
            NodeValue::Custom(custom) => custom.literal.as_mut(),
            _ => None,
        }
    }

    /// Returns the text of a `Text` node.
    pub fn text(&self) -> Option<&str> {
        match self {
            NodeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the text of a `Text` node mutably.
    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self {
            NodeValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Returns the custom kind name for custom nodes.
    pub fn custom_name(&self) -> Option<&str> {
        match self {
            NodeValue::Custom(custom) => Some(&custom.name),
            _ => None,
        }
    }

    /// Returns whether `child` may be appended under `self`.
    ///
    /// These are the core containment rules; extensions may widen them.
    pub fn can_contain(&self, child: &NodeValue) -> bool {
        if child.node_type() == NodeType::Document {
            return false;
        }
        match self {
            NodeValue::Document
            | NodeValue::BlockQuote
            | NodeValue::FootnoteDefinition(_)
            | NodeValue::Item(_)
            | NodeValue::TaskItem(_) => child.is_block() && !child.is_item(),
            NodeValue::List(_) => child.is_item(),
            NodeValue::Table(_) => matches!(child, NodeValue::TableRow(_)),
            NodeValue::TableRow(_) => matches!(child, NodeValue::TableCell),
            NodeValue::Custom(custom) if custom.leaf => false,
            NodeValue::Custom(custom) if custom.block && !custom.contains_inlines => {
                child.is_block() && !child.is_item()
            }
            NodeValue::Custom(_)
            | NodeValue::Paragraph
            | NodeValue::Heading(_)
            | NodeValue::TableCell
            | NodeValue::Emph
            | NodeValue::Strong
            | NodeValue::Strikethrough
            | NodeValue::Link(_)
            | NodeValue::Image(_) => child.is_inline(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_node_type_roundtrip() {
        let value = NodeValue::Heading(NodeHeading {
            level: 2,
            setext: false,
        });
        assert_eq!(value.node_type(), NodeType::Heading);
        assert!(value.is_block());
        assert!(value.contains_inlines());
    }

    #[test]
    fn test_literal_access() {
        let mut value = NodeValue::Code(NodeCode {
            num_backticks: 1,
            literal: "x".into(),
        });
        assert_eq!(value.literal(), Some("x"));
        value.literal_mut().unwrap().push('y');
        assert_eq!(value.literal(), Some("xy"));
        assert_eq!(NodeValue::Paragraph.literal(), None);
    }

    #[rstest]
    #[case::doc_para(NodeValue::Document, NodeValue::Paragraph, true)]
    #[case::doc_item(NodeValue::Document, NodeValue::Item(NodeList::default()), false)]
    #[case::list_item(NodeValue::List(NodeList::default()), NodeValue::Item(NodeList::default()), true)]
    #[case::list_para(NodeValue::List(NodeList::default()), NodeValue::Paragraph, false)]
    #[case::para_text(NodeValue::Paragraph, NodeValue::Text(String::new()), true)]
    #[case::para_para(NodeValue::Paragraph, NodeValue::Paragraph, false)]
    #[case::text_text(NodeValue::Text(String::new()), NodeValue::Text(String::new()), false)]
    #[case::row_cell(NodeValue::TableRow(false), NodeValue::TableCell, true)]
    #[case::quote_doc(NodeValue::BlockQuote, NodeValue::Document, false)]
    fn test_can_contain(#[case] parent: NodeValue, #[case] child: NodeValue, #[case] expected: bool) {
        assert_eq!(parent.can_contain(&child), expected);
    }

    #[test]
    fn test_custom_node_classification() {
        let custom = NodeValue::Custom(NodeCustom {
            name: "math.display".into(),
            literal: Some("x^2".into()),
            block: true,
            leaf: true,
            contains_inlines: false,
        });
        assert!(custom.is_block());
        assert!(custom.is_leaf());
        assert_eq!(custom.custom_name(), Some("math.display"));
        assert!(!custom.can_contain(&NodeValue::Paragraph));
    }

    #[test]
    fn test_alignment_strings() {
        assert_eq!(TableAlignment::None.as_str(), None);
        assert_eq!(TableAlignment::Center.as_str(), Some("center"));
    }
}
