//! Node type discriminants.
//!
//! [`NodeType`] mirrors the variants of [`crate::NodeValue`] without their
//! payloads. It is what renderers and extensions dispatch on.

use serde::{Deserialize, Serialize};

/// Node kinds of the Markdown AST.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    // Document structure
    /// Root document node.
    Document,

    // Container blocks
    /// Block quote.
    BlockQuote,
    /// Ordered or bullet list.
    List,
    /// Item in a list.
    Item,
    /// List item carrying a task checkbox (tasklist extension).
    TaskItem,
    /// Footnote definition.
    FootnoteDefinition,
    /// Table (table extension).
    Table,
    /// Table row (table extension).
    TableRow,
    /// Table cell (table extension).
    TableCell,

    // Leaf blocks
    /// Fenced or indented code block.
    CodeBlock,
    /// Raw HTML block.
    HtmlBlock,
    /// Paragraph containing inline content.
    Paragraph,
    /// ATX or setext heading.
    Heading,
    /// Thematic break.
    ThematicBreak,

    // Inlines
    /// Literal text.
    Text,
    /// Soft line break.
    #[serde(rename = "softbreak")]
    SoftBreak,
    /// Hard line break.
    #[serde(rename = "linebreak")]
    LineBreak,
    /// Code span.
    Code,
    /// Raw inline HTML.
    HtmlInline,
    /// Emphasis.
    Emph,
    /// Strong emphasis.
    Strong,
    /// Strikethrough (strikethrough extension).
    Strikethrough,
    /// Hyperlink.
    Link,
    /// Image.
    Image,
    /// Footnote reference.
    FootnoteReference,

    /// Node kind contributed by a third-party extension.
    Custom,
}

impl NodeType {
    /// Returns true if this node type is a block element.
    #[inline]
    pub const fn is_block(&self) -> bool {
        matches!(
            self,
            NodeType::Document
                | NodeType::BlockQuote
                | NodeType::List
                | NodeType::Item
                | NodeType::TaskItem
                | NodeType::FootnoteDefinition
                | NodeType::Table
                | NodeType::TableRow
                | NodeType::TableCell
                | NodeType::CodeBlock
                | NodeType::HtmlBlock
                | NodeType::Paragraph
                | NodeType::Heading
                | NodeType::ThematicBreak
        )
    }

    /// Returns true if this node type is an inline element.
    #[inline]
    pub const fn is_inline(&self) -> bool {
        matches!(
            self,
            NodeType::Text
                | NodeType::SoftBreak
                | NodeType::LineBreak
                | NodeType::Code
                | NodeType::HtmlInline
                | NodeType::Emph
                | NodeType::Strong
                | NodeType::Strikethrough
                | NodeType::Link
                | NodeType::Image
                | NodeType::FootnoteReference
        )
    }

    /// Returns true if nodes of this type never have children.
    ///
    /// Custom nodes decide per value, see [`crate::NodeValue::is_leaf`].
    #[inline]
    pub const fn is_leaf(&self) -> bool {
        matches!(
            self,
            NodeType::CodeBlock
                | NodeType::HtmlBlock
                | NodeType::ThematicBreak
                | NodeType::Text
                | NodeType::SoftBreak
                | NodeType::LineBreak
                | NodeType::Code
                | NodeType::HtmlInline
                | NodeType::FootnoteReference
        )
    }

    /// Returns true if the block's raw content is parsed into inlines.
    #[inline]
    pub const fn contains_inlines(&self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::TableCell
        )
    }

    /// Returns the snake_case name used in serialized trees.
    pub const fn as_str(&self) -> &'static str {
        match self {
            NodeType::Document => "document",
            NodeType::BlockQuote => "block_quote",
            NodeType::List => "list",
            NodeType::Item => "item",
            NodeType::TaskItem => "task_item",
            NodeType::FootnoteDefinition => "footnote_definition",
            NodeType::Table => "table",
            NodeType::TableRow => "table_row",
            NodeType::TableCell => "table_cell",
            NodeType::CodeBlock => "code_block",
            NodeType::HtmlBlock => "html_block",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::ThematicBreak => "thematic_break",
            NodeType::Text => "text",
            NodeType::SoftBreak => "softbreak",
            NodeType::LineBreak => "linebreak",
            NodeType::Code => "code",
            NodeType::HtmlInline => "html_inline",
            NodeType::Emph => "emph",
            NodeType::Strong => "strong",
            NodeType::Strikethrough => "strikethrough",
            NodeType::Link => "link",
            NodeType::Image => "image",
            NodeType::FootnoteReference => "footnote_reference",
            NodeType::Custom => "custom",
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::paragraph(NodeType::Paragraph, true, false)]
    #[case::document(NodeType::Document, true, false)]
    #[case::text(NodeType::Text, false, true)]
    #[case::link(NodeType::Link, false, true)]
    #[case::table_cell(NodeType::TableCell, true, false)]
    fn test_block_inline_classification(
        #[case] ty: NodeType,
        #[case] block: bool,
        #[case] inline: bool,
    ) {
        assert_eq!(ty.is_block(), block);
        assert_eq!(ty.is_inline(), inline);
    }

    #[test]
    fn test_leaf_types() {
        assert!(NodeType::Text.is_leaf());
        assert!(NodeType::CodeBlock.is_leaf());
        assert!(!NodeType::Image.is_leaf());
        assert!(!NodeType::Custom.is_leaf());
    }

    #[test]
    fn test_contains_inlines() {
        assert!(NodeType::Paragraph.contains_inlines());
        assert!(NodeType::TableCell.contains_inlines());
        assert!(!NodeType::CodeBlock.contains_inlines());
    }

    #[test]
    fn test_display_matches_serde() {
        for ty in [
            NodeType::BlockQuote,
            NodeType::HtmlInline,
            NodeType::TaskItem,
            NodeType::SoftBreak,
        ] {
            let json = serde_json::to_string(&ty).unwrap();
            assert_eq!(json, format!("\"{}\"", ty));
        }
    }
}
