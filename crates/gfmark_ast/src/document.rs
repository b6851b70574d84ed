//! The document: one arena plus its root.

use serde::Serialize;
use serde::ser::SerializeMap;

use crate::{Arena, Ast, NodeId, NodeValue, Position, SourcePos, Span, Traverse};

/// Structural errors reported by checked tree operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// The parent kind cannot hold the child kind.
    InvalidChild {
        parent: &'static str,
        child: &'static str,
    },
    /// A node would become its own ancestor.
    Cycle(NodeId),
    /// Parent and sibling links disagree.
    Inconsistent { node: NodeId, reason: &'static str },
}

impl std::fmt::Display for TreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeError::InvalidChild { parent, child } => {
                write!(f, "a {parent} node cannot contain a {child} node")
            }
            TreeError::Cycle(node) => write!(f, "node {} would contain itself", node.index()),
            TreeError::Inconsistent { node, reason } => {
                write!(f, "node {} is inconsistent: {reason}", node.index())
            }
        }
    }
}

impl std::error::Error for TreeError {}

/// A parsed document.
///
/// The document exclusively owns its node tree. It is created per parse and
/// is never shared between parses.
#[derive(Debug, Clone)]
pub struct Document {
    /// Node storage.
    pub arena: Arena,
    /// Handle of the `Document` node.
    pub root: NodeId,
    /// Byte offset at which each source line starts.
    pub line_starts: Vec<usize>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Creates an empty document with a single root node.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.alloc(Ast::new(NodeValue::Document));
        Self {
            arena,
            root,
            line_starts: vec![0],
        }
    }

    /// Returns the value of a node.
    #[inline]
    pub fn value(&self, id: NodeId) -> &NodeValue {
        &self.arena[id].value
    }

    /// Returns the value of a node mutably.
    #[inline]
    pub fn value_mut(&mut self, id: NodeId) -> &mut NodeValue {
        &mut self.arena[id].value
    }

    /// Allocates a detached node.
    pub fn create(&mut self, value: NodeValue, sourcepos: SourcePos) -> NodeId {
        let mut ast = Ast::with_pos(value, sourcepos);
        ast.open = false;
        self.arena.alloc(ast)
    }

    /// Appends `child` under `parent` after checking containment rules.
    pub fn append_checked(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        self.arena.append_child(parent, child);
        Ok(())
    }

    /// Inserts `new` after `node` after checking containment rules.
    pub fn insert_after_checked(&mut self, node: NodeId, new: NodeId) -> Result<(), TreeError> {
        if let Some(parent) = self.arena.parent(node) {
            self.check_insert(parent, new)?;
        }
        self.arena.insert_after(node, new);
        Ok(())
    }

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if parent == child || self.arena.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::Cycle(child));
        }
        let (p, c) = (self.value(parent), self.value(child));
        if !p.can_contain(c) {
            return Err(TreeError::InvalidChild {
                parent: p.node_type().as_str(),
                child: c.node_type().as_str(),
            });
        }
        Ok(())
    }

    /// Starts an enter/exit traversal at `node`.
    pub fn traverse(&self, node: NodeId) -> Traverse<'_> {
        Traverse::new(&self.arena, node)
    }

    /// Concatenates the literal text below `node`.
    ///
    /// Line breaks contribute a newline; raw HTML is skipped.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        for id in self.arena.descendants(node) {
            match self.value(id) {
                NodeValue::Text(text) => out.push_str(text),
                NodeValue::Code(code) => out.push_str(&code.literal),
                NodeValue::CodeBlock(block) => out.push_str(&block.literal),
                NodeValue::SoftBreak | NodeValue::LineBreak => out.push('\n'),
                NodeValue::Custom(custom) => {
                    if let Some(literal) = &custom.literal {
                        out.push_str(literal);
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Byte range of a node in the original source.
    pub fn span(&self, id: NodeId) -> Span {
        let pos = self.arena[id].sourcepos;
        let start = self.offset_of(pos.start, false);
        let end = self.offset_of(pos.end, true).max(start);
        Span::new(start as u32, end as u32)
    }

    fn offset_of(&self, pos: Position, inclusive: bool) -> usize {
        let line = (pos.line as usize).saturating_sub(1);
        let Some(&line_start) = self.line_starts.get(line) else {
            return self.line_starts.last().copied().unwrap_or(0);
        };
        let column = pos.column as usize;
        if inclusive {
            line_start + column
        } else {
            line_start + column.saturating_sub(1)
        }
    }

    /// Checks the structural invariants of the tree.
    ///
    /// Every reachable non-root node must name its parent correctly, and
    /// sibling links must be symmetric.
    pub fn validate(&self) -> Result<(), TreeError> {
        if self.arena.parent(self.root).is_some() {
            return Err(TreeError::Inconsistent {
                node: self.root,
                reason: "root has a parent",
            });
        }
        for id in self.arena.descendants(self.root) {
            let mut prev = None;
            for child in self.arena.children(id) {
                if self.arena.parent(child) != Some(id) {
                    return Err(TreeError::Inconsistent {
                        node: child,
                        reason: "parent link does not match",
                    });
                }
                if self.arena.previous_sibling(child) != prev {
                    return Err(TreeError::Inconsistent {
                        node: child,
                        reason: "previous sibling link does not match",
                    });
                }
                prev = Some(child);
            }
            if self.arena.last_child(id) != prev {
                return Err(TreeError::Inconsistent {
                    node: id,
                    reason: "last child link does not match",
                });
            }
        }
        Ok(())
    }

    /// Returns a serializable view of the subtree at `id`.
    pub fn serialize_node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { doc: self, id }
    }
}

impl std::ops::Index<NodeId> for Document {
    type Output = Ast;

    fn index(&self, id: NodeId) -> &Ast {
        &self.arena[id]
    }
}

impl std::ops::IndexMut<NodeId> for Document {
    fn index_mut(&mut self, id: NodeId) -> &mut Ast {
        &mut self.arena[id]
    }
}

/// A node bound to its document, serializable as a JSON-style tree.
///
/// Shape: `{"type", "range", "sourcepos", <payload fields>, "children"}`.
/// Leaf nodes omit `children`.
#[derive(Clone, Copy)]
pub struct NodeRef<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl NodeRef<'_> {
    /// Returns the handle this view points at.
    pub fn id(&self) -> NodeId {
        self.id
    }
}

struct ChildList<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl Serialize for ChildList<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_seq(
            self.doc
                .arena
                .children(self.id)
                .map(|child| self.doc.serialize_node(child)),
        )
    }
}

impl Serialize for NodeRef<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let ast = &self.doc.arena[self.id];
        let span = self.doc.span(self.id);
        let mut map = serializer.serialize_map(None)?;

        map.serialize_entry("type", &ast.value.node_type())?;
        map.serialize_entry("range", &[span.start, span.end])?;
        map.serialize_entry("sourcepos", &ast.sourcepos)?;

        match &ast.value {
            NodeValue::List(list) | NodeValue::Item(list) => {
                map.serialize_entry("list_type", &list.list_type)?;
                if list.list_type == crate::ListType::Ordered {
                    map.serialize_entry("start", &list.start)?;
                    map.serialize_entry("delimiter", &list.delimiter)?;
                }
                map.serialize_entry("tight", &list.tight)?;
            }
            NodeValue::TaskItem(task) => map.serialize_entry("checked", &task.checked)?,
            NodeValue::FootnoteDefinition(def) => map.serialize_entry("name", &def.name)?,
            NodeValue::Table(table) => map.serialize_entry("alignments", &table.alignments)?,
            NodeValue::TableRow(header) => map.serialize_entry("header", header)?,
            NodeValue::CodeBlock(block) => {
                map.serialize_entry("fenced", &block.fenced)?;
                map.serialize_entry("info", &block.info)?;
                map.serialize_entry("value", &block.literal)?;
            }
            NodeValue::HtmlBlock(block) => map.serialize_entry("value", &block.literal)?,
            NodeValue::Heading(heading) => {
                map.serialize_entry("level", &heading.level)?;
                map.serialize_entry("setext", &heading.setext)?;
            }
            NodeValue::Text(text) | NodeValue::HtmlInline(text) => {
                map.serialize_entry("value", text)?
            }
            NodeValue::Code(code) => map.serialize_entry("value", &code.literal)?,
            NodeValue::Link(link) | NodeValue::Image(link) => {
                map.serialize_entry("url", &link.url)?;
                if !link.title.is_empty() {
                    map.serialize_entry("title", &link.title)?;
                }
            }
            NodeValue::FootnoteReference(reference) => {
                map.serialize_entry("name", &reference.name)?;
                map.serialize_entry("ref_num", &reference.ref_num)?;
            }
            NodeValue::Custom(custom) => {
                map.serialize_entry("name", &custom.name)?;
                if let Some(literal) = &custom.literal {
                    map.serialize_entry("value", literal)?;
                }
            }
            _ => {}
        }

        if !ast.value.is_leaf() {
            map.serialize_entry(
                "children",
                &ChildList {
                    doc: self.doc,
                    id: self.id,
                },
            )?;
        }
        map.end()
    }
}
