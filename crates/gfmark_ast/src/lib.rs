//! # gfmark_ast
//!
//! Markdown AST definitions for gfmark.
//!
//! The tree is stored in an [`Arena`] and addressed through [`NodeId`]
//! handles. Parent and sibling links are handles as well, so a node never
//! owns a reference to its parent; the arena owns every node and the tree
//! shape is expressed purely through links.
//!
//! ## Architecture
//!
//! - [`NodeValue`] is the tagged variant over node kinds, [`NodeType`] its
//!   fieldless discriminant used for dispatch and serialization
//! - [`Document`] owns one arena plus the root handle; one document per parse
//! - [`Traverse`] yields enter/exit events and can start at any subtree
//! - [`visitor`] offers a callback-style walk on top of the same events
//!
//! ## Example
//!
//! ```rust
//! use gfmark_ast::{Ast, Document, NodeValue, EventType};
//!
//! let mut doc = Document::new();
//! let para = doc.arena.alloc(Ast::new(NodeValue::Paragraph));
//! let text = doc.arena.alloc(Ast::new(NodeValue::Text("hi".into())));
//! doc.arena.append_child(doc.root, para);
//! doc.arena.append_child(para, text);
//!
//! let events: Vec<_> = doc.traverse(doc.root).map(|(_, ev)| ev).collect();
//! assert_eq!(events.first(), Some(&EventType::Enter));
//! assert_eq!(doc.text_content(doc.root), "hi");
//! ```

mod arena;
mod document;
mod iter;
mod node;
mod node_type;
mod span;
pub mod visitor;

pub use arena::{Ancestors, Arena, Ast, Children, Descendants, NodeId};
pub use document::{Document, NodeRef, TreeError};
pub use iter::{EventType, Traverse};
pub use node::{
    ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeCustom, NodeFootnoteDefinition,
    NodeFootnoteReference, NodeHeading, NodeHtmlBlock, NodeLink, NodeList, NodeTable,
    NodeTaskItem, NodeValue, TableAlignment,
};
pub use node_type::NodeType;
pub use span::{Position, SourcePos, Span};

pub use visitor::{VisitResult, Visitor, walk_node};
