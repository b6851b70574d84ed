//! Visitor pattern for AST traversal.
//!
//! - [`Visitor`] - callbacks on entering and leaving nodes
//! - [`walk_node`] - drives a visitor over a subtree
//!
//! Unlike [`crate::Traverse`], the walk reports an exit for leaf nodes too,
//! so visitors can treat every node uniformly.
//!
//! # Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use gfmark_ast::{Ast, Document, NodeId, NodeValue};
//! use gfmark_ast::visitor::{VisitResult, Visitor, walk_node};
//!
//! struct TextCollector {
//!     texts: Vec<String>,
//! }
//!
//! impl Visitor for TextCollector {
//!     fn enter_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
//!         if let Some(text) = doc.value(node).text() {
//!             self.texts.push(text.to_string());
//!         }
//!         ControlFlow::Continue(())
//!     }
//! }
//!
//! let mut doc = Document::new();
//! let para = doc.arena.alloc(Ast::new(NodeValue::Paragraph));
//! let text = doc.arena.alloc(Ast::new(NodeValue::Text("hello".into())));
//! doc.arena.append_child(doc.root, para);
//! doc.arena.append_child(para, text);
//!
//! let mut collector = TextCollector { texts: Vec::new() };
//! walk_node(&mut collector, &doc, doc.root);
//! assert_eq!(collector.texts, vec!["hello"]);
//! ```

mod walk;

use std::ops::ControlFlow;

use crate::{Document, NodeId};

pub use walk::walk_node;

/// Result of a visitor callback. `Break` stops the walk.
pub type VisitResult = ControlFlow<()>;

/// Read-only traversal callbacks.
pub trait Visitor {
    /// Called before a node's children are visited.
    fn enter_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
        let _ = (doc, node);
        ControlFlow::Continue(())
    }

    /// Called after a node's children are visited.
    fn exit_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
        let _ = (doc, node);
        ControlFlow::Continue(())
    }
}
