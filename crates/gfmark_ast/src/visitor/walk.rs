//! Walk function for the Visitor pattern.

use std::ops::ControlFlow;

use crate::{Document, EventType, NodeId};

use super::{VisitResult, Visitor};

/// Walks the subtree at `node`, calling `enter_node`/`exit_node`.
///
/// The walk is iterative, so deeply nested documents do not grow the call
/// stack. Returns `Break` as soon as a callback does.
pub fn walk_node<V>(visitor: &mut V, doc: &Document, node: NodeId) -> VisitResult
where
    V: Visitor + ?Sized,
{
    for (id, event) in doc.traverse(node) {
        match event {
            EventType::Enter => {
                visitor.enter_node(doc, id)?;
                if doc.value(id).is_leaf() {
                    visitor.exit_node(doc, id)?;
                }
            }
            EventType::Exit => visitor.exit_node(doc, id)?,
        }
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Ast, NodeType, NodeValue};

    struct NodeCounter {
        entered: usize,
        exited: usize,
        text_count: usize,
    }

    impl Visitor for NodeCounter {
        fn enter_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
            self.entered += 1;
            if doc.value(node).node_type() == NodeType::Text {
                self.text_count += 1;
            }
            ControlFlow::Continue(())
        }

        fn exit_node(&mut self, _doc: &Document, _node: NodeId) -> VisitResult {
            self.exited += 1;
            ControlFlow::Continue(())
        }
    }

    struct StopAtFirstText {
        seen: usize,
    }

    impl Visitor for StopAtFirstText {
        fn enter_node(&mut self, doc: &Document, node: NodeId) -> VisitResult {
            self.seen += 1;
            if doc.value(node).text().is_some() {
                return ControlFlow::Break(());
            }
            ControlFlow::Continue(())
        }
    }

    fn two_paragraphs() -> Document {
        let mut doc = Document::new();
        for word in ["one", "two"] {
            let para = doc.arena.alloc(Ast::new(NodeValue::Paragraph));
            let text = doc.arena.alloc(Ast::new(NodeValue::Text(word.into())));
            doc.arena.append_child(doc.root, para);
            doc.arena.append_child(para, text);
        }
        doc
    }

    #[test]
    fn test_enter_and_exit_balance() {
        let doc = two_paragraphs();
        let mut counter = NodeCounter {
            entered: 0,
            exited: 0,
            text_count: 0,
        };
        let result = walk_node(&mut counter, &doc, doc.root);

        assert!(result.is_continue());
        assert_eq!(counter.entered, 5);
        assert_eq!(counter.exited, 5);
        assert_eq!(counter.text_count, 2);
    }

    #[test]
    fn test_early_termination() {
        let doc = two_paragraphs();
        let mut visitor = StopAtFirstText { seen: 0 };
        let result = walk_node(&mut visitor, &doc, doc.root);

        assert!(result.is_break());
        assert_eq!(visitor.seen, 3);
    }
}
