//! Enter/exit traversal.
//!
//! [`Traverse`] is a lazy cursor producing `(node, event)` pairs. Container
//! nodes produce an `Enter` and an `Exit` event; leaf nodes only `Enter`.
//! The cursor never leaves the subtree it was started on, and it can be
//! repositioned with [`Traverse::reset`].

use serde::Serialize;

use crate::{Arena, NodeId};

/// Traversal event kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Enter,
    Exit,
}

/// Cursor over a subtree.
#[derive(Clone)]
pub struct Traverse<'a> {
    arena: &'a Arena,
    root: NodeId,
    next: Option<(NodeId, EventType)>,
}

impl<'a> Traverse<'a> {
    /// Starts a traversal at `root`.
    pub fn new(arena: &'a Arena, root: NodeId) -> Self {
        Self {
            arena,
            root,
            next: Some((root, EventType::Enter)),
        }
    }

    /// Returns the subtree root this cursor is bound to.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Repositions the cursor so the next event is `(node, event)`.
    ///
    /// `node` must be inside the cursor's subtree.
    pub fn reset(&mut self, node: NodeId, event: EventType) {
        self.next = Some((node, event));
    }

    /// Skips the children of a container that was just entered.
    pub fn skip_children(&mut self, node: NodeId) {
        self.next = Some((node, EventType::Exit));
    }

    fn is_leaf(&self, node: NodeId) -> bool {
        self.arena[node].value.is_leaf()
    }

    fn successor(&self, node: NodeId, event: EventType) -> Option<(NodeId, EventType)> {
        if event == EventType::Enter && !self.is_leaf(node) {
            return Some(match self.arena.first_child(node) {
                Some(child) => (child, EventType::Enter),
                None => (node, EventType::Exit),
            });
        }
        if node == self.root {
            return None;
        }
        match self.arena.next_sibling(node) {
            Some(next) => Some((next, EventType::Enter)),
            None => self
                .arena
                .parent(node)
                .map(|parent| (parent, EventType::Exit)),
        }
    }
}

impl Iterator for Traverse<'_> {
    type Item = (NodeId, EventType);

    fn next(&mut self) -> Option<Self::Item> {
        let (node, event) = self.next?;
        self.next = self.successor(node, event);
        Some((node, event))
    }
}
