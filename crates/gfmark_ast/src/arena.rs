//! Arena storage for AST nodes.
//!
//! Every node of a document lives in one `Vec`-backed arena and is
//! addressed by a [`NodeId`]. Parent, sibling and child links are stored as
//! handles, so the tree can be restructured in place without fighting the
//! borrow checker and without reference cycles.
//!
//! Detaching a node unlinks it but keeps its slot; slots are reclaimed when
//! the whole arena is dropped.

use std::ops::{Index, IndexMut};

use serde::Serialize;

use crate::{NodeValue, SourcePos};

/// Handle to a node in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the slot index of this handle.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Data stored in each node slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ast {
    /// Kind and payload.
    pub value: NodeValue,
    /// Source position, 1-indexed and inclusive.
    pub sourcepos: SourcePos,
    /// Raw text accumulated for leaf blocks while parsing.
    pub content: String,
    /// Line and column where each line of `content` starts, keyed by the
    /// byte offset into `content`. Used to compute inline positions.
    pub line_offsets: Vec<(usize, u32, u32)>,
    /// Whether the block is still open during parsing.
    pub open: bool,
    /// Whether the last line added to the block was blank.
    pub last_line_blank: bool,
}

impl Ast {
    /// Creates node data with default position and no content.
    pub fn new(value: NodeValue) -> Self {
        Self::with_pos(value, SourcePos::default())
    }

    /// Creates node data at the given position.
    pub fn with_pos(value: NodeValue, sourcepos: SourcePos) -> Self {
        Self {
            value,
            sourcepos,
            content: String::new(),
            line_offsets: Vec::new(),
            open: true,
            last_line_blank: false,
        }
    }
}

#[derive(Debug, Clone)]
struct Slot {
    ast: Ast,
    parent: Option<NodeId>,
    prev: Option<NodeId>,
    next: Option<NodeId>,
    first_child: Option<NodeId>,
    last_child: Option<NodeId>,
}

/// Arena allocator for AST nodes.
///
/// # Example
///
/// ```rust
/// use gfmark_ast::{Arena, Ast, NodeValue};
///
/// let mut arena = Arena::new();
/// let parent = arena.alloc(Ast::new(NodeValue::Paragraph));
/// let child = arena.alloc(Ast::new(NodeValue::Text("a".into())));
/// arena.append_child(parent, child);
///
/// assert_eq!(arena.parent(child), Some(parent));
/// assert_eq!(arena.children(parent).count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Arena {
    slots: Vec<Slot>,
}

impl Arena {
    /// Creates a new, empty arena.
    #[inline]
    pub fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Creates a new arena with room for `capacity` nodes.
    #[inline]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
        }
    }

    /// Allocates a detached node and returns its handle.
    pub fn alloc(&mut self, ast: Ast) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        self.slots.push(Slot {
            ast,
            parent: None,
            prev: None,
            next: None,
            first_child: None,
            last_child: None,
        });
        id
    }

    /// Returns the number of allocated slots, detached ones included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if nothing was allocated.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Returns true if the handle belongs to this arena.
    #[inline]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.slots.len()
    }

    /// Returns node data, or `None` for a foreign handle.
    #[inline]
    pub fn get(&self, id: NodeId) -> Option<&Ast> {
        self.slots.get(id.index()).map(|slot| &slot.ast)
    }

    /// Returns mutable node data, or `None` for a foreign handle.
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Ast> {
        self.slots.get_mut(id.index()).map(|slot| &mut slot.ast)
    }

    #[inline]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    #[inline]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].first_child
    }

    #[inline]
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].last_child
    }

    #[inline]
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].next
    }

    #[inline]
    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].prev
    }

    /// Unlinks a node (with its subtree) from its parent and siblings.
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let slot = &self.slots[id.index()];
            (slot.parent, slot.prev, slot.next)
        };

        match prev {
            Some(prev) => self.slots[prev.index()].next = next,
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.index()].first_child = next;
                }
            }
        }
        match next {
            Some(next) => self.slots[next.index()].prev = prev,
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.index()].last_child = prev;
                }
            }
        }

        let slot = &mut self.slots[id.index()];
        slot.parent = None;
        slot.prev = None;
        slot.next = None;
    }

    /// Appends `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let last = self.slots[parent.index()].last_child;
        {
            let slot = &mut self.slots[child.index()];
            slot.parent = Some(parent);
            slot.prev = last;
        }
        match last {
            Some(last) => self.slots[last.index()].next = Some(child),
            None => self.slots[parent.index()].first_child = Some(child),
        }
        self.slots[parent.index()].last_child = Some(child);
    }

    /// Prepends `child` as the first child of `parent`, detaching it first.
    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        let first = self.slots[parent.index()].first_child;
        {
            let slot = &mut self.slots[child.index()];
            slot.parent = Some(parent);
            slot.next = first;
        }
        match first {
            Some(first) => self.slots[first.index()].prev = Some(child),
            None => self.slots[parent.index()].last_child = Some(child),
        }
        self.slots[parent.index()].first_child = Some(child);
    }

    /// Inserts `new` right after `node` under the same parent.
    pub fn insert_after(&mut self, node: NodeId, new: NodeId) {
        self.detach(new);
        let parent = self.slots[node.index()].parent;
        let next = self.slots[node.index()].next;
        {
            let slot = &mut self.slots[new.index()];
            slot.parent = parent;
            slot.prev = Some(node);
            slot.next = next;
        }
        self.slots[node.index()].next = Some(new);
        match next {
            Some(next) => self.slots[next.index()].prev = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.index()].last_child = Some(new);
                }
            }
        }
    }

    /// Inserts `new` right before `node` under the same parent.
    pub fn insert_before(&mut self, node: NodeId, new: NodeId) {
        self.detach(new);
        let parent = self.slots[node.index()].parent;
        let prev = self.slots[node.index()].prev;
        {
            let slot = &mut self.slots[new.index()];
            slot.parent = parent;
            slot.prev = prev;
            slot.next = Some(node);
        }
        self.slots[node.index()].prev = Some(new);
        match prev {
            Some(prev) => self.slots[prev.index()].next = Some(new),
            None => {
                if let Some(parent) = parent {
                    self.slots[parent.index()].first_child = Some(new);
                }
            }
        }
    }

    /// Iterates over the direct children of a node, in document order.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            arena: self,
            next: self.first_child(id),
        }
    }

    /// Iterates over a node's ancestors, nearest first.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            arena: self,
            next: self.parent(id),
        }
    }

    /// Iterates over a node and all of its descendants in pre-order.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            arena: self,
            root: id,
            next: Some(id),
        }
    }
}

impl Index<NodeId> for Arena {
    type Output = Ast;

    fn index(&self, id: NodeId) -> &Ast {
        &self.slots[id.index()].ast
    }
}

impl IndexMut<NodeId> for Arena {
    fn index_mut(&mut self, id: NodeId) -> &mut Ast {
        &mut self.slots[id.index()].ast
    }
}

/// Iterator over direct children.
pub struct Children<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.next_sibling(current);
        Some(current)
    }
}

/// Iterator over ancestors.
pub struct Ancestors<'a> {
    arena: &'a Arena,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.arena.parent(current);
        Some(current)
    }
}

/// Pre-order iterator over a subtree.
pub struct Descendants<'a> {
    arena: &'a Arena,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = match self.arena.first_child(current) {
            Some(child) => Some(child),
            None => {
                let mut node = current;
                loop {
                    if node == self.root {
                        break None;
                    }
                    if let Some(next) = self.arena.next_sibling(node) {
                        break Some(next);
                    }
                    match self.arena.parent(node) {
                        Some(parent) => node = parent,
                        None => break None,
                    }
                }
            }
        };
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(arena: &mut Arena, s: &str) -> NodeId {
        arena.alloc(Ast::new(NodeValue::Text(s.into())))
    }

    fn literals(arena: &Arena, parent: NodeId) -> Vec<String> {
        arena
            .children(parent)
            .filter_map(|id| arena[id].value.text().map(str::to_string))
            .collect()
    }

    #[test]
    fn test_append_and_prepend() {
        let mut arena = Arena::new();
        let para = arena.alloc(Ast::new(NodeValue::Paragraph));
        let a = text(&mut arena, "a");
        let b = text(&mut arena, "b");
        let c = text(&mut arena, "c");

        arena.append_child(para, b);
        arena.append_child(para, c);
        arena.prepend_child(para, a);

        assert_eq!(literals(&arena, para), ["a", "b", "c"]);
        assert_eq!(arena.first_child(para), Some(a));
        assert_eq!(arena.last_child(para), Some(c));
        assert_eq!(arena.previous_sibling(b), Some(a));
        assert_eq!(arena.next_sibling(b), Some(c));
    }

    #[test]
    fn test_insert_before_and_after() {
        let mut arena = Arena::new();
        let para = arena.alloc(Ast::new(NodeValue::Paragraph));
        let b = text(&mut arena, "b");
        arena.append_child(para, b);

        let a = text(&mut arena, "a");
        let c = text(&mut arena, "c");
        arena.insert_before(b, a);
        arena.insert_after(b, c);

        assert_eq!(literals(&arena, para), ["a", "b", "c"]);
        assert_eq!(arena.parent(a), Some(para));
        assert_eq!(arena.parent(c), Some(para));
        assert_eq!(arena.last_child(para), Some(c));
    }

    #[test]
    fn test_detach_relinks_siblings() {
        let mut arena = Arena::new();
        let para = arena.alloc(Ast::new(NodeValue::Paragraph));
        let ids: Vec<_> = ["a", "b", "c"].iter().map(|s| text(&mut arena, s)).collect();
        for &id in &ids {
            arena.append_child(para, id);
        }

        arena.detach(ids[1]);
        assert_eq!(literals(&arena, para), ["a", "c"]);
        assert_eq!(arena.parent(ids[1]), None);

        arena.detach(ids[0]);
        arena.detach(ids[2]);
        assert_eq!(arena.first_child(para), None);
        assert_eq!(arena.last_child(para), None);
    }

    #[test]
    fn test_append_moves_between_parents() {
        let mut arena = Arena::new();
        let first = arena.alloc(Ast::new(NodeValue::Paragraph));
        let second = arena.alloc(Ast::new(NodeValue::Paragraph));
        let a = text(&mut arena, "a");

        arena.append_child(first, a);
        arena.append_child(second, a);

        assert_eq!(arena.children(first).count(), 0);
        assert_eq!(arena.parent(a), Some(second));
    }

    #[test]
    fn test_descendants_stay_in_subtree() {
        let mut arena = Arena::new();
        let doc = arena.alloc(Ast::new(NodeValue::Document));
        let p1 = arena.alloc(Ast::new(NodeValue::Paragraph));
        let p2 = arena.alloc(Ast::new(NodeValue::Paragraph));
        let a = text(&mut arena, "a");
        let b = text(&mut arena, "b");
        arena.append_child(doc, p1);
        arena.append_child(doc, p2);
        arena.append_child(p1, a);
        arena.append_child(p2, b);

        let all: Vec<_> = arena.descendants(doc).collect();
        assert_eq!(all, [doc, p1, a, p2, b]);

        let sub: Vec<_> = arena.descendants(p1).collect();
        assert_eq!(sub, [p1, a]);

        let up: Vec<_> = arena.ancestors(a).collect();
        assert_eq!(up, [p1, doc]);
    }

    #[test]
    fn test_foreign_handle_lookup() {
        let arena = Arena::new();
        assert!(arena.get(NodeId(3)).is_none());
        assert!(!arena.contains(NodeId(0)));
    }
}
