//! Link reference definitions and footnote numbering.

use std::collections::HashMap;

use gfmark_ast::{Document, NodeFootnoteReference, NodeId, NodeValue};
use gfmark_text::normalize_label;
use tracing::debug;

/// Maximum length of a link label, in bytes.
pub const MAX_LINK_LABEL_LENGTH: usize = 999;

/// Lower bound for the expansion budget of reference links.
const MIN_EXPANSION_BUDGET: usize = 100_000;

/// A resolved link reference definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub url: String,
    pub title: String,
}

/// Link reference definitions keyed by normalized label.
///
/// The first definition of a label wins. Lookups are charged against an
/// expansion budget proportional to the input size so that a few huge
/// definitions referenced many times cannot blow up the output.
#[derive(Debug, Clone)]
pub struct ReferenceMap {
    map: HashMap<String, Reference>,
    budget: usize,
    spent: usize,
}

impl Default for ReferenceMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceMap {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
            budget: usize::MAX,
            spent: 0,
        }
    }

    /// Adds a definition unless the label is already defined.
    ///
    /// Returns false when the label is empty after normalization or was
    /// defined before.
    pub fn insert(&mut self, label: &str, reference: Reference) -> bool {
        let key = normalize_label(label);
        if key.is_empty() || self.map.contains_key(&key) {
            return false;
        }
        debug!("Reference definition [{}] -> {}", key, reference.url);
        self.map.insert(key, reference);
        true
    }

    /// Returns true if a definition exists for the label.
    pub fn contains(&self, label: &str) -> bool {
        self.map.contains_key(&normalize_label(label))
    }

    /// Looks up a label and charges the expansion budget.
    pub fn lookup(&mut self, label: &str) -> Option<Reference> {
        let entry = self.map.get(&normalize_label(label))?;
        let size = entry.url.len() + entry.title.len();
        if size > self.budget.saturating_sub(self.spent) {
            return None;
        }
        self.spent += size;
        Some(entry.clone())
    }

    /// Sets the expansion budget from the total input size.
    pub fn set_input_size(&mut self, total: usize) {
        self.budget = total.max(MIN_EXPANSION_BUDGET);
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[derive(Debug)]
struct FootnoteEntry {
    node: NodeId,
    /// Label as written in the definition.
    label: String,
    /// Number assigned in order of first reference.
    ix: Option<u32>,
    references: u32,
}

/// Footnote definitions keyed by normalized label.
#[derive(Debug, Default)]
pub struct FootnoteMap {
    defs: HashMap<String, FootnoteEntry>,
}

impl FootnoteMap {
    /// Collects every footnote definition of the document. The first
    /// definition of a label wins; later ones are dropped.
    pub fn collect(doc: &mut Document) -> Self {
        let mut defs: HashMap<String, FootnoteEntry> = HashMap::new();
        let mut duplicates = Vec::new();
        for id in doc.arena.descendants(doc.root) {
            if let NodeValue::FootnoteDefinition(def) = &doc.arena[id].value {
                let key = normalize_label(&def.name);
                if defs.contains_key(&key) {
                    duplicates.push(id);
                } else {
                    defs.insert(
                        key,
                        FootnoteEntry {
                            node: id,
                            label: def.name.clone(),
                            ix: None,
                            references: 0,
                        },
                    );
                }
            }
        }
        for id in duplicates {
            doc.arena.detach(id);
        }
        Self { defs }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Numbers footnote references in order of first use and moves the
    /// referenced definitions to the end of the document in that order.
    ///
    /// References without a definition become literal `[^label]` text and
    /// definitions nobody references are removed.
    pub fn resolve(mut self, doc: &mut Document) {
        let references: Vec<NodeId> = doc
            .arena
            .descendants(doc.root)
            .filter(|&id| matches!(doc.arena[id].value, NodeValue::FootnoteReference(_)))
            .collect();

        let mut next_ix = 0;
        for id in references {
            let NodeValue::FootnoteReference(reference) = &doc.arena[id].value else {
                continue;
            };
            let key = normalize_label(&reference.name);
            match self.defs.get_mut(&key) {
                Some(entry) => {
                    let ix = *entry.ix.get_or_insert_with(|| {
                        next_ix += 1;
                        next_ix
                    });
                    entry.references += 1;
                    doc.arena[id].value = NodeValue::FootnoteReference(NodeFootnoteReference {
                        name: entry.label.clone(),
                        ref_num: ix,
                        ix: entry.references,
                    });
                }
                None => {
                    let literal = format!("[^{}]", reference.name);
                    doc.arena[id].value = NodeValue::Text(literal);
                }
            }
        }

        let mut entries: Vec<(String, FootnoteEntry)> = self.defs.drain().collect();
        entries.sort_by_key(|(_, entry)| entry.ix);
        for (_, entry) in entries {
            match entry.ix {
                Some(_) => {
                    if let NodeValue::FootnoteDefinition(def) = &mut doc.arena[entry.node].value {
                        def.total_references = entry.references;
                    }
                    doc.arena.append_child(doc.root, entry.node);
                }
                None => {
                    debug!("Dropping unreferenced footnote [{}]", entry.label);
                    doc.arena.detach(entry.node);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gfmark_ast::{Ast, NodeFootnoteDefinition};
    use pretty_assertions::assert_eq;

    fn reference(url: &str) -> Reference {
        Reference {
            url: url.to_string(),
            title: String::new(),
        }
    }

    #[test]
    fn test_first_definition_wins() {
        let mut map = ReferenceMap::new();
        assert!(map.insert("Foo", reference("/first")));
        assert!(!map.insert("FOO", reference("/second")));
        assert_eq!(map.lookup("foo").unwrap().url, "/first");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_label_normalization() {
        let mut map = ReferenceMap::new();
        map.insert("Foo  \n bar", reference("/x"));
        assert!(map.contains("foo bar"));
        assert!(!map.insert("   ", reference("/y")));
    }

    #[test]
    fn test_expansion_budget() {
        let mut map = ReferenceMap::new();
        map.insert("a", reference(&"x".repeat(60_000)));
        map.set_input_size(10);
        assert!(map.lookup("a").is_some());
        assert!(map.lookup("a").is_none());
    }

    fn footnote_def(doc: &mut Document, name: &str) -> NodeId {
        let id = doc.arena.alloc(Ast::new(NodeValue::FootnoteDefinition(
            NodeFootnoteDefinition {
                name: name.to_string(),
                total_references: 0,
            },
        )));
        doc.arena.append_child(doc.root, id);
        id
    }

    fn footnote_ref(doc: &mut Document, parent: NodeId, name: &str) -> NodeId {
        let id = doc.arena.alloc(Ast::new(NodeValue::FootnoteReference(
            NodeFootnoteReference {
                name: name.to_string(),
                ref_num: 0,
                ix: 0,
            },
        )));
        doc.arena.append_child(parent, id);
        id
    }

    #[test]
    fn test_footnote_numbering() {
        let mut doc = Document::new();
        let para = doc.arena.alloc(Ast::new(NodeValue::Paragraph));
        doc.arena.append_child(doc.root, para);
        let first_def = footnote_def(&mut doc, "a");
        let second_def = footnote_def(&mut doc, "b");
        let unused = footnote_def(&mut doc, "unused");

        let r1 = footnote_ref(&mut doc, para, "b");
        let r2 = footnote_ref(&mut doc, para, "A");
        let r3 = footnote_ref(&mut doc, para, "b");
        let missing = footnote_ref(&mut doc, para, "nope");

        let map = FootnoteMap::collect(&mut doc);
        assert_eq!(map.len(), 3);
        map.resolve(&mut doc);

        let refnum = |id| match &doc.arena[id].value {
            NodeValue::FootnoteReference(r) => (r.ref_num, r.ix),
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(refnum(r1), (1, 1));
        assert_eq!(refnum(r2), (2, 1));
        assert_eq!(refnum(r3), (1, 2));
        match &doc.arena[r2].value {
            NodeValue::FootnoteReference(r) => assert_eq!(r.name, "a"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(doc.arena[missing].value, NodeValue::Text("[^nope]".into()));

        let order: Vec<NodeId> = doc.arena.children(doc.root).collect();
        assert_eq!(order, vec![para, second_def, first_def]);
        assert_eq!(doc.arena.parent(unused), None);
        match &doc.arena[second_def].value {
            NodeValue::FootnoteDefinition(def) => {
                assert_eq!(def.name, "b");
                assert_eq!(def.total_references, 2);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
