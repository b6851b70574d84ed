//! tasklist extension: `- [ ] todo` and `- [x] done` list items.
//!
//! Runs after inline parsing. A list item whose first paragraph starts
//! with `[ ]`, `[x]` or `[X]` followed by whitespace becomes a
//! [`NodeValue::TaskItem`]; the marker is removed from the text.

use gfmark_ast::{Document, NodeId, NodeTaskItem, NodeValue};
use gfmark_parser::{Extension, ExtensionError, ParseOptions};
use tracing::trace;

pub const EXTENSION_NAME: &str = "tasklist";

#[derive(Debug, Clone, Copy, Default)]
pub struct Tasklist;

/// Parses a task marker at the start of `text`. Returns the marker
/// character and the number of bytes to strip.
fn task_marker(text: &str, followed_by_break: bool) -> Option<(char, usize)> {
    let bytes = text.as_bytes();
    if bytes.len() < 3 || bytes[0] != b'[' || bytes[2] != b']' {
        return None;
    }
    let symbol = match bytes[1] {
        b' ' => ' ',
        b'x' => 'x',
        b'X' => 'X',
        _ => return None,
    };
    let spaces = bytes[3..]
        .iter()
        .take_while(|&&b| b == b' ' || b == b'\t')
        .count();
    if spaces == 0 && !(bytes.len() == 3 && followed_by_break) {
        return None;
    }
    Some((symbol, 3 + spaces))
}

fn convert_item(doc: &mut Document, item: NodeId) -> bool {
    let Some(paragraph) = doc
        .arena
        .first_child(item)
        .filter(|&p| matches!(doc.value(p), NodeValue::Paragraph))
    else {
        return false;
    };
    let Some(text_node) = doc.arena.first_child(paragraph) else {
        return false;
    };
    let Some(text) = doc.value(text_node).text() else {
        return false;
    };
    let followed_by_break = doc
        .arena
        .next_sibling(text_node)
        .is_some_and(|next| matches!(doc.value(next), NodeValue::SoftBreak));
    let Some((symbol, strip)) = task_marker(text, followed_by_break) else {
        return false;
    };

    if let Some(text) = doc.value_mut(text_node).text_mut() {
        text.drain(..strip);
    }
    let ast = &mut doc.arena[text_node];
    ast.sourcepos.start.column += strip as u32;
    if matches!(&ast.value, NodeValue::Text(text) if text.is_empty()) {
        doc.arena.detach(text_node);
    }

    *doc.value_mut(item) = NodeValue::TaskItem(NodeTaskItem {
        checked: symbol != ' ',
        symbol,
    });
    true
}

impl Extension for Tasklist {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn postprocess(&self, doc: &mut Document, _options: &ParseOptions) -> Result<(), ExtensionError> {
        let items: Vec<NodeId> = doc
            .arena
            .descendants(doc.root)
            .filter(|&id| matches!(doc.value(id), NodeValue::Item(_)))
            .collect();
        let converted = items
            .into_iter()
            .filter(|&item| convert_item(doc, item))
            .count();
        trace!("Converted {} list items to task items", converted);
        Ok(())
    }
}
