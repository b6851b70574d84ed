//! table extension: GitHub-style pipe tables.
//!
//! A paragraph line followed by a delimiter row with the same number of
//! cells becomes the header of a table. Following lines are body rows until
//! a blank line or the start of another block.
//!
//! ```text
//! | a | b |
//! |:--|--:|
//! | c | d |
//! ```
//!
//! # Configuration
//!
//! | Option | Type | Default | Description |
//! |--------|------|---------|-------------|
//! | strict | boolean | false | End the table at a row whose cell count differs from the header instead of padding or truncating it |
//!
//! # Example
//!
//! ```json
//! {
//!   "extensions": [
//!     { "name": "table", "options": { "strict": true } }
//!   ]
//! }
//! ```

use gfmark_ast::{NodeId, NodeTable, NodeValue, Position, SourcePos};
use gfmark_parser::{BlockContext, BlockContinue, BlockStart, Extension, scanners};
use serde::Deserialize;

pub const EXTENSION_NAME: &str = "table";

/// Configuration for the table extension.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TableOptions {
    /// Rows with a different cell count end the table.
    pub strict: bool,
}

/// Pipe table block parser.
#[derive(Debug, Clone, Default)]
pub struct Table {
    options: TableOptions,
}

impl Table {
    pub fn new(options: TableOptions) -> Self {
        Self { options }
    }
}

/// One cell of a row, with byte offsets into the row text.
#[derive(Debug, PartialEq, Eq)]
struct Cell {
    text: String,
    start: usize,
    end: usize,
}

/// Splits a row into trimmed cells. Outer pipes are optional and `\|`
/// does not split.
fn split_row(row: &str) -> Vec<Cell> {
    let bytes = row.as_bytes();
    let end = row.trim_end().len();
    let mut pos = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    if bytes.get(pos) == Some(&b'|') {
        pos += 1;
    }

    let mut cells = Vec::new();
    let mut cell_start = pos;
    let mut i = pos;
    while i < end {
        match bytes[i] {
            b'\\' if bytes.get(i + 1) == Some(&b'|') => i += 2,
            b'|' => {
                cells.push(make_cell(row, cell_start, i));
                cell_start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    if cell_start < end {
        cells.push(make_cell(row, cell_start, end));
    }
    cells
}

fn make_cell(row: &str, start: usize, end: usize) -> Cell {
    let raw = &row[start..end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    Cell {
        text: trimmed.replace("\\|", "|"),
        start: start + leading,
        end: start + leading + trimmed.len(),
    }
}

impl Table {
    /// Appends a row of closed cells to `table`. Missing cells are added
    /// empty and extra cells are dropped.
    fn add_row(
        ctx: &mut BlockContext<'_, '_>,
        table: NodeId,
        header: bool,
        text: &str,
        start: Position,
    ) {
        let columns = match ctx.document().value(table) {
            NodeValue::Table(table) => table.num_columns(),
            _ => return,
        };
        let cells = split_row(text);
        let line = start.line;
        let column_at = |offset: usize| start.column + offset as u32;
        let row_end = Position::new(line, column_at(text.trim_end().len().max(1) - 1));

        let doc = ctx.document_mut();
        let row = doc.create(NodeValue::TableRow(header), SourcePos::new(start, row_end));
        doc.arena.append_child(table, row);

        for index in 0..columns {
            let (content, sourcepos) = match cells.get(index) {
                Some(cell) => {
                    let first = Position::new(line, column_at(cell.start));
                    let last = Position::new(line, column_at(cell.end.max(cell.start + 1) - 1));
                    (cell.text.clone(), SourcePos::new(first, last))
                }
                None => (String::new(), SourcePos::new(row_end, row_end)),
            };
            let cell = doc.create(NodeValue::TableCell, sourcepos);
            let ast = &mut doc.arena[cell];
            ast.line_offsets = vec![(0, line, sourcepos.start.column)];
            ast.content = content;
            doc.arena.append_child(row, cell);
        }
    }

    /// Turns the last line of an open paragraph into a table header when
    /// the current line is a matching delimiter row.
    fn try_start(ctx: &mut BlockContext<'_, '_>, paragraph: NodeId) -> Option<BlockStart> {
        if ctx.indent() >= 4 {
            return None;
        }
        let alignments = scanners::table_delimiter_row(ctx.rest_from_nonspace().as_bytes())?;

        let ast = &ctx.document().arena[paragraph];
        let &(start, _, _) = ast.line_offsets.last()?;
        let header = ast.content.get(start..)?.trim_end_matches(['\n', '\r']);
        if split_row(header).len() != alignments.len() {
            return None;
        }

        let (header, header_pos) = ctx.take_last_line(paragraph)?;
        let table = ctx.add_block(
            NodeValue::Table(NodeTable { alignments }),
            header_pos.column as usize,
        );
        ctx.document_mut().arena[table].sourcepos.start = header_pos;
        Self::add_row(ctx, table, true, &header, header_pos);
        Some(BlockStart::Consumed)
    }
}

impl Extension for Table {
    fn name(&self) -> &str {
        EXTENSION_NAME
    }

    fn try_open_block(&self, ctx: &mut BlockContext<'_, '_>) -> Option<BlockStart> {
        let container = ctx.container();
        let value = ctx.document().value(container);
        if matches!(value, NodeValue::Paragraph) {
            return Self::try_start(ctx, container);
        }
        if !matches!(value, NodeValue::Table(_)) || ctx.is_blank() {
            return None;
        }
        let text = ctx
            .rest_from_nonspace()
            .trim_end_matches(['\n', '\r'])
            .to_string();
        let start = Position::new(ctx.line_number(), (ctx.first_nonspace() + 1) as u32);
        Self::add_row(ctx, container, false, &text, start);
        Some(BlockStart::Consumed)
    }

    fn continue_block(&self, ctx: &mut BlockContext<'_, '_>, node: NodeId) -> BlockContinue {
        let NodeValue::Table(table) = ctx.document().value(node) else {
            return BlockContinue::Unhandled;
        };
        if ctx.is_blank() {
            return BlockContinue::NotMatched;
        }
        if self.options.strict && split_row(ctx.rest_from_nonspace()).len() != table.num_columns()
        {
            return BlockContinue::NotMatched;
        }
        BlockContinue::Matched
    }
}
