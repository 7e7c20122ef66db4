use crate::blocks::{Block, BlockKind, Cell, Exportable, FrameBlock, Row, Table};
use crate::document::Document;
use crate::models::attributes::Attributes;

/// A document with one content block per string, each a single paragraph
pub fn paragraphs(texts: &[&str]) -> Document {
    let blocks = texts
        .iter()
        .map(|text| {
            let mut block = FrameBlock::empty(BlockKind::Content);
            block.insert_text(0, text, None);
            Block::Frames(block)
        })
        .collect();
    Document::from_blocks(blocks)
}

/// A table with one single-paragraph cell per string
pub fn table(rows: &[&[&str]]) -> Table {
    let rows = rows
        .iter()
        .map(|cells| Row::new(cells.iter().map(|text| Cell::new(paragraphs(&[text]))).collect()))
        .collect();
    Table::from_rows(rows, Attributes::new())
}

/// Full text of a cell's document
pub fn cell_text(table: &Table, row: usize, cell: usize) -> String {
    table
        .cell(row, cell)
        .map(|cell| cell.document.to_text(None))
        .unwrap_or_default()
}

/// `before` paragraph, a 2x2 table of `a b / c d`, then an `after` paragraph
pub fn document_with_table() -> Document {
    let mut blocks = paragraphs(&["before"]).blocks().to_vec();
    blocks.push(Block::Table(table(&[&["a", "b"], &["c", "d"]])));
    blocks.extend_from_slice(paragraphs(&["after"]).blocks());
    Document::from_blocks(blocks)
}
