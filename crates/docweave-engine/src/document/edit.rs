use crate::blocks::{Block, BlockKind, FrameBlock, Table, TableError, TableRange};
use crate::document::Document;
use crate::models::attributes::Attributes;
use crate::models::doc_pos::DocPos;
use crate::models::fragment::Fragment;

/// A position resolved into one table cell
#[derive(Debug, Clone)]
struct CellTarget {
    block: usize,
    row: usize,
    cell: usize,
    inner: DocPos,
}

/// The part of an edit range that falls in one block
enum Segment {
    Frames {
        block: usize,
        from: usize,
        to: usize,
    },
    Cells {
        block: usize,
        cells: Vec<(usize, usize)>,
    },
    InCell(CellTarget, DocPos),
}

impl Document {
    fn cell_target(&self, pos: &DocPos) -> Option<CellTarget> {
        let row_pos = pos.inner()?;
        let block = self.table_holding(pos)?;
        let table = self.blocks[block].as_table()?;
        let row = row_pos.index.min(table.rows().len().checked_sub(1)?);
        let (cell, inner) = match row_pos.inner() {
            Some(cell) => (cell.index, cell.inner().cloned().unwrap_or_default()),
            None => (0, DocPos::new(0)),
        };
        let cell = cell.min(table.rows()[row].cells().len().checked_sub(1)?);
        Some(CellTarget {
            block,
            row,
            cell,
            inner,
        })
    }

    fn cell_document_mut(&mut self, block: usize, row: usize, cell: usize) -> Option<&mut Document> {
        let table = self.blocks.get_mut(block)?.as_table_mut()?;
        table.cell_mut(row, cell).map(|cell| &mut cell.document)
    }

    fn wrap(&self, target: &CellTarget, inner: DocPos) -> DocPos {
        DocPos::nested(
            self.blocks[target.block].start(),
            DocPos::nested(target.row, DocPos::nested(target.cell, inner)),
        )
    }

    /// Run `edit` on the document of the cell `pos` lands in and wrap the
    /// caret it returns
    fn in_cell(
        &mut self,
        pos: &DocPos,
        edit: impl FnOnce(&mut Document, &DocPos) -> DocPos,
    ) -> Option<DocPos> {
        let target = self.cell_target(pos)?;
        let document = self.cell_document_mut(target.block, target.row, target.cell)?;
        let caret = edit(document, &target.inner);
        Some(self.wrap(&target, caret))
    }

    /// Frame block receiving an insert at `offset`. Inserting at a table
    /// creates an empty content block in front of it, or after it at the
    /// end of the document.
    fn frame_block_for_insert(&mut self, offset: usize) -> usize {
        let index = self.block_index_at(offset);
        if self.blocks[index].as_frames().is_some() {
            return index;
        }
        let at = if offset >= self.blocks[index].end() {
            index + 1
        } else {
            index
        };
        self.blocks
            .insert(at, Block::Frames(FrameBlock::empty(BlockKind::Content)));
        self.recompute_starts();
        at
    }

    // ============ content ============

    /// Insert text at `at`; `\n` starts a new paragraph. Returns the caret
    /// after the inserted text.
    pub fn insert_text(&mut self, at: &DocPos, text: &str, attributes: Option<&Attributes>) -> DocPos {
        if let Some(caret) = self.in_cell(at, |document, inner| {
            document.insert_text(inner, text, attributes)
        }) {
            return caret;
        }
        let index = self.frame_block_for_insert(at.index);
        let start = self.blocks[index].start();
        let Some(block) = self.blocks[index].as_frames_mut() else {
            return at.clone();
        };
        let caret = block.insert_text(at.index.saturating_sub(start), text, attributes);
        self.recompute_starts();
        DocPos::new(start + caret)
    }

    /// Insert an image, date or other atomic fragment
    pub fn insert_fragment(&mut self, at: &DocPos, fragment: Fragment) -> DocPos {
        if let Some(target) = self.cell_target(at) {
            let caret = self
                .cell_document_mut(target.block, target.row, target.cell)
                .map(|document| document.insert_fragment(&target.inner, fragment));
            return caret.map_or_else(|| at.clone(), |caret| self.wrap(&target, caret));
        }
        let index = self.frame_block_for_insert(at.index);
        let start = self.blocks[index].start();
        let Some(block) = self.blocks[index].as_frames_mut() else {
            return at.clone();
        };
        let caret = block.insert_fragment(at.index.saturating_sub(start), fragment);
        self.recompute_starts();
        DocPos::new(start + caret)
    }

    /// Delete between two positions, normalizing table selections first.
    ///
    /// Cell ranges are cleared rather than removed, row ranges remove their
    /// rows, and a table covered entirely goes with the rest of the range.
    /// Paragraphs cut open at the start of the range join the first
    /// paragraph after it.
    pub fn delete_range(&mut self, start: &DocPos, end: &DocPos) -> DocPos {
        let (start, end) = self.correct_selection(start, end);
        if start == end {
            return start;
        }
        if let (Some(a), Some(b)) = (self.table_holding(&start), self.table_holding(&end))
            && a == b
        {
            return self.delete_in_table(a, &start, &end);
        }

        let mut end_offset = end.index;
        if let Some(index) = self.table_holding(&end) {
            end_offset = self.blocks[index].start();
            self.delete_table_head(index, &end);
        }
        let mut start_offset = start.index;
        if let Some(index) = self.table_holding(&start)
            && self.delete_table_tail(index, &start)
        {
            start_offset += 1;
        }
        self.delete_linear(start_offset, end_offset.max(start_offset));
        DocPos::new(start_offset.min(self.length().saturating_sub(1)))
    }

    fn delete_in_table(&mut self, index: usize, start: &DocPos, end: &DocPos) -> DocPos {
        let Some(table) = self.blocks[index].as_table_mut() else {
            return start.clone();
        };
        let base = table.start;
        let range = table.range_of(&DocPos::relative(base, start), &DocPos::relative(base, end));
        let caret_in = |row: usize, cell: usize| DocPos::path(&[base, row, cell, 0]);
        match range {
            TableRange::Rows(rows) if table.delete_rows(rows.clone()) => {
                let row = rows.start.min(table.rows().len() - 1);
                caret_in(row, 0)
            }
            TableRange::Whole | TableRange::Rows(_) => {
                self.blocks.remove(index);
                self.ensure_block();
                self.recompute_starts();
                DocPos::new(base.min(self.length().saturating_sub(1)))
            }
            TableRange::Cells { .. } => {
                let cells = table.cells_in(&range);
                table.clear_cells(&cells);
                cells
                    .first()
                    .map_or_else(|| start.clone(), |(row, cell)| caret_in(*row, *cell))
            }
            TableRange::InCell {
                row,
                cell,
                start: from,
                end: to,
            } => match table.cell_mut(row, cell) {
                Some(target) => {
                    let caret = target.document.delete_range(&from, &to);
                    DocPos::nested(base, DocPos::nested(row, DocPos::nested(cell, caret)))
                }
                None => start.clone(),
            },
        }
    }

    /// Remove the rows of a table that lie before `end`
    fn delete_table_head(&mut self, index: usize, end: &DocPos) {
        let Some(table) = self.blocks[index].as_table_mut() else {
            return;
        };
        let local = DocPos::relative(table.start, end);
        let rows = match table.range_of(&DocPos::new(0), &local) {
            TableRange::Rows(rows) => rows,
            _ => return,
        };
        if rows.is_empty() {
            return;
        }
        if !table.delete_rows(rows) {
            self.blocks.remove(index);
            self.recompute_starts();
        }
    }

    /// Remove the rows of a table from `start` on. Returns false when that
    /// is every row; the table then goes with the linear part of the range.
    fn delete_table_tail(&mut self, index: usize, start: &DocPos) -> bool {
        let Some(table) = self.blocks[index].as_table_mut() else {
            return false;
        };
        let local = DocPos::relative(table.start, start);
        match table.range_of(&local, &DocPos::new(1)) {
            TableRange::Rows(rows) if rows.start > 0 => table.delete_rows(rows),
            _ => false,
        }
    }

    /// Delete flat offsets `start..end` across blocks
    fn delete_linear(&mut self, start: usize, end: usize) {
        if start >= end {
            return;
        }
        let first = self.block_index_at(start);
        for index in (first..self.blocks.len()).rev() {
            let block = &mut self.blocks[index];
            let (block_start, block_end) = (block.start(), block.end());
            let (from, to) = (start.max(block_start), end.min(block_end));
            if from >= to {
                continue;
            }
            if from == block_start && to == block_end {
                self.blocks.remove(index);
            } else if let Some(frames) = block.as_frames_mut() {
                frames.delete_range(from - block_start, to - block_start);
            }
        }
        self.recompute_starts();
        self.rejoin(first);
        self.blocks
            .retain(|block| block.as_frames().is_none_or(|frames| !frames.is_empty()));
        self.ensure_block();
        self.recompute_starts();
    }

    /// Give an unterminated block the first paragraph of the next one
    fn rejoin(&mut self, index: usize) {
        let open = self
            .blocks
            .get(index)
            .and_then(Block::as_frames)
            .is_some_and(|block| !block.is_empty() && !block.ends_terminated());
        if !open {
            return;
        }
        let next = self
            .blocks
            .get_mut(index + 1)
            .and_then(Block::as_frames_mut)
            .and_then(FrameBlock::remove_first_frame);
        if let Some(block) = self.blocks[index].as_frames_mut() {
            match next {
                Some(frame) => block.join_last(frame),
                None => block.terminate(),
            }
        }
    }

    // ============ formatting ============

    /// Split a range, given in either order, into per-block pieces
    fn segments(&self, start: &DocPos, end: &DocPos) -> Vec<Segment> {
        let (start, end) = ordered(start, end);
        if start >= end {
            if let Some(target) = self.cell_target(start) {
                let inner = target.inner.clone();
                return vec![Segment::InCell(target, inner)];
            }
            let block = self.block_index_at(start.index);
            let local = start.index.saturating_sub(self.blocks[block].start());
            return match &self.blocks[block] {
                Block::Frames(_) => vec![Segment::Frames {
                    block,
                    from: local,
                    to: local,
                }],
                Block::Table(_) => Vec::new(),
            };
        }
        self.clipped(start, end)
            .map(|(block, from, to)| match &self.blocks[block] {
                Block::Frames(_) => Segment::Frames {
                    block,
                    from: from.index,
                    to: to.index,
                },
                Block::Table(table) => match table.range_of(&from, &to) {
                    TableRange::InCell {
                        row,
                        cell,
                        start,
                        end,
                    } => Segment::InCell(
                        CellTarget {
                            block,
                            row,
                            cell,
                            inner: start,
                        },
                        end,
                    ),
                    range => Segment::Cells {
                        block,
                        cells: table.cells_in(&range),
                    },
                },
            })
            .collect()
    }

    /// Apply `edit` to every frame block range the selection touches,
    /// descending into table cells
    fn edit_paragraphs(
        &mut self,
        start: &DocPos,
        end: &DocPos,
        edit: &mut dyn FnMut(&mut FrameBlock, usize, usize),
    ) {
        for segment in self.segments(start, end) {
            match segment {
                Segment::Frames { block, from, to } => {
                    if let Some(frames) = self.blocks[block].as_frames_mut() {
                        edit(frames, from, to);
                    }
                }
                Segment::Cells { block, cells } => {
                    for (row, cell) in cells {
                        if let Some(document) = self.cell_document_mut(block, row, cell) {
                            let end = DocPos::new(document.length());
                            document.edit_paragraphs(&DocPos::new(0), &end, &mut *edit);
                        }
                    }
                }
                Segment::InCell(target, end) => {
                    if let Some(document) =
                        self.cell_document_mut(target.block, target.row, target.cell)
                    {
                        document.edit_paragraphs(&target.inner, &end, &mut *edit);
                    }
                }
            }
        }
    }

    /// Merge attributes into the fragments of a range; `null` values remove
    pub fn format_range(&mut self, start: &DocPos, end: &DocPos, attributes: &Attributes) {
        let (start, end) = ordered(start, end);
        if start == end {
            return;
        }
        self.edit_paragraphs(start, end, &mut |block, from, to| {
            block.format_range(from, to, attributes);
        });
    }

    /// Merge paragraph attributes into every paragraph the range touches
    pub fn format_paragraphs(&mut self, start: &DocPos, end: &DocPos, attributes: &Attributes) {
        self.edit_paragraphs(start, end, &mut |block, from, to| {
            block.format_paragraphs(from, to, attributes);
        });
    }

    /// Change the indent level of touched paragraphs by `delta`
    pub fn indent(&mut self, start: &DocPos, end: &DocPos, delta: isize) {
        self.edit_paragraphs(start, end, &mut |block, from, to| {
            block.indent_paragraphs(from, to, delta);
        });
    }

    /// Turn the paragraphs a range touches into a block of `kind`, splitting
    /// the surrounding blocks as needed
    pub fn convert_blocks(&mut self, start: &DocPos, end: &DocPos, kind: BlockKind) {
        for segment in self.segments(start, end).into_iter().rev() {
            match segment {
                Segment::Frames { block, from, to } => self.convert_frames(block, from, to, kind),
                Segment::Cells { block, cells } => {
                    for (row, cell) in cells {
                        if let Some(document) = self.cell_document_mut(block, row, cell) {
                            let end = DocPos::new(document.length());
                            document.convert_blocks(&DocPos::new(0), &end, kind);
                        }
                    }
                }
                Segment::InCell(target, end) => {
                    if let Some(document) =
                        self.cell_document_mut(target.block, target.row, target.cell)
                    {
                        document.convert_blocks(&target.inner, &end, kind);
                    }
                }
            }
        }
        self.recompute_starts();
    }

    fn convert_frames(&mut self, index: usize, from: usize, to: usize, kind: BlockKind) {
        if self.blocks[index]
            .as_frames()
            .is_none_or(|block| block.kind() == kind)
        {
            return;
        }
        let Block::Frames(mut head) = self.blocks.remove(index) else {
            return;
        };
        let touched = head.frames_touching(from, to);
        let tail = head.split_off(touched.end() + 1);
        let middle = head.split_off(*touched.start());

        let mut parts = Vec::new();
        if !head.is_empty() {
            parts.push(head);
        }
        if let Some(mut middle) = middle {
            middle.set_kind(kind);
            parts.push(middle);
        }
        parts.extend(tail);
        self.blocks
            .splice(index..index, parts.into_iter().map(Block::Frames));
    }

    // ============ tables ============

    /// Insert a `rows` × `cols` table after the paragraph holding `at`.
    /// Returns the caret in the first cell.
    pub fn insert_table(&mut self, at: &DocPos, rows: usize, cols: usize) -> DocPos {
        if let Some(caret) = self.in_cell(at, |document, inner| {
            document.insert_table(inner, rows, cols)
        }) {
            return caret;
        }
        let index = self.block_index_at(at.index);
        let block_end = self.blocks[index].end();
        let insert_at = match self.blocks[index].as_frames_mut() {
            Some(block) => {
                let (frame, _) = block.frame_at(at.index.saturating_sub(block.start));
                if let Some(tail) = block.split_off(frame + 1) {
                    self.blocks.insert(index + 1, Block::Frames(tail));
                }
                index + 1
            }
            None if at.index >= block_end => index + 1,
            None => index,
        };
        self.blocks
            .insert(insert_at, Block::Table(Table::new(rows, cols)));
        self.recompute_starts();
        DocPos::path(&[self.blocks[insert_at].start(), 0, 0, 0])
    }

    /// The innermost table both positions reach into, with the positions
    /// made relative to it
    fn table_scope_mut(&mut self, start: &DocPos, end: &DocPos) -> Option<(&mut Table, DocPos, DocPos)> {
        let index = self.table_holding(start)?;
        if self.table_holding(end) != Some(index) {
            return None;
        }
        let base = self.blocks[index].start();
        let deeper = match (self.cell_target(start), self.cell_target(end)) {
            (Some(a), Some(b)) if (a.row, a.cell) == (b.row, b.cell) => {
                let document = &self.blocks[index].as_table()?.cell(a.row, a.cell)?.document;
                let inner_table = document.table_holding(&a.inner);
                (inner_table.is_some() && inner_table == document.table_holding(&b.inner))
                    .then_some((a, b))
            }
            _ => None,
        };
        let table = self.blocks[index].as_table_mut()?;
        match deeper {
            Some((a, b)) => table
                .cell_mut(a.row, a.cell)?
                .document
                .table_scope_mut(&a.inner, &b.inner),
            None => Some((table, DocPos::relative(base, start), DocPos::relative(base, end))),
        }
    }

    /// Grid placement `(row, span, col, span)` of the cell a table-relative
    /// position addresses
    fn scoped_cell(table: &Table, pos: &DocPos) -> Result<(usize, usize, usize, usize), TableError> {
        let row = pos.inner().ok_or(TableError::NotInTable)?;
        let cell_index = row.inner().map_or(0, |cell| cell.index);
        let cell = table
            .cell(row.index, cell_index)
            .ok_or(TableError::NoSuchCell {
                row: row.index,
                cell: cell_index,
            })?;
        Ok((cell.grid_row(), cell.row_span, cell.grid_col(), cell.col_span))
    }

    pub fn insert_row(&mut self, at: &DocPos, below: bool) -> Result<(), TableError> {
        let (table, pos, _) = self.table_scope_mut(at, at).ok_or(TableError::NotInTable)?;
        let (row, row_span, _, _) = Self::scoped_cell(table, &pos)?;
        table.insert_row(if below { row + row_span } else { row });
        Ok(())
    }

    pub fn delete_row(&mut self, at: &DocPos) -> Result<(), TableError> {
        let (table, pos, _) = self.table_scope_mut(at, at).ok_or(TableError::NotInTable)?;
        let (row, _, _, _) = Self::scoped_cell(table, &pos)?;
        table.delete_row(row)
    }

    pub fn insert_column(&mut self, at: &DocPos, right: bool) -> Result<(), TableError> {
        let (table, pos, _) = self.table_scope_mut(at, at).ok_or(TableError::NotInTable)?;
        let (_, _, col, col_span) = Self::scoped_cell(table, &pos)?;
        table.insert_column(if right { col + col_span } else { col });
        Ok(())
    }

    pub fn delete_column(&mut self, at: &DocPos) -> Result<(), TableError> {
        let (table, pos, _) = self.table_scope_mut(at, at).ok_or(TableError::NotInTable)?;
        let (_, _, col, _) = Self::scoped_cell(table, &pos)?;
        table.delete_column(col)
    }

    /// Merge the cells a selection covers; returns the merged cell's
    /// content start
    pub fn merge_cells(&mut self, start: &DocPos, end: &DocPos) -> Result<DocPos, TableError> {
        let (start, end) = self.correct_selection(start, end);
        let (table, from, to) = self
            .table_scope_mut(&start, &end)
            .ok_or(TableError::NotInTable)?;
        let cells = table.cells_in(&table.range_of(&from, &to));
        let (row, cell) = table.merge_cells(&cells)?;
        // the scope may be nested; rebuild the path from the outer start
        Ok(replace_table_tail(&start, DocPos::nested(row, DocPos::nested(cell, DocPos::new(0)))))
    }

    pub fn unmerge_cell(&mut self, at: &DocPos) -> Result<(), TableError> {
        let (table, pos, _) = self.table_scope_mut(at, at).ok_or(TableError::NotInTable)?;
        let row = pos.inner().ok_or(TableError::NotInTable)?;
        let cell = row.inner().map_or(0, |cell| cell.index);
        table.unmerge_cell(row.index, cell)
    }
}

/// Replace the part of `pos` below its innermost table with `tail`
fn replace_table_tail(pos: &DocPos, tail: DocPos) -> DocPos {
    // a path inside a table is table.row.cell.inner; descend while the
    // cell content itself reaches into another table
    match pos.inner().and_then(DocPos::inner).and_then(DocPos::inner) {
        Some(content) if content.inner.is_some() => DocPos::nested(
            pos.index,
            DocPos::nested(
                pos.inner().map_or(0, |row| row.index),
                DocPos::nested(
                    pos.inner().and_then(DocPos::inner).map_or(0, |cell| cell.index),
                    replace_table_tail(content, tail),
                ),
            ),
        ),
        _ => DocPos::nested(pos.index, tail),
    }
}

fn ordered<'a>(a: &'a DocPos, b: &'a DocPos) -> (&'a DocPos, &'a DocPos) {
    if a <= b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{Exportable, OpSource};
    use crate::tests::fixtures::{document_with_table, paragraphs};
    use pretty_assertions::assert_eq;

    fn text(document: &Document) -> String {
        document.to_text(None)
    }

    // ============ content ============

    #[test]
    fn test_insert_text_with_newline() {
        let mut document = Document::from_text("hello");
        let caret = document.insert_text(&DocPos::new(2), "y\nz", None);
        assert_eq!(text(&document), "hey\nzllo\n");
        assert_eq!(caret, DocPos::new(5));
        assert_eq!(document.length(), 9);
    }

    #[test]
    fn test_insert_text_into_cell() {
        let mut document = document_with_table();
        let caret = document.insert_text(&DocPos::path(&[7, 1, 0, 1]), "!", None);
        assert_eq!(caret, DocPos::path(&[7, 1, 0, 2]));
        assert_eq!(text(&document), "before\na\tb\nc!\td\nafter\n");
        assert_eq!(document.length(), 14);
    }

    #[test]
    fn test_insert_before_leading_table_adds_paragraph() {
        let mut document = Document::new();
        document.insert_table(&DocPos::new(0), 1, 1);
        document.delete_range(&DocPos::new(0), &DocPos::new(1));
        assert_eq!(document.blocks()[0].tag(), "table");

        let caret = document.insert_text(&DocPos::new(0), "x", None);
        assert_eq!(caret, DocPos::new(1));
        let tags: Vec<&str> = document.blocks().iter().map(|block| block.tag()).collect();
        assert_eq!(tags, vec!["content", "table"]);
    }

    #[test]
    fn test_insert_image_fragment() {
        let mut document = Document::from_text("ab");
        let caret = document.insert_fragment(
            &DocPos::new(1),
            Fragment::image("a.png", 10.0, 10.0, Attributes::new()),
        );
        assert_eq!(caret, DocPos::new(2));
        assert_eq!(document.length(), 4);
    }

    // ============ deletion ============

    #[test]
    fn test_delete_across_blocks_joins_paragraphs() {
        let mut document = paragraphs(&["one", "two", "three"]);
        let caret = document.delete_range(&DocPos::new(2), &DocPos::new(10));
        assert_eq!(caret, DocPos::new(2));
        assert_eq!(text(&document), "onree\n");
        assert_eq!(document.blocks().len(), 1);
    }

    #[test]
    fn test_delete_everything_leaves_empty_paragraph() {
        let mut document = paragraphs(&["one", "two"]);
        document.delete_range(&DocPos::new(0), &DocPos::new(8));
        assert!(document.is_blank());
    }

    #[test]
    fn test_delete_into_table_removes_leading_rows() {
        let mut document = document_with_table();
        // from inside "before" into the first row: that row goes
        document.delete_range(&DocPos::new(3), &DocPos::path(&[7, 0, 1, 0]));
        assert_eq!(text(&document), "bef\nc\td\nafter\n");
    }

    #[test]
    fn test_delete_over_whole_table() {
        let mut document = document_with_table();
        document.delete_range(&DocPos::new(6), &DocPos::new(9));
        assert_eq!(text(&document), "beforefter\n");
        assert_eq!(document.blocks().len(), 1);
    }

    #[test]
    fn test_delete_cells_clears_content() {
        let mut document = document_with_table();
        let caret = document.delete_range(&DocPos::path(&[7, 0, 0, 0]), &DocPos::path(&[7, 0, 1, 1]));
        assert_eq!(caret, DocPos::path(&[7, 0, 0, 0]));
        assert_eq!(text(&document), "before\n\t\nc\td\nafter\n");
    }

    #[test]
    fn test_delete_inside_cell() {
        let mut document = Document::new();
        let caret = document.insert_table(&DocPos::new(0), 1, 1);
        let caret = document.insert_text(&caret, "abc", None);
        assert_eq!(caret, DocPos::path(&[1, 0, 0, 3]));
        let caret = document.delete_range(&DocPos::path(&[1, 0, 0, 1]), &caret);
        assert_eq!(caret, DocPos::path(&[1, 0, 0, 1]));
        assert_eq!(text(&document), "\na\n");
    }

    // ============ formatting ============

    #[test]
    fn test_format_range_across_blocks() {
        let mut document = paragraphs(&["one", "two"]);
        let bold = Attributes::new().with("bold", true);
        document.format_range(&DocPos::new(2), &DocPos::new(5), &bold);
        assert_eq!(
            document.to_html(None),
            "<p>on<strong>e</strong></p><p><strong>t</strong>wo</p>"
        );
    }

    #[test]
    fn test_reversed_ranges_edit_like_forward_ones() {
        let bold = Attributes::new().with("bold", true);
        let center = Attributes::new().with("align", "center");
        let edits: [&dyn Fn(&mut Document, &DocPos, &DocPos); 4] = [
            &|document: &mut Document, a: &DocPos, b: &DocPos| document.format_range(a, b, &bold),
            &|document: &mut Document, a: &DocPos, b: &DocPos| document.format_paragraphs(a, b, &center),
            &|document: &mut Document, a: &DocPos, b: &DocPos| document.indent(a, b, 1),
            &|document: &mut Document, a: &DocPos, b: &DocPos| document.convert_blocks(a, b, BlockKind::Code),
        ];
        for edit in edits {
            let mut forward = paragraphs(&["hello", "world"]);
            let mut reversed = forward.clone();
            edit(&mut forward, &DocPos::new(1), &DocPos::new(8));
            edit(&mut reversed, &DocPos::new(8), &DocPos::new(1));
            assert_ne!(forward.to_ops(), paragraphs(&["hello", "world"]).to_ops());
            assert_eq!(reversed.to_ops(), forward.to_ops());
        }
    }

    #[test]
    fn test_format_paragraph_at_caret() {
        let mut document = paragraphs(&["one", "two"]);
        let center = Attributes::new().with("align", "center");
        document.format_paragraphs(&DocPos::new(5), &DocPos::new(5), &center);
        assert_eq!(
            document.to_html(None),
            "<p>one</p><p style=\"text-align:center\">two</p>"
        );
    }

    #[test]
    fn test_indent_never_goes_negative() {
        let mut document = Document::from_text("a\nb");
        document.indent(&DocPos::new(0), &DocPos::new(3), 1);
        document.indent(&DocPos::new(0), &DocPos::new(0), -2);
        let levels: Vec<usize> = document.blocks()[0]
            .as_frames()
            .unwrap()
            .frames()
            .iter()
            .map(|frame| frame.indent_level())
            .collect();
        assert_eq!(levels, vec![0, 1]);
    }

    #[test]
    fn test_convert_middle_paragraph_splits_block() {
        let mut document = Document::from_text("a\nb\nc");
        document.convert_blocks(&DocPos::new(2), &DocPos::new(3), BlockKind::Quote);
        let tags: Vec<&str> = document.blocks().iter().map(|block| block.tag()).collect();
        assert_eq!(tags, vec!["content", "quote", "content"]);
        assert_eq!(document.length(), 6);
        assert_eq!(document.to_html(None), "<p>a</p><blockquote><p>b</p></blockquote><p>c</p>");
    }

    // ============ tables ============

    #[test]
    fn test_insert_table_after_caret_paragraph() {
        let mut document = Document::from_text("a\nb");
        let caret = document.insert_table(&DocPos::new(0), 2, 2);
        assert_eq!(caret, DocPos::path(&[2, 0, 0, 0]));
        let tags: Vec<&str> = document.blocks().iter().map(|block| block.tag()).collect();
        assert_eq!(tags, vec!["content", "table", "content"]);
        assert_eq!(document.length(), 5);
    }

    #[test]
    fn test_row_and_column_commands() {
        let mut document = document_with_table();
        let in_b = DocPos::path(&[7, 0, 1, 0]);
        document.insert_row(&in_b, true).unwrap();
        document.insert_column(&in_b, false).unwrap();
        let table = document.blocks()[1].as_table().unwrap();
        assert_eq!((table.rows().len(), table.columns()), (3, 3));
        assert_eq!(text(&document), "before\na\t\tb\n\t\t\nc\t\td\nafter\n");

        document.delete_row(&DocPos::path(&[7, 1, 0, 0])).unwrap();
        document.delete_column(&DocPos::path(&[7, 0, 1, 0])).unwrap();
        assert_eq!(text(&document), "before\na\tb\nc\td\nafter\n");
        assert_eq!(
            document.insert_row(&DocPos::new(2), false),
            Err(TableError::NotInTable)
        );
    }

    #[test]
    fn test_merge_and_unmerge_by_selection() {
        let mut document = document_with_table();
        let caret = document
            .merge_cells(&DocPos::path(&[7, 0, 0, 0]), &DocPos::path(&[7, 1, 0, 1]))
            .unwrap();
        assert_eq!(caret, DocPos::path(&[7, 0, 0, 0]));
        let table = document.blocks()[1].as_table().unwrap();
        assert_eq!(table.rows()[0].cells()[0].row_span, 2);
        assert_eq!(text(&document), "before\na c\tb\nd\nafter\n");

        document.unmerge_cell(&caret).unwrap();
        let ops = document.to_ops();
        let read = Document::from_ops(&ops, &crate::delta::Registry::default());
        assert_eq!(text(&read), "before\na c\tb\n\td\nafter\n");
    }
}
