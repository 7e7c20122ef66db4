use std::collections::BTreeSet;
use std::ops::Range;

use serde_json::Value;

use crate::blocks::{Exportable, Layout, OpSource, Selectable};
use crate::delta::{Delta, InsertValue, Op, Registry};
use crate::document::Document;
use crate::layout::LayoutContext;
use crate::models::attributes::{Attributes, keys};
use crate::models::doc_pos::DocPos;
use crate::models::geometry::Rect;

/// Width of the band around a cell edge that counts as border
pub const BORDER_BAND: f32 = 3.0;

/// Which outer edges of the table a cell touches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BorderHints {
    pub is_first_cell: bool,
    pub is_last_cell: bool,
    pub is_first_line: bool,
    pub is_last_line: bool,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TableError {
    #[error("no cell at row {row}, index {cell}")]
    NoSuchCell { row: usize, cell: usize },
    #[error("selected cells do not tile a rectangle")]
    NotRectangular,
    #[error("at least two cells are needed to merge")]
    NothingToMerge,
    #[error("cell does not span more than one slot")]
    NotMerged,
    #[error("the table would have no rows or columns left")]
    WouldEmpty,
    #[error("the position is not inside a table")]
    NotInTable,
}

/// A table cell; its content is a document of its own
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub document: Document,
    pub row_span: usize,
    pub col_span: usize,
    pub attributes: Attributes,
    pub(crate) grid_row: usize,
    pub(crate) grid_col: usize,
    pub(crate) border: BorderHints,
    pub(crate) geometry: Rect,
}

impl Cell {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            row_span: 1,
            col_span: 1,
            attributes: Attributes::new(),
            grid_row: 0,
            grid_col: 0,
            border: BorderHints::default(),
            geometry: Rect::default(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Document::new())
    }

    pub fn with_span(mut self, row_span: usize, col_span: usize) -> Self {
        self.row_span = row_span.max(1);
        self.col_span = col_span.max(1);
        self
    }

    pub fn grid_row(&self) -> usize {
        self.grid_row
    }

    pub fn grid_col(&self) -> usize {
        self.grid_col
    }

    pub fn border(&self) -> BorderHints {
        self.border
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    fn grid_rows(&self) -> Range<usize> {
        self.grid_row..self.grid_row + self.row_span
    }

    fn grid_cols(&self) -> Range<usize> {
        self.grid_col..self.grid_col + self.col_span
    }

    fn to_op(&self) -> Op {
        let mut attributes = self.attributes.clone();
        if self.col_span > 1 {
            attributes.insert(keys::COL_SPAN, self.col_span);
        }
        if self.row_span > 1 {
            attributes.insert(keys::ROW_SPAN, self.row_span);
        }
        Op::Insert {
            value: InsertValue::Nested(self.document.to_ops()),
            attributes: attributes.into_option(),
        }
    }

    fn from_op(op: &Op, registry: &Registry) -> Option<Cell> {
        let Op::Insert {
            value: InsertValue::Nested(content),
            attributes,
        } = op
        else {
            return None;
        };
        let mut attributes = attributes.clone().unwrap_or_default();
        let spans = attributes.split_off_keys(&[keys::COL_SPAN, keys::ROW_SPAN]);
        let mut cell = Cell::new(Document::from_ops(content, registry)).with_span(
            spans.get_usize(keys::ROW_SPAN).unwrap_or(1),
            spans.get_usize(keys::COL_SPAN).unwrap_or(1),
        );
        cell.attributes = attributes;
        Some(cell)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    cells: Vec<Cell>,
    /// Row attributes; `height` is an explicit minimum height
    pub attributes: Attributes,
    pub(crate) y: f32,
    pub(crate) height: f32,
}

impl Row {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self {
            cells,
            attributes: Attributes::new(),
            y: 0.0,
            height: 0.0,
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Index at which a cell starting at grid column `col` belongs
    fn insert_index(&self, col: usize) -> usize {
        self.cells.iter().filter(|cell| cell.grid_col < col).count()
    }
}

/// A selection inside one table, as classified from two table-relative
/// positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableRange {
    Whole,
    Rows(Range<usize>),
    /// Every cell whose origin lies in the grid rectangle
    Cells { rows: Range<usize>, cols: Range<usize> },
    /// A range inside one cell's document
    InCell {
        row: usize,
        cell: usize,
        start: DocPos,
        end: DocPos,
    },
}

/// A grid of cells. Occupies a single unit in its document.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    rows: Vec<Row>,
    /// Table attributes; `colWidths` fixes column widths
    pub attributes: Attributes,
    pub(crate) geometry: Rect,
    pub(crate) start: usize,
    columns: usize,
    column_x: Vec<f32>,
    padding: f32,
    needs_layout: bool,
    width: f32,
}

impl Table {
    pub const TAG: &'static str = "table";

    pub fn from_rows(rows: Vec<Row>, attributes: Attributes) -> Self {
        let mut table = Self {
            rows,
            attributes,
            geometry: Rect::default(),
            start: 0,
            columns: 0,
            column_x: Vec::new(),
            padding: 0.0,
            needs_layout: true,
            width: 0.0,
        };
        table.compute_grid();
        table
    }

    /// A `rows` × `cols` table of empty cells
    pub fn new(rows: usize, cols: usize) -> Self {
        let rows = (0..rows.max(1))
            .map(|_| Row::new((0..cols.max(1)).map(|_| Cell::empty()).collect()))
            .collect();
        Self::from_rows(rows, Attributes::new())
    }

    /// Build from the nested op list of a table insert: one nested insert per
    /// row, holding one nested insert per cell
    pub fn from_ops(rows: &Delta, attributes: Attributes, registry: &Registry) -> Option<Table> {
        let mut parsed = Vec::new();
        for op in rows.ops() {
            let Op::Insert {
                value: InsertValue::Nested(cells),
                attributes: row_attributes,
            } = op
            else {
                log::warn!("skipping non-row unit inside a table");
                continue;
            };
            let mut row = Row::new(Vec::new());
            row.attributes = row_attributes.clone().unwrap_or_default();
            for op in cells.ops() {
                match Cell::from_op(op, registry) {
                    Some(cell) => row.cells.push(cell),
                    None => log::warn!("skipping non-cell unit inside a table row"),
                }
            }
            parsed.push(row);
        }
        if parsed.iter().all(|row| row.cells.is_empty()) {
            return None;
        }
        Some(Self::from_rows(parsed, attributes))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn cell(&self, row: usize, cell: usize) -> Option<&Cell> {
        self.rows.get(row)?.cells.get(cell)
    }

    pub fn cell_mut(&mut self, row: usize, cell: usize) -> Option<&mut Cell> {
        self.needs_layout = true;
        self.rows.get_mut(row)?.cells.get_mut(cell)
    }

    pub fn mark_dirty(&mut self) {
        self.needs_layout = true;
    }

    /// Assign grid coordinates and border hints
    fn compute_grid(&mut self) {
        let row_count = self.rows.len();
        let mut remaining: Vec<usize> = Vec::new();
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            let mut col = 0;
            for cell in &mut row.cells {
                while col < remaining.len() && remaining[col] > 0 {
                    col += 1;
                }
                cell.row_span = cell.row_span.clamp(1, row_count - row_index);
                cell.grid_row = row_index;
                cell.grid_col = col;
                let end = col + cell.col_span;
                if remaining.len() < end {
                    remaining.resize(end, 0);
                }
                for slot in &mut remaining[col..end] {
                    *slot = cell.row_span;
                }
                col = end;
            }
            for slot in &mut remaining {
                *slot = slot.saturating_sub(1);
            }
        }
        self.columns = remaining.len();
        let columns = self.columns;
        for cell in self.rows.iter_mut().flat_map(|row| row.cells.iter_mut()) {
            cell.border = BorderHints {
                is_first_cell: cell.grid_col == 0,
                is_last_cell: cell.grid_col + cell.col_span == columns,
                is_first_line: cell.grid_row == 0,
                is_last_line: cell.grid_row + cell.row_span == row_count,
            };
        }
        self.needs_layout = true;
    }

    fn cells(&self) -> impl Iterator<Item = (usize, usize, &Cell)> {
        self.rows.iter().enumerate().flat_map(|(row_index, row)| {
            row.cells
                .iter()
                .enumerate()
                .map(move |(cell_index, cell)| (row_index, cell_index, cell))
        })
    }

    /// Row and index of the cell covering a grid slot
    pub fn cell_at_slot(&self, grid_row: usize, grid_col: usize) -> Option<(usize, usize)> {
        self.cells()
            .find(|(_, _, cell)| {
                cell.grid_rows().contains(&grid_row) && cell.grid_cols().contains(&grid_col)
            })
            .map(|(row, index, _)| (row, index))
    }

    fn column_widths(&self, width: f32, min_width: f32) -> Vec<f32> {
        if let Some(Value::Array(widths)) = self.attributes.get(keys::COL_WIDTHS)
            && widths.len() == self.columns
        {
            return widths
                .iter()
                .map(|width| (width.as_f64().unwrap_or(0.0) as f32).max(min_width))
                .collect();
        }
        let columns = self.columns.max(1) as f32;
        vec![(width / columns).max(min_width); self.columns]
    }

    // ============ selection ============

    /// Normalize a selection touching this table.
    ///
    /// Positions are table-relative; `None` means outside the table. Returns
    /// `None` when both ends are outside. Otherwise the result is the whole
    /// table, a row range, a rectangular cell range (widened to every spanning
    /// cell it touches), or a range within one cell. A collapsed selection on
    /// a row or cell boundary moves to the start of that cell's content.
    pub fn correct_selection_pos(
        &self,
        start: Option<&DocPos>,
        end: Option<&DocPos>,
    ) -> Option<(Option<DocPos>, Option<DocPos>)> {
        if start.is_none() && end.is_none() {
            return None;
        }
        fn inside(pos: Option<&DocPos>) -> Option<&DocPos> {
            pos.filter(|p| p.index == 0).and_then(DocPos::inner)
        }
        let row_boundary = |row: usize| Some(DocPos::nested(0, DocPos::new(row)));

        match (inside(start), inside(end)) {
            (None, None) => Some((start.cloned(), end.cloned())),
            (None, Some(end_row)) => Some((start.cloned(), row_boundary(self.row_end(end_row)))),
            (Some(start_row), None) => Some((row_boundary(start_row.index), end.cloned())),
            (Some(a), Some(b)) => {
                if a.inner.is_none() || b.inner.is_none() {
                    if a == b {
                        let cursor = self.content_start(a.index, 0)?;
                        return Some((Some(cursor.clone()), Some(cursor)));
                    }
                    return Some((row_boundary(a.index), row_boundary(self.row_end(b))));
                }
                let (a_cell, b_cell) = (a.inner()?, b.inner()?);
                if a.index == b.index && a_cell.index == b_cell.index {
                    if a_cell.inner.is_none() || b_cell.inner.is_none() {
                        let cursor = self.content_start(a.index, a_cell.index)?;
                        let end = if a == b {
                            cursor.clone()
                        } else {
                            Self::cell_pos(b.index, b_cell.index, b_cell.inner().cloned().unwrap_or_default())
                        };
                        return Some((Some(cursor), Some(end)));
                    }
                    return Some((start.cloned(), end.cloned()));
                }
                let (rows, cols) = self.rectangle(
                    self.cell(a.index, a_cell.index)?,
                    self.cell(b.index, b_cell.index)?,
                );
                Some(self.rectangle_bounds(&rows, &cols))
            }
        }
    }

    fn cell_pos(row: usize, cell: usize, inner: DocPos) -> DocPos {
        DocPos::nested(0, DocPos::nested(row, DocPos::nested(cell, inner)))
    }

    fn content_start(&self, row: usize, cell: usize) -> Option<DocPos> {
        let row_cells = &self.rows.get(row)?.cells;
        let cell = cell.min(row_cells.len().checked_sub(1)?);
        Some(Self::cell_pos(row, cell, DocPos::new(0)))
    }

    /// Row index just past the row(s) a row-level position covers
    fn row_end(&self, pos: &DocPos) -> usize {
        match pos.inner().and_then(|cell| self.cell(pos.index, cell.index)) {
            Some(cell) => cell.grid_row + cell.row_span,
            None if pos.inner.is_some() => pos.index + 1,
            None => pos.index,
        }
        .min(self.rows.len())
    }

    /// Smallest grid rectangle holding both cells and every cell it cuts
    fn rectangle(&self, a: &Cell, b: &Cell) -> (Range<usize>, Range<usize>) {
        let mut rows = a.grid_row.min(b.grid_row)
            ..(a.grid_row + a.row_span).max(b.grid_row + b.row_span);
        let mut cols = a.grid_col.min(b.grid_col)
            ..(a.grid_col + a.col_span).max(b.grid_col + b.col_span);
        loop {
            let mut grown = false;
            for (_, _, cell) in self.cells() {
                let (cell_rows, cell_cols) = (cell.grid_rows(), cell.grid_cols());
                let intersects = cell_rows.start < rows.end
                    && rows.start < cell_rows.end
                    && cell_cols.start < cols.end
                    && cols.start < cell_cols.end;
                if !intersects {
                    continue;
                }
                if cell_rows.start < rows.start || cell_rows.end > rows.end {
                    rows = rows.start.min(cell_rows.start)..rows.end.max(cell_rows.end);
                    grown = true;
                }
                if cell_cols.start < cols.start || cell_cols.end > cols.end {
                    cols = cols.start.min(cell_cols.start)..cols.end.max(cell_cols.end);
                    grown = true;
                }
            }
            if !grown {
                return (rows, cols);
            }
        }
    }

    /// Cell-boundary positions delimiting a grid rectangle
    fn rectangle_bounds(&self, rows: &Range<usize>, cols: &Range<usize>) -> (Option<DocPos>, Option<DocPos>) {
        let first_row = &self.rows[rows.start];
        let start_cell = first_row
            .cells
            .iter()
            .position(|cell| cell.grid_col >= cols.start)
            .unwrap_or(0);
        let end_row = rows
            .clone()
            .rev()
            .find(|row| {
                self.rows[*row]
                    .cells
                    .iter()
                    .any(|cell| cols.contains(&cell.grid_col))
            })
            .unwrap_or(rows.start);
        let end_cell = self.rows[end_row]
            .cells
            .iter()
            .filter(|cell| cell.grid_col < cols.end)
            .count();
        (
            Some(DocPos::nested(0, DocPos::nested(rows.start, DocPos::new(start_cell)))),
            Some(DocPos::nested(0, DocPos::nested(end_row, DocPos::new(end_cell)))),
        )
    }

    /// Classify a table-relative range. Start positions past the table and
    /// end positions before it never reach here.
    pub fn range_of(&self, start: &DocPos, end: &DocPos) -> TableRange {
        let start_row = start.inner().filter(|_| start.index == 0);
        let end_row = end.inner().filter(|_| end.index == 0);
        match (start_row, end_row) {
            (None, None) => TableRange::Whole,
            (None, Some(b)) => TableRange::Rows(0..self.row_end(b)),
            (Some(a), None) => TableRange::Rows(a.index..self.rows.len()),
            (Some(a), Some(b)) => {
                let (Some(a_cell), Some(b_cell)) = (a.inner(), b.inner()) else {
                    return TableRange::Rows(a.index..self.row_end(b).max(a.index));
                };
                if a.index == b.index && a_cell.index == b_cell.index {
                    return TableRange::InCell {
                        row: a.index,
                        cell: a_cell.index,
                        start: a_cell.inner().cloned().unwrap_or_default(),
                        end: b_cell
                            .inner()
                            .cloned()
                            .unwrap_or_else(|| DocPos::new(self.cell_length(b.index, b_cell.index))),
                    };
                }
                // an end on a cell boundary closes the range after the previous cell
                let b_index = if b_cell.inner.is_none() {
                    b_cell.index.saturating_sub(1)
                } else {
                    b_cell.index
                };
                match (self.cell(a.index, a_cell.index), self.cell(b.index, b_index)) {
                    (Some(first), Some(last)) => {
                        let rows = first.grid_row.min(last.grid_row)
                            ..(first.grid_row + first.row_span).max(last.grid_row + last.row_span);
                        let cols = first.grid_col.min(last.grid_col)
                            ..(first.grid_col + first.col_span).max(last.grid_col + last.col_span);
                        TableRange::Cells { rows, cols }
                    }
                    _ => TableRange::Rows(a.index..self.row_end(b).max(a.index)),
                }
            }
        }
    }

    fn cell_length(&self, row: usize, cell: usize) -> usize {
        self.cell(row, cell).map_or(0, |cell| cell.document.length())
    }

    /// Row and cell indices of every cell a range covers, in row order
    pub fn cells_in(&self, range: &TableRange) -> Vec<(usize, usize)> {
        self.cells()
            .filter(|(row, index, cell)| match range {
                TableRange::Whole => true,
                TableRange::Rows(rows) => rows.contains(row),
                TableRange::Cells { rows, cols } => {
                    rows.contains(&cell.grid_row) && cols.contains(&cell.grid_col)
                }
                TableRange::InCell { row: r, cell: c, .. } => r == row && c == index,
            })
            .map(|(row, index, _)| (row, index))
            .collect()
    }

    fn rows_rect(&self, rows: &Range<usize>) -> Option<Rect> {
        let first = self.rows.get(rows.start)?;
        let last = self.rows.get(rows.end.checked_sub(1)?)?;
        Some(Rect::new(
            0.0,
            first.y,
            self.geometry.width,
            last.y + last.height - first.y,
        ))
    }

    pub(crate) fn content_origin(&self, cell: &Cell) -> (f32, f32) {
        (cell.geometry.x + self.padding, cell.geometry.y + self.padding)
    }

    // ============ structure editing ============

    /// The top-left cell if the given cells tile a rectangle with no gaps
    /// and no overlaps
    pub fn can_merge_cells(&self, cells: &[(usize, usize)]) -> Option<(usize, usize)> {
        let selected: Vec<&Cell> = cells
            .iter()
            .map(|(row, cell)| self.cell(*row, *cell))
            .collect::<Option<_>>()?;
        let first = selected.first()?;
        let mut rows = first.grid_rows();
        let mut cols = first.grid_cols();
        for cell in &selected {
            rows = rows.start.min(cell.grid_row)..rows.end.max(cell.grid_row + cell.row_span);
            cols = cols.start.min(cell.grid_col)..cols.end.max(cell.grid_col + cell.col_span);
        }

        let mut filled = vec![vec![false; cols.len()]; rows.len()];
        for cell in &selected {
            for row in cell.grid_rows() {
                for col in cell.grid_cols() {
                    let slot = &mut filled[row - rows.start][col - cols.start];
                    if *slot {
                        return None;
                    }
                    *slot = true;
                }
            }
        }
        let full_row = vec![true; cols.len()];
        if filled.iter().any(|row| *row != full_row) {
            return None;
        }
        cells
            .iter()
            .copied()
            .find(|(row, cell)| {
                self.cell(*row, *cell)
                    .is_some_and(|c| c.grid_row == rows.start && c.grid_col == cols.start)
            })
    }

    /// Merge cells into the top-left one, which takes over their content.
    /// Returns the merged cell's row and index.
    pub fn merge_cells(&mut self, cells: &[(usize, usize)]) -> Result<(usize, usize), TableError> {
        let unique: BTreeSet<(usize, usize)> = cells.iter().copied().collect();
        if unique.len() < 2 {
            return Err(TableError::NothingToMerge);
        }
        for &(row, cell) in &unique {
            if self.cell(row, cell).is_none() {
                return Err(TableError::NoSuchCell { row, cell });
            }
        }
        let cells: Vec<(usize, usize)> = unique.into_iter().collect();
        let (origin_row, origin_cell) = self.can_merge_cells(&cells).ok_or(TableError::NotRectangular)?;

        let (mut row_end, mut col_end) = (0, 0);
        for &(row, cell) in &cells {
            let cell = &self.rows[row].cells[cell];
            row_end = row_end.max(cell.grid_row + cell.row_span);
            col_end = col_end.max(cell.grid_col + cell.col_span);
        }

        let mut absorbed = Vec::new();
        for &(row, cell) in cells.iter().rev() {
            if (row, cell) != (origin_row, origin_cell) {
                absorbed.push((row, self.rows[row].cells.remove(cell)));
            }
        }
        absorbed.reverse();

        // the other cells sit right of or below the origin, so its index holds
        let origin_index = origin_cell;
        let origin = &mut self.rows[origin_row].cells[origin_index];
        origin.row_span = row_end - origin.grid_row;
        origin.col_span = col_end - origin.grid_col;
        for (_, cell) in absorbed {
            if !cell.document.is_blank() {
                origin.document.append_document(cell.document);
            }
        }
        log::debug!(
            "merged {} cells into row {origin_row}, cell {origin_index}",
            cells.len()
        );
        self.compute_grid();
        Ok((origin_row, origin_index))
    }

    /// Split a spanning cell back into single-slot cells; new cells are empty
    pub fn unmerge_cell(&mut self, row: usize, cell: usize) -> Result<(), TableError> {
        let target = self.cell(row, cell).ok_or(TableError::NoSuchCell { row, cell })?;
        if target.row_span == 1 && target.col_span == 1 {
            return Err(TableError::NotMerged);
        }
        let (rows, cols, origin) = (target.grid_rows(), target.grid_cols(), target.grid_col);
        for grid_row in rows {
            for col in cols.clone() {
                if grid_row == row && col == origin {
                    continue;
                }
                let row_cells = &mut self.rows[grid_row];
                let index = row_cells.insert_index(col);
                let mut filler = Cell::empty();
                filler.grid_row = grid_row;
                filler.grid_col = col;
                row_cells.cells.insert(index, filler);
            }
        }
        if let Some(target) = self.rows[row]
            .cells
            .iter_mut()
            .find(|candidate| candidate.grid_col == origin && candidate.row_span * candidate.col_span > 1)
        {
            target.row_span = 1;
            target.col_span = 1;
        }
        self.compute_grid();
        Ok(())
    }

    /// Insert an empty row before `at`; cells spanning across grow
    pub fn insert_row(&mut self, at: usize) {
        let at = at.min(self.rows.len());
        let mut cells = Vec::new();
        let mut col = 0;
        while col < self.columns {
            let spanning = self.cells().find(|(_, _, cell)| {
                cell.grid_row < at && at < cell.grid_row + cell.row_span && cell.grid_cols().contains(&col)
            });
            match spanning {
                Some((row, index, cell)) => {
                    col = cell.grid_col + cell.col_span;
                    cells.push(Err((row, index)));
                }
                None => {
                    cells.push(Ok(Cell::empty()));
                    col += 1;
                }
            }
        }
        let mut new_row = Row::new(Vec::new());
        for cell in cells {
            match cell {
                Ok(cell) => new_row.cells.push(cell),
                Err((row, index)) => self.rows[row].cells[index].row_span += 1,
            }
        }
        self.rows.insert(at, new_row);
        self.compute_grid();
    }

    /// Remove row `at`. Cells starting there with a row span move down.
    pub fn delete_row(&mut self, at: usize) -> Result<(), TableError> {
        if at >= self.rows.len() {
            return Err(TableError::NoSuchCell { row: at, cell: 0 });
        }
        if self.rows.len() == 1 {
            return Err(TableError::WouldEmpty);
        }
        for row in &mut self.rows[..at] {
            for cell in &mut row.cells {
                if cell.grid_row + cell.row_span > at {
                    cell.row_span -= 1;
                }
            }
        }
        let removed = self.rows.remove(at);
        for mut cell in removed.cells {
            if cell.row_span > 1 {
                cell.row_span -= 1;
                let below = &mut self.rows[at];
                let index = below.insert_index(cell.grid_col);
                below.cells.insert(index, cell);
            }
        }
        self.compute_grid();
        Ok(())
    }

    /// Insert an empty column before grid column `at`
    pub fn insert_column(&mut self, at: usize) {
        let at = at.min(self.columns);
        let mut covered = BTreeSet::new();
        for row in &mut self.rows {
            for cell in &mut row.cells {
                if cell.grid_col < at && at < cell.grid_col + cell.col_span {
                    cell.col_span += 1;
                    covered.extend(cell.grid_rows());
                }
            }
        }
        for (row_index, row) in self.rows.iter_mut().enumerate() {
            if covered.contains(&row_index) {
                continue;
            }
            let index = row.insert_index(at);
            row.cells.insert(index, Cell::empty());
        }
        if let Some(Value::Array(widths)) = self.attributes.get(keys::COL_WIDTHS).cloned()
            && widths.len() == self.columns
        {
            let mut widths = widths;
            let copied = widths.get(at.min(widths.len().saturating_sub(1))).cloned();
            widths.insert(at, copied.unwrap_or(Value::from(0)));
            self.attributes.insert(keys::COL_WIDTHS, Value::Array(widths));
        }
        self.compute_grid();
    }

    /// Remove grid column `at`; spanning cells shrink
    pub fn delete_column(&mut self, at: usize) -> Result<(), TableError> {
        if at >= self.columns {
            return Err(TableError::NoSuchCell { row: 0, cell: at });
        }
        if self.columns == 1 {
            return Err(TableError::WouldEmpty);
        }
        for row in &mut self.rows {
            row.cells.retain_mut(|cell| {
                if !cell.grid_cols().contains(&at) {
                    return true;
                }
                if cell.col_span > 1 {
                    cell.col_span -= 1;
                    return true;
                }
                false
            });
        }
        if let Some(Value::Array(widths)) = self.attributes.get(keys::COL_WIDTHS).cloned()
            && widths.len() == self.columns
        {
            let mut widths = widths;
            widths.remove(at);
            self.attributes.insert(keys::COL_WIDTHS, Value::Array(widths));
        }
        self.compute_grid();
        Ok(())
    }

    /// Replace the content of the given cells with an empty paragraph
    pub fn clear_cells(&mut self, cells: &[(usize, usize)]) {
        for &(row, cell) in cells {
            if let Some(cell) = self.cell_mut(row, cell) {
                cell.document = Document::new();
            }
        }
    }

    /// Remove whole rows, keeping the span bookkeeping valid. Returns false
    /// when that would leave no rows.
    pub fn delete_rows(&mut self, rows: Range<usize>) -> bool {
        if rows.start == 0 && rows.end >= self.rows.len() {
            return false;
        }
        for at in rows.rev() {
            if self.delete_row(at).is_err() {
                return false;
            }
        }
        true
    }
}

impl Layout for Table {
    fn layout(&mut self, ctx: &LayoutContext<'_>, width: f32) {
        if !self.needs_layout() && self.width == width {
            return;
        }
        let padding = ctx.settings.cell_padding;
        let widths = self.column_widths(width, ctx.settings.min_column_width);
        let mut column_x = Vec::with_capacity(widths.len() + 1);
        let mut x = 0.0;
        column_x.push(x);
        for width in &widths {
            x += width;
            column_x.push(x);
        }

        let row_count = self.rows.len();
        let mut own_heights = vec![0.0f32; row_count];
        let mut spanning: Vec<Vec<(usize, f32)>> = vec![Vec::new(); row_count];
        for row in &mut self.rows {
            for cell in &mut row.cells {
                let cell_width = column_x[cell.grid_col + cell.col_span] - column_x[cell.grid_col];
                cell.document
                    .layout(ctx, (cell_width - 2.0 * padding).max(0.0));
                let content = cell.document.height() + 2.0 * padding;
                if cell.row_span == 1 {
                    own_heights[cell.grid_row] = own_heights[cell.grid_row].max(content);
                } else {
                    spanning[cell.grid_row + cell.row_span - 1].push((cell.grid_row, content));
                }
            }
        }

        let mut heights = vec![0.0f32; row_count];
        let mut y = 0.0;
        for row_index in 0..row_count {
            let explicit = self.rows[row_index]
                .attributes
                .get_f32(keys::HEIGHT)
                .unwrap_or(0.0);
            let mut height = own_heights[row_index].max(explicit);
            for (first_row, content) in &spanning[row_index] {
                let above: f32 = heights[*first_row..row_index].iter().sum();
                height = height.max(content - above);
            }
            heights[row_index] = height;
            let row = &mut self.rows[row_index];
            row.y = y;
            row.height = height;
            y += height;
        }

        for row in &mut self.rows {
            for cell in &mut row.cells {
                let top = heights[..cell.grid_row].iter().sum::<f32>();
                let height = heights[cell.grid_rows()].iter().sum::<f32>();
                cell.geometry = Rect::new(
                    column_x[cell.grid_col],
                    top,
                    column_x[cell.grid_col + cell.col_span] - column_x[cell.grid_col],
                    height,
                );
            }
        }

        log::debug!("laid out table with {row_count} rows and {} columns", self.columns);
        self.geometry.width = x;
        self.geometry.height = y;
        self.column_x = column_x;
        self.padding = padding;
        self.width = width;
        self.needs_layout = false;
    }

    fn needs_layout(&self) -> bool {
        self.needs_layout
            || self
                .rows
                .iter()
                .flat_map(|row| row.cells.iter())
                .any(|cell| cell.document.needs_layout())
    }

    fn geometry(&self) -> Rect {
        self.geometry
    }
}

impl Selectable for Table {
    fn get_document_pos(&self, x: f32, y: f32, is_start_of_selection: bool) -> Option<DocPos> {
        if self.rows.is_empty() || self.geometry.width <= 0.0 {
            return Some(DocPos::new(0));
        }
        let cx = x.clamp(0.0, self.geometry.width - 0.01);
        let cy = y.clamp(0.0, self.geometry.height - 0.01);
        let (row, index, cell) = self
            .cells()
            .find(|(_, _, cell)| cell.geometry.contains(cx, cy))?;
        if is_start_of_selection {
            let g = cell.geometry;
            let edge = (x - g.x).min(g.right() - x).min(y - g.y).min(g.bottom() - y);
            if edge < BORDER_BAND {
                return None;
            }
        }
        let (origin_x, origin_y) = self.content_origin(cell);
        // padding and slack below short content map onto the nearest line
        let inner_y = (cy - origin_y).clamp(0.0, (cell.document.height() - 0.01).max(0.0));
        let inner = cell
            .document
            .get_document_pos(cx - origin_x, inner_y, is_start_of_selection)?;
        Some(Self::cell_pos(row, index, inner))
    }

    fn get_selection_rectangles(
        &self,
        start: &DocPos,
        end: &DocPos,
        correct_by_y: Option<f32>,
    ) -> Vec<Rect> {
        let rects = match self.range_of(start, end) {
            TableRange::Whole => vec![Rect::new(0.0, 0.0, self.geometry.width, self.geometry.height)],
            TableRange::Rows(rows) => self.rows_rect(&rows).into_iter().collect(),
            range @ TableRange::Cells { .. } => self
                .cells_in(&range)
                .into_iter()
                .filter_map(|(row, cell)| self.cell(row, cell).map(Cell::geometry))
                .collect(),
            TableRange::InCell {
                row,
                cell,
                start,
                end,
            } => {
                let Some(cell) = self.cell(row, cell) else {
                    return Vec::new();
                };
                let (dx, dy) = self.content_origin(cell);
                return cell
                    .document
                    .get_selection_rectangles(&start, &end, correct_by_y.map(|y| y - dy))
                    .into_iter()
                    .map(|rect| rect.translate(dx, dy))
                    .collect();
            }
        };
        match correct_by_y {
            Some(y) => rects.into_iter().filter(|rect| rect.contains_y(y)).collect(),
            None => rects,
        }
    }
}

impl OpSource for Table {
    fn to_ops(&self) -> Delta {
        let rows = Delta::from_ops(self.rows.iter().map(|row| Op::Insert {
            value: InsertValue::Nested(Delta::from_ops(row.cells.iter().map(Cell::to_op))),
            attributes: row.attributes.clone().into_option(),
        }));
        Delta::new().insert_nested(rows, Some(self.attributes.clone().with(keys::BLOCK, Self::TAG)))
    }
}

impl Table {
    fn export_range(&self, range: Option<(&DocPos, &DocPos)>) -> TableRange {
        match range {
            Some((start, end)) => self.range_of(start, end),
            None => TableRange::Whole,
        }
    }

    /// Selected cells grouped by row
    fn export_rows(&self, range: &TableRange) -> Vec<(usize, Vec<usize>)> {
        let mut rows: Vec<(usize, Vec<usize>)> = Vec::new();
        for (row, cell) in self.cells_in(range) {
            match rows.last_mut() {
                Some((last, cells)) if *last == row => cells.push(cell),
                _ => rows.push((row, vec![cell])),
            }
        }
        rows
    }
}

impl Exportable for Table {
    fn to_text(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        let range = self.export_range(range);
        if let TableRange::InCell {
            row,
            cell,
            start,
            end,
        } = &range
        {
            return self
                .cell(*row, *cell)
                .map(|cell| cell.document.to_text(Some((start, end))))
                .unwrap_or_default();
        }
        let mut text = String::new();
        for (row, cells) in self.export_rows(&range) {
            let line: Vec<String> = cells
                .iter()
                .filter_map(|cell| self.cell(row, *cell))
                .map(|cell| cell.document.to_text(None).trim_end_matches('\n').replace('\n', " "))
                .collect();
            text.push_str(&line.join("\t"));
            text.push('\n');
        }
        text
    }

    fn to_html(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        let range = self.export_range(range);
        if let TableRange::InCell {
            row,
            cell,
            start,
            end,
        } = &range
        {
            return self
                .cell(*row, *cell)
                .map(|cell| cell.document.to_html(Some((start, end))))
                .unwrap_or_default();
        }
        let mut html = String::from("<table>");
        for (row, cells) in self.export_rows(&range) {
            html.push_str("<tr>");
            for cell in cells.iter().filter_map(|cell| self.cell(row, *cell)) {
                html.push_str("<td");
                if cell.col_span > 1 {
                    html.push_str(&format!(" colspan=\"{}\"", cell.col_span));
                }
                if cell.row_span > 1 {
                    html.push_str(&format!(" rowspan=\"{}\"", cell.row_span));
                }
                html.push('>');
                html.push_str(&cell.document.to_html(None));
                html.push_str("</td>");
            }
            html.push_str("</tr>");
        }
        html.push_str("</table>");
        html
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MonospacePlatform;
    use crate::tests::fixtures::{cell_text, paragraphs, table};
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn grid(table: &Table) -> Vec<Vec<(usize, usize, usize, usize)>> {
        table
            .rows()
            .iter()
            .map(|row| {
                row.cells()
                    .iter()
                    .map(|cell| (cell.grid_row, cell.grid_col, cell.row_span, cell.col_span))
                    .collect()
            })
            .collect()
    }

    /// Which cell covers each slot, as (row, index)
    fn occupancy(table: &Table) -> Vec<Vec<Option<(usize, usize)>>> {
        (0..table.rows().len())
            .map(|row| {
                (0..table.columns())
                    .map(|col| table.cell_at_slot(row, col))
                    .collect()
            })
            .collect()
    }

    fn pos(path: &[usize]) -> DocPos {
        DocPos::path(path)
    }

    // ============ grid ============

    #[test]
    fn test_grid_skips_slots_covered_from_above() {
        let table = Table::from_rows(
            vec![
                Row::new(vec![Cell::empty().with_span(2, 1), Cell::empty(), Cell::empty()]),
                Row::new(vec![Cell::empty().with_span(1, 2)]),
            ],
            Attributes::new(),
        );
        assert_eq!(
            grid(&table),
            vec![
                vec![(0, 0, 2, 1), (0, 1, 1, 1), (0, 2, 1, 1)],
                vec![(1, 1, 1, 2)],
            ]
        );
        assert_eq!(table.columns(), 3);
        let hints = table.rows()[1].cells()[0].border();
        assert!(hints.is_last_cell && hints.is_last_line && !hints.is_first_cell);
    }

    #[test]
    fn test_row_span_is_clamped_to_table() {
        let table = Table::from_rows(
            vec![Row::new(vec![Cell::empty().with_span(5, 1)])],
            Attributes::new(),
        );
        assert_eq!(table.rows()[0].cells()[0].row_span, 1);
    }

    // ============ layout ============

    #[test]
    fn test_spanning_cell_inflates_its_last_row() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut tall = Cell::new(paragraphs(&["1", "2", "3", "4"])).with_span(2, 1);
        tall.attributes = Attributes::new();
        let mut table = Table::from_rows(
            vec![
                Row::new(vec![tall, Cell::new(paragraphs(&["b"]))]),
                Row::new(vec![Cell::new(paragraphs(&["c"]))]),
            ],
            Attributes::new(),
        );
        table.layout(&ctx, 200.0);
        let heights: Vec<f32> = table.rows().iter().map(Row::height).collect();
        assert_eq!(heights, vec![28.0, 60.0]);
        assert_eq!(table.geometry().height, 88.0);
        assert_eq!(table.rows()[0].cells()[0].geometry(), Rect::new(0.0, 0.0, 100.0, 88.0));
        assert_eq!(table.rows()[1].cells()[0].geometry(), Rect::new(100.0, 28.0, 100.0, 60.0));
    }

    #[test]
    fn test_explicit_row_height_and_column_widths() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut table = table(&[&["a", "b"]]);
        table.attributes.insert("colWidths", serde_json::json!([50, 150]));
        table.rows[0].attributes.insert("height", 40);
        table.layout(&ctx, 400.0);
        assert_eq!(table.geometry(), Rect::new(0.0, 0.0, 200.0, 40.0));
        assert_eq!(table.rows()[0].cells()[1].geometry().x, 50.0);
    }

    #[test]
    fn test_point_to_cell_position_and_border_band() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut table = table(&[&["ab", "cd"], &["ef", "gh"]]);
        table.layout(&ctx, 200.0);
        assert_eq!(table.get_document_pos(125.0, 40.0, false), Some(pos(&[0, 1, 1, 2])));
        assert_eq!(table.get_document_pos(101.0, 40.0, true), None);
        assert_eq!(table.get_document_pos(101.0, 40.0, false), Some(pos(&[0, 1, 1, 0])));
    }

    // ============ selection correction ============

    #[test]
    fn test_whole_table_selection_is_canonical() {
        let table = table(&[&["a", "b"], &["c", "d"]]);
        let (start, end) = (pos(&[0]), pos(&[1]));
        assert_eq!(
            table.correct_selection_pos(Some(&start), Some(&end)),
            Some((Some(start), Some(end)))
        );
    }

    #[test]
    fn test_selection_from_outside_into_first_row_takes_the_row() {
        let table = table(&[&["a", "b"], &["c", "d"]]);
        let end = pos(&[0, 0, 1, 1]);
        assert_eq!(
            table.correct_selection_pos(None, Some(&end)),
            Some((None, Some(pos(&[0, 1]))))
        );
    }

    #[test]
    fn test_cross_cell_selection_in_one_row() {
        let table = table(&[&["a", "b", "c"]]);
        assert_eq!(
            table.correct_selection_pos(Some(&pos(&[0, 0, 0, 0])), Some(&pos(&[0, 0, 1, 1]))),
            Some((Some(pos(&[0, 0, 0])), Some(pos(&[0, 0, 2]))))
        );
    }

    #[test]
    fn test_both_ends_outside_is_left_alone() {
        let table = table(&[&["a"]]);
        assert_eq!(table.correct_selection_pos(None, None), None);
    }

    #[test]
    fn test_cursor_on_cell_boundary_moves_into_content() {
        let table = table(&[&["a", "b"]]);
        let boundary = pos(&[0, 0, 1]);
        assert_eq!(
            table.correct_selection_pos(Some(&boundary), Some(&boundary)),
            Some((Some(pos(&[0, 0, 1, 0])), Some(pos(&[0, 0, 1, 0]))))
        );
        let row = pos(&[0, 0]);
        assert_eq!(
            table.correct_selection_pos(Some(&row), Some(&row)),
            Some((Some(pos(&[0, 0, 0, 0])), Some(pos(&[0, 0, 0, 0]))))
        );
    }

    #[test]
    fn test_selection_inside_one_cell_is_unchanged() {
        let table = table(&[&["abc", "d"]]);
        let (start, end) = (pos(&[0, 0, 0, 1]), pos(&[0, 0, 0, 3]));
        assert_eq!(
            table.correct_selection_pos(Some(&start), Some(&end)),
            Some((Some(start), Some(end)))
        );
    }

    #[test]
    fn test_rectangle_grows_to_spanning_cells() {
        // row 0: [A (2 cols)] [B]
        // row 1: [C] [D] [E]
        let table = Table::from_rows(
            vec![
                Row::new(vec![Cell::empty().with_span(1, 2), Cell::empty()]),
                Row::new(vec![Cell::empty(), Cell::empty(), Cell::empty()]),
            ],
            Attributes::new(),
        );
        // from D up to A: A covers columns 0-1, so C joins
        let corrected = table.correct_selection_pos(Some(&pos(&[0, 1, 1, 0])), Some(&pos(&[0, 0, 0, 0])));
        assert_eq!(corrected, Some((Some(pos(&[0, 0, 0])), Some(pos(&[0, 1, 2])))));

        let range = table.range_of(&pos(&[0, 0, 0]), &pos(&[0, 1, 2]));
        assert_eq!(range, TableRange::Cells { rows: 0..2, cols: 0..2 });
        assert_eq!(table.cells_in(&range), vec![(0, 0), (1, 0), (1, 1)]);
    }

    #[test]
    fn test_start_inside_end_after_takes_rows_to_the_end() {
        let table = table(&[&["a"], &["b"], &["c"]]);
        let after = pos(&[1]);
        assert_eq!(
            table.correct_selection_pos(Some(&pos(&[0, 1, 0, 0])), Some(&after)),
            Some((Some(pos(&[0, 1])), Some(after.clone())))
        );
        assert_eq!(table.range_of(&pos(&[0, 1]), &after), TableRange::Rows(1..3));
    }

    // ============ merge & unmerge ============

    #[rstest]
    #[case::square(vec![(0, 0), (0, 1), (1, 0), (1, 1)], Some((0, 0)))]
    #[case::row(vec![(1, 0), (1, 1)], Some((1, 0)))]
    #[case::l_shape(vec![(0, 0), (0, 1), (1, 0)], None)]
    #[case::gap(vec![(0, 0), (0, 2)], None)]
    #[case::duplicate(vec![(0, 0), (0, 0)], None)]
    #[case::missing(vec![(0, 0), (7, 7)], None)]
    fn test_can_merge_requires_a_filled_rectangle(
        #[case] cells: Vec<(usize, usize)>,
        #[case] expected: Option<(usize, usize)>,
    ) {
        let table = table(&[&["a", "b", "c"], &["d", "e", "f"]]);
        assert_eq!(table.can_merge_cells(&cells), expected);
    }

    #[test]
    fn test_merge_then_unmerge_restores_occupancy() {
        let mut table = table(&[&["a", "b", "c"], &["d", "e", "f"]]);
        let before = occupancy(&table);

        let merged = table.merge_cells(&[(0, 1), (0, 2), (1, 1), (1, 2)]).unwrap();
        assert_eq!(merged, (0, 1));
        assert_eq!(grid(&table), vec![vec![(0, 0, 1, 1), (0, 1, 2, 2)], vec![(1, 0, 1, 1)]]);
        assert_eq!(cell_text(&table, 0, 1), "b\nc\ne\nf\n");

        table.unmerge_cell(0, 1).unwrap();
        assert_eq!(occupancy(&table), before);
        assert_eq!(cell_text(&table, 0, 2), "\n");
    }

    #[test]
    fn test_merge_failures() {
        let mut table = table(&[&["a", "b"], &["c", "d"]]);
        assert_eq!(table.merge_cells(&[(0, 0)]), Err(TableError::NothingToMerge));
        assert_eq!(
            table.merge_cells(&[(0, 0), (1, 1)]),
            Err(TableError::NotRectangular)
        );
        assert_eq!(table.unmerge_cell(0, 0), Err(TableError::NotMerged));
        assert_eq!(
            table.unmerge_cell(4, 0),
            Err(TableError::NoSuchCell { row: 4, cell: 0 })
        );
    }

    // ============ rows & columns ============

    #[test]
    fn test_insert_row_through_spanning_cell_extends_it() {
        let mut table = Table::from_rows(
            vec![
                Row::new(vec![Cell::empty().with_span(2, 1), Cell::empty()]),
                Row::new(vec![Cell::empty()]),
            ],
            Attributes::new(),
        );
        table.insert_row(1);
        assert_eq!(
            grid(&table),
            vec![
                vec![(0, 0, 3, 1), (0, 1, 1, 1)],
                vec![(1, 1, 1, 1)],
                vec![(2, 1, 1, 1)],
            ]
        );
    }

    #[test]
    fn test_delete_row_moves_spanning_cell_down() {
        let mut table = Table::from_rows(
            vec![
                Row::new(vec![Cell::new(paragraphs(&["tall"])).with_span(2, 1), Cell::empty()]),
                Row::new(vec![Cell::empty()]),
            ],
            Attributes::new(),
        );
        table.delete_row(0).unwrap();
        assert_eq!(grid(&table), vec![vec![(0, 0, 1, 1), (0, 1, 1, 1)]]);
        assert_eq!(cell_text(&table, 0, 0), "tall\n");
        assert_eq!(table.delete_row(0), Err(TableError::WouldEmpty));
    }

    #[test]
    fn test_insert_and_delete_columns() {
        let mut table = table(&[&["a", "b"], &["c", "d"]]);
        table.attributes.insert("colWidths", serde_json::json!([10, 20]));
        table.insert_column(1);
        assert_eq!(table.columns(), 3);
        assert_eq!(cell_text(&table, 1, 2), "d\n");
        assert_eq!(table.attributes.get("colWidths"), Some(&serde_json::json!([10, 20, 20])));

        table.merge_cells(&[(0, 0), (0, 1)]).unwrap();
        table.delete_column(0).unwrap();
        assert_eq!(grid(&table), vec![vec![(0, 0, 1, 1), (0, 1, 1, 1)], vec![(1, 0, 1, 1), (1, 1, 1, 1)]]);
        assert_eq!(cell_text(&table, 0, 0), "a\n");
        assert_eq!(table.attributes.get("colWidths"), Some(&serde_json::json!([20, 20])));
    }

    // ============ serialization & export ============

    #[test]
    fn test_ops_round_trip_through_registry() {
        let mut table = table(&[&["a", "b"], &["c", "d"]]);
        table.merge_cells(&[(0, 0), (1, 0)]).unwrap();
        let ops = table.to_ops();
        let Some(Op::Insert {
            value: InsertValue::Nested(rows),
            attributes,
        }) = ops.ops().first()
        else {
            panic!("expected a nested insert");
        };
        let mut attributes = attributes.clone().unwrap();
        assert_eq!(attributes.remove("block"), Some(Value::from("table")));
        let read = Table::from_ops(rows, attributes, &Registry::default()).unwrap();
        assert_eq!(read.to_ops(), ops);
        assert_eq!(read.rows()[0].cells()[0].row_span, 2);
    }

    #[test]
    fn test_text_and_html_export() {
        let mut table = table(&[&["a", "b"], &["c", "d"]]);
        assert_eq!(table.to_text(None), "a\tb\nc\td\n");
        table.merge_cells(&[(0, 0), (0, 1)]).unwrap();
        insta::assert_snapshot!(
            table.to_html(None),
            @r#"<table><tr><td colspan="2"><p>a</p><p>b</p></td></tr><tr><td><p>c</p></td><td><p>d</p></td></tr></table>"#
        );
        let second_row = (pos(&[0, 1]), pos(&[1]));
        assert_eq!(table.to_text(Some((&second_row.0, &second_row.1))), "c\td\n");
    }
}
