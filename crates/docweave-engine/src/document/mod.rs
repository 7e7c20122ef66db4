/*!
 * # Document
 *
 * The root of the tree: an ordered list of blocks. Table cells own documents
 * too, so everything here also applies one level down.
 *
 * ## Invariants
 *
 * - A document always holds at least one block; an empty one is a content
 *   block with a single empty paragraph.
 * - Block starts are contiguous (`start(n + 1) == start(n) + length(n)`) and
 *   are recomputed after every splice.
 * - `height` is the bottom of the last block once laid out.
 *
 * ## Module Structure
 *
 * - **`mod`**: the `Document` type, layout and position queries
 * - **`edit`**: in-place edits addressed by `DocPos`, returning the caret
 * - **`apply`**: applying an external op list to a span of blocks
 */

use crate::blocks::{Block, BlockKind, Exportable, FrameBlock, Layout, OpSource, Selectable};
use crate::delta::{Delta, Registry, read_blocks};
use crate::layout::{IdleBudget, LayoutContext, LayoutProgress};
use crate::models::doc_pos::DocPos;
use crate::models::geometry::Rect;

pub mod apply;
pub mod edit;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    blocks: Vec<Block>,
    geometry: Rect,
    width: f32,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// A document holding one empty paragraph
    pub fn new() -> Self {
        Self::from_blocks(Vec::new())
    }

    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        let mut document = Self {
            blocks,
            geometry: Rect::default(),
            width: 0.0,
        };
        document.ensure_block();
        document.recompute_starts();
        document
    }

    pub fn from_ops(delta: &Delta, registry: &Registry) -> Self {
        Self::from_blocks(read_blocks(delta, registry))
    }

    /// One content block; `\n` separates paragraphs
    pub fn from_text(text: &str) -> Self {
        let mut block = FrameBlock::empty(BlockKind::Content);
        block.insert_text(0, text, None);
        Self::from_blocks(vec![Block::Frames(block)])
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn block(&self, index: usize) -> Option<&Block> {
        self.blocks.get(index)
    }

    pub fn length(&self) -> usize {
        self.blocks.iter().map(Block::length).sum()
    }

    pub fn height(&self) -> f32 {
        self.blocks
            .last()
            .map_or(0.0, |block| block.geometry().bottom())
    }

    /// A single empty paragraph in a content block
    pub fn is_blank(&self) -> bool {
        match self.blocks.as_slice() {
            [Block::Frames(block)] => block.kind() == BlockKind::Content && block.length() <= 1,
            _ => false,
        }
    }

    /// Index of the block holding `offset`; the end of the document
    /// resolves to the last block
    pub fn block_index_at(&self, offset: usize) -> usize {
        self.blocks
            .iter()
            .position(|block| offset < block.end())
            .unwrap_or(self.blocks.len().saturating_sub(1))
    }

    /// Block a position lands in. Positions reaching inside a table resolve
    /// to the table even though their index equals its start.
    pub fn block_index_for(&self, pos: &DocPos) -> usize {
        if pos.inner.is_some()
            && let Some(index) = self
                .blocks
                .iter()
                .position(|block| block.start() == pos.index && block.as_table().is_some())
        {
            return index;
        }
        self.block_index_at(pos.index)
    }

    /// Append another document's blocks
    pub fn append_document(&mut self, other: Document) {
        self.blocks.extend(other.blocks);
        self.recompute_starts();
        self.geometry.height = 0.0;
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
        self.ensure_block();
        self.recompute_starts();
    }

    pub(crate) fn ensure_block(&mut self) {
        if self.blocks.is_empty() {
            self.blocks
                .push(Block::Frames(FrameBlock::empty(BlockKind::Content)));
        }
    }

    pub(crate) fn recompute_starts(&mut self) {
        let mut start = 0;
        for block in &mut self.blocks {
            block.set_start(start);
            start += block.length();
        }
    }

    /// Lay out dirty blocks until the budget runs out
    pub fn layout_slice(
        &mut self,
        ctx: &LayoutContext<'_>,
        width: f32,
        budget: &dyn IdleBudget,
    ) -> LayoutProgress {
        self.set_width(width);
        let mut progress = LayoutProgress::Complete;
        for block in &mut self.blocks {
            if !block.needs_layout() {
                continue;
            }
            if !budget.has_time_remaining() {
                progress = LayoutProgress::Pending;
                break;
            }
            block.layout(ctx, width);
        }
        self.position_blocks();
        log::debug!(
            "layout slice finished {:?}, height {}",
            progress,
            self.geometry.height
        );
        progress
    }

    fn set_width(&mut self, width: f32) {
        if self.width != width {
            self.width = width;
            for block in &mut self.blocks {
                block.mark_dirty();
            }
        }
    }

    fn position_blocks(&mut self) {
        let mut y = 0.0;
        for block in &mut self.blocks {
            block.set_y(y);
            y += block.geometry().height;
        }
        self.geometry.width = self.width;
        self.geometry.height = y;
    }

    // ============ selection ============

    /// Blocks overlapping `start..end`, each with the range clipped to it
    /// and made block-relative
    pub(crate) fn clipped<'a>(
        &'a self,
        start: &'a DocPos,
        end: &'a DocPos,
    ) -> impl Iterator<Item = (usize, DocPos, DocPos)> + 'a {
        self.blocks.iter().enumerate().filter_map(move |(index, block)| {
            let block_start = DocPos::new(block.start());
            let block_end = DocPos::new(block.end());
            if *start >= block_end || *end <= block_start {
                return None;
            }
            let local_start = DocPos::relative(block.start(), start);
            let local_end = if end.index >= block.end() {
                DocPos::new(block.length())
            } else {
                DocPos::relative(block.start(), end)
            };
            Some((index, local_start, local_end))
        })
    }

    /// Caret rectangles for a position; two candidates on a soft wrap
    pub fn caret_rects(&self, pos: &DocPos) -> Vec<Rect> {
        self.get_selection_rectangles(pos, pos, None)
    }

    /// Normalize a selection that starts or ends inside tables. Positions
    /// are ordered first; ends outside every table are left alone.
    pub fn correct_selection(&self, start: &DocPos, end: &DocPos) -> (DocPos, DocPos) {
        let (mut start, mut end) = if start <= end {
            (start.clone(), end.clone())
        } else {
            (end.clone(), start.clone())
        };
        let start_table = self.table_holding(&start);
        let end_table = self.table_holding(&end);

        match (start_table, end_table) {
            (Some(a), Some(b)) if a == b => {
                if let Some(table) = self.blocks[a].as_table() {
                    let base = table.start;
                    let local = (DocPos::relative(base, &start), DocPos::relative(base, &end));
                    if let Some((s, e)) = table.correct_selection_pos(Some(&local.0), Some(&local.1)) {
                        start = s.map_or(start, |s| s.offset_by(base));
                        end = e.map_or(end, |e| e.offset_by(base));
                    }
                }
            }
            (a, b) => {
                if let Some(table) = a.and_then(|index| self.blocks[index].as_table()) {
                    let base = table.start;
                    if let Some((Some(s), _)) =
                        table.correct_selection_pos(Some(&DocPos::relative(base, &start)), None)
                    {
                        start = s.offset_by(base);
                    }
                }
                if let Some(table) = b.and_then(|index| self.blocks[index].as_table()) {
                    let base = table.start;
                    if let Some((_, Some(e))) =
                        table.correct_selection_pos(None, Some(&DocPos::relative(base, &end)))
                    {
                        end = e.offset_by(base);
                    }
                }
            }
        }
        (start, end)
    }

    /// Index of the table a position reaches inside
    fn table_holding(&self, pos: &DocPos) -> Option<usize> {
        pos.inner.as_ref()?;
        let index = self.block_index_for(pos);
        self.blocks[index].as_table().map(|_| index)
    }
}

impl Layout for Document {
    fn layout(&mut self, ctx: &LayoutContext<'_>, width: f32) {
        self.set_width(width);
        for block in &mut self.blocks {
            if block.needs_layout() {
                block.layout(ctx, width);
            }
        }
        self.position_blocks();
    }

    fn needs_layout(&self) -> bool {
        self.blocks.iter().any(Block::needs_layout)
    }

    fn geometry(&self) -> Rect {
        self.geometry
    }
}

impl Selectable for Document {
    fn get_document_pos(&self, x: f32, y: f32, is_start_of_selection: bool) -> Option<DocPos> {
        if y < 0.0 {
            return None;
        }
        let block = self.blocks.iter().find(|block| y < block.geometry().bottom())?;
        let origin = block.geometry();
        block
            .get_document_pos(x - origin.x, y - origin.y, is_start_of_selection)
            .map(|pos| pos.offset_by(block.start()))
    }

    fn get_selection_rectangles(
        &self,
        start: &DocPos,
        end: &DocPos,
        correct_by_y: Option<f32>,
    ) -> Vec<Rect> {
        let translate = |block: &Block, local_start: &DocPos, local_end: &DocPos| {
            let origin = block.geometry();
            block
                .get_selection_rectangles(local_start, local_end, correct_by_y.map(|y| y - origin.y))
                .into_iter()
                .map(move |rect| rect.translate(origin.x, origin.y))
        };
        if start >= end {
            let block = &self.blocks[self.block_index_for(start)];
            let local = DocPos::relative(block.start(), start);
            return translate(block, &local, &local).collect();
        }
        self.clipped(start, end)
            .flat_map(|(index, local_start, local_end)| {
                translate(&self.blocks[index], &local_start, &local_end).collect::<Vec<_>>()
            })
            .collect()
    }
}

impl OpSource for Document {
    fn to_ops(&self) -> Delta {
        self.blocks
            .iter()
            .fold(Delta::new(), |ops, block| ops.concat(block.to_ops()))
    }
}

impl Exportable for Document {
    fn to_text(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        match range {
            None => self.blocks.iter().map(|block| block.to_text(None)).collect(),
            Some((start, end)) => self
                .clipped(start, end)
                .map(|(index, from, to)| self.blocks[index].to_text(Some((&from, &to))))
                .collect(),
        }
    }

    fn to_html(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        match range {
            None => self.blocks.iter().map(|block| block.to_html(None)).collect(),
            Some((start, end)) => self
                .clipped(start, end)
                .map(|(index, from, to)| self.blocks[index].to_html(Some((&from, &to))))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MonospacePlatform;
    use crate::tests::fixtures::{document_with_table, paragraphs};
    use pretty_assertions::assert_eq;

    fn laid_out(mut document: Document) -> Document {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        document.layout(&LayoutContext::new(&platform), 200.0);
        document
    }

    #[test]
    fn test_new_document_has_one_empty_paragraph() {
        let document = Document::new();
        assert_eq!(document.blocks().len(), 1);
        assert_eq!(document.length(), 1);
        assert!(document.is_blank());
        assert_eq!(document.to_text(None), "\n");
    }

    #[test]
    fn test_block_starts_are_contiguous() {
        let document = document_with_table();
        let starts: Vec<(usize, usize)> = document
            .blocks()
            .iter()
            .map(|block| (block.start(), block.length()))
            .collect();
        assert_eq!(starts, vec![(0, 7), (7, 1), (8, 6)]);
        assert_eq!(document.length(), 14);
        assert_eq!(document.block_index_at(7), 1);
        assert_eq!(document.block_index_at(14), 2);
    }

    #[test]
    fn test_layout_stacks_blocks() {
        let document = laid_out(paragraphs(&["one", "two"]));
        assert_eq!(document.blocks()[1].geometry().y, 20.0);
        assert_eq!(document.height(), 40.0);
        assert!(!document.needs_layout());
    }

    #[test]
    fn test_point_lookup_adds_block_start() {
        let document = laid_out(paragraphs(&["one", "two"]));
        assert_eq!(document.get_document_pos(12.0, 25.0, false), Some(DocPos::new(5)));
    }

    #[test]
    fn test_point_outside_document_has_no_position() {
        let document = laid_out(paragraphs(&["one", "two"]));
        assert_eq!(document.get_document_pos(12.0, 40.0, false), None);
        assert_eq!(document.get_document_pos(12.0, 500.0, false), None);
        assert_eq!(document.get_document_pos(12.0, -1.0, false), None);
        assert_eq!(document.get_document_pos(500.0, 39.0, false), Some(DocPos::new(7)));
    }

    #[test]
    fn test_point_inside_table_nests() {
        let document = laid_out(document_with_table());
        // the table sits under one 20px paragraph; rows are 28px high
        assert_eq!(
            document.get_document_pos(115.0, 34.0, false),
            Some(DocPos::path(&[7, 0, 1, 1]))
        );
        assert_eq!(document.get_document_pos(100.5, 34.0, true), None);
    }

    #[test]
    fn test_selection_rectangles_span_blocks() {
        let document = laid_out(paragraphs(&["one", "two"]));
        let rects = document.get_selection_rectangles(&DocPos::new(1), &DocPos::new(6), None);
        assert_eq!(
            rects,
            vec![Rect::new(10.0, 0.0, 20.0, 20.0), Rect::new(0.0, 20.0, 20.0, 20.0)]
        );
        let filtered =
            document.get_selection_rectangles(&DocPos::new(1), &DocPos::new(6), Some(30.0));
        assert_eq!(filtered, vec![Rect::new(0.0, 20.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_correct_selection_into_table() {
        let document = document_with_table();
        let (start, end) =
            document.correct_selection(&DocPos::path(&[7, 0, 1, 1]), &DocPos::new(2));
        assert_eq!((start, end), (DocPos::new(2), DocPos::path(&[7, 1])));
    }

    #[test]
    fn test_clipped_export_across_table() {
        let document = document_with_table();
        assert_eq!(document.to_text(None), "before\na\tb\nc\td\nafter\n");
        let text = document.to_text(Some((&DocPos::new(3), &DocPos::new(10))));
        assert_eq!(text, "ore\na\tb\nc\td\naf");
    }

    #[test]
    fn test_ops_round_trip() {
        let document = document_with_table();
        let read = Document::from_ops(&document.to_ops(), &Registry::default());
        assert_eq!(read.to_ops(), document.to_ops());
        assert_eq!(read.length(), document.length());
    }
}
