/*!
 * # Blocks
 *
 * The top-level structural units of a document.
 *
 * ## Variants
 *
 * - **Frame blocks** (`frame_block`): content, quote and code blocks. Each
 *   holds one or more paragraphs (`LayoutFrame`s) and differs only in the
 *   insets it lays out with and the attribute defaults it imposes on its
 *   fragments (code is monospace, quotes are italic).
 * - **Tables** (`table`): rows of cells, each cell owning a nested
 *   `Document`. A table is one unit long in its parent document; positions
 *   inside it nest through row, cell and the cell's document.
 *
 * ## Capabilities
 *
 * Behaviour shared by blocks, cells and documents is expressed as small
 * traits rather than one large interface:
 *
 * - **`Layout`**: lay out for a width, report dirtiness and geometry
 * - **`Selectable`**: point to position, and range to rectangles
 * - **`OpSource`**: serialize to an insert-only op list
 * - **`Exportable`**: clipped plain-text and HTML projections
 *
 * All positions taken and returned by these traits are relative to the
 * receiver, and all geometry is relative to the receiver's origin.
 */

use crate::delta::Delta;
use crate::layout::LayoutContext;
use crate::models::attributes::{Attributes, keys};
use crate::models::doc_pos::DocPos;
use crate::models::geometry::Rect;

pub mod frame_block;
pub mod table;

pub use frame_block::FrameBlock;
pub use table::{BorderHints, Cell, Row, Table, TableError, TableRange};

pub trait Layout {
    fn layout(&mut self, ctx: &LayoutContext<'_>, width: f32);

    fn needs_layout(&self) -> bool;

    fn geometry(&self) -> Rect;
}

pub trait Selectable {
    /// Position under a point. When `is_start_of_selection` is set, points
    /// on structural boundaries such as table borders give `None`.
    fn get_document_pos(&self, x: f32, y: f32, is_start_of_selection: bool) -> Option<DocPos>;

    /// Rectangles covering `start..end`. With `correct_by_y`, rectangles
    /// whose vertical span misses that y are dropped.
    fn get_selection_rectangles(
        &self,
        start: &DocPos,
        end: &DocPos,
        correct_by_y: Option<f32>,
    ) -> Vec<Rect>;
}

pub trait OpSource {
    fn to_ops(&self) -> Delta;
}

pub trait Exportable {
    /// Plain text of the range, or of everything when `None`
    fn to_text(&self, range: Option<(&DocPos, &DocPos)>) -> String;

    fn to_html(&self, range: Option<(&DocPos, &DocPos)>) -> String;
}

/// The three flavours of frame block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Content,
    Quote,
    Code,
}

impl BlockKind {
    pub fn tag(self) -> &'static str {
        match self {
            BlockKind::Content => "content",
            BlockKind::Quote => "quote",
            BlockKind::Code => "code",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "content" => Some(BlockKind::Content),
            "quote" => Some(BlockKind::Quote),
            "code" => Some(BlockKind::Code),
            _ => None,
        }
    }

    /// Attribute keys carried by the block itself
    pub fn owned_keys(self) -> &'static [&'static str] {
        match self {
            BlockKind::Code => &[keys::LANGUAGE],
            BlockKind::Content | BlockKind::Quote => &[],
        }
    }

    /// Defaults this kind imposes below the fragments' own attributes
    pub fn override_defaults(self) -> Attributes {
        match self {
            BlockKind::Content => Attributes::new(),
            BlockKind::Quote => Attributes::new().with(keys::ITALIC, true),
            BlockKind::Code => Attributes::new().with(keys::FONT, "monospace"),
        }
    }
}

/// A top-level unit of a document
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Frames(FrameBlock),
    Table(Table),
}

impl Block {
    /// Document offset of the first unit, maintained by the owning document
    pub fn start(&self) -> usize {
        match self {
            Block::Frames(block) => block.start,
            Block::Table(table) => table.start,
        }
    }

    pub(crate) fn set_start(&mut self, start: usize) {
        match self {
            Block::Frames(block) => block.start = start,
            Block::Table(table) => table.start = start,
        }
    }

    pub fn length(&self) -> usize {
        match self {
            Block::Frames(block) => block.length(),
            Block::Table(_) => 1,
        }
    }

    pub fn end(&self) -> usize {
        self.start() + self.length()
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Block::Frames(block) => block.kind().tag(),
            Block::Table(_) => Table::TAG,
        }
    }

    pub fn as_frames(&self) -> Option<&FrameBlock> {
        match self {
            Block::Frames(block) => Some(block),
            Block::Table(_) => None,
        }
    }

    pub fn as_frames_mut(&mut self) -> Option<&mut FrameBlock> {
        match self {
            Block::Frames(block) => Some(block),
            Block::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&Table> {
        match self {
            Block::Table(table) => Some(table),
            Block::Frames(_) => None,
        }
    }

    pub fn as_table_mut(&mut self) -> Option<&mut Table> {
        match self {
            Block::Table(table) => Some(table),
            Block::Frames(_) => None,
        }
    }

    pub(crate) fn set_y(&mut self, y: f32) {
        match self {
            Block::Frames(block) => block.geometry.y = y,
            Block::Table(table) => table.geometry.y = y,
        }
    }

    pub fn mark_dirty(&mut self) {
        match self {
            Block::Frames(block) => block.mark_dirty(),
            Block::Table(table) => table.mark_dirty(),
        }
    }
}

impl Layout for Block {
    fn layout(&mut self, ctx: &LayoutContext<'_>, width: f32) {
        match self {
            Block::Frames(block) => block.layout(ctx, width),
            Block::Table(table) => table.layout(ctx, width),
        }
    }

    fn needs_layout(&self) -> bool {
        match self {
            Block::Frames(block) => block.needs_layout(),
            Block::Table(table) => table.needs_layout(),
        }
    }

    fn geometry(&self) -> Rect {
        match self {
            Block::Frames(block) => block.geometry(),
            Block::Table(table) => table.geometry(),
        }
    }
}

impl Selectable for Block {
    fn get_document_pos(&self, x: f32, y: f32, is_start_of_selection: bool) -> Option<DocPos> {
        match self {
            Block::Frames(block) => block.get_document_pos(x, y, is_start_of_selection),
            Block::Table(table) => table.get_document_pos(x, y, is_start_of_selection),
        }
    }

    fn get_selection_rectangles(
        &self,
        start: &DocPos,
        end: &DocPos,
        correct_by_y: Option<f32>,
    ) -> Vec<Rect> {
        match self {
            Block::Frames(block) => block.get_selection_rectangles(start, end, correct_by_y),
            Block::Table(table) => table.get_selection_rectangles(start, end, correct_by_y),
        }
    }
}

impl OpSource for Block {
    fn to_ops(&self) -> Delta {
        match self {
            Block::Frames(block) => block.to_ops(),
            Block::Table(table) => table.to_ops(),
        }
    }
}

impl Exportable for Block {
    fn to_text(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        match self {
            Block::Frames(block) => block.to_text(range),
            Block::Table(table) => table.to_text(range),
        }
    }

    fn to_html(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        match self {
            Block::Frames(block) => block.to_html(range),
            Block::Table(table) => table.to_html(range),
        }
    }
}
