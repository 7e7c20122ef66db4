use crate::blocks::BlockKind;
use crate::models::attributes::Attributes;
use crate::models::doc_pos::DocPos;
use crate::models::fragment::Fragment;

/// Edit commands understood by the content controller.
///
/// Positions are document-level; ranges may be given in either order.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        at: DocPos,
        text: String,
        attributes: Option<Attributes>,
    },
    /// Insert an image or date fragment
    InsertEmbed { at: DocPos, fragment: Fragment },
    DeleteRange { start: DocPos, end: DocPos },
    /// Set fragment attributes; `null` values remove
    Format {
        start: DocPos,
        end: DocPos,
        attributes: Attributes,
    },
    /// Set paragraph attributes on every touched paragraph
    FormatParagraph {
        start: DocPos,
        end: DocPos,
        attributes: Attributes,
    },
    Indent { start: DocPos, end: DocPos },
    Outdent { start: DocPos, end: DocPos },
    ConvertBlock {
        start: DocPos,
        end: DocPos,
        kind: BlockKind,
    },
    InsertTable { at: DocPos, rows: usize, cols: usize },
    InsertRow { at: DocPos, below: bool },
    DeleteRow { at: DocPos },
    InsertColumn { at: DocPos, right: bool },
    DeleteColumn { at: DocPos },
    MergeCells { start: DocPos, end: DocPos },
    UnmergeCell { at: DocPos },
}

impl Cmd {
    /// The positions the command touches, in document order
    pub fn range(&self) -> (&DocPos, &DocPos) {
        let (a, b) = match self {
            Cmd::InsertText { at, .. }
            | Cmd::InsertEmbed { at, .. }
            | Cmd::InsertTable { at, .. }
            | Cmd::InsertRow { at, .. }
            | Cmd::DeleteRow { at }
            | Cmd::InsertColumn { at, .. }
            | Cmd::DeleteColumn { at }
            | Cmd::UnmergeCell { at } => (at, at),
            Cmd::DeleteRange { start, end }
            | Cmd::Format { start, end, .. }
            | Cmd::FormatParagraph { start, end, .. }
            | Cmd::Indent { start, end }
            | Cmd::Outdent { start, end }
            | Cmd::ConvertBlock { start, end, .. }
            | Cmd::MergeCells { start, end } => (start, end),
        };
        if a <= b { (a, b) } else { (b, a) }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Cmd::InsertText { .. } => "insert_text",
            Cmd::InsertEmbed { .. } => "insert_embed",
            Cmd::DeleteRange { .. } => "delete_range",
            Cmd::Format { .. } => "format",
            Cmd::FormatParagraph { .. } => "format_paragraph",
            Cmd::Indent { .. } => "indent",
            Cmd::Outdent { .. } => "outdent",
            Cmd::ConvertBlock { .. } => "convert_block",
            Cmd::InsertTable { .. } => "insert_table",
            Cmd::InsertRow { .. } => "insert_row",
            Cmd::DeleteRow { .. } => "delete_row",
            Cmd::InsertColumn { .. } => "insert_column",
            Cmd::DeleteColumn { .. } => "delete_column",
            Cmd::MergeCells { .. } => "merge_cells",
            Cmd::UnmergeCell { .. } => "unmerge_cell",
        }
    }
}
