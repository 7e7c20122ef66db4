use crate::blocks::{Block, OpSource};
use crate::delta::{Delta, Registry};
use crate::document::Document;
use crate::editing::{Cmd, EditError, EditGroup, History, Patch, Selection};
use crate::models::doc_pos::DocPos;

/// Applies commands to a document and records them for undo.
///
/// Every command snapshots the ops of the blocks around its range, mutates
/// the tree in place, snapshots the same span again and records the diff.
/// Undo and redo replay recorded diffs through [`Document::apply_delta`].
#[derive(Debug)]
pub struct ContentController {
    document: Document,
    registry: Registry,
    selection: Selection,
    history: History,
    /// The document as one op list, kept by composing every applied change
    state: Delta,
    version: u64,
}

impl ContentController {
    pub fn new(document: Document, registry: Registry) -> Self {
        let state = document.to_ops();
        Self {
            document,
            registry,
            selection: Selection::default(),
            history: History::default(),
            state,
            version: 0,
        }
    }

    pub fn from_ops(ops: &Delta, registry: Registry) -> Self {
        Self::new(Document::from_ops(ops, &registry), registry)
    }

    pub fn with_history_depth(mut self, depth: usize) -> Self {
        self.history = History::new(depth);
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Mutable access for layout. Edits made through it are not recorded.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
    }

    pub fn state(&self) -> &Delta {
        &self.state
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Run a command. A command that changes nothing returns a patch with
    /// an empty diff and leaves the history and selection alone.
    pub fn apply(&mut self, cmd: Cmd) -> Result<Patch, EditError> {
        let (lo, hi) = {
            let (lo, hi) = cmd.range();
            (lo.clone(), hi.clone())
        };
        let count = self.document.blocks().len();
        let first = self.document.block_index_for(&lo).saturating_sub(1);
        let end = (self.document.block_index_for(&hi) + 2).min(count);
        let tail = count - end;
        let prefix = self.document.blocks()[first].start();
        let before = span_ops(&self.document.blocks()[first..end]);

        log::debug!("applying {} over blocks {first}..{end}", cmd.name());
        let caret = self.execute(cmd)?;

        let blocks = self.document.blocks();
        let after = span_ops(&blocks[first..blocks.len().saturating_sub(tail).max(first)]);
        let diff = before.diff(&after)?;
        let redo = Delta::new().retain(prefix, None).concat(diff.clone()).chop();
        if diff.is_empty() {
            return Ok(Patch {
                diff: Delta::new(),
                new_selection: self.selection.clone(),
                version: self.version,
            });
        }
        let new_selection = match caret {
            Some(pos) => Selection::caret(pos),
            None => Selection::new(lo, hi).transform(&redo),
        };
        let selection_before = std::mem::replace(&mut self.selection, new_selection.clone());
        let undo = Delta::new()
            .retain(prefix, None)
            .concat(diff.invert(&before))
            .chop();
        self.state = self.state.compose(&redo);
        self.version += 1;
        self.history.push(EditGroup {
            redo: redo.clone(),
            undo,
            selection_before,
            selection_after: new_selection.clone(),
        });
        Ok(Patch {
            diff: redo,
            new_selection,
            version: self.version,
        })
    }

    /// Mutate the tree; returns the caret for commands that place one
    fn execute(&mut self, cmd: Cmd) -> Result<Option<DocPos>, EditError> {
        let document = &mut self.document;
        let caret = match cmd {
            Cmd::InsertText {
                at,
                text,
                attributes,
            } => Some(document.insert_text(&at, &text, attributes.as_ref())),
            Cmd::InsertEmbed { at, fragment } => Some(document.insert_fragment(&at, fragment)),
            Cmd::DeleteRange { start, end } => Some(document.delete_range(&start, &end)),
            Cmd::Format {
                start,
                end,
                attributes,
            } => {
                document.format_range(&start, &end, &attributes);
                None
            }
            Cmd::FormatParagraph {
                start,
                end,
                attributes,
            } => {
                document.format_paragraphs(&start, &end, &attributes);
                None
            }
            Cmd::Indent { start, end } => {
                document.indent(&start, &end, 1);
                None
            }
            Cmd::Outdent { start, end } => {
                document.indent(&start, &end, -1);
                None
            }
            Cmd::ConvertBlock { start, end, kind } => {
                document.convert_blocks(&start, &end, kind);
                None
            }
            Cmd::InsertTable { at, rows, cols } => Some(document.insert_table(&at, rows, cols)),
            Cmd::InsertRow { at, below } => {
                document.insert_row(&at, below)?;
                None
            }
            Cmd::DeleteRow { at } => {
                document.delete_row(&at)?;
                None
            }
            Cmd::InsertColumn { at, right } => {
                document.insert_column(&at, right)?;
                None
            }
            Cmd::DeleteColumn { at } => {
                document.delete_column(&at)?;
                None
            }
            Cmd::MergeCells { start, end } => Some(document.merge_cells(&start, &end)?),
            Cmd::UnmergeCell { at } => {
                document.unmerge_cell(&at)?;
                None
            }
        };
        Ok(caret)
    }

    pub fn undo(&mut self) -> Option<Patch> {
        let group = self.history.undo()?.clone();
        self.replay(&group.undo, group.selection_before)
    }

    pub fn redo(&mut self) -> Option<Patch> {
        let group = self.history.redo()?.clone();
        self.replay(&group.redo, group.selection_after)
    }

    fn replay(&mut self, change: &Delta, selection: Selection) -> Option<Patch> {
        if let Err(err) = self.document.apply_delta(change, &self.registry) {
            log::error!("failed to replay history entry: {err}");
            return None;
        }
        self.state = self.state.compose(change);
        self.selection = selection.clone();
        self.version += 1;
        Some(Patch {
            diff: change.clone(),
            new_selection: selection,
            version: self.version,
        })
    }
}

fn span_ops(blocks: &[Block]) -> Delta {
    blocks
        .iter()
        .fold(Delta::new(), |ops, block| ops.concat(block.to_ops()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::{BlockKind, Exportable, TableError};
    use crate::models::attributes::Attributes;
    use crate::tests::fixtures::{document_with_table, paragraphs};
    use pretty_assertions::assert_eq;

    fn controller(document: Document) -> ContentController {
        ContentController::new(document, Registry::default())
    }

    fn text(controller: &ContentController) -> String {
        controller.document().to_text(None)
    }

    // ============ commands ============

    #[test]
    fn test_insert_text_records_diff_and_caret() {
        let mut controller = controller(paragraphs(&["one", "two"]));
        let patch = controller
            .apply(Cmd::InsertText {
                at: DocPos::new(5),
                text: "X".to_string(),
                attributes: None,
            })
            .unwrap();
        assert_eq!(patch.diff, Delta::new().retain(5, None).insert("X", None));
        assert_eq!(patch.new_selection, Selection::caret(DocPos::new(6)));
        assert_eq!(patch.version, 1);
        assert_eq!(text(&controller), "one\ntXwo\n");
        assert_eq!(controller.state(), &controller.document().to_ops());
    }

    #[test]
    fn test_format_over_empty_range_is_not_recorded() {
        let mut controller = controller(paragraphs(&["one"]));
        let selection = Selection::new(DocPos::new(0), DocPos::new(3));
        controller.set_selection(selection.clone());
        let patch = controller
            .apply(Cmd::Format {
                start: DocPos::new(1),
                end: DocPos::new(1),
                attributes: Attributes::new().with("bold", true),
            })
            .unwrap();
        assert!(patch.is_noop());
        assert_eq!(patch.version, 0);
        assert!(!controller.can_undo());
        assert_eq!(controller.selection(), &selection);
        assert_eq!(patch.new_selection, selection);
    }

    #[test]
    fn test_format_keeps_selection() {
        let mut controller = controller(paragraphs(&["hello"]));
        let patch = controller
            .apply(Cmd::Format {
                start: DocPos::new(4),
                end: DocPos::new(1),
                attributes: Attributes::new().with("italic", true),
            })
            .unwrap();
        assert_eq!(
            patch.diff,
            Delta::new()
                .retain(1, None)
                .retain(3, Some(Attributes::new().with("italic", true)))
        );
        assert_eq!(
            patch.new_selection,
            Selection::new(DocPos::new(1), DocPos::new(4))
        );
    }

    #[test]
    fn test_table_command_failure_is_an_error() {
        let mut controller = controller(document_with_table());
        let err = controller
            .apply(Cmd::UnmergeCell {
                at: DocPos::path(&[7, 0, 0, 0]),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            EditError::InvalidTableSelection(TableError::NotMerged)
        ));
        assert!(!controller.can_undo());
    }

    #[test]
    fn test_insert_row_moves_selection_down() {
        let mut controller = controller(document_with_table());
        let patch = controller
            .apply(Cmd::InsertRow {
                at: DocPos::path(&[7, 0, 1, 0]),
                below: false,
            })
            .unwrap();
        assert_eq!(
            patch.new_selection,
            Selection::caret(DocPos::path(&[7, 1, 1, 0]))
        );
        assert_eq!(text(&controller), "before\n\t\na\tb\nc\td\nafter\n");
    }

    // ============ undo / redo ============

    #[test]
    fn test_undo_restores_initial_ops() {
        let initial = document_with_table();
        let ops = initial.to_ops();
        let mut controller = controller(initial);
        let commands = vec![
            Cmd::InsertText {
                at: DocPos::new(2),
                text: "ab\ncd".to_string(),
                attributes: None,
            },
            Cmd::DeleteRange {
                start: DocPos::new(1),
                end: DocPos::new(4),
            },
            Cmd::ConvertBlock {
                start: DocPos::new(0),
                end: DocPos::new(0),
                kind: BlockKind::Quote,
            },
        ];
        for cmd in commands {
            controller.apply(cmd).unwrap();
            assert_eq!(controller.state(), &controller.document().to_ops());
        }
        while controller.undo().is_some() {}
        assert_eq!(controller.document().to_ops(), ops);
        assert_eq!(controller.state(), &ops);
    }

    #[test]
    fn test_redo_after_undo() {
        let mut controller = controller(paragraphs(&["one"]));
        controller
            .apply(Cmd::InsertText {
                at: DocPos::new(3),
                text: "!".to_string(),
                attributes: None,
            })
            .unwrap();
        let undone = controller.undo().unwrap();
        assert_eq!(undone.new_selection, Selection::default());
        assert_eq!(text(&controller), "one\n");

        let redone = controller.redo().unwrap();
        assert_eq!(redone.new_selection, Selection::caret(DocPos::new(4)));
        assert_eq!(text(&controller), "one!\n");
        assert!(controller.redo().is_none());
    }

    #[test]
    fn test_undo_table_merge() {
        let initial = document_with_table();
        let ops = initial.to_ops();
        let mut controller = controller(initial);
        controller
            .apply(Cmd::MergeCells {
                start: DocPos::path(&[7, 0, 0, 0]),
                end: DocPos::path(&[7, 0, 1, 1]),
            })
            .unwrap();
        assert_eq!(text(&controller), "before\na b\nc\td\nafter\n");
        controller.undo().unwrap();
        assert_eq!(controller.document().to_ops(), ops);
    }

    #[test]
    fn test_history_depth_is_configurable() {
        let mut controller = controller(paragraphs(&[""])).with_history_depth(1);
        for _ in 0..3 {
            controller
                .apply(Cmd::InsertText {
                    at: DocPos::new(0),
                    text: "x".to_string(),
                    attributes: None,
                })
                .unwrap();
        }
        assert!(controller.undo().is_some());
        assert!(controller.undo().is_none());
        assert_eq!(text(&controller), "xx\n");
    }
}
