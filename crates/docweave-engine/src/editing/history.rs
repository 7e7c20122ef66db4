//! Undo/redo history of applied changes.

use crate::delta::Delta;
use crate::editing::Selection;

/// Default number of undo levels kept
pub const DEFAULT_MAX_DEPTH: usize = 1000;

/// One undoable edit: the change that was applied and the change that
/// reverts it, both prefixed with the untouched leading offset.
#[derive(Debug, Clone, PartialEq)]
pub struct EditGroup {
    pub redo: Delta,
    pub undo: Delta,
    /// Selection before the edit.
    pub selection_before: Selection,
    /// Selection after the edit.
    pub selection_after: Selection,
}

/// Manages undo/redo history.
#[derive(Debug)]
pub struct History {
    undo_stack: Vec<EditGroup>,
    redo_stack: Vec<EditGroup>,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DEPTH)
    }
}

impl History {
    /// Creates a new history keeping at most `max_size` undo levels.
    pub fn new(max_size: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: max_size.max(1),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Records a new edit. The redo stack is cleared and the oldest levels
    /// are dropped past the size limit.
    pub fn push(&mut self, group: EditGroup) {
        self.undo_stack.push(group);
        self.redo_stack.clear();
        if self.undo_stack.len() > self.max_size {
            let excess = self.undo_stack.len() - self.max_size;
            self.undo_stack.drain(..excess);
        }
        log::debug!("history: {} undo level(s)", self.undo_stack.len());
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Pops the last edit for undo; it moves to the redo stack.
    pub fn undo(&mut self) -> Option<&EditGroup> {
        let group = self.undo_stack.pop()?;
        self.redo_stack.push(group);
        self.redo_stack.last()
    }

    /// Pops the last undone edit for redo; it moves back to the undo stack.
    pub fn redo(&mut self) -> Option<&EditGroup> {
        let group = self.redo_stack.pop()?;
        self.undo_stack.push(group);
        self.undo_stack.last()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::doc_pos::DocPos;

    fn group(text: &str) -> EditGroup {
        let length = text.chars().count();
        EditGroup {
            redo: Delta::new().insert(text, None),
            undo: Delta::new().delete(length),
            selection_before: Selection::caret(DocPos::new(0)),
            selection_after: Selection::caret(DocPos::new(length)),
        }
    }

    #[test]
    fn test_undo_redo() {
        let mut history = History::new(100);
        history.push(group("hello"));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let undone = history.undo().unwrap();
        assert_eq!(undone.undo, Delta::new().delete(5));
        assert!(!history.can_undo());
        assert!(history.can_redo());

        let redone = history.redo().unwrap();
        assert_eq!(redone.selection_after, Selection::caret(DocPos::new(5)));
        assert!(history.can_undo());
    }

    #[test]
    fn test_redo_cleared_on_new_edit() {
        let mut history = History::default();
        history.push(group("a"));
        history.undo();
        assert!(history.can_redo());
        history.push(group("b"));
        assert!(!history.can_redo());
    }

    #[test]
    fn test_depth_limit_drops_oldest() {
        let mut history = History::new(2);
        for text in ["a", "bb", "ccc"] {
            history.push(group(text));
        }
        assert_eq!(history.undo().unwrap().undo, Delta::new().delete(3));
        assert_eq!(history.undo().unwrap().undo, Delta::new().delete(2));
        assert!(history.undo().is_none());
    }
}
