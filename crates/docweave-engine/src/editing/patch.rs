use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::editing::Selection;

/// Result of applying a command, undo or redo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patch {
    /// The change applied to the document; empty when nothing changed
    pub diff: Delta,
    pub new_selection: Selection,
    pub version: u64,
}

impl Patch {
    pub fn is_noop(&self) -> bool {
        self.diff.is_empty()
    }
}
