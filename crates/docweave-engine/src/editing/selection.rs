//! Selection model kept in step with the document

use serde::{Deserialize, Serialize};

use crate::delta::Delta;
use crate::models::doc_pos::DocPos;

/// A selection between two positions. `anchor` is where the gesture began
/// and `focus` where it currently is; either may come first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: DocPos,
    pub focus: DocPos,
}

impl Selection {
    pub fn new(anchor: DocPos, focus: DocPos) -> Self {
        Self { anchor, focus }
    }

    /// A collapsed selection
    pub fn caret(pos: DocPos) -> Self {
        Self {
            anchor: pos.clone(),
            focus: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// `(start, end)` in document order
    pub fn ordered(&self) -> (&DocPos, &DocPos) {
        if self.anchor <= self.focus {
            (&self.anchor, &self.focus)
        } else {
            (&self.focus, &self.anchor)
        }
    }

    pub fn start(&self) -> &DocPos {
        self.ordered().0
    }

    pub fn end(&self) -> &DocPos {
        self.ordered().1
    }

    /// Both ends moved as if `change` had already been applied
    pub fn transform(&self, change: &Delta) -> Selection {
        Selection {
            anchor: self.anchor.transform(change),
            focus: self.focus.transform(change),
        }
    }
}
