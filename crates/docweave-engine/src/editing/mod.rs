/*!
 * # Editing
 *
 * Command-based editing on top of [`Document`](crate::document::Document).
 *
 * Every command follows the same pattern: snapshot the op list of the blocks
 * around the edit, mutate the tree in place, snapshot the same span again,
 * diff the two and prefix the diff with a retain of the untouched offset.
 * The result is pushed on the history together with its inverse and
 * composed into the running state. Undo and redo replay recorded diffs
 * through `Document::apply_delta`, the same path external changes take.
 *
 * ## Module Structure
 *
 * - **`commands`**: the `Cmd` enum
 * - **`controller`**: `ContentController`, which runs commands and owns
 *   history and selection
 * - **`history`**: undo/redo stacks of `EditGroup`s
 * - **`selection`**: anchor/focus selection mapped through changes
 * - **`patch`**: what a command, undo or redo reports back
 */

pub mod commands;
pub mod controller;
pub mod history;
pub mod patch;
pub mod selection;

pub use commands::Cmd;
pub use controller::ContentController;
pub use history::{EditGroup, History};
pub use patch::Patch;
pub use selection::Selection;

use crate::blocks::TableError;
use crate::delta::DeltaError;

/// Errors from running an edit command
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("invalid table selection: {0}")]
    InvalidTableSelection(#[from] TableError),
    #[error(transparent)]
    Delta(#[from] DeltaError),
}
