/*!
 * # docweave engine
 *
 * A rich-text document model with its own line layout and an operation-list
 * change format.
 *
 * ## Module Structure
 *
 * - **`models`**: positions, attributes, fragments, styles and geometry
 * - **`delta`**: operation lists and their algebra
 * - **`layout`**: line breaking and paragraph layout
 * - **`blocks`**: content, quote, code and table blocks
 * - **`document`**: the block tree, editing and change application
 * - **`editing`**: commands, undo/redo and selection
 * - **`platform`** / **`render`** / **`protocol`**: host-facing seams
 * - **`search`**: text search and highlight rectangles
 * - **`io`**: operation lists on disk
 */

pub mod blocks;
pub mod delta;
pub mod document;
pub mod editing;
pub mod io;
pub mod layout;
pub mod models;
pub mod platform;
pub mod protocol;
pub mod render;
pub mod search;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use blocks::{Block, BlockKind, Exportable, Layout, OpSource, Selectable, Table, TableError};
pub use delta::{Delta, DeltaError, Op, Registry};
pub use document::Document;
pub use editing::{Cmd, ContentController, EditError, Patch, Selection};
pub use io::IoError;
pub use layout::{LayoutContext, LayoutFrame, LayoutSettings};
pub use models::{Attributes, DocPos, Fragment, Rect, TextStyle};
pub use platform::{MonospacePlatform, Platform};
pub use protocol::{Message, MessageBus};
pub use render::{DisplayList, RenderSurface, SearchHighlight};
pub use search::{SearchMatch, SearchOptions, find_all, highlight_rects};
