/*!
 * # Layout
 *
 * Turns frames of fragments into positioned lines and runs.
 *
 * A frame is laid out in four passes: text fragments are cut into pieces at
 * Unicode line-break opportunities, pieces are packed greedily into lines of
 * the available width, runs holding CJK text are exploded into one run per
 * character, and finally each line is aligned. The result is derived state:
 * it can be thrown away and rebuilt at any time, and rebuilding with the same
 * input and width gives the same lines.
 *
 * Geometry is relative: runs are relative to their frame, frames to their
 * block, blocks to the document.
 */

use serde::{Deserialize, Serialize};

use crate::models::attributes::{Attributes, keys};
use crate::platform::Platform;

pub mod alignment;
pub mod frame;
pub mod idle;
pub mod line;
pub mod line_breaker;
pub(crate) mod pieces;

pub use alignment::Alignment;
pub use frame::LayoutFrame;
pub use idle::{BlockCountBudget, DeadlineBudget, IdleBudget, IdleLayout, LayoutProgress};
pub use line::{Line, Run, RunKind};
pub use line_breaker::{Break, BreakClass, LineBreaker};

/// Tolerance for width comparisons while packing
pub(crate) const EPSILON: f32 = 0.01;

/// Spacing knobs for block and table layout, in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutSettings {
    /// Width of one paragraph indent level
    pub indent_width: f32,
    pub cell_padding: f32,
    pub quote_indent: f32,
    pub code_padding: f32,
    /// Minimum width of a table column
    pub min_column_width: f32,
}

impl LayoutSettings {
    pub const DEFAULT: LayoutSettings = LayoutSettings {
        indent_width: 24.0,
        cell_padding: 4.0,
        quote_indent: 16.0,
        code_padding: 6.0,
        min_column_width: 16.0,
    };
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self::DEFAULT
    }
}

static DEFAULT_SETTINGS: LayoutSettings = LayoutSettings::DEFAULT;

/// Everything a layout pass reads besides the tree itself
#[derive(Clone, Copy)]
pub struct LayoutContext<'a> {
    pub platform: &'a dyn Platform,
    /// Bottom attribute layer for every fragment
    pub defaults: &'a Attributes,
    pub settings: &'a LayoutSettings,
}

impl<'a> LayoutContext<'a> {
    /// Library defaults and default settings
    pub fn new(platform: &'a dyn Platform) -> Self {
        Self {
            platform,
            defaults: Attributes::library_defaults(),
            settings: &DEFAULT_SETTINGS,
        }
    }

    pub fn with_defaults(mut self, defaults: &'a Attributes) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_settings(mut self, settings: &'a LayoutSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Paragraph-level attributes read from a frame's terminator
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParagraphStyle {
    pub alignment: Alignment,
    pub indent: usize,
    /// In points
    pub first_line_indent: f32,
    pub line_spacing: f32,
}

impl ParagraphStyle {
    pub fn from_attributes(attrs: &Attributes) -> Self {
        Self {
            alignment: Alignment::from_attributes(attrs),
            indent: attrs.get_usize(keys::INDENT).unwrap_or(0),
            first_line_indent: attrs.get_f32(keys::FIRST_LINE_INDENT).unwrap_or(0.0),
            line_spacing: attrs
                .get_f32(keys::LINE_SPACING)
                .filter(|spacing| *spacing > 0.0)
                .unwrap_or(1.0),
        }
    }
}
