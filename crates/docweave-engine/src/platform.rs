//! The capabilities the engine needs from its host.
//!
//! Text measurement and idle scheduling live outside the engine: a browser
//! host backs them with canvas metrics and `requestIdleCallback`, tests and
//! the CLI use [`MonospacePlatform`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;

use crate::models::style::{FontMetrics, TextStyle};

/// Token for a pending idle callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IdleHandle(pub u64);

pub trait Platform {
    /// Advance width of `text` in pixels
    fn measure_text_width(&self, text: &str, style: &TextStyle) -> f32;

    fn measure_text_metrics(&self, style: &TextStyle) -> FontMetrics;

    fn point_size_to_pixels(&self, points: f32) -> f32;

    /// Ask the host to call back when it is idle
    fn schedule_idle_work(&self) -> IdleHandle;

    fn cancel_idle_work(&self, handle: IdleHandle);
}

/// Deterministic fixed-advance metrics.
///
/// Every char advances by `char_width` (wide East Asian chars by twice that).
/// In scaled mode the metrics are per 12pt and grow with the font size.
#[derive(Debug)]
pub struct MonospacePlatform {
    char_width: f32,
    line_height: f32,
    ascent: f32,
    scale_with_size: bool,
    next_handle: Cell<u64>,
    pending: RefCell<BTreeSet<IdleHandle>>,
}

impl MonospacePlatform {
    /// Fixed metrics regardless of font size
    pub fn fixed(char_width: f32, line_height: f32) -> Self {
        Self {
            char_width,
            line_height,
            ascent: line_height * 0.8,
            scale_with_size: false,
            next_handle: Cell::new(1),
            pending: RefCell::new(BTreeSet::new()),
        }
    }

    /// Metrics that scale with the style's point size
    pub fn scaled(char_width: f32, line_height: f32) -> Self {
        Self {
            scale_with_size: true,
            ..Self::fixed(char_width, line_height)
        }
    }

    /// Idle callbacks scheduled and not yet cancelled or taken
    pub fn pending_idle_work(&self) -> Vec<IdleHandle> {
        self.pending.borrow().iter().copied().collect()
    }

    /// Simulate the host firing an idle callback
    pub fn take_idle_work(&self) -> Option<IdleHandle> {
        self.pending.borrow_mut().pop_first()
    }

    fn factor(&self, style: &TextStyle) -> f32 {
        if self.scale_with_size {
            style.font_size / 12.0
        } else {
            1.0
        }
    }
}

impl Default for MonospacePlatform {
    fn default() -> Self {
        Self::scaled(7.2, 15.0)
    }
}

impl Platform for MonospacePlatform {
    fn measure_text_width(&self, text: &str, style: &TextStyle) -> f32 {
        let columns: usize = text
            .chars()
            .map(|c| {
                if c.is_control() {
                    0
                } else if is_wide(c) {
                    2
                } else {
                    1
                }
            })
            .sum();
        columns as f32 * self.char_width * self.factor(style)
    }

    fn measure_text_metrics(&self, style: &TextStyle) -> FontMetrics {
        let factor = self.factor(style);
        FontMetrics {
            baseline: self.ascent * factor,
            bottom: self.line_height * factor,
            x_top: self.ascent * 0.5 * factor,
        }
    }

    fn point_size_to_pixels(&self, points: f32) -> f32 {
        points * 96.0 / 72.0
    }

    fn schedule_idle_work(&self) -> IdleHandle {
        let handle = IdleHandle(self.next_handle.get());
        self.next_handle.set(handle.0 + 1);
        self.pending.borrow_mut().insert(handle);
        handle
    }

    fn cancel_idle_work(&self, handle: IdleHandle) {
        self.pending.borrow_mut().remove(&handle);
    }
}

fn is_wide(c: char) -> bool {
    matches!(
        c as u32,
        0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6
            | 0x20000..=0x3FFFD
    )
}
