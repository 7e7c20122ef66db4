//! Painting laid-out documents onto a host drawing surface.
//!
//! The engine never owns pixels. A host implements [`RenderSurface`] over its
//! canvas; [`Document::paint`] walks the visible lines and emits primitives.
//! [`DisplayList`] records the primitives instead of drawing them, which is
//! what tests and the CLI use.

use crate::blocks::{Block, BlockKind, FrameBlock, Layout, Table};
use crate::document::Document;
use crate::layout::{LayoutFrame, RunKind};
use crate::models::fragment::FragmentKind;
use crate::models::geometry::{Point, Rect};
use crate::models::style::TextStyle;

pub const CURSOR_WIDTH: f32 = 2.0;
pub const SELECTION_COLOR: &str = "rgba(0,120,215,0.3)";
pub const HIGHLIGHT_COLOR: &str = "rgba(255,235,59,0.5)";
pub const CURRENT_HIGHLIGHT_COLOR: &str = "rgba(255,150,50,0.6)";
pub const BORDER_COLOR: &str = "#c0c0c0";
pub const QUOTE_BAR_COLOR: &str = "#d0d0d0";
pub const CODE_BACKGROUND: &str = "#f5f5f5";
pub const IMAGE_PLACEHOLDER: &str = "#e0e0e0";

/// Rectangles of one search match, in document coordinates
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchHighlight {
    pub rects: Vec<Rect>,
}

/// Drawing context supplied by the host.
///
/// Only the three primitives are required; the editor helpers are built on
/// them and may be overridden by hosts with faster paths.
pub trait RenderSurface {
    fn fill_rect(&mut self, rect: Rect, color: &str);

    /// Draw `text` with its baseline at `baseline`
    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle);

    fn stroke_line(&mut self, from: Point, to: Point, width: f32, color: &str);

    fn draw_image(&mut self, _src: &str, rect: Rect) {
        self.fill_rect(rect, IMAGE_PLACEHOLDER);
    }

    fn draw_cursor(&mut self, x: f32, y: f32, height: f32, color: &str) {
        self.fill_rect(Rect::new(x, y, CURSOR_WIDTH, height), color);
    }

    /// Fill selection rectangles given in document coordinates, skipping
    /// those outside `scroll_offset..view_end`
    fn draw_selection_rectangles(&mut self, rects: &[Rect], scroll_offset: f32, view_end: f32) {
        for rect in visible(rects, scroll_offset, view_end) {
            self.fill_rect(rect.translate(0.0, -scroll_offset), SELECTION_COLOR);
        }
    }

    /// Fill search matches; the match at `current_index` stands out
    fn draw_search_highlights(
        &mut self,
        results: &[SearchHighlight],
        scroll_offset: f32,
        view_end: f32,
        current_index: Option<usize>,
    ) {
        for (index, result) in results.iter().enumerate() {
            let color = if Some(index) == current_index {
                CURRENT_HIGHLIGHT_COLOR
            } else {
                HIGHLIGHT_COLOR
            };
            for rect in visible(&result.rects, scroll_offset, view_end) {
                self.fill_rect(rect.translate(0.0, -scroll_offset), color);
            }
        }
    }
}

fn visible(rects: &[Rect], top: f32, bottom: f32) -> impl Iterator<Item = Rect> + '_ {
    rects
        .iter()
        .copied()
        .filter(move |rect| rect.bottom() > top && rect.y < bottom)
}

/// One recorded primitive
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Rect {
        rect: Rect,
        color: String,
    },
    Text {
        text: String,
        x: f32,
        baseline: f32,
        style: TextStyle,
    },
    Line {
        from: Point,
        to: Point,
        width: f32,
        color: String,
    },
    Image {
        src: String,
        rect: Rect,
    },
}

/// A surface that records what would be drawn
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    pub commands: Vec<DrawCommand>,
}

impl DisplayList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text commands in paint order
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl RenderSurface for DisplayList {
    fn fill_rect(&mut self, rect: Rect, color: &str) {
        self.commands.push(DrawCommand::Rect {
            rect,
            color: color.to_string(),
        });
    }

    fn fill_text(&mut self, text: &str, x: f32, baseline: f32, style: &TextStyle) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            x,
            baseline,
            style: style.clone(),
        });
    }

    fn stroke_line(&mut self, from: Point, to: Point, width: f32, color: &str) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            width,
            color: color.to_string(),
        });
    }

    fn draw_image(&mut self, src: &str, rect: Rect) {
        self.commands.push(DrawCommand::Image {
            src: src.to_string(),
            rect,
        });
    }
}

/// Vertical window being painted, in surface coordinates
#[derive(Debug, Clone, Copy)]
struct Viewport {
    height: f32,
}

impl Viewport {
    fn shows(&self, rect: &Rect) -> bool {
        rect.bottom() > 0.0 && rect.y < self.height
    }
}

impl Document {
    /// Paint the lines between `scroll_offset` and `view_end`. The document
    /// must have been laid out.
    pub fn paint(&self, surface: &mut dyn RenderSurface, scroll_offset: f32, view_end: f32) {
        let viewport = Viewport {
            height: (view_end - scroll_offset).max(0.0),
        };
        self.paint_at(surface, 0.0, -scroll_offset, viewport);
    }

    fn paint_at(&self, surface: &mut dyn RenderSurface, dx: f32, dy: f32, viewport: Viewport) {
        for block in self.blocks() {
            let bounds = block.geometry().translate(dx, dy);
            if !viewport.shows(&bounds) {
                continue;
            }
            match block {
                Block::Frames(frames) => paint_frames(frames, surface, bounds, viewport),
                Block::Table(table) => paint_table(table, surface, bounds, viewport),
            }
        }
    }
}

fn paint_frames(block: &FrameBlock, surface: &mut dyn RenderSurface, bounds: Rect, viewport: Viewport) {
    match block.kind() {
        BlockKind::Code => surface.fill_rect(bounds, CODE_BACKGROUND),
        BlockKind::Quote => surface.stroke_line(
            Point::new(bounds.x + 1.0, bounds.y),
            Point::new(bounds.x + 1.0, bounds.bottom()),
            2.0,
            QUOTE_BAR_COLOR,
        ),
        BlockKind::Content => {}
    }
    for frame in block.frames() {
        let origin = frame.geometry().translate(bounds.x, bounds.y);
        if viewport.shows(&origin) {
            paint_frame(frame, surface, origin.x, origin.y, viewport);
        }
    }
}

fn paint_frame(frame: &LayoutFrame, surface: &mut dyn RenderSurface, x: f32, y: f32, viewport: Viewport) {
    for line in frame.lines() {
        let top = y + line.y;
        if !viewport.shows(&Rect::new(x, top, 0.0, line.height)) {
            continue;
        }
        let baseline = top + line.baseline;
        for run in &line.runs {
            let Some(style) = frame.style(run.fragment) else {
                continue;
            };
            let left = x + run.x;
            if let Some(background) = &style.background
                && run.kind != RunKind::ParaEnd
            {
                surface.fill_rect(Rect::new(left, top, run.width, line.height), background);
            }
            if let Some(FragmentKind::Image(image)) =
                frame.fragments().get(run.fragment).map(|fragment| fragment.kind())
            {
                let rect = Rect::new(left, baseline - image.height, run.width, image.height);
                surface.draw_image(&image.src, rect);
                continue;
            }
            if run.text.is_empty() {
                continue;
            }
            surface.fill_text(&run.text, left, baseline, style);
            if style.underline {
                let under = baseline + 1.0;
                surface.stroke_line(Point::new(left, under), Point::new(left + run.width, under), 1.0, &style.color);
            }
            if style.strike {
                let middle = baseline - run.ascent / 3.0;
                surface.stroke_line(Point::new(left, middle), Point::new(left + run.width, middle), 1.0, &style.color);
            }
        }
    }
}

fn paint_table(table: &Table, surface: &mut dyn RenderSurface, bounds: Rect, viewport: Viewport) {
    for row in table.rows() {
        for cell in row.cells() {
            let rect = cell.geometry().translate(bounds.x, bounds.y);
            if !viewport.shows(&rect) {
                continue;
            }
            let border = cell.border();
            let (left, top, right, bottom) = (rect.x, rect.y, rect.right(), rect.bottom());
            surface.stroke_line(Point::new(left, top), Point::new(right, top), 1.0, BORDER_COLOR);
            surface.stroke_line(Point::new(left, top), Point::new(left, bottom), 1.0, BORDER_COLOR);
            if border.is_last_cell {
                surface.stroke_line(Point::new(right, top), Point::new(right, bottom), 1.0, BORDER_COLOR);
            }
            if border.is_last_line {
                surface.stroke_line(Point::new(left, bottom), Point::new(right, bottom), 1.0, BORDER_COLOR);
            }
            let (content_x, content_y) = table.content_origin(cell);
            cell.document.paint_at(
                surface,
                bounds.x + content_x,
                bounds.y + content_y,
                viewport,
            );
        }
    }
}
