use crate::models::geometry::Rect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Text,
    /// Whitespace; may hang past the line width
    Space,
    /// Image or date
    Embed,
    ParaEnd,
    /// Stand-in for a line with no content
    Placeholder,
}

/// A positioned slice of one fragment on one line
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    pub kind: RunKind,
    /// Index of the fragment in its frame
    pub fragment: usize,
    /// Frame offset of the first unit
    pub offset: usize,
    pub length: usize,
    /// What gets painted; empty for images and paragraph ends
    pub text: String,
    pub x: f32,
    pub width: f32,
    pub ascent: f32,
    pub descent: f32,
    /// x of every unit boundary relative to `x`; `length + 1` entries
    pub(crate) advances: Vec<f32>,
}

impl Run {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    /// Frame x of a boundary inside this run
    pub fn x_at(&self, offset: usize) -> f32 {
        let index = offset.saturating_sub(self.offset).min(self.length);
        self.x + self.advances.get(index).copied().unwrap_or(self.width)
    }

    /// Boundary nearest to frame x
    pub fn offset_at(&self, x: f32) -> usize {
        let relative = x - self.x;
        let mut best = 0;
        let mut best_distance = f32::MAX;
        for (index, advance) in self.advances.iter().enumerate().take(self.length + 1) {
            let distance = (advance - relative).abs();
            if distance < best_distance {
                best = index;
                best_distance = distance;
            }
        }
        self.offset + best
    }

    /// Stretch to a new width, spreading the change evenly over boundaries
    pub(crate) fn stretch_to(&mut self, width: f32) {
        if self.width > 0.0 {
            let scale = width / self.width;
            for advance in &mut self.advances {
                *advance *= scale;
            }
        } else if let Some(last) = self.advances.last_mut() {
            *last = width;
        }
        self.width = width;
    }

    pub fn is_content(&self) -> bool {
        !matches!(
            self.kind,
            RunKind::Space | RunKind::ParaEnd | RunKind::Placeholder
        )
    }
}

/// One visual line of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    /// Frame offset of the first unit
    pub offset: usize,
    pub length: usize,
    pub y: f32,
    pub height: f32,
    /// Distance from `y` to the baseline
    pub baseline: f32,
    /// Where the line starts after indentation
    pub left: f32,
    pub available_width: f32,
    /// Ended by a mandatory break or the paragraph end
    pub hard_break: bool,
    pub runs: Vec<Run>,
}

impl Line {
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    /// Width from `left` to the end of the last non-space run
    pub fn content_width(&self) -> f32 {
        self.runs
            .iter()
            .rev()
            .find(|run| run.is_content())
            .map_or(0.0, |run| run.right() - self.left)
    }

    pub fn right(&self) -> f32 {
        self.runs.last().map_or(self.left, Run::right)
    }

    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.y, self.right() - self.left, self.height)
    }

    pub fn text(&self) -> String {
        self.runs.iter().map(|run| run.text.as_str()).collect()
    }

    /// Frame x for an offset on this line
    pub fn x_for(&self, offset: usize) -> f32 {
        if let Some(run) = self
            .runs
            .iter()
            .find(|run| run.offset <= offset && offset < run.end())
        {
            return run.x_at(offset);
        }
        if let Some(run) = self.runs.iter().rev().find(|run| run.end() == offset) {
            return run.x_at(offset);
        }
        match self.runs.first() {
            Some(first) if offset <= first.offset => first.x,
            _ => self.right(),
        }
    }
}
