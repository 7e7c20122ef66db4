use crate::layout::line::{Line, RunKind};
use crate::models::attributes::{Attributes, keys};

/// Horizontal alignment of the lines of a paragraph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Alignment {
    #[default]
    Left,
    Right,
    Center,
    /// Stretch every line but the last to the full width
    Justify,
    /// Like justify, including the last line
    Scattered,
}

impl Alignment {
    pub fn from_attributes(attrs: &Attributes) -> Self {
        match attrs.get_str(keys::ALIGN) {
            Some("right") => Alignment::Right,
            Some("center") => Alignment::Center,
            Some("justify") => Alignment::Justify,
            Some("scattered") => Alignment::Scattered,
            _ => Alignment::Left,
        }
    }

    pub fn as_css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Right => "right",
            Alignment::Center => "center",
            Alignment::Justify | Alignment::Scattered => "justify",
        }
    }
}

/// Position runs within each line's free space
pub(crate) fn align_lines(lines: &mut [Line], alignment: Alignment) {
    let count = lines.len();
    for (index, line) in lines.iter_mut().enumerate() {
        let free_space = line.available_width - line.content_width();
        if free_space <= 0.0 {
            continue;
        }
        let is_last = index + 1 == count;
        match alignment {
            Alignment::Left => {}
            Alignment::Right => shift(line, free_space),
            Alignment::Center => shift(line, free_space / 2.0),
            Alignment::Justify if is_last || line.hard_break => {}
            Alignment::Justify | Alignment::Scattered => justify(line, free_space),
        }
    }
}

fn shift(line: &mut Line, dx: f32) {
    for run in &mut line.runs {
        run.x += dx;
    }
}

/// Spread free space over interior whitespace, or over the gaps between
/// runs when the line has none (CJK text)
fn justify(line: &mut Line, free_space: f32) {
    let Some(last_content) = line.runs.iter().rposition(|run| run.is_content()) else {
        return;
    };
    let spaces = line.runs[..last_content]
        .iter()
        .filter(|run| run.kind == RunKind::Space)
        .count();

    if spaces > 0 {
        let extra = free_space / spaces as f32;
        let mut offset = 0.0;
        for (index, run) in line.runs.iter_mut().enumerate() {
            run.x += offset;
            if index < last_content && run.kind == RunKind::Space {
                let width = run.width + extra;
                run.stretch_to(width);
                offset += extra;
            }
        }
        return;
    }

    if last_content == 0 {
        return;
    }
    let extra = free_space / last_content as f32;
    for (index, run) in line.runs.iter_mut().enumerate() {
        run.x += extra * index.min(last_content) as f32;
    }
}
