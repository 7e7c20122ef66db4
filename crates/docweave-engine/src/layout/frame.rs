use std::collections::VecDeque;
use std::ops::Range;

use crate::delta::Delta;
use crate::layout::alignment::align_lines;
use crate::layout::line::{Line, Run, RunKind};
use crate::layout::line_breaker::is_cjk_char;
use crate::layout::pieces::{Piece, PieceKind, PiecePart, build_pieces, measure};
use crate::layout::{EPSILON, LayoutContext, ParagraphStyle};
use crate::models::attributes::{Attributes, keys};
use crate::models::fragment::{Fragment, FragmentKind};
use crate::models::geometry::Rect;
use crate::models::style::TextStyle;

/// An ordered run of fragments making up one paragraph.
///
/// The last fragment is a paragraph end except while two frames are being
/// merged. Lines, styles and geometry are derived by [`LayoutFrame::layout`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutFrame {
    fragments: Vec<Fragment>,
    lines: Vec<Line>,
    styles: Vec<TextStyle>,
    max_width: f32,
    needs_layout: bool,
    pub(crate) geometry: Rect,
}

impl LayoutFrame {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        let mut frame = Self {
            fragments,
            lines: Vec::new(),
            styles: Vec::new(),
            max_width: 0.0,
            needs_layout: true,
            geometry: Rect::default(),
        };
        frame.normalize();
        frame
    }

    /// A paragraph holding nothing but its terminator
    pub fn empty(paragraph: Attributes) -> Self {
        Self::new(vec![Fragment::para_end(paragraph)])
    }

    pub fn fragments(&self) -> &[Fragment] {
        &self.fragments
    }

    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    pub fn geometry(&self) -> Rect {
        self.geometry
    }

    pub fn needs_layout(&self) -> bool {
        self.needs_layout
    }

    pub fn mark_dirty(&mut self) {
        self.needs_layout = true;
    }

    pub fn length(&self) -> usize {
        self.fragments.iter().map(Fragment::length).sum()
    }

    pub fn is_terminated(&self) -> bool {
        self.fragments.last().is_some_and(Fragment::is_para_end)
    }

    pub fn para_end(&self) -> Option<&Fragment> {
        self.fragments.last().filter(|f| f.is_para_end())
    }

    pub(crate) fn para_end_mut(&mut self) -> Option<&mut Fragment> {
        self.needs_layout = true;
        self.fragments.last_mut().filter(|f| f.is_para_end())
    }

    /// Explicit paragraph attributes from the terminator
    pub fn paragraph_attributes(&self) -> Attributes {
        self.para_end()
            .map(|end| end.explicit().clone())
            .unwrap_or_default()
    }

    /// One char per unit: text as-is, embeds as U+FFFC, the end as `\n`
    pub fn text(&self) -> String {
        self.fragments.iter().map(Fragment::placeholder_text).collect()
    }

    /// Style of a fragment as of the last layout
    pub fn style(&self, fragment: usize) -> Option<&TextStyle> {
        self.styles.get(fragment)
    }

    /// Fragment index and offset within it for a frame offset. An offset on
    /// a fragment boundary resolves to the start of the later fragment.
    fn locate(&self, offset: usize) -> (usize, usize) {
        let mut start = 0;
        for (index, fragment) in self.fragments.iter().enumerate() {
            let len = fragment.length();
            if offset < start + len {
                return (index, offset - start);
            }
            start += len;
        }
        (self.fragments.len(), 0)
    }

    /// Make `offset` a fragment boundary; returns the index of the fragment
    /// starting there
    fn split_fragments_at(&mut self, offset: usize) -> usize {
        let (index, inner) = self.locate(offset);
        if inner == 0 {
            return index;
        }
        if let Some(tail) = self.fragments[index].split_off(inner) {
            self.fragments.insert(index + 1, tail);
        }
        index + 1
    }

    /// Merge equal neighbouring text and drop empty text
    pub(crate) fn normalize(&mut self) {
        self.fragments
            .retain(|fragment| !(fragment.is_text() && fragment.length() == 0));
        let mut merged: Vec<Fragment> = Vec::with_capacity(self.fragments.len());
        for fragment in self.fragments.drain(..) {
            match merged.last_mut() {
                Some(last) if last.can_merge(&fragment) => last.merge_from(&fragment),
                _ => merged.push(fragment),
            }
        }
        self.fragments = merged;
    }

    // ============ editing ============

    /// Insert text (without newlines) at `offset`.
    ///
    /// The text joins the fragment before the offset when it is text,
    /// otherwise the one after it. Passing `attributes` that differ from
    /// that fragment's makes a fragment of its own.
    pub fn insert_text(&mut self, offset: usize, text: &str, attributes: Option<&Attributes>) {
        if text.is_empty() {
            return;
        }
        self.needs_layout = true;
        let (index, inner) = self.locate(offset);

        let host = if inner > 0 {
            Some((index, inner))
        } else if index > 0 && self.fragments[index - 1].is_text() {
            Some((index - 1, self.fragments[index - 1].length()))
        } else if index < self.fragments.len() && self.fragments[index].is_text() {
            Some((index, 0))
        } else {
            None
        };

        if let Some((host_index, host_offset)) = host {
            let host_attrs = self.fragments[host_index].explicit();
            if attributes.is_none_or(|attrs| attrs == host_attrs) {
                self.fragments[host_index].insert_str(host_offset, text);
                return;
            }
        }

        let explicit = attributes.cloned().unwrap_or_default();
        let at = self.split_fragments_at(offset);
        self.fragments.insert(at, Fragment::text(text, explicit));
        self.normalize();
    }

    /// Insert a non-text fragment at `offset`
    pub fn insert_fragment(&mut self, offset: usize, fragment: Fragment) {
        self.needs_layout = true;
        let at = self.split_fragments_at(offset);
        self.fragments.insert(at, fragment);
        self.normalize();
    }

    /// Remove units `start..end`. Removing the terminator leaves the frame
    /// unterminated until it is merged with its successor.
    pub fn delete_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.length());
        if start >= end {
            return;
        }
        self.needs_layout = true;
        let first = self.split_fragments_at(start);
        let last = self.split_fragments_at(end);
        self.fragments.drain(first..last);
        self.normalize();
    }

    /// Compose `attributes` onto every text and embed fragment in range
    pub fn format_range(&mut self, start: usize, end: usize, attributes: &Attributes) {
        let end = end.min(self.length());
        if start >= end {
            return;
        }
        let attributes = attributes.without_structural();
        self.needs_layout = true;
        let first = self.split_fragments_at(start);
        let last = self.split_fragments_at(end);
        for fragment in &mut self.fragments[first..last] {
            if fragment.is_para_end() {
                continue;
            }
            let composed =
                Attributes::compose(Some(fragment.explicit()), Some(&attributes), false);
            *fragment.explicit_mut() = composed.unwrap_or_default();
        }
        self.normalize();
    }

    /// Compose `attributes` onto the paragraph terminator
    pub fn format_paragraph(&mut self, attributes: &Attributes) {
        let attributes = attributes.without_structural();
        if let Some(end) = self.para_end_mut() {
            let composed = Attributes::compose(Some(end.explicit()), Some(&attributes), false);
            *end.explicit_mut() = composed.unwrap_or_default();
        }
    }

    /// Split in two at `offset`. This frame keeps the head and gets a new
    /// terminator copying the paragraph attributes; the tail is returned.
    pub fn split_at(&mut self, offset: usize) -> LayoutFrame {
        self.needs_layout = true;
        let at = self.split_fragments_at(offset);
        let tail = self.fragments.split_off(at);
        let paragraph = tail
            .last()
            .filter(|f| f.is_para_end())
            .map(|end| end.explicit().clone())
            .unwrap_or_default();
        let mut terminator = Fragment::para_end(paragraph);
        if let Some(end) = tail.last() {
            terminator.layers.override_defaults = end.layers.override_defaults.clone();
        }
        self.fragments.push(terminator);
        let mut tail = LayoutFrame::new(tail);
        if !tail.is_terminated() {
            tail.fragments.push(Fragment::para_end(Attributes::new()));
        }
        tail
    }

    /// Merge `other` into this frame, dropping this frame's terminator
    pub fn append_frame(&mut self, other: LayoutFrame) {
        self.needs_layout = true;
        if self.is_terminated() {
            self.fragments.pop();
        }
        self.fragments.extend(other.fragments);
        self.normalize();
    }

    /// Add a terminator if the frame lost it
    pub(crate) fn terminate(&mut self) {
        if !self.is_terminated() {
            self.needs_layout = true;
            self.fragments.push(Fragment::para_end(Attributes::new()));
        }
    }

    /// Set the block-owned attribute layer on every fragment
    pub(crate) fn set_override_defaults(&mut self, defaults: &Attributes) {
        for fragment in &mut self.fragments {
            if fragment.layers.override_defaults != *defaults {
                fragment.layers.override_defaults = defaults.clone();
                self.needs_layout = true;
            }
        }
    }

    /// Set or clear the transient layer on fragments in range
    pub fn set_transient(&mut self, start: usize, end: usize, transient: Option<&Attributes>) {
        let first = self.split_fragments_at(start);
        let last = self.split_fragments_at(end.min(self.length()));
        for fragment in &mut self.fragments[first..last] {
            fragment.layers.transient = transient.cloned();
        }
        self.needs_layout = true;
        self.normalize();
    }

    // ============ layout ============

    /// Lay out into lines no wider than `max_width`.
    ///
    /// Does nothing if neither the content nor the width changed.
    pub fn layout(&mut self, ctx: &LayoutContext<'_>, max_width: f32) {
        if !self.needs_layout && self.max_width == max_width && !self.lines.is_empty() {
            return;
        }

        self.styles = self
            .fragments
            .iter()
            .map(|fragment| TextStyle::from_attributes(&fragment.compiled(ctx.defaults)))
            .collect();

        let paragraph = ParagraphStyle::from_attributes(&self.paragraph_attributes());
        let indent = paragraph.indent as f32 * ctx.settings.indent_width;
        let first_line_indent = ctx
            .platform
            .point_size_to_pixels(paragraph.first_line_indent);

        let pieces = build_pieces(&self.fragments, &self.styles, ctx);
        let packer = LinePacker {
            fragments: &self.fragments,
            styles: &self.styles,
            starts: fragment_starts(&self.fragments),
            ctx,
            max_width,
            indent,
            first_line_indent,
            lines: Vec::new(),
            runs: Vec::new(),
            x: 0.0,
            cursor: 0,
        };
        let mut lines = packer.pack(pieces);

        for line in &mut lines {
            explode_cjk(line);
        }
        let default_metrics = ctx
            .platform
            .measure_text_metrics(&TextStyle::from_attributes(ctx.defaults));
        let mut y = 0.0;
        for line in &mut lines {
            let (ascent, descent) = if line.runs.is_empty() {
                (
                    default_metrics.baseline,
                    default_metrics.bottom - default_metrics.baseline,
                )
            } else {
                line.runs.iter().fold((0.0f32, 0.0f32), |(a, d), run| {
                    (a.max(run.ascent), d.max(run.descent))
                })
            };
            let natural = ascent + descent;
            line.height = natural * paragraph.line_spacing;
            line.baseline = ascent + (line.height - natural) / 2.0;
            line.y = y;
            y += line.height;
        }
        align_lines(&mut lines, paragraph.alignment);

        let width = lines
            .iter()
            .map(|line| line.right())
            .fold(0.0f32, f32::max);
        self.geometry.width = width;
        self.geometry.height = y;
        self.lines = lines;
        self.max_width = max_width;
        self.needs_layout = false;
    }

    // ============ queries ============

    /// Offset nearest to a frame-relative point
    pub fn hit_test(&self, x: f32, y: f32) -> usize {
        let Some(line) = self
            .lines
            .iter()
            .find(|line| y < line.y + line.height)
            .or(self.lines.last())
        else {
            return 0;
        };

        let Some(first) = line.runs.first() else {
            return line.offset;
        };
        if x <= first.x {
            return first.offset;
        }
        for run in &line.runs {
            if x < run.right() {
                return match run.kind {
                    RunKind::ParaEnd | RunKind::Placeholder => run.offset,
                    _ => run.offset_at(x),
                };
            }
        }
        match line.runs.last() {
            Some(last) if matches!(last.kind, RunKind::ParaEnd | RunKind::Placeholder) => {
                last.offset
            }
            Some(last) if !line.hard_break && last.kind == RunKind::Space => {
                line.end().saturating_sub(1)
            }
            _ => line.end(),
        }
    }

    /// Zero-width caret rectangles for an offset. A soft-wrap boundary
    /// yields one candidate on each adjacent line.
    pub fn caret_rects(&self, offset: usize) -> Vec<Rect> {
        let mut rects: Vec<Rect> = self
            .lines
            .iter()
            .filter(|line| {
                (line.offset <= offset && offset < line.end())
                    || (offset == line.end() && !line.hard_break)
                    || (line.length == 0 && offset == line.offset)
            })
            .map(|line| Rect::new(line.x_for(offset), line.y, 0.0, line.height))
            .collect();
        if rects.is_empty()
            && let Some(line) = self.lines.last()
        {
            rects.push(Rect::new(line.right(), line.y, 0.0, line.height));
        }
        rects
    }

    /// Rectangles covering `start..end`, one per touched line. An empty range
    /// gives caret candidates. With `correct_by_y`, rectangles whose vertical
    /// span does not contain that y are dropped.
    pub fn selection_rects(&self, start: usize, end: usize, correct_by_y: Option<f32>) -> Vec<Rect> {
        let rects = if start >= end {
            self.caret_rects(start)
        } else {
            self.lines
                .iter()
                .filter_map(|line| {
                    let from = start.max(line.offset);
                    let to = end.min(line.end());
                    if from >= to {
                        return None;
                    }
                    let x1 = line.x_for(from);
                    let x2 = line.x_for(to);
                    Some(Rect::new(x1, line.y, (x2 - x1).max(0.0), line.height))
                })
                .collect()
        };
        match correct_by_y {
            Some(y) => rects.into_iter().filter(|rect| rect.contains_y(y)).collect(),
            None => rects,
        }
    }

    // ============ serialization & export ============

    pub fn to_ops(&self) -> Delta {
        Delta::from_ops(self.fragments.iter().map(Fragment::to_op))
    }

    /// Plain text of `range` (the whole frame when `None`)
    pub fn to_text(&self, range: Option<Range<usize>>) -> String {
        let range = range.unwrap_or(0..self.length());
        self.clipped(range)
            .map(|(fragment, local)| fragment.to_text(local))
            .collect()
    }

    /// A `<p>` for `range`; the paragraph attributes become inline CSS
    pub fn to_html(&self, range: Option<Range<usize>>) -> String {
        let range = range.unwrap_or(0..self.length());
        let inner: String = self
            .clipped(range)
            .map(|(fragment, local)| fragment.to_html(local))
            .collect();
        let paragraph = ParagraphStyle::from_attributes(&self.paragraph_attributes());
        let mut css = Vec::new();
        if paragraph.alignment != crate::layout::Alignment::Left {
            css.push(format!("text-align:{}", paragraph.alignment.as_css()));
        }
        if paragraph.indent > 0 {
            css.push(format!("margin-left:{}em", paragraph.indent * 2));
        }
        if paragraph.first_line_indent != 0.0 {
            css.push(format!("text-indent:{}pt", paragraph.first_line_indent));
        }
        if css.is_empty() {
            format!("<p>{inner}</p>")
        } else {
            format!("<p style=\"{}\">{inner}</p>", css.join(";"))
        }
    }

    /// Fragments overlapping `range` with the overlap in fragment offsets
    fn clipped(&self, range: Range<usize>) -> impl Iterator<Item = (&Fragment, Range<usize>)> {
        let mut start = 0;
        self.fragments.iter().filter_map(move |fragment| {
            let len = fragment.length();
            let from = range.start.max(start);
            let to = range.end.min(start + len);
            let local = from.saturating_sub(start)..to.saturating_sub(start);
            start += len;
            (from < to).then_some((fragment, local))
        })
    }

    /// The explicit `indent` level of this paragraph
    pub fn indent_level(&self) -> usize {
        self.paragraph_attributes()
            .get_usize(keys::INDENT)
            .unwrap_or(0)
    }
}

fn fragment_starts(fragments: &[Fragment]) -> Vec<usize> {
    let mut start = 0;
    fragments
        .iter()
        .map(|fragment| {
            let current = start;
            start += fragment.length();
            current
        })
        .collect()
}

/// Greedy line filling state
struct LinePacker<'a> {
    fragments: &'a [Fragment],
    styles: &'a [TextStyle],
    starts: Vec<usize>,
    ctx: &'a LayoutContext<'a>,
    max_width: f32,
    indent: f32,
    first_line_indent: f32,
    lines: Vec<Line>,
    runs: Vec<Run>,
    /// Pen position relative to the line start
    x: f32,
    /// Frame offset after the last placed unit
    cursor: usize,
}

impl LinePacker<'_> {
    fn line_left(&self) -> f32 {
        if self.lines.is_empty() {
            self.indent + self.first_line_indent
        } else {
            self.indent
        }
    }

    fn available(&self) -> f32 {
        (self.max_width - self.line_left()).max(0.0)
    }

    fn remaining(&self) -> f32 {
        self.available() - self.x
    }

    fn pack(mut self, pieces: Vec<Piece>) -> Vec<Line> {
        let mut queue: VecDeque<Piece> = pieces.into();
        while let Some(piece) = queue.pop_front() {
            let fits = piece.kind == PieceKind::Space
                || piece.width == 0.0
                || piece.width <= self.remaining() + EPSILON;
            if fits || (self.runs.is_empty() && piece.kind == PieceKind::Holder) {
                self.place_with_break(piece);
                continue;
            }
            if !self.runs.is_empty() {
                self.finish_line(false);
                queue.push_front(piece);
                continue;
            }
            match self.split_piece(piece) {
                (head, Some(tail)) => {
                    self.place(head);
                    self.finish_line(false);
                    queue.push_front(tail);
                }
                (head, None) => self.place_with_break(head),
            }
        }
        if !self.runs.is_empty() || self.lines.is_empty() {
            self.finish_line(true);
        }
        self.lines
    }

    fn place_with_break(&mut self, piece: Piece) {
        let mandatory = piece.mandatory_break;
        self.place(piece);
        if mandatory {
            self.finish_line(true);
        }
    }

    /// Fit as much of an overlong piece as possible on an empty line: whole
    /// parts first, then single chars, and always at least one char
    fn split_piece(&self, piece: Piece) -> (Piece, Option<Piece>) {
        let remaining = self.remaining();
        let mut head: Vec<PiecePart> = Vec::new();
        let mut tail: Vec<PiecePart> = Vec::new();
        let mut used = 0.0;
        let mut parts = piece.parts.into_iter();

        while let Some(part) = parts.next() {
            if used + part.width <= remaining + EPSILON {
                used += part.width;
                head.push(part);
                continue;
            }
            let fragment = &self.fragments[part.fragment];
            let style = &self.styles[part.fragment];
            let mut fit = 0;
            let mut fit_width = 0.0;
            for end in part.start + 1..=part.end {
                let width = measure(self.ctx, fragment, style, part.start, end);
                if used + width > remaining + EPSILON {
                    break;
                }
                fit = end - part.start;
                fit_width = width;
            }
            if fit == 0 && head.is_empty() {
                fit = 1;
                fit_width = measure(self.ctx, fragment, style, part.start, part.start + 1);
            }
            let split = part.start + fit;
            if fit > 0 {
                head.push(PiecePart {
                    end: split,
                    width: fit_width,
                    ..part.clone()
                });
            }
            if split < part.end {
                tail.push(PiecePart {
                    start: split,
                    width: measure(self.ctx, fragment, style, split, part.end),
                    ..part
                });
            }
            tail.extend(parts.by_ref());
            break;
        }

        let mandatory_break = piece.mandatory_break;
        let head = Piece {
            kind: piece.kind,
            width: head.iter().map(|part| part.width).sum(),
            parts: head,
            mandatory_break: mandatory_break && tail.is_empty(),
        };
        let tail = (!tail.is_empty()).then(|| Piece {
            kind: piece.kind,
            width: tail.iter().map(|part| part.width).sum(),
            parts: tail,
            mandatory_break,
        });
        (head, tail)
    }

    fn place(&mut self, piece: Piece) {
        let left = self.line_left();
        for part in piece.parts {
            let fragment = &self.fragments[part.fragment];
            let style = &self.styles[part.fragment];
            let metrics = self.ctx.platform.measure_text_metrics(style);
            let (kind, text, ascent, descent) = match (piece.kind, fragment.kind()) {
                (PieceKind::Holder, FragmentKind::ParaEnd) => (
                    RunKind::ParaEnd,
                    String::new(),
                    metrics.baseline,
                    metrics.bottom - metrics.baseline,
                ),
                (PieceKind::Holder, FragmentKind::Image(image)) => {
                    (RunKind::Embed, String::new(), image.height, 0.0)
                }
                (PieceKind::Holder, FragmentKind::Date(literal)) => (
                    RunKind::Embed,
                    literal.clone(),
                    metrics.baseline,
                    metrics.bottom - metrics.baseline,
                ),
                (kind, _) => (
                    if kind == PieceKind::Space {
                        RunKind::Space
                    } else {
                        RunKind::Text
                    },
                    fragment
                        .as_text()
                        .unwrap_or_default()
                        .chars()
                        .skip(part.start)
                        .take(part.end - part.start)
                        .collect(),
                    metrics.baseline,
                    metrics.bottom - metrics.baseline,
                ),
            };

            let length = part.end - part.start;
            let advances = if matches!(kind, RunKind::Text | RunKind::Space) {
                let mut advances: Vec<f32> = (0..length)
                    .map(|n| measure(self.ctx, fragment, style, part.start, part.start + n))
                    .collect();
                advances.push(part.width);
                advances
            } else {
                vec![0.0, part.width]
            };

            self.runs.push(Run {
                kind,
                fragment: part.fragment,
                offset: self.starts[part.fragment] + part.start,
                length,
                text,
                x: left + self.x,
                width: part.width,
                ascent,
                descent,
                advances,
            });
            self.x += part.width;
            self.cursor = self.starts[part.fragment] + part.end;
        }
    }

    fn finish_line(&mut self, hard_break: bool) {
        let left = self.line_left();
        let available_width = self.available();
        let mut runs = std::mem::take(&mut self.runs);
        if runs.is_empty() {
            runs.push(Run {
                kind: RunKind::Placeholder,
                fragment: 0,
                offset: self.cursor,
                length: 0,
                text: String::new(),
                x: left,
                width: 0.0,
                ascent: 0.0,
                descent: 0.0,
                advances: vec![0.0],
            });
        }
        let offset = runs.first().map_or(self.cursor, |run| run.offset);
        let length = runs.iter().map(|run| run.length).sum();
        self.lines.push(Line {
            offset,
            length,
            y: 0.0,
            height: 0.0,
            baseline: 0.0,
            left,
            available_width,
            hard_break,
            runs,
        });
        self.x = 0.0;
    }
}

/// One run per char for text runs containing CJK
fn explode_cjk(line: &mut Line) {
    let needs_split = line
        .runs
        .iter()
        .any(|run| run.kind == RunKind::Text && run.length > 1 && run.text.chars().any(is_cjk_char));
    if !needs_split {
        return;
    }
    let runs = std::mem::take(&mut line.runs);
    for run in runs {
        if run.kind != RunKind::Text || run.length <= 1 || !run.text.chars().any(is_cjk_char) {
            line.runs.push(run);
            continue;
        }
        for (index, c) in run.text.chars().enumerate() {
            let start = run.advances[index];
            let end = run.advances[index + 1];
            line.runs.push(Run {
                offset: run.offset + index,
                length: 1,
                text: c.to_string(),
                x: run.x + start,
                width: end - start,
                advances: vec![0.0, end - start],
                ..run.clone()
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MonospacePlatform;
    use pretty_assertions::assert_eq;

    fn platform() -> MonospacePlatform {
        MonospacePlatform::fixed(10.0, 20.0)
    }

    fn frame(text: &str) -> LayoutFrame {
        LayoutFrame::new(vec![
            Fragment::text(text, Attributes::new()),
            Fragment::para_end(Attributes::new()),
        ])
    }

    fn line_texts(frame: &LayoutFrame) -> Vec<String> {
        frame.lines().iter().map(Line::text).collect()
    }

    // ============ layout ============

    #[test]
    fn test_wraps_at_word_boundaries() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("hello big world");
        frame.layout(&ctx, 100.0);
        assert_eq!(line_texts(&frame), vec!["hello big ", "world"]);
        assert_eq!(frame.lines()[1].offset, 10);
        assert_eq!(frame.geometry().height, 40.0);
    }

    #[test]
    fn test_trailing_space_hangs_past_width() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("abcd efgh");
        frame.layout(&ctx, 40.0);
        assert_eq!(line_texts(&frame), vec!["abcd ", "efgh"]);
    }

    #[test]
    fn test_overlong_word_splits_by_char() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("abcdefghij");
        frame.layout(&ctx, 40.0);
        assert_eq!(line_texts(&frame), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_narrow_width_places_one_char_per_line() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("abc");
        frame.layout(&ctx, 1.0);
        assert_eq!(line_texts(&frame), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_wide_image_placed_alone() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = LayoutFrame::new(vec![
            Fragment::text("ab ", Attributes::new()),
            Fragment::image("big.png", 500.0, 50.0, Attributes::new()),
            Fragment::para_end(Attributes::new()),
        ]);
        frame.layout(&ctx, 100.0);
        assert_eq!(frame.lines().len(), 2);
        assert_eq!(frame.lines()[1].runs[0].kind, RunKind::Embed);
        assert_eq!(frame.lines()[1].height, 54.0);
    }

    #[test]
    fn test_empty_frame_has_one_line() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = LayoutFrame::empty(Attributes::new());
        frame.layout(&ctx, 100.0);
        assert_eq!(frame.lines().len(), 1);
        assert_eq!(frame.lines()[0].runs.len(), 1);
        assert_eq!(frame.lines()[0].runs[0].width, 0.0);
        assert_eq!(frame.geometry().height, 20.0);

        let mut bare = LayoutFrame::new(Vec::new());
        bare.layout(&ctx, 100.0);
        assert_eq!(bare.lines().len(), 1);
        assert_eq!(bare.lines()[0].runs[0].kind, RunKind::Placeholder);
    }

    #[test]
    fn test_relayout_is_idempotent() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("the quick brown fox jumps");
        frame.layout(&ctx, 120.0);
        let first = frame.lines().to_vec();
        frame.mark_dirty();
        frame.layout(&ctx, 120.0);
        assert_eq!(frame.lines(), first.as_slice());
    }

    #[test]
    fn test_cjk_runs_are_exploded() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("日本語");
        frame.layout(&ctx, 1000.0);
        let line = &frame.lines()[0];
        let texts: Vec<&str> = line.runs.iter().map(|run| run.text.as_str()).collect();
        assert_eq!(texts, vec!["日", "本", "語", ""]);
        assert_eq!(line.runs[1].x, 20.0);
    }

    #[test]
    fn test_indent_and_first_line_indent_offset_lines() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = LayoutFrame::new(vec![
            Fragment::text("aaaa bbbb", Attributes::new()),
            Fragment::para_end(Attributes::new().with("indent", 1).with("firstLineIndent", 15)),
        ]);
        frame.layout(&ctx, 94.0);
        assert_eq!(frame.lines()[0].left, 44.0);
        assert_eq!(frame.lines()[1].left, 24.0);
        assert_eq!(line_texts(&frame), vec!["aaaa ", "bbbb"]);
    }

    #[test]
    fn test_center_alignment() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = LayoutFrame::new(vec![
            Fragment::text("ab", Attributes::new()),
            Fragment::para_end(Attributes::new().with("align", "center")),
        ]);
        frame.layout(&ctx, 100.0);
        assert_eq!(frame.lines()[0].runs[0].x, 40.0);
    }

    // ============ queries ============

    #[test]
    fn test_hit_test_and_caret() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("hello big world");
        frame.layout(&ctx, 100.0);
        assert_eq!(frame.hit_test(0.0, 5.0), 0);
        assert_eq!(frame.hit_test(24.0, 5.0), 2);
        assert_eq!(frame.hit_test(500.0, 5.0), 9);
        assert_eq!(frame.hit_test(12.0, 25.0), 11);
        assert_eq!(frame.hit_test(500.0, 25.0), 15);
        assert_eq!(frame.hit_test(0.0, 500.0), 10);
    }

    #[test]
    fn test_caret_on_wrap_boundary_has_two_candidates() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("hello big world");
        frame.layout(&ctx, 100.0);
        let rects = frame.caret_rects(10);
        assert_eq!(rects.len(), 2);
        let corrected = frame.selection_rects(10, 10, Some(25.0));
        assert_eq!(corrected, vec![Rect::new(0.0, 20.0, 0.0, 20.0)]);
    }

    #[test]
    fn test_selection_rects_span_lines() {
        let platform = platform();
        let ctx = LayoutContext::new(&platform);
        let mut frame = frame("hello big world");
        frame.layout(&ctx, 100.0);
        let rects = frame.selection_rects(6, 13, None);
        assert_eq!(
            rects,
            vec![
                Rect::new(60.0, 0.0, 40.0, 20.0),
                Rect::new(0.0, 20.0, 30.0, 20.0),
            ]
        );
    }

    // ============ editing ============

    #[test]
    fn test_insert_text_joins_previous_fragment() {
        let mut frame = LayoutFrame::new(vec![
            Fragment::text("ab", Attributes::new().with("bold", true)),
            Fragment::text("cd", Attributes::new()),
            Fragment::para_end(Attributes::new()),
        ]);
        frame.insert_text(2, "X", None);
        assert_eq!(frame.fragments()[0].as_text(), Some("abX"));
        frame.insert_text(0, "Y", None);
        assert_eq!(frame.fragments()[0].as_text(), Some("YabX"));
        assert_eq!(frame.length(), 7);
    }

    #[test]
    fn test_insert_text_with_new_attributes_splits() {
        let mut frame = frame("abcd");
        let italic = Attributes::new().with("italic", true);
        frame.insert_text(2, "X", Some(&italic));
        let texts: Vec<&str> = frame.fragments().iter().filter_map(Fragment::as_text).collect();
        assert_eq!(texts, vec!["ab", "X", "cd"]);
        assert_eq!(frame.fragments()[1].explicit(), &italic);
    }

    #[test]
    fn test_delete_and_merge_neighbours() {
        let mut frame = LayoutFrame::new(vec![
            Fragment::text("ab", Attributes::new()),
            Fragment::image("a.png", 5.0, 5.0, Attributes::new()),
            Fragment::text("cd", Attributes::new()),
            Fragment::para_end(Attributes::new()),
        ]);
        frame.delete_range(2, 3);
        assert_eq!(frame.fragments().len(), 2);
        assert_eq!(frame.text(), "abcd\n");
        frame.delete_range(3, 5);
        assert!(!frame.is_terminated());
        assert_eq!(frame.text(), "abc");
    }

    #[test]
    fn test_format_range_splits_and_remerges() {
        let mut frame = frame("abcdef");
        let bold = Attributes::new().with("bold", true);
        frame.format_range(2, 4, &bold);
        assert_eq!(frame.fragments().len(), 4);
        assert!(frame.fragments()[1].explicit().get_bool("bold"));
        let unbold = Attributes::new().with("bold", serde_json::Value::Null);
        frame.format_range(0, 6, &unbold);
        assert_eq!(frame.fragments().len(), 2);
    }

    #[test]
    fn test_split_and_append_round_trip() {
        let mut frame = LayoutFrame::new(vec![
            Fragment::text("abcdef", Attributes::new()),
            Fragment::para_end(Attributes::new().with("align", "right")),
        ]);
        let tail = frame.split_at(3);
        assert_eq!(frame.text(), "abc\n");
        assert_eq!(tail.text(), "def\n");
        assert_eq!(frame.paragraph_attributes().get_str("align"), Some("right"));

        frame.append_frame(tail);
        assert_eq!(frame.text(), "abcdef\n");
        assert_eq!(frame.fragments().len(), 2);
    }

    // ============ export ============

    #[test]
    fn test_to_text_and_html_ranges() {
        let frame = LayoutFrame::new(vec![
            Fragment::text("Hi ", Attributes::new()),
            Fragment::text("there", Attributes::new().with("italic", true)),
            Fragment::para_end(Attributes::new().with("align", "center")),
        ]);
        assert_eq!(frame.to_text(Some(1..5)), "i th");
        insta::assert_snapshot!(frame.to_html(None), @r#"<p style="text-align:center">Hi <em>there</em></p>"#);
    }
}
