use std::ops::RangeInclusive;

use crate::blocks::{BlockKind, Exportable, Layout, OpSource, Selectable};
use crate::delta::{Delta, Op};
use crate::layout::{LayoutContext, LayoutFrame, LayoutSettings};
use crate::models::attributes::{Attributes, keys};
use crate::models::doc_pos::DocPos;
use crate::models::fragment::Fragment;
use crate::models::geometry::Rect;

/// A content, quote or code block: a run of paragraphs
#[derive(Debug, Clone, PartialEq)]
pub struct FrameBlock {
    kind: BlockKind,
    frames: Vec<LayoutFrame>,
    /// Block-owned attributes such as a code block's `language`
    pub attributes: Attributes,
    pub(crate) geometry: Rect,
    pub(crate) start: usize,
    needs_layout: bool,
    width: f32,
}

impl FrameBlock {
    pub fn new(kind: BlockKind, frames: Vec<LayoutFrame>, attributes: Attributes) -> Self {
        let mut frames = frames;
        if frames.is_empty() {
            frames.push(LayoutFrame::empty(Attributes::new()));
        }
        for frame in &mut frames {
            frame.terminate();
            frame.set_override_defaults(&kind.override_defaults());
        }
        Self {
            kind,
            frames,
            attributes,
            geometry: Rect::default(),
            start: 0,
            needs_layout: true,
            width: 0.0,
        }
    }

    /// A block holding one empty paragraph
    pub fn empty(kind: BlockKind) -> Self {
        Self::new(kind, Vec::new(), Attributes::new())
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Switch flavour; attributes the new kind does not own are dropped
    pub fn set_kind(&mut self, kind: BlockKind) {
        if self.kind == kind {
            return;
        }
        self.kind = kind;
        let owned = kind.owned_keys();
        self.attributes = self
            .attributes
            .iter()
            .filter(|(key, _)| owned.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        let defaults = kind.override_defaults();
        for frame in &mut self.frames {
            frame.set_override_defaults(&defaults);
        }
        self.mark_dirty();
    }

    pub fn frames(&self) -> &[LayoutFrame] {
        &self.frames
    }

    pub fn length(&self) -> usize {
        self.frames.iter().map(LayoutFrame::length).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn mark_dirty(&mut self) {
        self.needs_layout = true;
    }

    /// Block offset where frame `index` starts
    pub fn frame_start(&self, index: usize) -> usize {
        self.frames[..index.min(self.frames.len())]
            .iter()
            .map(LayoutFrame::length)
            .sum()
    }

    /// Frame holding `offset` and the offset within it. The end of the block
    /// resolves to the end of the last frame.
    pub fn frame_at(&self, offset: usize) -> (usize, usize) {
        let mut start = 0;
        for (index, frame) in self.frames.iter().enumerate() {
            let len = frame.length();
            if offset < start + len {
                return (index, offset - start);
            }
            start += len;
        }
        let last = self.frames.len().saturating_sub(1);
        let last_start = start - self.frames.last().map_or(0, LayoutFrame::length);
        (last, offset.saturating_sub(last_start))
    }

    /// Frames touched by `start..end`; a collapsed range touches one
    pub fn frames_touching(&self, start: usize, end: usize) -> RangeInclusive<usize> {
        let (first, _) = self.frame_at(start);
        let (last, _) = if end > start {
            self.frame_at(end - 1)
        } else {
            (first, 0)
        };
        first..=last
    }

    /// Last offset that still lies before the final terminator
    fn clamp_insert(&self, offset: usize) -> usize {
        offset.min(self.length().saturating_sub(1))
    }

    fn insets(&self, settings: &LayoutSettings) -> (f32, f32, f32, f32) {
        match self.kind {
            BlockKind::Content => (0.0, 0.0, 0.0, 0.0),
            BlockKind::Quote => (settings.quote_indent, 0.0, 0.0, 0.0),
            BlockKind::Code => (
                settings.code_padding,
                settings.code_padding,
                settings.code_padding,
                settings.code_padding,
            ),
        }
    }

    // ============ editing ============

    /// Insert text at a block offset; `\n` starts a new paragraph. Returns
    /// the offset after the inserted text.
    pub(crate) fn insert_text(
        &mut self,
        offset: usize,
        text: &str,
        attributes: Option<&Attributes>,
    ) -> usize {
        let mut offset = self.clamp_insert(offset);
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                self.split_paragraph(offset);
                offset += 1;
            }
            if !line.is_empty() {
                let (frame, local) = self.frame_at(offset);
                self.frames[frame].insert_text(local, line, attributes);
                offset += line.chars().count();
            }
        }
        self.mark_dirty();
        offset
    }

    pub(crate) fn insert_fragment(&mut self, offset: usize, fragment: Fragment) -> usize {
        let offset = self.clamp_insert(offset);
        let length = fragment.length();
        let (frame, local) = self.frame_at(offset);
        self.frames[frame].insert_fragment(local, fragment);
        self.mark_dirty();
        offset + length
    }

    /// End the paragraph at `offset`; the rest moves to a new paragraph
    pub(crate) fn split_paragraph(&mut self, offset: usize) {
        let (frame, local) = self.frame_at(offset);
        let mut tail = self.frames[frame].split_at(local);
        tail.set_override_defaults(&self.kind.override_defaults());
        self.frames.insert(frame + 1, tail);
        self.mark_dirty();
    }

    /// Remove `start..end`. Paragraphs that lose their terminator merge with
    /// the following one; only the last paragraph may stay unterminated,
    /// and the block may end up with no paragraphs at all.
    pub(crate) fn delete_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.length());
        if start >= end {
            return;
        }
        let mut frame_start = 0;
        let mut index = 0;
        while index < self.frames.len() {
            let len = self.frames[index].length();
            let from = start.max(frame_start);
            let to = end.min(frame_start + len);
            frame_start += len;
            if from >= to {
                index += 1;
                continue;
            }
            let local_start = from - (frame_start - len);
            if local_start == 0 && to - from == len {
                self.frames.remove(index);
            } else {
                self.frames[index].delete_range(local_start, to - (frame_start - len));
                index += 1;
            }
        }

        let mut index = 0;
        while index + 1 < self.frames.len() {
            if self.frames[index].is_terminated() {
                index += 1;
            } else {
                let next = self.frames.remove(index + 1);
                self.frames[index].append_frame(next);
            }
        }
        self.mark_dirty();
    }

    pub(crate) fn format_range(&mut self, start: usize, end: usize, attributes: &Attributes) {
        let mut frame_start = 0;
        for frame in &mut self.frames {
            let len = frame.length();
            let from = start.max(frame_start);
            let to = end.min(frame_start + len);
            if from < to {
                frame.format_range(from - frame_start, to - frame_start, attributes);
            }
            frame_start += len;
        }
        self.mark_dirty();
    }

    pub(crate) fn format_paragraphs(&mut self, start: usize, end: usize, attributes: &Attributes) {
        for index in self.frames_touching(start, end) {
            self.frames[index].format_paragraph(attributes);
        }
        self.mark_dirty();
    }

    /// Change the indent level of touched paragraphs, never below zero
    pub(crate) fn indent_paragraphs(&mut self, start: usize, end: usize, delta: isize) {
        for index in self.frames_touching(start, end) {
            let frame = &mut self.frames[index];
            let level = (frame.indent_level() as isize + delta).max(0) as usize;
            let value = if level == 0 {
                serde_json::Value::Null
            } else {
                level.into()
            };
            frame.format_paragraph(&Attributes::new().with(keys::INDENT, value));
        }
        self.mark_dirty();
    }

    /// Move frames `at..` into a new block of the same kind
    pub(crate) fn split_off(&mut self, at: usize) -> Option<FrameBlock> {
        if at >= self.frames.len() {
            return None;
        }
        let tail = self.frames.split_off(at);
        self.mark_dirty();
        Some(FrameBlock::new(self.kind, tail, self.attributes.clone()))
    }

    /// Merge an unterminated last paragraph with `next`, the first paragraph
    /// of the following block
    pub(crate) fn join_last(&mut self, next: LayoutFrame) {
        match self.frames.last_mut() {
            Some(last) => last.append_frame(next),
            None => self.frames.push(next),
        }
        if let Some(last) = self.frames.last_mut() {
            last.set_override_defaults(&self.kind.override_defaults());
        }
        self.mark_dirty();
    }

    pub(crate) fn remove_first_frame(&mut self) -> Option<LayoutFrame> {
        if self.frames.is_empty() {
            return None;
        }
        self.mark_dirty();
        Some(self.frames.remove(0))
    }

    pub(crate) fn ends_terminated(&self) -> bool {
        self.frames.last().is_some_and(LayoutFrame::is_terminated)
    }

    pub(crate) fn terminate(&mut self) {
        if let Some(last) = self.frames.last_mut() {
            last.terminate();
        }
        self.mark_dirty();
    }

    fn clipped(&self, start: usize, end: usize) -> impl Iterator<Item = (&LayoutFrame, usize, usize)> {
        let mut frame_start = 0;
        self.frames.iter().filter_map(move |frame| {
            let len = frame.length();
            let from = start.max(frame_start);
            let to = end.min(frame_start + len);
            let local = (from.saturating_sub(frame_start), to.saturating_sub(frame_start));
            frame_start += len;
            (from < to).then_some((frame, local.0, local.1))
        })
    }

    fn range_bounds(&self, range: Option<(&DocPos, &DocPos)>) -> (usize, usize) {
        match range {
            Some((start, end)) => (start.index, end.index.min(self.length())),
            None => (0, self.length()),
        }
    }
}

impl Layout for FrameBlock {
    fn layout(&mut self, ctx: &LayoutContext<'_>, width: f32) {
        if !self.needs_layout() && self.width == width {
            return;
        }
        let (left, top, right, bottom) = self.insets(ctx.settings);
        let inner = (width - left - right).max(0.0);
        let mut y = top;
        for frame in &mut self.frames {
            frame.layout(ctx, inner);
            frame.geometry.x = left;
            frame.geometry.y = y;
            y += frame.geometry.height;
        }
        self.geometry.width = width;
        self.geometry.height = y + bottom;
        self.width = width;
        self.needs_layout = false;
    }

    fn needs_layout(&self) -> bool {
        self.needs_layout || self.frames.iter().any(LayoutFrame::needs_layout)
    }

    fn geometry(&self) -> Rect {
        self.geometry
    }
}

impl Selectable for FrameBlock {
    fn get_document_pos(&self, x: f32, y: f32, _is_start_of_selection: bool) -> Option<DocPos> {
        if y < 0.0 || y >= self.geometry.height {
            return None;
        }
        // the bottom padding band belongs to the last frame
        let index = self
            .frames
            .iter()
            .position(|frame| y < frame.geometry.bottom())
            .unwrap_or(self.frames.len().checked_sub(1)?);
        let frame = &self.frames[index];
        let offset = frame.hit_test(x - frame.geometry.x, y - frame.geometry.y);
        Some(DocPos::new(self.frame_start(index) + offset))
    }

    fn get_selection_rectangles(
        &self,
        start: &DocPos,
        end: &DocPos,
        correct_by_y: Option<f32>,
    ) -> Vec<Rect> {
        let (start, end) = (start.index, end.index);
        if start >= end {
            let (index, local) = self.frame_at(start);
            let Some(frame) = self.frames.get(index) else {
                return Vec::new();
            };
            let origin = frame.geometry;
            return frame
                .selection_rects(local, local, correct_by_y.map(|y| y - origin.y))
                .into_iter()
                .map(|rect| rect.translate(origin.x, origin.y))
                .collect();
        }
        self.clipped(start, end)
            .flat_map(|(frame, from, to)| {
                let origin = frame.geometry;
                frame
                    .selection_rects(from, to, correct_by_y.map(|y| y - origin.y))
                    .into_iter()
                    .map(move |rect| rect.translate(origin.x, origin.y))
            })
            .collect()
    }
}

impl OpSource for FrameBlock {
    fn to_ops(&self) -> Delta {
        let mut ops: Vec<Op> = self
            .frames
            .iter()
            .flat_map(|frame| frame.fragments().iter().map(Fragment::to_op))
            .collect();
        if let Some(Op::Insert { attributes, .. }) = ops.last_mut() {
            let mut tagged = attributes.take().unwrap_or_default();
            tagged.insert(keys::BLOCK, self.kind.tag());
            for key in self.kind.owned_keys() {
                if let Some(value) = self.attributes.get(key) {
                    tagged.insert(*key, value.clone());
                }
            }
            *attributes = Some(tagged);
        }
        Delta::from_ops(ops)
    }
}

impl Exportable for FrameBlock {
    fn to_text(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        let (start, end) = self.range_bounds(range);
        self.clipped(start, end)
            .map(|(frame, from, to)| frame.to_text(Some(from..to)))
            .collect()
    }

    fn to_html(&self, range: Option<(&DocPos, &DocPos)>) -> String {
        let (start, end) = self.range_bounds(range);
        match self.kind {
            BlockKind::Code => {
                let text = self.to_text(range);
                let text = text.strip_suffix('\n').unwrap_or(&text);
                let class = self
                    .attributes
                    .get_str(keys::LANGUAGE)
                    .map(|language| {
                        format!(
                            " class=\"language-{}\"",
                            html_escape::encode_double_quoted_attribute(language)
                        )
                    })
                    .unwrap_or_default();
                format!("<pre><code{class}>{}</code></pre>", html_escape::encode_text(text))
            }
            BlockKind::Content | BlockKind::Quote => {
                let paragraphs: String = self
                    .clipped(start, end)
                    .map(|(frame, from, to)| frame.to_html(Some(from..to)))
                    .collect();
                if self.kind == BlockKind::Quote {
                    format!("<blockquote>{paragraphs}</blockquote>")
                } else {
                    paragraphs
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::MonospacePlatform;
    use pretty_assertions::assert_eq;

    fn paragraph(text: &str) -> LayoutFrame {
        LayoutFrame::new(vec![
            Fragment::text(text, Attributes::new()),
            Fragment::para_end(Attributes::new()),
        ])
    }

    fn block(kind: BlockKind, texts: &[&str]) -> FrameBlock {
        FrameBlock::new(kind, texts.iter().map(|t| paragraph(t)).collect(), Attributes::new())
    }

    fn texts(block: &FrameBlock) -> Vec<String> {
        block.frames().iter().map(LayoutFrame::text).collect()
    }

    // ============ editing ============

    #[test]
    fn test_insert_text_with_newlines_splits_paragraphs() {
        let mut block = block(BlockKind::Content, &["abcd"]);
        let end = block.insert_text(2, "X\nY\nZ", None);
        assert_eq!(texts(&block), vec!["abX\n", "Y\n", "Zcd\n"]);
        assert_eq!(end, 7);
        assert_eq!(block.length(), 10);
    }

    #[test]
    fn test_insert_past_end_lands_before_terminator() {
        let mut block = block(BlockKind::Content, &["ab"]);
        let end = block.insert_text(10, "c", None);
        assert_eq!(texts(&block), vec!["abc\n"]);
        assert_eq!(end, 3);
    }

    #[test]
    fn test_delete_across_paragraphs_merges() {
        let mut block = block(BlockKind::Content, &["one", "two", "three"]);
        block.delete_range(2, 10);
        assert_eq!(texts(&block), vec!["onree\n"]);
    }

    #[test]
    fn test_delete_terminator_joins_next_paragraph() {
        let mut block = block(BlockKind::Content, &["one", "two"]);
        block.delete_range(3, 4);
        assert_eq!(texts(&block), vec!["onetwo\n"]);
    }

    #[test]
    fn test_delete_last_terminator_leaves_block_unterminated() {
        let mut block = block(BlockKind::Content, &["one", "two"]);
        block.delete_range(6, 8);
        assert_eq!(texts(&block), vec!["one\n", "tw"]);
        assert!(!block.ends_terminated());

        block.delete_range(0, 6);
        assert!(block.is_empty());
    }

    #[test]
    fn test_indent_never_goes_negative() {
        let mut block = block(BlockKind::Content, &["a", "b"]);
        block.indent_paragraphs(0, 3, 2);
        assert_eq!(block.frames()[1].indent_level(), 2);
        block.indent_paragraphs(0, 0, -5);
        assert_eq!(block.frames()[0].indent_level(), 0);
        assert!(!block.frames()[0].paragraph_attributes().contains_key("indent"));
        assert_eq!(block.frames()[1].indent_level(), 2);
    }

    #[test]
    fn test_set_kind_swaps_defaults_and_owned_attributes() {
        let mut code = FrameBlock::new(
            BlockKind::Code,
            vec![paragraph("x")],
            Attributes::new().with("language", "rust"),
        );
        assert_eq!(
            code.frames()[0].fragments()[0].layers.override_defaults.get_str("font"),
            Some("monospace")
        );
        code.set_kind(BlockKind::Quote);
        assert!(code.attributes.is_empty());
        assert!(
            code.frames()[0].fragments()[0]
                .layers
                .override_defaults
                .get_bool("italic")
        );
    }

    // ============ layout & queries ============

    #[test]
    fn test_code_block_insets_frames() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut code = block(BlockKind::Code, &["a", "b"]);
        code.layout(&ctx, 200.0);
        assert_eq!(code.frames()[1].geometry(), Rect::new(6.0, 26.0, 10.0, 20.0));
        assert_eq!(code.geometry().height, 52.0);
        assert_eq!(code.get_document_pos(8.0, 30.0, false), Some(DocPos::new(2)));
        assert_eq!(code.get_document_pos(8.0, 50.0, false), Some(DocPos::new(2)));
        assert_eq!(code.get_document_pos(8.0, 52.0, false), None);
    }

    #[test]
    fn test_selection_rectangles_cross_paragraphs() {
        let platform = MonospacePlatform::fixed(10.0, 20.0);
        let ctx = LayoutContext::new(&platform);
        let mut block = block(BlockKind::Quote, &["abc", "de"]);
        block.layout(&ctx, 200.0);
        let rects = block.get_selection_rectangles(&DocPos::new(1), &DocPos::new(5), None);
        assert_eq!(
            rects,
            vec![
                Rect::new(26.0, 0.0, 20.0, 20.0),
                Rect::new(16.0, 20.0, 10.0, 20.0),
            ]
        );
    }

    // ============ serialization & export ============

    #[test]
    fn test_to_ops_tags_last_terminator() {
        let code = FrameBlock::new(
            BlockKind::Code,
            vec![paragraph("a"), paragraph("b")],
            Attributes::new().with("language", "rust"),
        );
        let json = serde_json::to_value(code.to_ops()).unwrap();
        assert_eq!(
            json,
            serde_json::json!([
                {"insert": "a"},
                {"insert": 1, "attributes": {"frag": "paraEnd"}},
                {"insert": "b"},
                {"insert": 1, "attributes": {"frag": "paraEnd", "block": "code", "language": "rust"}},
            ])
        );
    }

    #[test]
    fn test_html_per_kind() {
        let quote = block(BlockKind::Quote, &["a<b"]);
        insta::assert_snapshot!(quote.to_html(None), @"<blockquote><p>a&lt;b</p></blockquote>");

        let code = FrameBlock::new(
            BlockKind::Code,
            vec![paragraph("let x;"), paragraph("x < 1")],
            Attributes::new().with("language", "rust"),
        );
        assert_eq!(
            code.to_html(None),
            "<pre><code class=\"language-rust\">let x;\nx &lt; 1</code></pre>"
        );
        assert_eq!(code.to_text(Some((&DocPos::new(4), &DocPos::new(9)))), "x;\nx ");
    }
}
