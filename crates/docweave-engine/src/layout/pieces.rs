use crate::layout::LayoutContext;
use crate::layout::line_breaker::LineBreaker;
use crate::models::fragment::{Fragment, FragmentKind};
use crate::models::style::TextStyle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PieceKind {
    Word,
    Space,
    /// A non-text fragment, placed atomically
    Holder,
}

/// A char range of one fragment inside a piece
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PiecePart {
    pub fragment: usize,
    pub start: usize,
    pub end: usize,
    pub width: f32,
}

/// The unit the packer places: text between two break opportunities, a
/// whitespace run, or a holder
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Piece {
    pub kind: PieceKind,
    pub parts: Vec<PiecePart>,
    pub width: f32,
    /// A new line must start after this piece
    pub mandatory_break: bool,
}

impl Piece {
    fn from_parts(kind: PieceKind, parts: Vec<PiecePart>) -> Self {
        let width = parts.iter().map(|part| part.width).sum();
        Self {
            kind,
            parts,
            width,
            mandatory_break: false,
        }
    }

    #[cfg(test)]
    pub fn text(&self, fragments: &[Fragment]) -> String {
        self.parts
            .iter()
            .map(|part| {
                fragments[part.fragment]
                    .placeholder_text()
                    .chars()
                    .skip(part.start)
                    .take(part.end - part.start)
                    .collect::<String>()
            })
            .collect()
    }
}

pub(crate) fn is_space(c: char) -> bool {
    c.is_whitespace() && !matches!(c, '\u{00A0}' | '\u{2007}' | '\u{202F}')
}

/// Width of chars `start..end` of a text fragment
pub(crate) fn measure(
    ctx: &LayoutContext<'_>,
    fragment: &Fragment,
    style: &TextStyle,
    start: usize,
    end: usize,
) -> f32 {
    match fragment.kind() {
        FragmentKind::Text(text) => {
            let slice: String = text.chars().skip(start).take(end - start).collect();
            ctx.platform.measure_text_width(&slice, style)
        }
        FragmentKind::Image(image) => image.width,
        FragmentKind::Date(literal) => ctx.platform.measure_text_width(literal, style),
        FragmentKind::ParaEnd => 0.0,
    }
}

/// Cut a frame's fragments into pieces
pub(crate) fn build_pieces(
    fragments: &[Fragment],
    styles: &[TextStyle],
    ctx: &LayoutContext<'_>,
) -> Vec<Piece> {
    let mut pieces = Vec::new();
    let mut index = 0;
    while index < fragments.len() {
        if !fragments[index].is_text() {
            let width = measure(ctx, &fragments[index], &styles[index], 0, 1);
            pieces.push(Piece::from_parts(
                PieceKind::Holder,
                vec![PiecePart {
                    fragment: index,
                    start: 0,
                    end: 1,
                    width,
                }],
            ));
            index += 1;
            continue;
        }

        let group_start = index;
        while index < fragments.len() && fragments[index].is_text() {
            index += 1;
        }
        text_group_pieces(fragments, styles, ctx, group_start..index, &mut pieces);
    }
    pieces
}

fn text_group_pieces(
    fragments: &[Fragment],
    styles: &[TextStyle],
    ctx: &LayoutContext<'_>,
    group: std::ops::Range<usize>,
    pieces: &mut Vec<Piece>,
) {
    let mut chars = Vec::new();
    let mut owners = Vec::new();
    for fragment_index in group {
        if let Some(text) = fragments[fragment_index].as_text() {
            for (offset, c) in text.chars().enumerate() {
                chars.push(c);
                owners.push((fragment_index, offset));
            }
        }
    }
    let text: String = chars.iter().collect();

    let make_piece = |range: std::ops::Range<usize>, kind: PieceKind| {
        let mut parts: Vec<PiecePart> = Vec::new();
        for &(fragment, offset) in &owners[range] {
            match parts.last_mut() {
                Some(part) if part.fragment == fragment => part.end = offset + 1,
                _ => parts.push(PiecePart {
                    fragment,
                    start: offset,
                    end: offset + 1,
                    width: 0.0,
                }),
            }
        }
        for part in &mut parts {
            part.width = measure(
                ctx,
                &fragments[part.fragment],
                &styles[part.fragment],
                part.start,
                part.end,
            );
        }
        Piece::from_parts(kind, parts)
    };

    let mut start = 0;
    for brk in LineBreaker::new(&text) {
        let end = brk.position;
        let segment = &chars[start..end];
        let leading = segment.iter().take_while(|c| is_space(**c)).count();
        let trailing = if leading == segment.len() {
            0
        } else {
            segment.iter().rev().take_while(|c| is_space(**c)).count()
        };

        let first_piece = pieces.len();
        if leading > 0 {
            pieces.push(make_piece(start..start + leading, PieceKind::Space));
        }
        if start + leading < end - trailing {
            pieces.push(make_piece(start + leading..end - trailing, PieceKind::Word));
        }
        if trailing > 0 {
            pieces.push(make_piece(end - trailing..end, PieceKind::Space));
        }
        if brk.required
            && pieces.len() > first_piece
            && let Some(last) = pieces.last_mut()
        {
            last.mandatory_break = true;
        }
        start = end;
    }
}
