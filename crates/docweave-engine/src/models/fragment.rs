use std::ops::Range;

use crate::delta::{InsertValue, Op};
use crate::models::attributes::{AttributeLayers, Attributes, keys};

/// Object replacement character standing in for embeds in plain text views
pub const EMBED_PLACEHOLDER: char = '\u{FFFC}';

pub const TEXT_TAG: &str = "text";
pub const IMAGE_TAG: &str = "image";
pub const DATE_TAG: &str = "date";
pub const PARA_END_TAG: &str = "paraEnd";

/// Remote image reference with fixed pixel dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    pub src: String,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FragmentKind {
    Text(String),
    Image(ImageSource),
    /// A date stamp rendered as its formatted literal
    Date(String),
    /// Paragraph terminator; carries paragraph attributes
    ParaEnd,
}

/// The atomic content unit of a frame
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment {
    kind: FragmentKind,
    pub layers: AttributeLayers,
}

impl Fragment {
    pub fn new(kind: FragmentKind, explicit: Attributes) -> Self {
        Self {
            kind,
            layers: AttributeLayers::from_explicit(explicit),
        }
    }

    pub fn text(text: impl Into<String>, explicit: Attributes) -> Self {
        Self::new(FragmentKind::Text(text.into()), explicit)
    }

    pub fn image(src: impl Into<String>, width: f32, height: f32, explicit: Attributes) -> Self {
        Self::new(
            FragmentKind::Image(ImageSource {
                src: src.into(),
                width,
                height,
            }),
            explicit,
        )
    }

    pub fn date(literal: impl Into<String>, explicit: Attributes) -> Self {
        Self::new(FragmentKind::Date(literal.into()), explicit)
    }

    pub fn para_end(explicit: Attributes) -> Self {
        Self::new(FragmentKind::ParaEnd, explicit)
    }

    pub fn kind(&self) -> &FragmentKind {
        &self.kind
    }

    pub fn tag(&self) -> &'static str {
        match self.kind {
            FragmentKind::Text(_) => TEXT_TAG,
            FragmentKind::Image(_) => IMAGE_TAG,
            FragmentKind::Date(_) => DATE_TAG,
            FragmentKind::ParaEnd => PARA_END_TAG,
        }
    }

    pub fn length(&self) -> usize {
        match &self.kind {
            FragmentKind::Text(text) => text.chars().count(),
            _ => 1,
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, FragmentKind::Text(_))
    }

    pub fn is_para_end(&self) -> bool {
        matches!(self.kind, FragmentKind::ParaEnd)
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            FragmentKind::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn explicit(&self) -> &Attributes {
        &self.layers.explicit
    }

    pub fn explicit_mut(&mut self) -> &mut Attributes {
        &mut self.layers.explicit
    }

    pub fn compiled(&self, defaults: &Attributes) -> Attributes {
        self.layers.compile(defaults)
    }

    /// Adjacent text fragments with identical layers collapse into one
    pub fn can_merge(&self, other: &Fragment) -> bool {
        self.is_text() && other.is_text() && self.layers == other.layers
    }

    /// Append the text of `other`; callers check [`Fragment::can_merge`] first
    pub fn merge_from(&mut self, other: &Fragment) {
        if let (FragmentKind::Text(text), Some(tail)) = (&mut self.kind, other.as_text()) {
            text.push_str(tail);
        }
    }

    /// Split a text fragment at a char offset, keeping the head.
    ///
    /// Returns `None` when the split would be empty on either side or the
    /// fragment is not text.
    pub fn split_off(&mut self, at: usize) -> Option<Fragment> {
        let FragmentKind::Text(text) = &mut self.kind else {
            return None;
        };
        let len = text.chars().count();
        if at == 0 || at >= len {
            return None;
        }
        let tail = text.split_off(byte_index(text, at));
        Some(Fragment {
            kind: FragmentKind::Text(tail),
            layers: self.layers.clone(),
        })
    }

    pub fn insert_str(&mut self, at: usize, s: &str) {
        if let FragmentKind::Text(text) = &mut self.kind {
            let byte = byte_index(text, at);
            text.insert_str(byte, s);
        }
    }

    /// Remove the chars in `range` from a text fragment
    pub fn remove_chars(&mut self, range: Range<usize>) {
        if let FragmentKind::Text(text) = &mut self.kind {
            let start = byte_index(text, range.start);
            let end = byte_index(text, range.end);
            text.replace_range(start..end, "");
        }
    }

    /// One char per unit of length, used for searching and line breaking
    pub fn placeholder_text(&self) -> String {
        match &self.kind {
            FragmentKind::Text(text) => text.clone(),
            FragmentKind::Image(_) | FragmentKind::Date(_) => EMBED_PLACEHOLDER.to_string(),
            FragmentKind::ParaEnd => "\n".to_string(),
        }
    }

    /// The op this fragment serializes to
    pub fn to_op(&self) -> Op {
        let explicit = self.layers.explicit.clone();
        match &self.kind {
            FragmentKind::Text(text) => Op::Insert {
                value: InsertValue::Text(text.clone()),
                attributes: explicit.into_option(),
            },
            FragmentKind::Image(image) => Op::Insert {
                value: InsertValue::Count(1),
                attributes: Some(
                    explicit
                        .with(keys::FRAG, IMAGE_TAG)
                        .with(keys::SRC, image.src.clone())
                        .with(keys::WIDTH, image.width)
                        .with(keys::HEIGHT, image.height),
                ),
            },
            FragmentKind::Date(literal) => Op::Insert {
                value: InsertValue::Count(1),
                attributes: Some(
                    explicit
                        .with(keys::FRAG, DATE_TAG)
                        .with(keys::TEXT, literal.clone()),
                ),
            },
            FragmentKind::ParaEnd => Op::Insert {
                value: InsertValue::Count(1),
                attributes: Some(explicit.with(keys::FRAG, PARA_END_TAG)),
            },
        }
    }

    /// Plain text for the chars of this fragment inside `range`
    pub fn to_text(&self, range: Range<usize>) -> String {
        if range.is_empty() {
            return String::new();
        }
        match &self.kind {
            FragmentKind::Text(text) => text
                .chars()
                .skip(range.start)
                .take(range.end - range.start)
                .collect(),
            FragmentKind::Image(_) => String::new(),
            FragmentKind::Date(literal) => literal.clone(),
            FragmentKind::ParaEnd => "\n".to_string(),
        }
    }

    /// Inline HTML for the chars of this fragment inside `range`.
    /// Paragraph terminators produce nothing; the frame closes the paragraph.
    pub fn to_html(&self, range: Range<usize>) -> String {
        if range.is_empty() {
            return String::new();
        }
        match &self.kind {
            FragmentKind::Text(_) => {
                let text = self.to_text(range);
                wrap_inline(&html_escape::encode_text(&text), &self.layers.explicit)
            }
            FragmentKind::Image(image) => format!(
                "<img src=\"{}\" width=\"{}\" height=\"{}\">",
                html_escape::encode_double_quoted_attribute(&image.src),
                image.width,
                image.height
            ),
            FragmentKind::Date(literal) => wrap_inline(
                &format!("<time>{}</time>", html_escape::encode_text(literal)),
                &self.layers.explicit,
            ),
            FragmentKind::ParaEnd => String::new(),
        }
    }
}

fn wrap_inline(inner: &str, attrs: &Attributes) -> String {
    let mut html = inner.to_string();
    for (key, tag) in [
        (keys::STRIKE, "s"),
        (keys::UNDERLINE, "u"),
        (keys::ITALIC, "em"),
        (keys::BOLD, "strong"),
    ] {
        if attrs.get_bool(key) {
            html = format!("<{tag}>{html}</{tag}>");
        }
    }

    let mut css = Vec::new();
    if let Some(font) = attrs.get_str(keys::FONT) {
        css.push(format!("font-family:{font}"));
    }
    if let Some(size) = attrs.get_f32(keys::SIZE) {
        css.push(format!("font-size:{size}pt"));
    }
    if let Some(color) = attrs.get_str(keys::COLOR) {
        css.push(format!("color:{color}"));
    }
    if let Some(background) = attrs.get_str(keys::BACKGROUND) {
        css.push(format!("background-color:{background}"));
    }
    if css.is_empty() {
        html
    } else {
        format!(
            "<span style=\"{}\">{html}</span>",
            html_escape::encode_double_quoted_attribute(&css.join(";"))
        )
    }
}

/// Byte offset of the `char_index`-th char, or the string length past the end
pub(crate) fn byte_index(text: &str, char_index: usize) -> usize {
    text.char_indices()
        .nth(char_index)
        .map_or(text.len(), |(byte, _)| byte)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_length_counts_chars() {
        assert_eq!(Fragment::text("héllo", Attributes::new()).length(), 5);
        assert_eq!(Fragment::image("a.png", 10.0, 10.0, Attributes::new()).length(), 1);
        assert_eq!(Fragment::para_end(Attributes::new()).length(), 1);
    }

    #[test]
    fn test_split_off_multibyte() {
        let mut frag = Fragment::text("日本語です", Attributes::new().with("bold", true));
        let tail = frag.split_off(2).unwrap();
        assert_eq!(frag.as_text(), Some("日本"));
        assert_eq!(tail.as_text(), Some("語です"));
        assert_eq!(tail.explicit(), frag.explicit());
        assert!(frag.split_off(0).is_none());
        assert!(frag.split_off(2).is_none());
    }

    #[test]
    fn test_insert_and_remove_chars() {
        let mut frag = Fragment::text("héllo", Attributes::new());
        frag.insert_str(2, "XY");
        assert_eq!(frag.as_text(), Some("héXYllo"));
        frag.remove_chars(1..4);
        assert_eq!(frag.as_text(), Some("hllo"));
    }

    #[test]
    fn test_to_op_tags_embeds() {
        let op = Fragment::date("2024-03-01", Attributes::new()).to_op();
        let json = serde_json::to_string(&op).unwrap();
        assert_eq!(
            json,
            r#"{"insert":1,"attributes":{"frag":"date","text":"2024-03-01"}}"#
        );

        let op = Fragment::text("hi", Attributes::new()).to_op();
        assert_eq!(serde_json::to_string(&op).unwrap(), r#"{"insert":"hi"}"#);
    }

    #[test]
    fn test_to_html_escapes_and_wraps() {
        let frag = Fragment::text(
            "a<b",
            Attributes::new().with("bold", true).with("color", "red"),
        );
        insta::assert_snapshot!(frag.to_html(0..3), @r#"<span style="color:red"><strong>a&lt;b</strong></span>"#);
    }

    #[test]
    fn test_to_text_clips_range() {
        let frag = Fragment::text("hello world", Attributes::new());
        assert_eq!(frag.to_text(6..11), "world");
        assert_eq!(Fragment::para_end(Attributes::new()).to_text(0..1), "\n");
    }
}
