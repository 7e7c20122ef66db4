use crate::models::attributes::{Attributes, keys};

/// Typography resolved from a compiled attribute map.
///
/// This is what the platform measures and what the render surface paints;
/// sizes are in points and converted by the platform.
#[derive(Debug, Clone, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub strike: bool,
    pub color: String,
    pub background: Option<String>,
}

impl TextStyle {
    pub fn from_attributes(attrs: &Attributes) -> Self {
        let defaults = Attributes::library_defaults();
        Self {
            font_family: attrs
                .get_str(keys::FONT)
                .or_else(|| defaults.get_str(keys::FONT))
                .unwrap_or("sans-serif")
                .to_string(),
            font_size: attrs
                .get_f32(keys::SIZE)
                .filter(|size| *size > 0.0)
                .unwrap_or(12.0),
            bold: attrs.get_bool(keys::BOLD),
            italic: attrs.get_bool(keys::ITALIC),
            underline: attrs.get_bool(keys::UNDERLINE),
            strike: attrs.get_bool(keys::STRIKE),
            color: attrs.get_str(keys::COLOR).unwrap_or("#000000").to_string(),
            background: attrs.get_str(keys::BACKGROUND).map(str::to_string),
        }
    }

    /// CSS declarations for the non-default parts of this style
    pub fn css(&self, base: &TextStyle) -> String {
        let mut css = Vec::new();
        if self.font_family != base.font_family {
            css.push(format!("font-family:{}", self.font_family));
        }
        if self.font_size != base.font_size {
            css.push(format!("font-size:{}pt", self.font_size));
        }
        if self.color != base.color {
            css.push(format!("color:{}", self.color));
        }
        if let Some(background) = &self.background {
            css.push(format!("background-color:{background}"));
        }
        css.join(";")
    }
}

impl Default for TextStyle {
    fn default() -> Self {
        Self::from_attributes(Attributes::library_defaults())
    }
}

/// Vertical font metrics, in pixels, as reported by the platform
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FontMetrics {
    /// Distance from the top of the line box to the baseline
    pub baseline: f32,
    /// Height of the line box
    pub bottom: f32,
    pub x_top: f32,
}
